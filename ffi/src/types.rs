//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Conversion functions live here to keep
//! `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use formfetch_core::{HttpMethod, RequestError, RequestSnapshot, RequestState};
use serde_json::Value;

/// Opaque handle to a `RequestState`. C callers receive a pointer to this
/// and pass it back into every `formfetch_request_*` function.
pub struct FfiRequestState {
    pub(crate) inner: RequestState<Value>,
}

/// Message recorded when `formfetch_request_settle_transport_error` is
/// called without one.
pub(crate) const DEFAULT_TRANSPORT_MESSAGE: &str = "transport error";

/// Copy `s` into a heap C string owned by the caller. Interior NUL bytes
/// cannot be represented, so such strings come back empty.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
    Patch = 4,
}

impl FfiHttpMethod {
    /// Map a raw discriminant received from C. Unknown values yield `None`.
    pub(crate) fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(FfiHttpMethod::Get),
            1 => Some(FfiHttpMethod::Post),
            2 => Some(FfiHttpMethod::Put),
            3 => Some(FfiHttpMethod::Delete),
            4 => Some(FfiHttpMethod::Patch),
            _ => None,
        }
    }
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
            HttpMethod::Patch => FfiHttpMethod::Patch,
        }
    }
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Delete => HttpMethod::Delete,
            FfiHttpMethod::Patch => HttpMethod::Patch,
        }
    }
}

/// A header supplied by the C caller. The FFI layer copies both strings and
/// never frees them.
#[repr(C)]
pub struct FfiHeaderRef {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// A single HTTP header as a key-value pair of owned C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Returned by `formfetch_request_begin`. The C caller executes the request
/// and hands the outcome back through `formfetch_request_settle_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: formfetch_core::HttpRequest) -> *mut Self {
        let url = into_c_string(req.url);
        let body = match req.body {
            Some(b) => into_c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request, then
/// passes a pointer to `formfetch_request_settle_response`. The FFI layer
/// reads but does not free these fields. `body` is taken as raw bytes up to
/// the NUL terminator and need not be UTF-8. A null `body` is read as empty.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Error category carried by a snapshot or returned by settle calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Transport = 1,
    HttpStatus = 2,
    Parse = 3,
    Serialization = 4,
    Panic = 5,
    NullArg = 6,
}

impl From<&RequestError> for FfiErrorCode {
    fn from(err: &RequestError) -> Self {
        match err {
            RequestError::Transport(_) => FfiErrorCode::Transport,
            RequestError::HttpStatus { .. } => FfiErrorCode::HttpStatus,
            RequestError::Parse { .. } => FfiErrorCode::Parse,
            RequestError::Serialization { .. } => FfiErrorCode::Serialization,
        }
    }
}

/// Observable state of a request handle, copied out for C.
///
/// `status` is -1 until the first response. `data_json` is the last payload
/// re-serialized as JSON, or null. On failure `error_code` names the
/// category and `error_message` is a human-readable C string.
#[repr(C)]
pub struct FfiRequestSnapshot {
    pub is_loading: bool,
    pub is_success: bool,
    pub is_error: bool,
    pub status: i32,
    pub data_json: *mut c_char,
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
}

impl FfiRequestSnapshot {
    pub(crate) fn from_core(snapshot: RequestSnapshot<Value>) -> *mut Self {
        let (error_code, error_message) = match &snapshot.error {
            Some(err) => (FfiErrorCode::from(err), into_c_string(err.to_string())),
            None => (FfiErrorCode::Ok, std::ptr::null_mut()),
        };
        let data_json = match &snapshot.data {
            Some(data) => into_c_string(data.to_string()),
            None => std::ptr::null_mut(),
        };

        Box::into_raw(Box::new(FfiRequestSnapshot {
            is_loading: snapshot.is_loading,
            is_success: snapshot.is_success,
            is_error: snapshot.is_error,
            status: snapshot.status.map_or(-1, i32::from),
            data_json,
            error_code,
            error_message,
        }))
    }

    /// Snapshot carrying only an error, used for bad arguments and panics.
    pub(crate) fn failure(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiRequestSnapshot {
            is_loading: false,
            is_success: false,
            is_error: false,
            status: -1,
            data_json: std::ptr::null_mut(),
            error_code,
            error_message: into_c_string(msg.to_string()),
        }))
    }
}
