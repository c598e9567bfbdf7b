//! C-ABI wrapper around `formfetch-core`'s `RequestState`.
//!
//! # Overview
//! Lets any language with a C FFI track one configured JSON request without
//! linking to serde directly: create a handle, call `begin` to get the
//! request to send, perform it with the host's own HTTP stack, then report
//! the outcome with one of the `settle_*` functions. `snapshot` copies the
//! observable state out at any time.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary. The handle holds non-`UnwindSafe` state,
//!   so closures are wrapped in `AssertUnwindSafe`; a panic mid-transition
//!   can at worst leave the flags half-updated, never free memory twice.
//! - Several `begin` calls may be outstanding; the last `settle_*` wins.
//! - The C caller owns all returned pointers and must call the matching
//!   `formfetch_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use formfetch_core::{HttpResponse, RequestOptions, RequestState, TransportError};

use types::*;

/// Borrow a C string as UTF-8. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// returned borrow.
unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Build options from C arguments. `None` if any argument is unusable.
fn options_from_c(
    url: *const c_char,
    method: i32,
    headers: *const FfiHeaderRef,
    headers_len: u32,
    body_json: *const c_char,
) -> Option<RequestOptions> {
    let url = unsafe { c_str(url) }?;
    let method = FfiHttpMethod::from_raw(method)?;
    let mut options = RequestOptions::new(method.into(), url);

    if headers_len > 0 {
        if headers.is_null() {
            return None;
        }
        let headers = unsafe { std::slice::from_raw_parts(headers, headers_len as usize) };
        for header in headers {
            let key = unsafe { c_str(header.key) }?;
            let value = unsafe { c_str(header.value) }?;
            options = options.header(key, value);
        }
    }

    if !body_json.is_null() {
        let body = unsafe { c_str(body_json) }?;
        options = options.body(serde_json::from_str(body).ok()?);
    }

    Some(options)
}

// ---------------------------------------------------------------------------
// Handle lifecycle
// ---------------------------------------------------------------------------

/// Create a request handle.
///
/// `method` is an `FfiHttpMethod` discriminant. `headers` may be null when
/// `headers_len` is 0. `body_json` may be null for no body; otherwise it must
/// be valid JSON.
///
/// Returns null if `url` is null, any string is not UTF-8, `method` is
/// unknown, `body_json` does not parse, or an internal panic occurs.
/// The caller must free the returned pointer with `formfetch_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_request_new(
    url: *const c_char,
    method: i32,
    headers: *const FfiHeaderRef,
    headers_len: u32,
    body_json: *const c_char,
) -> *mut FfiRequestState {
    catch_unwind(|| match options_from_c(url, method, headers, headers_len, body_json) {
        Some(options) => Box::into_raw(Box::new(FfiRequestState {
            inner: RequestState::new(options),
        })),
        None => std::ptr::null_mut(),
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a handle created by `formfetch_request_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_request_free(state: *mut FfiRequestState) {
    if !state.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(state) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Request lifecycle
// ---------------------------------------------------------------------------

/// Start a call: flags are reset and the request to send is returned.
///
/// Returns null if `state` is null.
/// The caller must free the returned pointer with `formfetch_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_request_begin(state: *mut FfiRequestState) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if state.is_null() {
            return std::ptr::null_mut();
        }
        let state = unsafe { &mut *state };
        FfiHttpRequest::from_core(state.inner.begin())
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Settle one outstanding call with the response the host received.
///
/// Returns `Ok` once recorded, or `NullArg` / `Panic`. The outcome of the
/// call itself is read back through `formfetch_request_snapshot`.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_request_settle_response(
    state: *mut FfiRequestState,
    response: *const FfiHttpResponse,
) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        if state.is_null() || response.is_null() {
            return FfiErrorCode::NullArg;
        }
        let state = unsafe { &mut *state };
        let resp = unsafe { &*response };
        let body = if resp.body.is_null() {
            Vec::new()
        } else {
            unsafe { CStr::from_ptr(resp.body) }.to_bytes().to_vec()
        };
        state.inner.settle(Ok(HttpResponse::new(resp.status, body)));
        FfiErrorCode::Ok
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

/// Settle one outstanding call that failed before any response arrived.
///
/// `message` may be null. Returns `Ok`, `NullArg` or `Panic`.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_request_settle_transport_error(
    state: *mut FfiRequestState,
    message: *const c_char,
) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        if state.is_null() {
            return FfiErrorCode::NullArg;
        }
        let state = unsafe { &mut *state };
        let message = if message.is_null() {
            DEFAULT_TRANSPORT_MESSAGE.to_string()
        } else {
            unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
        };
        state.inner.settle(Err(TransportError::new(message)));
        FfiErrorCode::Ok
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

/// Copy the current state out of a handle.
///
/// A null `state` yields a snapshot with `error_code = NullArg`.
/// The caller must free the returned pointer with `formfetch_free_snapshot`.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_request_snapshot(state: *const FfiRequestState) -> *mut FfiRequestSnapshot {
    catch_unwind(AssertUnwindSafe(|| {
        if state.is_null() {
            return FfiRequestSnapshot::failure(FfiErrorCode::NullArg, "null argument: state");
        }
        let state = unsafe { &*state };
        FfiRequestSnapshot::from_core(state.inner.snapshot())
    }))
    .unwrap_or_else(|_| FfiRequestSnapshot::failure(FfiErrorCode::Panic, "panic in formfetch_request_snapshot"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `formfetch_request_begin`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiRequestSnapshot` returned by `formfetch_request_snapshot`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_free_snapshot(snapshot: *mut FfiRequestSnapshot) {
    if snapshot.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let snapshot = unsafe { Box::from_raw(snapshot) };
        free_c_string(snapshot.data_json);
        free_c_string(snapshot.error_message);
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn formfetch_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const URL: &str = "http://localhost:3000/contacts/1";

    fn new_get() -> *mut FfiRequestState {
        let url = CString::new(URL).unwrap();
        formfetch_request_new(url.as_ptr(), FfiHttpMethod::Get as i32, std::ptr::null(), 0, std::ptr::null())
    }

    fn settle(state: *mut FfiRequestState, status: u16, body: &str) {
        let body = CString::new(body).unwrap();
        let resp = FfiHttpResponse {
            status,
            body: body.as_ptr(),
        };
        assert_eq!(formfetch_request_settle_response(state, &resp), FfiErrorCode::Ok);
    }

    fn read(ptr: *const c_char) -> Option<String> {
        unsafe { c_str(ptr) }.map(str::to_string)
    }

    #[test]
    fn request_new_and_free() {
        let state = new_get();
        assert!(!state.is_null());
        formfetch_request_free(state);
    }

    #[test]
    fn request_new_null_url_returns_null() {
        let state = formfetch_request_new(std::ptr::null(), 0, std::ptr::null(), 0, std::ptr::null());
        assert!(state.is_null());
    }

    #[test]
    fn request_new_unknown_method_returns_null() {
        let url = CString::new(URL).unwrap();
        let state = formfetch_request_new(url.as_ptr(), 99, std::ptr::null(), 0, std::ptr::null());
        assert!(state.is_null());
    }

    #[test]
    fn request_new_invalid_body_returns_null() {
        let url = CString::new(URL).unwrap();
        let body = CString::new("{not json").unwrap();
        let state = formfetch_request_new(
            url.as_ptr(),
            FfiHttpMethod::Post as i32,
            std::ptr::null(),
            0,
            body.as_ptr(),
        );
        assert!(state.is_null());
    }

    #[test]
    fn request_new_headers_without_pointer_returns_null() {
        let url = CString::new(URL).unwrap();
        let state = formfetch_request_new(url.as_ptr(), 0, std::ptr::null(), 2, std::ptr::null());
        assert!(state.is_null());
    }

    #[test]
    fn request_free_null_is_safe() {
        formfetch_request_free(std::ptr::null_mut());
    }

    #[test]
    fn fresh_snapshot_is_idle() {
        let state = new_get();
        let snap = formfetch_request_snapshot(state);
        let s = unsafe { &*snap };
        assert!(!s.is_loading);
        assert!(!s.is_success);
        assert!(!s.is_error);
        assert_eq!(s.status, -1);
        assert!(s.data_json.is_null());
        assert_eq!(s.error_code, FfiErrorCode::Ok);
        assert!(s.error_message.is_null());

        formfetch_free_snapshot(snap);
        formfetch_request_free(state);
    }

    #[test]
    fn begin_returns_configured_request() {
        let url = CString::new(URL).unwrap();
        let key = CString::new("authorization").unwrap();
        let value = CString::new("Bearer abc").unwrap();
        let headers = [FfiHeaderRef {
            key: key.as_ptr(),
            value: value.as_ptr(),
        }];
        let body = CString::new(r#"{"age":21}"#).unwrap();
        let state = formfetch_request_new(
            url.as_ptr(),
            FfiHttpMethod::Patch as i32,
            headers.as_ptr(),
            headers.len() as u32,
            body.as_ptr(),
        );
        assert!(!state.is_null());

        let req = formfetch_request_begin(state);
        assert!(!req.is_null());
        let r = unsafe { &*req };
        assert_eq!(r.method, FfiHttpMethod::Patch);
        assert_eq!(read(r.url).as_deref(), Some(URL));
        assert_eq!(r.headers_len, 2);

        let hs = unsafe { std::slice::from_raw_parts(r.headers, r.headers_len as usize) };
        assert_eq!(read(hs[0].key).as_deref(), Some("authorization"));
        assert_eq!(read(hs[0].value).as_deref(), Some("Bearer abc"));
        assert_eq!(read(hs[1].key).as_deref(), Some("content-type"));

        let sent: serde_json::Value = serde_json::from_str(&read(r.body).unwrap()).unwrap();
        assert_eq!(sent["age"], 21);

        let snap = formfetch_request_snapshot(state);
        assert!(unsafe { &*snap }.is_loading);

        formfetch_free_snapshot(snap);
        formfetch_free_request(req);
        formfetch_request_free(state);
    }

    #[test]
    fn begin_null_state_returns_null() {
        assert!(formfetch_request_begin(std::ptr::null_mut()).is_null());
    }

    #[test]
    fn settle_success_exposes_data_json() {
        let state = new_get();
        let req = formfetch_request_begin(state);
        settle(state, 200, r#"{"a":1}"#);

        let snap = formfetch_request_snapshot(state);
        let s = unsafe { &*snap };
        assert!(s.is_success);
        assert!(!s.is_loading);
        assert_eq!(s.status, 200);
        assert_eq!(read(s.data_json).as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(s.error_code, FfiErrorCode::Ok);

        formfetch_free_snapshot(snap);
        formfetch_free_request(req);
        formfetch_request_free(state);
    }

    #[test]
    fn settle_not_found_keeps_data() {
        let state = new_get();
        formfetch_free_request(formfetch_request_begin(state));
        settle(state, 200, r#"{"a":1}"#);
        formfetch_free_request(formfetch_request_begin(state));
        settle(state, 404, "");

        let snap = formfetch_request_snapshot(state);
        let s = unsafe { &*snap };
        assert!(s.is_error);
        assert!(!s.is_success);
        assert_eq!(s.status, 404);
        assert_eq!(s.error_code, FfiErrorCode::HttpStatus);
        assert_eq!(read(s.error_message).as_deref(), Some("HTTP error! status: 404"));
        assert_eq!(read(s.data_json).as_deref(), Some(r#"{"a":1}"#));

        formfetch_free_snapshot(snap);
        formfetch_request_free(state);
    }

    #[test]
    fn settle_transport_error_keeps_status_unset() {
        let state = new_get();
        formfetch_free_request(formfetch_request_begin(state));
        let msg = CString::new("connection refused").unwrap();
        assert_eq!(
            formfetch_request_settle_transport_error(state, msg.as_ptr()),
            FfiErrorCode::Ok
        );

        let snap = formfetch_request_snapshot(state);
        let s = unsafe { &*snap };
        assert!(s.is_error);
        assert_eq!(s.status, -1);
        assert_eq!(s.error_code, FfiErrorCode::Transport);
        assert_eq!(
            read(s.error_message).as_deref(),
            Some("network failure: connection refused")
        );

        formfetch_free_snapshot(snap);
        formfetch_request_free(state);
    }

    #[test]
    fn settle_malformed_body_is_parse_error() {
        let state = new_get();
        formfetch_free_request(formfetch_request_begin(state));
        settle(state, 200, "<html>");

        let snap = formfetch_request_snapshot(state);
        assert_eq!(unsafe { &*snap }.error_code, FfiErrorCode::Parse);

        formfetch_free_snapshot(snap);
        formfetch_request_free(state);
    }

    #[test]
    fn settle_non_utf8_body_is_parse_error() {
        let state = new_get();
        formfetch_free_request(formfetch_request_begin(state));
        let body = CString::new(b"{\"a\":\"\xff\"}".to_vec()).unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        assert_eq!(formfetch_request_settle_response(state, &resp), FfiErrorCode::Ok);

        let snap = formfetch_request_snapshot(state);
        let s = unsafe { &*snap };
        assert!(s.is_error);
        assert!(!s.is_success);
        assert_eq!(s.status, 200);
        assert_eq!(s.error_code, FfiErrorCode::Parse);
        assert!(s.data_json.is_null());

        formfetch_free_snapshot(snap);
        formfetch_request_free(state);
    }

    #[test]
    fn settle_transport_error_without_message_uses_default() {
        let state = new_get();
        formfetch_free_request(formfetch_request_begin(state));
        assert_eq!(
            formfetch_request_settle_transport_error(state, std::ptr::null()),
            FfiErrorCode::Ok
        );

        let snap = formfetch_request_snapshot(state);
        let s = unsafe { &*snap };
        assert_eq!(s.error_code, FfiErrorCode::Transport);
        assert_eq!(
            read(s.error_message),
            Some(format!("network failure: {DEFAULT_TRANSPORT_MESSAGE}"))
        );

        formfetch_free_snapshot(snap);
        formfetch_request_free(state);
    }

    #[test]
    fn settle_null_arguments_are_reported() {
        let state = new_get();
        assert_eq!(
            formfetch_request_settle_response(state, std::ptr::null()),
            FfiErrorCode::NullArg
        );
        let resp = FfiHttpResponse {
            status: 200,
            body: std::ptr::null(),
        };
        assert_eq!(
            formfetch_request_settle_response(std::ptr::null_mut(), &resp),
            FfiErrorCode::NullArg
        );
        assert_eq!(
            formfetch_request_settle_transport_error(std::ptr::null_mut(), std::ptr::null()),
            FfiErrorCode::NullArg
        );
        formfetch_request_free(state);
    }

    #[test]
    fn snapshot_null_state_reports_null_arg() {
        let snap = formfetch_request_snapshot(std::ptr::null());
        let s = unsafe { &*snap };
        assert_eq!(s.error_code, FfiErrorCode::NullArg);
        assert!(!s.error_message.is_null());
        formfetch_free_snapshot(snap);
    }

    #[test]
    fn free_request_null_is_safe() {
        formfetch_free_request(std::ptr::null_mut());
    }

    #[test]
    fn free_snapshot_null_is_safe() {
        formfetch_free_snapshot(std::ptr::null_mut());
    }

    #[test]
    fn free_string_null_is_safe() {
        formfetch_free_string(std::ptr::null_mut());
    }
}
