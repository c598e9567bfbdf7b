//! State containers for UI code that talks to JSON APIs and validates forms.
//!
//! # Overview
//! - [`RequestState`] tracks one configured HTTP call: loading, success and
//!   error flags, the last status code and the last parsed payload.
//! - [`FieldValidator`] runs per-field rules against a shared
//!   [`FormValues`] store and keeps per-field errors and "touched" marks,
//!   revalidating fields as their values change.
//!
//! The two are independent.
//!
//! # Design
//! - Host-does-IO: the core renders `HttpRequest` values and consumes
//!   `HttpResponse` values but never opens a socket. Hosts either implement
//!   [`Transport`] or drive `begin`/`settle` themselves.
//! - Single-threaded: the form store and validator are `Rc<RefCell<_>>`
//!   handles, and all observers run synchronously on the caller's stack.
//! - Failures are state, not return values: `RequestState` records every
//!   error in its `error` field and never propagates it.

pub mod error;
pub mod form;
pub mod http;
pub mod observe;
pub mod options;
pub mod request;
pub mod validation;

pub use error::{RequestError, TransportError};
pub use form::{ChangeSet, FormValues};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use observe::{Observers, SubscriptionId};
pub use options::RequestOptions;
pub use request::{RequestSnapshot, RequestState};
pub use validation::{FieldValidator, Rule, Rules, ValidationSnapshot};
