//! Loading/success/error tracking for a single configured HTTP call.
//!
//! # Design
//! `RequestState` owns its `RequestOptions` and the observable result fields.
//! A call is split into `begin` (reset flags, render the request) and
//! `settle` (apply the host's outcome), so the host decides how and when the
//! I/O happens. `execute` glues the two together around a [`Transport`].
//!
//! Several calls may be outstanding at once. There is no sequencing: each
//! `settle` overwrites the lifecycle flags, so whichever call settles last
//! determines the final state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RequestError, TransportError};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::observe::{Observers, SubscriptionId};
use crate::options::RequestOptions;

/// Owned copy of the observable fields, handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSnapshot<T = Value> {
    pub data: Option<T>,
    pub status: Option<u16>,
    pub is_loading: bool,
    pub is_success: bool,
    pub is_error: bool,
    pub error: Option<RequestError>,
}

#[derive(Debug)]
pub struct RequestState<T = Value> {
    options: RequestOptions,
    data: Option<T>,
    status: Option<u16>,
    is_loading: bool,
    is_success: bool,
    is_error: bool,
    error: Option<RequestError>,
    in_flight: usize,
    observers: Observers<RequestSnapshot<T>>,
}

impl<T> RequestState<T> {
    pub fn new(options: RequestOptions) -> Self {
        Self {
            options,
            data: None,
            status: None,
            is_loading: false,
            is_success: false,
            is_error: false,
            error: None,
            in_flight: 0,
            observers: Observers::new(),
        }
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    /// Calls begun but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Register a callback that runs after every `begin` and `settle`.
    pub fn subscribe(&mut self, observer: impl Fn(&RequestSnapshot<T>) + 'static) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl<T: Clone> RequestState<T> {
    pub fn snapshot(&self) -> RequestSnapshot<T> {
        RequestSnapshot {
            data: self.data.clone(),
            status: self.status,
            is_loading: self.is_loading,
            is_success: self.is_success,
            is_error: self.is_error,
            error: self.error.clone(),
        }
    }

    fn notify(&self) {
        if !self.observers.is_empty() {
            self.observers.notify(&self.snapshot());
        }
    }
}

impl<T: DeserializeOwned + Clone> RequestState<T> {
    /// Start a call: reset the lifecycle flags and render the request the
    /// host must send. `data` and `status` keep their previous values.
    pub fn begin(&mut self) -> HttpRequest {
        self.is_loading = true;
        self.is_success = false;
        self.is_error = false;
        self.error = None;
        self.in_flight += 1;

        let request = self.options.to_request();
        debug!(
            method = %request.method,
            url = %request.url,
            in_flight = self.in_flight,
            "request started"
        );
        self.notify();
        request
    }

    /// Apply the outcome of a call started with `begin`.
    ///
    /// Never fails: transport failures, non-2xx statuses and unparsable
    /// bodies are recorded in `error`, and `data` is left untouched.
    pub fn settle(&mut self, outcome: Result<HttpResponse, TransportError>) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let result = match outcome {
            Ok(response) => {
                self.status = Some(response.status);
                parse_payload(response)
            }
            Err(err) => Err(RequestError::from(err)),
        };

        match result {
            Ok(payload) => {
                debug!(status = ?self.status, "request succeeded");
                self.data = Some(payload);
                self.is_success = true;
                self.is_error = false;
                self.error = None;
            }
            Err(err) => {
                warn!(status = ?self.status, error = %err, "request failed");
                self.is_success = false;
                self.is_error = true;
                self.error = Some(err);
            }
        }
        self.is_loading = false;
        self.notify();
    }

    /// Perform one call through `transport` and record its outcome.
    pub fn execute<C: Transport + ?Sized>(&mut self, transport: &C) {
        let request = self.begin();
        let outcome = transport.send(&request);
        self.settle(outcome);
    }
}

fn parse_payload<T: DeserializeOwned>(response: HttpResponse) -> Result<T, RequestError> {
    if !response.is_success() {
        return Err(RequestError::HttpStatus {
            status: response.status,
            body: response.body_text().into_owned(),
        });
    }
    serde_json::from_slice(&response.body).map_err(RequestError::parse)
}
