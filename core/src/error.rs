//! Error types recorded by `RequestState`.
//!
//! # Design
//! None of these errors are ever returned from `RequestState::execute` or
//! `RequestState::settle`; they are stored in `RequestState::error` for the
//! UI to inspect. Every variant is `Clone` so observers can receive owned
//! snapshots of the state.

use serde::Serialize;

/// The HTTP call did not complete: no response was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("network failure: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure detail of the last settled call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestError {
    /// The transport failed before any response arrived.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response arrived with a status outside 2xx.
    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16, body: String },

    /// A 2xx body could not be parsed as the expected JSON payload.
    #[error("response parse failed: {message}")]
    Parse { message: String },

    /// The request body could not be serialized to JSON.
    #[error("request body serialization failed: {message}")]
    Serialization { message: String },
}

impl RequestError {
    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn parse(err: serde_json::Error) -> Self {
        RequestError::Parse {
            message: err.to_string(),
        }
    }

    pub(crate) fn serialization(err: serde_json::Error) -> Self {
        RequestError::Serialization {
            message: err.to_string(),
        }
    }
}
