//! Construction-time configuration of a `RequestState`.
//!
//! # Design
//! `RequestOptions` is plain data with builder helpers. Once handed to
//! `RequestState::new` it is never mutated; every `begin()` renders the same
//! `HttpRequest` from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest};

const CONTENT_TYPE: &str = "content-type";
const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` with serde and attach it.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, RequestError> {
        let value = serde_json::to_value(body).map_err(RequestError::serialization)?;
        Ok(self.body(value))
    }

    /// Render the options into a request.
    ///
    /// A JSON body gets `content-type: application/json` unless the caller
    /// already set a content type.
    pub fn to_request(&self) -> HttpRequest {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let body = self.body.as_ref().map(Value::to_string);
        if body.is_some() && !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE)) {
            headers.push((CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
        }

        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body,
        }
    }
}
