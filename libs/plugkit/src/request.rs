//! Host-neutral request/response pair exchanged through `Plugin::dispatch`.

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

use crate::problem::{Problem, APPLICATION_PROBLEM_JSON};

pub const JSON_UTF8: &str = "application/json;charset=UTF-8";
pub const TEXT_HTML_UTF8: &str = "text/html;charset=UTF-8";

/// An inbound request as seen by a plugin.
#[derive(Debug, Clone)]
pub struct PlugRequest {
    pub method: Method,
    /// Path without the query string.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Query-string and url-encoded form fields, later values win.
    pub form: HashMap<String, String>,
}

impl PlugRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            form: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Self {
        self.body = serde_json::to_vec(value).unwrap_or_default();
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The plugin's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlugResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl PlugResponse {
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// 202 with an HTML content type and no body.
    pub fn accepted() -> Self {
        Self::empty(StatusCode::ACCEPTED).with_content_type(TEXT_HTML_UTF8)
    }

    pub fn not_found() -> Self {
        Self::empty(StatusCode::NOT_FOUND)
    }

    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                headers: HeaderMap::new(),
                body,
            }
            .with_content_type(JSON_UTF8),
            Err(e) => Self::problem(Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                format!("response encoding failed: {e}"),
            )),
        }
    }

    pub fn problem(problem: Problem) -> Self {
        let status =
            StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            headers: HeaderMap::new(),
            body: serde_json::to_vec(&problem).unwrap_or_default(),
        }
        .with_content_type(APPLICATION_PROBLEM_JSON)
    }

    pub fn with_content_type(mut self, value: &'static str) -> Self {
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

impl axum::response::IntoResponse for PlugResponse {
    fn into_response(self) -> axum::response::Response {
        let mut resp = axum::response::Response::new(axum::body::Body::from(self.body));
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}
