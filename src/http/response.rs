//! Normalized response model.
//!
//! # Responsibilities
//! - Hold status, headers and a typed body produced by a handler or middleware
//! - Provide constructors for the JSON/text/binary shapes handlers return
//! - Record the opaque error ID of a failed invocation for observability
//!
//! # Design Decisions
//! - The body stays typed until serialization so binary payloads are never
//!   coerced through a string
//! - Error bodies carry only a message and an ID, never the failure detail

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use serde_json::{json, Value};
use uuid::Uuid;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Text(String),
    Binary(Bytes),
    Json(Value),
}

/// Canonical in-process response.
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    error_id: Option<Uuid>,
}

impl NormalizedResponse {
    /// Response with no body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
            error_id: None,
        }
    }

    pub fn json(status: StatusCode, value: Value) -> Self {
        Self::empty(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .with_body(ResponseBody::Json(value))
    }

    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::empty(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE))
            .with_body(ResponseBody::Text(text.into()))
    }

    pub fn binary(status: StatusCode, bytes: impl Into<Bytes>) -> Self {
        Self::empty(status)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static(BINARY_CONTENT_TYPE))
            .with_body(ResponseBody::Binary(bytes.into()))
    }

    /// `{"error": message}` with the given status.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    /// Error response that references an opaque failure ID.
    pub fn failure(status: StatusCode, message: &str, error_id: Uuid) -> Self {
        let mut response = Self::json(
            status,
            json!({ "error": message, "errorId": error_id.to_string() }),
        );
        response.error_id = Some(error_id);
        response
    }

    /// 500 carrying only an opaque error ID.
    pub fn internal_error(error_id: Uuid) -> Self {
        Self::failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error",
            error_id,
        )
    }

    /// Set a header, replacing any existing values for that name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// ID of the failure this response reports, if any.
    pub fn error_id(&self) -> Option<Uuid> {
        self.error_id
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}
