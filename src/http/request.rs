//! Normalized request model.
//!
//! # Responsibilities
//! - Hold the canonical, platform-independent view of one HTTP request
//! - Classify the body once by content type (`ParsedBody`)
//! - Carry the per-invocation context (request ID, deadline)
//!
//! # Design Decisions
//! - Header lookups go through `HeaderMap`, so names are case-insensitive
//! - Augmentation consumes `self` and returns a new value; nothing downstream
//!   can observe a request changing underneath it
//! - Body classification never fails; unparsable JSON becomes `Invalid`

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use axum::http::{header, HeaderMap, Method};
use bytes::Bytes;
use serde_json::Value;
use url::form_urlencoded;
use uuid::Uuid;

/// Request body, decided once from the declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// No body was sent (or a structured content type with zero bytes).
    Empty,
    /// A JSON document.
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs, last value wins.
    Form(HashMap<String, String>),
    /// Any other content type, passed through untouched.
    Raw(Bytes),
    /// Declared as JSON but failed to parse.
    Invalid { reason: String },
}

impl ParsedBody {
    /// Classify a raw body using the request's `Content-Type`.
    pub fn decode(content_type: Option<&str>, raw: Option<Bytes>) -> Self {
        let Some(raw) = raw else {
            return ParsedBody::Empty;
        };

        match content_type.map(BodyKind::from_content_type) {
            Some(BodyKind::Json) => {
                if raw.is_empty() {
                    return ParsedBody::Empty;
                }
                match serde_json::from_slice(&raw) {
                    Ok(value) => ParsedBody::Json(value),
                    Err(e) => ParsedBody::Invalid {
                        reason: e.to_string(),
                    },
                }
            }
            Some(BodyKind::Form) => {
                if raw.is_empty() {
                    return ParsedBody::Empty;
                }
                let fields = form_urlencoded::parse(&raw)
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                ParsedBody::Form(fields)
            }
            _ => ParsedBody::Raw(raw),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedBody::Empty => "empty",
            ParsedBody::Json(_) => "json",
            ParsedBody::Form(_) => "form",
            ParsedBody::Raw(_) => "raw",
            ParsedBody::Invalid { .. } => "invalid",
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ParsedBody::Invalid { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn from_content_type(value: &str) -> Self {
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json"
            || (essence.starts_with("application/") && essence.ends_with("+json"))
        {
            BodyKind::Json
        } else if essence == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

/// Per-invocation context handed down from the platform.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
    pub deadline: Option<SystemTime>,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
        }
    }

    /// Context with a freshly generated request ID.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_deadline(mut self, deadline: SystemTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Time left before the platform deadline, if one was given.
    /// A deadline already in the past yields zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| {
            deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }
}

/// Canonical in-process request.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: HashMap<String, String>,
    body: ParsedBody,
    body_len: usize,
    path_params: HashMap<String, String>,
    context: InvocationContext,
}

impl NormalizedRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: HashMap::new(),
            body: ParsedBody::Empty,
            body_len: 0,
            path_params: HashMap::new(),
            context: InvocationContext::generate(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Attach a raw body, classifying it by the current `Content-Type` header.
    pub fn with_raw_body(mut self, raw: Option<Bytes>) -> Self {
        self.body_len = raw.as_ref().map_or(0, Bytes::len);
        let content_type = self
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        self.body = ParsedBody::decode(content_type, raw);
        self
    }

    pub fn with_context(mut self, context: InvocationContext) -> Self {
        self.context = context;
        self
    }

    /// Merge path parameters; later bindings replace earlier ones.
    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params.extend(params);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &ParsedBody {
        &self.body
    }

    /// Size in bytes of the body as received, before parsing.
    pub fn body_len(&self) -> usize {
        self.body_len
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    pub fn request_id(&self) -> &str {
        &self.context.request_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_absent_body_is_empty() {
        assert_eq!(
            ParsedBody::decode(Some("application/json"), None),
            ParsedBody::Empty
        );
        assert_eq!(ParsedBody::decode(None, None), ParsedBody::Empty);
    }

    #[test]
    fn test_empty_string_without_content_type_stays_raw() {
        let body = ParsedBody::decode(None, Some(Bytes::new()));
        assert_eq!(body, ParsedBody::Raw(Bytes::new()));
    }

    #[test]
    fn test_json_content_type_variants() {
        let raw = Some(Bytes::from_static(br#"{"a":1}"#));
        for ct in [
            "application/json",
            "Application/JSON; charset=utf-8",
            "application/vnd.api+json",
        ] {
            assert_eq!(
                ParsedBody::decode(Some(ct), raw.clone()),
                ParsedBody::Json(serde_json::json!({"a": 1})),
                "content type {ct}"
            );
        }
    }

    #[test]
    fn test_invalid_json_is_marked_not_thrown() {
        let body = ParsedBody::decode(
            Some("application/json"),
            Some(Bytes::from_static(b"{not json")),
        );
        assert!(body.is_invalid());
        assert_eq!(body.kind(), "invalid");
    }

    #[test]
    fn test_form_last_value_wins() {
        let body = ParsedBody::decode(
            Some("application/x-www-form-urlencoded"),
            Some(Bytes::from_static(b"titulo=a+b&x=1&x=2")),
        );
        let ParsedBody::Form(fields) = body else {
            panic!("expected form body");
        };
        assert_eq!(fields["titulo"], "a b");
        assert_eq!(fields["x"], "2");
    }

    #[test]
    fn test_unknown_content_type_passes_through() {
        let bytes = Bytes::from_static(&[0, 159, 146, 150]);
        let body = ParsedBody::decode(Some("image/png"), Some(bytes.clone()));
        assert_eq!(body, ParsedBody::Raw(bytes));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-custom", HeaderValue::from_static("yes"));
        let req = NormalizedRequest::new(Method::GET, "/").with_headers(headers);
        assert_eq!(req.header("X-Custom"), Some("yes"));
        assert_eq!(req.header("X-CUSTOM"), Some("yes"));
    }

    #[test]
    fn test_with_raw_body_uses_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let req = NormalizedRequest::new(Method::POST, "/tarefas")
            .with_headers(headers)
            .with_raw_body(Some(Bytes::from_static(b"[1,2]")));
        assert_eq!(req.body_len(), 5);
        assert_eq!(req.body(), &ParsedBody::Json(serde_json::json!([1, 2])));
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let ctx = InvocationContext::new("r").with_deadline(SystemTime::UNIX_EPOCH);
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert_eq!(InvocationContext::new("r").remaining(), None);
    }
}
