//! Platform payload shapes.
//!
//! Only the fields the adapter reads are modelled; everything else in the
//! payload is ignored by serde.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::http::InvocationContext;

/// An API Gateway proxy invocation, either payload version.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InvocationEvent {
    /// HTTP API, payload format 2.0.
    HttpApi(HttpApiEvent),
    /// REST API / ALB, payload format 1.0.
    RestApi(RestApiEvent),
}

/// Which result envelope the platform expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVersion {
    RestApi,
    HttpApi,
}

impl InvocationEvent {
    pub fn version(&self) -> PayloadVersion {
        match self {
            InvocationEvent::HttpApi(_) => PayloadVersion::HttpApi,
            InvocationEvent::RestApi(_) => PayloadVersion::RestApi,
        }
    }

    /// Request ID assigned by the gateway, if present.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            InvocationEvent::HttpApi(e) => e.request_context.request_id.as_deref(),
            InvocationEvent::RestApi(e) => e
                .request_context
                .as_ref()
                .and_then(|c| c.request_id.as_deref()),
        }
    }
}

impl InvocationContext {
    /// Context for an event that arrived without platform metadata.
    pub fn for_event(event: &InvocationEvent) -> Self {
        match event.request_id() {
            Some(id) => InvocationContext::new(id),
            None => InvocationContext::generate(),
        }
    }
}

/// Payload format 1.0.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiEvent {
    pub http_method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_query_string_parameters: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default)]
    pub request_context: Option<RestApiContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiContext {
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Payload format 2.0.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiEvent {
    #[serde(default)]
    pub version: Option<String>,
    pub raw_path: String,
    #[serde(default)]
    pub raw_query_string: Option<String>,
    #[serde(default)]
    pub cookies: Option<Vec<String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    pub request_context: HttpApiContext,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiContext {
    #[serde(default)]
    pub request_id: Option<String>,
    pub http: HttpDescription,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpDescription {
    pub method: String,
}

/// What the adapter hands back to the platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_value_headers: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl InvocationResult {
    /// Header value by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
