//! Adapter-level error types.
//!
//! Every variant here is a failure of the adaptation layer itself, not of a
//! business handler. The entry point converts all of them into a 500 result.

use thiserror::Error;

/// Failure inside the invocation-to-HTTP adaptation path.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The payload matched no known invocation event shape.
    #[error("malformed invocation event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    /// The event carried no usable HTTP method.
    #[error("invocation event has no HTTP method")]
    MissingMethod,

    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    /// A header name or value could not be represented as HTTP.
    #[error("invalid header {name:?} in invocation event")]
    InvalidHeader { name: String },

    /// The body was flagged as base64 but did not decode.
    #[error("body flagged as base64 could not be decoded: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Processing panicked outside any handler.
    #[error("adapter panicked while processing the invocation")]
    Panicked,
}
