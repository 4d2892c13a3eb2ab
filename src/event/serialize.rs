//! `NormalizedResponse` → invocation result.
//!
//! # Design Decisions
//! - Status and headers are copied verbatim
//! - Text and JSON bodies go out as-is; binary bodies are always base64
//!   encoded with `isBase64Encoded` set, even when they happen to be UTF-8
//! - Payload 1.0 keeps every header value in `multiValueHeaders`; payload
//!   2.0 joins repeated values and moves `set-cookie` into `cookies`

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::event::types::{InvocationResult, PayloadVersion};
use crate::http::{NormalizedResponse, ResponseBody};

/// Encode a response in the envelope the platform expects.
pub fn serialize(response: NormalizedResponse, version: PayloadVersion) -> InvocationResult {
    let (status, headers, body) = response.into_parts();
    let (body, is_base64_encoded) = encode_body(body);

    match version {
        PayloadVersion::RestApi => {
            let mut single = BTreeMap::new();
            let mut multi: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for name in headers.keys() {
                let values: Vec<String> = headers.get_all(name).iter().map(header_text).collect();
                if let Some(last) = values.last() {
                    single.insert(name.to_string(), last.clone());
                }
                multi.insert(name.to_string(), values);
            }
            InvocationResult {
                status_code: status.as_u16(),
                headers: single,
                multi_value_headers: Some(multi),
                cookies: Vec::new(),
                body,
                is_base64_encoded,
            }
        }
        PayloadVersion::HttpApi => {
            let cookies = headers
                .get_all(header::SET_COOKIE)
                .iter()
                .map(header_text)
                .collect();
            InvocationResult {
                status_code: status.as_u16(),
                headers: joined_headers(&headers),
                multi_value_headers: None,
                cookies,
                body,
                is_base64_encoded,
            }
        }
    }
}

fn joined_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .filter(|name| **name != header::SET_COOKIE)
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(header_text)
                .collect::<Vec<_>>()
                .join(", ");
            (name.to_string(), joined)
        })
        .collect()
}

fn header_text(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

fn encode_body(body: ResponseBody) -> (String, bool) {
    match body {
        ResponseBody::Empty => (String::new(), false),
        ResponseBody::Text(text) => (text, false),
        ResponseBody::Json(value) => (value.to_string(), false),
        ResponseBody::Binary(bytes) => (STANDARD.encode(&bytes), true),
    }
}
