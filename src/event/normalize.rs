//! Invocation event → `NormalizedRequest`.
//!
//! # Design Decisions
//! - Method is upper-cased; unknown methods pass through as extension methods
//! - Query: last value wins for repeated keys (both payload versions)
//! - Header names are lowercased by `HeaderName`; repeated values are kept
//! - A body flagged as base64 is decoded to bytes before classification

use std::collections::HashMap;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use url::form_urlencoded;

use crate::error::AdapterError;
use crate::event::types::{HttpApiEvent, InvocationEvent, RestApiEvent};
use crate::http::{InvocationContext, NormalizedRequest};

/// Decode a platform event into the canonical request.
///
/// Fails only on structurally malformed events: missing method, header
/// names or values HTTP cannot carry, or an undecodable base64 body.
pub fn normalize(
    event: InvocationEvent,
    context: InvocationContext,
) -> Result<NormalizedRequest, AdapterError> {
    match event {
        InvocationEvent::RestApi(e) => normalize_rest(e, context),
        InvocationEvent::HttpApi(e) => normalize_http(e, context),
    }
}

fn normalize_rest(
    event: RestApiEvent,
    context: InvocationContext,
) -> Result<NormalizedRequest, AdapterError> {
    let method = parse_method(&event.http_method)?;
    let path = non_empty_path(event.path);

    let mut headers = HeaderMap::new();
    match event.multi_value_headers.filter(|m| !m.is_empty()) {
        Some(multi) => {
            for (name, values) in multi {
                for value in values {
                    append_header(&mut headers, &name, &value)?;
                }
            }
        }
        None => {
            for (name, value) in event.headers.unwrap_or_default() {
                append_header(&mut headers, &name, &value)?;
            }
        }
    }

    let query = match event
        .multi_value_query_string_parameters
        .filter(|m| !m.is_empty())
    {
        Some(multi) => multi
            .into_iter()
            .filter_map(|(key, values)| values.into_iter().last().map(|v| (key, v)))
            .collect(),
        None => event.query_string_parameters.unwrap_or_default(),
    };

    let raw = decode_body(event.body, event.is_base64_encoded)?;

    Ok(NormalizedRequest::new(method, path)
        .with_headers(headers)
        .with_query(query)
        .with_raw_body(raw)
        .with_path_params(event.path_parameters.unwrap_or_default())
        .with_context(context))
}

fn normalize_http(
    event: HttpApiEvent,
    context: InvocationContext,
) -> Result<NormalizedRequest, AdapterError> {
    let method = parse_method(&event.request_context.http.method)?;
    let path = non_empty_path(Some(event.raw_path));

    let mut headers = HeaderMap::new();
    for (name, value) in event.headers.unwrap_or_default() {
        append_header(&mut headers, &name, &value)?;
    }
    if let Some(cookies) = event.cookies.filter(|c| !c.is_empty()) {
        let joined = cookies.join("; ");
        let value = HeaderValue::from_str(&joined).map_err(|_| AdapterError::InvalidHeader {
            name: header::COOKIE.to_string(),
        })?;
        headers.insert(header::COOKIE, value);
    }

    let query: HashMap<String, String> = form_urlencoded::parse(
        event.raw_query_string.unwrap_or_default().as_bytes(),
    )
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

    let raw = decode_body(event.body, event.is_base64_encoded)?;

    Ok(NormalizedRequest::new(method, path)
        .with_headers(headers)
        .with_query(query)
        .with_raw_body(raw)
        .with_path_params(event.path_parameters.unwrap_or_default())
        .with_context(context))
}

fn parse_method(raw: &str) -> Result<Method, AdapterError> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(AdapterError::MissingMethod);
    }
    Method::from_bytes(upper.as_bytes()).map_err(|_| AdapterError::InvalidMethod(upper.clone()))
}

fn non_empty_path(path: Option<String>) -> String {
    path.filter(|p| !p.is_empty())
        .unwrap_or_else(|| "/".to_string())
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), AdapterError> {
    let invalid = || AdapterError::InvalidHeader {
        name: name.to_string(),
    };
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    headers.append(name, value);
    Ok(())
}

fn decode_body(body: Option<String>, base64_encoded: bool) -> Result<Option<Bytes>, AdapterError> {
    match body {
        None => Ok(None),
        Some(body) if base64_encoded => Ok(Some(Bytes::from(STANDARD.decode(body)?))),
        Some(body) => Ok(Some(Bytes::from(body))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ParsedBody;
    use serde_json::json;

    fn event(value: serde_json::Value) -> InvocationEvent {
        serde_json::from_value(value).unwrap()
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new("test-request")
    }

    #[test]
    fn test_rest_event_is_normalized() {
        let req = normalize(
            event(json!({
                "httpMethod": "post",
                "path": "/tarefas",
                "headers": { "Content-Type": "application/json", "X-Trace": "1" },
                "queryStringParameters": { "page": "2" },
                "pathParameters": null,
                "body": "{\"titulo\":\"x\"}",
                "isBase64Encoded": false
            })),
            ctx(),
        )
        .unwrap();

        assert_eq!(*req.method(), Method::POST);
        assert_eq!(req.path(), "/tarefas");
        assert_eq!(req.header("x-trace"), Some("1"));
        assert_eq!(req.query_param("page"), Some("2"));
        assert_eq!(req.body(), &ParsedBody::Json(json!({"titulo": "x"})));
        assert_eq!(req.request_id(), "test-request");
    }

    #[test]
    fn test_rest_multi_value_query_last_wins() {
        let req = normalize(
            event(json!({
                "httpMethod": "GET",
                "path": "/tarefas",
                "queryStringParameters": { "tag": "b" },
                "multiValueQueryStringParameters": { "tag": ["a", "b"], "q": ["z"] },
                "isBase64Encoded": false
            })),
            ctx(),
        )
        .unwrap();
        assert_eq!(req.query_param("tag"), Some("b"));
        assert_eq!(req.query_param("q"), Some("z"));
    }

    #[test]
    fn test_rest_multi_value_headers_are_kept() {
        let req = normalize(
            event(json!({
                "httpMethod": "GET",
                "path": "/",
                "multiValueHeaders": { "Accept": ["text/html", "application/json"] },
                "isBase64Encoded": false
            })),
            ctx(),
        )
        .unwrap();
        let values: Vec<_> = req.headers().get_all("accept").iter().collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_http_event_query_and_cookies() {
        let req = normalize(
            event(json!({
                "version": "2.0",
                "rawPath": "/tarefas",
                "rawQueryString": "a=1&a=2&b=hello%20world",
                "cookies": ["s=1", "t=2"],
                "headers": { "host": "example.com" },
                "requestContext": { "http": { "method": "GET" } },
                "isBase64Encoded": false
            })),
            ctx(),
        )
        .unwrap();
        assert_eq!(req.query_param("a"), Some("2"));
        assert_eq!(req.query_param("b"), Some("hello world"));
        assert_eq!(req.header("Cookie"), Some("s=1; t=2"));
    }

    #[test]
    fn test_unknown_method_passes_through_uppercased() {
        let req = normalize(
            event(json!({
                "httpMethod": "purge",
                "path": "/cache",
                "isBase64Encoded": false
            })),
            ctx(),
        )
        .unwrap();
        assert_eq!(req.method().as_str(), "PURGE");
    }

    #[test]
    fn test_base64_body_is_decoded() {
        let req = normalize(
            event(json!({
                "httpMethod": "PUT",
                "path": "/blob",
                "headers": { "content-type": "application/octet-stream" },
                "body": STANDARD.encode([0u8, 255, 10, 13]),
                "isBase64Encoded": true
            })),
            ctx(),
        )
        .unwrap();
        assert_eq!(
            req.body(),
            &ParsedBody::Raw(Bytes::from_static(&[0, 255, 10, 13]))
        );
    }

    #[test]
    fn test_malformed_events_fail() {
        let bad_base64 = event(json!({
            "httpMethod": "POST",
            "path": "/",
            "body": "%%%not-base64",
            "isBase64Encoded": true
        }));
        assert!(matches!(
            normalize(bad_base64, ctx()),
            Err(AdapterError::InvalidBase64(_))
        ));

        let empty_method = event(json!({
            "httpMethod": "  ",
            "path": "/",
            "isBase64Encoded": false
        }));
        assert!(matches!(
            normalize(empty_method, ctx()),
            Err(AdapterError::MissingMethod)
        ));

        let bad_header = event(json!({
            "httpMethod": "GET",
            "path": "/",
            "headers": { "bad header": "x" },
            "isBase64Encoded": false
        }));
        assert!(matches!(
            normalize(bad_header, ctx()),
            Err(AdapterError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_missing_path_defaults_to_root() {
        let req = normalize(
            event(json!({ "httpMethod": "GET", "isBase64Encoded": false })),
            ctx(),
        )
        .unwrap();
        assert_eq!(req.path(), "/");
    }
}
