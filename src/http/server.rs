//! Local HTTP server.
//!
//! # Responsibilities
//! - Serve the adapter over plain HTTP for local runs and container hosts
//! - Convert each HTTP request into a payload 2.0 invocation event
//! - Render the invocation result back into an HTTP response
//!
//! # Design Decisions
//! - A single catch-all route: all routing happens inside the adapter, so
//!   local behaviour is exactly the deployed behaviour
//! - Bodies that are not UTF-8 travel base64-encoded, as the gateway does

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, request::Parts, HeaderName, HeaderValue, Request, StatusCode},
    response::Response,
    routing::any,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::adapter::Adapter;
use crate::event::types::{HttpApiContext, HttpApiEvent, HttpDescription};
use crate::event::{serialize, InvocationEvent, InvocationResult, PayloadVersion};
use crate::http::middleware::Cors;
use crate::http::NormalizedResponse;

/// Largest request body accepted, mirroring the platform's payload cap.
pub const MAX_REQUEST_BYTES: usize = 6 * 1024 * 1024;

/// Build the axum router fronting `adapter`.
pub fn app(adapter: Arc<Adapter>) -> axum::Router {
    axum::Router::new()
        .route("/", any(invoke))
        .route("/{*path}", any(invoke))
        .with_state(adapter)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// HTTP server for local mode.
pub struct LocalServer {
    router: axum::Router,
}

impl LocalServer {
    pub fn new(adapter: Arc<Adapter>) -> Self {
        Self {
            router: app(adapter),
        }
    }

    /// Run until Ctrl+C, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn invoke(State(adapter): State<Arc<Adapter>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_REQUEST_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read request body");
            return local_failure(NormalizedResponse::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            ));
        }
    };

    let event = to_event(&parts, bytes);
    let result = adapter.handle(InvocationEvent::HttpApi(event), None).await;
    into_response(result)
}

/// Describe an HTTP request the way an HTTP API gateway would.
pub fn to_event(parts: &Parts, body: Bytes) -> HttpApiEvent {
    let mut headers = std::collections::HashMap::<String, String>::new();
    let mut cookies = Vec::new();

    for (name, value) in &parts.headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        if name == header::COOKIE {
            cookies.extend(
                value
                    .split(';')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            );
            continue;
        }
        headers
            .entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    let (body, is_base64_encoded) = if body.is_empty() {
        (None, false)
    } else {
        match std::str::from_utf8(&body) {
            Ok(text) => (Some(text.to_string()), false),
            Err(_) => (Some(STANDARD.encode(&body)), true),
        }
    };

    HttpApiEvent {
        version: Some("2.0".to_string()),
        raw_path: parts.uri.path().to_string(),
        raw_query_string: parts.uri.query().map(str::to_string),
        cookies: (!cookies.is_empty()).then_some(cookies),
        headers: Some(headers),
        path_parameters: None,
        body,
        is_base64_encoded,
        request_context: HttpApiContext {
            request_id: None,
            http: HttpDescription {
                method: parts.method.as_str().to_string(),
            },
        },
    }
}

/// Render an invocation result as an HTTP response.
pub fn into_response(result: InvocationResult) -> Response {
    let status = StatusCode::from_u16(result.status_code).unwrap_or_else(|_| {
        tracing::warn!(status = result.status_code, "Result carried an invalid status");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let body = if result.is_base64_encoded {
        match STANDARD.decode(result.body.as_bytes()) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = %error_id, error = %err, "Result body is not valid base64");
                return local_failure(NormalizedResponse::internal_error(error_id));
            }
        }
    } else {
        Bytes::from(result.body)
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();

    let pairs: Vec<(String, String)> = match result.multi_value_headers {
        Some(multi) => multi
            .into_iter()
            .flat_map(|(name, values)| values.into_iter().map(move |v| (name.clone(), v)))
            .collect(),
        None => result.headers.into_iter().collect(),
    };
    let cookies = result
        .cookies
        .into_iter()
        .map(|c| (header::SET_COOKIE.as_str().to_string(), c));

    for (name, value) in pairs.into_iter().chain(cookies) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping unrepresentable response header"),
        }
    }

    response
}

/// Render a response produced outside the adapter, with the same CORS
/// headers the adapter would have added.
fn local_failure(response: NormalizedResponse) -> Response {
    into_response(serialize(
        Cors::permissive().decorate(response),
        PayloadVersion::HttpApi,
    ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_to_event_folds_cookies_and_repeated_headers() {
        let parts = parts(
            Request::builder()
                .method("POST")
                .uri("/tarefas?limite=5")
                .header("cookie", "a=1; b=2")
                .header("x-tag", "one")
                .header("x-tag", "two")
                .body(())
                .unwrap(),
        );
        let event = to_event(&parts, Bytes::from_static(b"{}"));

        assert_eq!(event.raw_path, "/tarefas");
        assert_eq!(event.raw_query_string.as_deref(), Some("limite=5"));
        assert_eq!(event.request_context.http.method, "POST");
        assert_eq!(event.cookies, Some(vec!["a=1".to_string(), "b=2".to_string()]));
        let headers = event.headers.unwrap();
        assert_eq!(headers["x-tag"], "one, two");
        assert!(!headers.contains_key("cookie"));
        assert_eq!(event.body.as_deref(), Some("{}"));
        assert!(!event.is_base64_encoded);
    }

    #[test]
    fn test_to_event_encodes_binary_body() {
        let parts = parts(Request::builder().uri("/").body(()).unwrap());
        let event = to_event(&parts, Bytes::from_static(&[0xff, 0x00, 0x10]));
        assert!(event.is_base64_encoded);
        assert_eq!(event.body.as_deref(), Some("/wAQ"));
    }

    #[test]
    fn test_into_response_restores_cookies_and_binary() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/octet-stream".to_string());
        let response = into_response(InvocationResult {
            status_code: 201,
            headers,
            multi_value_headers: None,
            cookies: vec!["s=1".into(), "t=2".into()],
            body: "/wAQ".into(),
            is_base64_encoded: true,
        });

        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["s=1", "t=2"]);
    }

    #[test]
    fn test_undecodable_result_body_is_500_with_cors() {
        let response = into_response(InvocationResult {
            status_code: 200,
            headers: BTreeMap::new(),
            multi_value_headers: None,
            cookies: Vec::new(),
            body: "not base64!".into(),
            is_base64_encoded: true,
        });

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
