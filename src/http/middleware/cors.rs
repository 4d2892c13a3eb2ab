//! Cross-origin headers.
//!
//! # Responsibilities
//! - Add `access-control-allow-origin: *` to every response
//! - Answer preflight (`OPTIONS`) requests without reaching the router
//!
//! # Design Decisions
//! - Permissive policy: any origin, the usual method set, requested headers
//!   reflected back
//! - `decorate` is public so the adapter can apply the same headers to its
//!   last-resort error responses

use async_trait::async_trait;
use axum::http::{header, HeaderValue, Method, StatusCode};

use crate::error::AdapterError;
use crate::http::middleware::{Middleware, Next};
use crate::http::{NormalizedRequest, NormalizedResponse};

const DEFAULT_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

#[derive(Debug, Clone)]
pub struct Cors {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
}

impl Cors {
    /// Allow every origin.
    pub fn permissive() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_methods: HeaderValue::from_static(DEFAULT_METHODS),
        }
    }

    /// Add the allow-origin header to a finished response.
    pub fn decorate(&self, mut response: NormalizedResponse) -> NormalizedResponse {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        response
    }

    fn preflight(&self, req: &NormalizedRequest) -> NormalizedResponse {
        let mut response = NormalizedResponse::empty(StatusCode::NO_CONTENT)
            .with_header(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone())
            .with_header(header::CONTENT_LENGTH, HeaderValue::from_static("0"));

        if let Some(requested) = req.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
            headers.append(
                header::VARY,
                HeaderValue::from_static("Access-Control-Request-Headers"),
            );
        }

        self.decorate(response)
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::permissive()
    }
}

#[async_trait]
impl Middleware for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn handle(
        &self,
        req: NormalizedRequest,
        next: Next<'_>,
    ) -> Result<NormalizedResponse, AdapterError> {
        if *req.method() == Method::OPTIONS {
            tracing::debug!(request_id = %req.request_id(), path = %req.path(), "CORS preflight");
            return Ok(self.preflight(&req));
        }

        let response = next.run(req).await?;
        Ok(self.decorate(response))
    }
}
