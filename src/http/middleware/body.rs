//! Request body gatekeeping.
//!
//! # Responsibilities
//! - Reject bodies larger than the configured limit (413)
//! - Reject malformed structured bodies (400)
//!
//! Both checks apply only to routes with a `Structured` body policy.
//!
//! # Design Decisions
//! - Parsing itself already happened in the normalizer; this step only
//!   decides what an `Invalid` body means for the matched route
//! - Unmatched requests pass through so the router can answer 404

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::error::AdapterError;
use crate::http::middleware::{Middleware, Next};
use crate::http::{NormalizedRequest, NormalizedResponse, ParsedBody};
use crate::routing::{BodyPolicy, Router};

pub struct BodyParsing {
    router: Arc<Router>,
    max_body_bytes: usize,
}

impl BodyParsing {
    pub fn new(router: Arc<Router>, max_body_bytes: usize) -> Self {
        Self {
            router,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl Middleware for BodyParsing {
    fn name(&self) -> &'static str {
        "body-parsing"
    }

    async fn handle(
        &self,
        req: NormalizedRequest,
        next: Next<'_>,
    ) -> Result<NormalizedResponse, AdapterError> {
        // Unmatched requests fall through to the router's 404; lenient routes
        // take whatever body arrived.
        if self.router.body_policy(req.method(), req.path()) != Some(BodyPolicy::Structured) {
            return next.run(req).await;
        }

        if req.body_len() > self.max_body_bytes {
            tracing::warn!(
                request_id = %req.request_id(),
                body_len = req.body_len(),
                limit = self.max_body_bytes,
                "Request body too large"
            );
            return Ok(NormalizedResponse::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            ));
        }

        if let ParsedBody::Invalid { reason } = req.body() {
            tracing::debug!(
                request_id = %req.request_id(),
                path = %req.path(),
                reason = %reason,
                "Rejecting malformed body"
            );
            return Ok(NormalizedResponse::error(
                StatusCode::BAD_REQUEST,
                "malformed request body",
            ));
        }

        next.run(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{handler_fn, HandlerError};
    use crate::http::middleware::Chain;
    use crate::routing::Route;
    use axum::http::{header, HeaderMap, HeaderValue, Method};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_router(calls: Arc<AtomicUsize>) -> Arc<Router> {
        let strict = calls.clone();
        let lenient = calls;
        Arc::new(
            Router::builder()
                .route(Route::new(
                    Method::POST,
                    "/strict",
                    handler_fn(move |_req: NormalizedRequest| {
                        strict.fetch_add(1, Ordering::SeqCst);
                        async move { Ok::<_, HandlerError>(NormalizedResponse::empty(StatusCode::OK)) }
                    }),
                ))
                .route(
                    Route::new(
                        Method::POST,
                        "/lenient",
                        handler_fn(move |_req: NormalizedRequest| {
                            lenient.fetch_add(1, Ordering::SeqCst);
                            async move {
                                Ok::<_, HandlerError>(NormalizedResponse::empty(StatusCode::OK))
                            }
                        }),
                    )
                    .lenient(),
                )
                .build(),
        )
    }

    fn json_request(path: &str, body: &'static [u8]) -> NormalizedRequest {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        NormalizedRequest::new(Method::POST, path)
            .with_headers(headers)
            .with_raw_body(Some(Bytes::from_static(body)))
    }

    fn chain(router: Arc<Router>, limit: usize) -> Chain {
        Chain::new(router.clone()).step(BodyParsing::new(router, limit))
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected_before_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain(counting_router(calls.clone()), 1024);

        let resp = chain.run(json_request("/strict", b"{oops")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lenient_route_accepts_malformed_json() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain(counting_router(calls.clone()), 1024);

        let resp = chain.run(json_request("/lenient", b"{oops")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unmatched_path_falls_through_to_404() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain(counting_router(calls), 1024);
        let resp = chain.run(json_request("/nowhere", b"{oops")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain(counting_router(calls.clone()), 4);
        let resp = chain.run(json_request("/strict", b"[1,2,3]")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lenient_route_ignores_size_limit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = chain(counting_router(calls.clone()), 4);
        let resp = chain.run(json_request("/lenient", b"[1,2,3]")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
