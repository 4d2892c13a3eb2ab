//! Adapter entry point.
//!
//! # Responsibilities
//! - Accept one invocation event and return one invocation result
//! - Run normalize → middleware chain → router → serialize
//! - Convert every adapter-internal failure into a CORS-decorated 500
//!
//! # Data Flow
//! ```text
//! payload ─▶ InvocationEvent ─▶ normalize ─▶ Chain (Cors ▶ BodyParsing ▶ Router)
//!                                                          │
//! InvocationResult ◀── serialize(version) ◀── NormalizedResponse
//! ```
//!
//! # Design Decisions
//! - `handle` never fails: it is the last line of defense, panics included
//! - The adapter holds no per-invocation state; concurrent invocations in one
//!   process share only the immutable route table and the tarefas store
//! - Failure detail is logged under an error ID and never returned

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde_json::Value;
use tracing::field::Empty;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AdapterError;
use crate::event::{normalize, serialize, InvocationEvent, InvocationResult, PayloadVersion};
use crate::handlers::api_routes;
use crate::handlers::tarefas::{InMemoryTarefas, TarefaRepository};
use crate::http::middleware::{BodyParsing, Chain, Cors};
use crate::http::{InvocationContext, NormalizedResponse};
use crate::observability::metrics;
use crate::routing::Router;

/// Process-wide adapter, built once at cold start.
pub struct Adapter {
    chain: Chain,
    cors: Cors,
}

impl Adapter {
    pub fn new(router: Router, max_body_bytes: usize) -> Self {
        let router = Arc::new(router);
        let cors = Cors::permissive();
        let chain = Chain::new(router.clone())
            .step(cors.clone())
            .step(BodyParsing::new(router, max_body_bytes));

        tracing::debug!(steps = ?chain.step_names(), "Middleware chain assembled");
        Self { chain, cors }
    }

    /// The application routes over a fresh in-memory store.
    pub fn from_config(config: &AppConfig) -> Self {
        let repo: Arc<dyn TarefaRepository> = Arc::new(InMemoryTarefas::new());
        Self::new(api_routes(repo), config.limits.max_body_bytes)
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.chain.step_names()
    }

    /// Adapt one decoded event.
    ///
    /// `context` carries the platform's request ID and deadline; without it
    /// the event's own request ID (or a fresh one) is used.
    pub async fn handle(
        &self,
        event: InvocationEvent,
        context: Option<InvocationContext>,
    ) -> InvocationResult {
        let start = Instant::now();
        let version = event.version();
        let context = context.unwrap_or_else(|| InvocationContext::for_event(&event));
        let span = tracing::info_span!(
            "invocation",
            request_id = %context.request_id,
            method = Empty,
            path = Empty,
        );

        async move {
            let response = match AssertUnwindSafe(self.process(event, context))
                .catch_unwind()
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => self.adapter_failure(&err),
                Err(_) => self.adapter_failure(&AdapterError::Panicked),
            };
            finish(response, version, start)
        }
        .instrument(span)
        .await
    }

    /// Adapt a raw payload, including ones that match no event shape.
    pub async fn handle_value(
        &self,
        payload: Value,
        context: Option<InvocationContext>,
    ) -> InvocationResult {
        match serde_json::from_value::<InvocationEvent>(payload) {
            Ok(event) => self.handle(event, context).await,
            Err(err) => {
                let start = Instant::now();
                let context = context.unwrap_or_else(InvocationContext::generate);
                let span = tracing::info_span!("invocation", request_id = %context.request_id);

                span.in_scope(|| {
                    let response = self.adapter_failure(&AdapterError::from(err));
                    // No version to mirror; the 1.0 envelope is the one every
                    // gateway integration understands.
                    finish(response, PayloadVersion::RestApi, start)
                })
            }
        }
    }

    async fn process(
        &self,
        event: InvocationEvent,
        context: InvocationContext,
    ) -> Result<NormalizedResponse, AdapterError> {
        let request = normalize(event, context)?;

        let span = tracing::Span::current();
        span.record("method", tracing::field::display(request.method()));
        span.record("path", request.path());
        tracing::debug!(
            body = request.body().kind(),
            body_len = request.body_len(),
            "Request normalized"
        );

        self.chain.run(request).await
    }

    fn adapter_failure(&self, err: &AdapterError) -> NormalizedResponse {
        let error_id = Uuid::new_v4();
        tracing::error!(error_id = %error_id, error = %err, "Adapter failure");
        metrics::record_adapter_failure();
        self.cors.decorate(NormalizedResponse::internal_error(error_id))
    }
}

fn finish(response: NormalizedResponse, version: PayloadVersion, start: Instant) -> InvocationResult {
    let status = response.status().as_u16();
    match response.error_id() {
        Some(error_id) => tracing::warn!(
            status,
            error_id = %error_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Invocation failed"
        ),
        None => tracing::info!(
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Invocation completed"
        ),
    }
    metrics::record_invocation(status, start);
    serialize(response, version)
}
