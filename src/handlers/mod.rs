//! Route handlers.
//!
//! # Responsibilities
//! - Define the `Handler` capability the router dispatches to
//! - Provide the built-in status handlers (`/health`, `/ping`, `/versao`)
//! - Provide the `tarefas` resource over a pluggable repository
//! - Assemble the application's route table
//!
//! # Design Decisions
//! - Handlers own their request; the router never sees it again
//! - Failures are opaque `HandlerError`s; turning them into responses is the
//!   router's job, so handlers cannot leak detail by accident

pub mod status;
pub mod tarefas;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use thiserror::Error;

use crate::http::{NormalizedRequest, NormalizedResponse};
use crate::routing::{Route, Router};
use tarefas::TarefaRepository;

/// Internal failure raised by a handler.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(Box<dyn std::error::Error + Send + Sync>);

impl HandlerError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

pub type HandlerResult = Result<NormalizedResponse, HandlerError>;

/// Anything that can answer a routed request.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: NormalizedRequest) -> HandlerResult;
}

/// Adapts an async function or closure into a `Handler`.
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(NormalizedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(NormalizedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, req: NormalizedRequest) -> HandlerResult {
        (self.0)(req).await
    }
}

/// The application's route table.
pub fn api_routes(repo: Arc<dyn TarefaRepository>) -> Router {
    let builder = Router::builder()
        .route(Route::new(Method::GET, "/health", handler_fn(status::health)).lenient())
        .route(Route::new(Method::GET, "/ping", handler_fn(status::ping)))
        .route(Route::new(Method::GET, "/versao", handler_fn(status::versao)));

    tarefas::register(builder, repo).build()
}
