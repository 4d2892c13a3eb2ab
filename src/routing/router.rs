//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the registered routes
//! - Resolve (method, path) to a route and its bound parameters
//! - Invoke the handler, converting failures and timeouts into responses
//!
//! # Design Decisions
//! - Immutable after `build()` (shared across invocations without locks)
//! - First registered match wins
//! - No match is a defined 404, not an error
//! - Handler failures, panics and deadline overruns never escape `dispatch`

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use futures_util::FutureExt;
use uuid::Uuid;

use crate::handlers::{Handler, HandlerError, HandlerResult};
use crate::http::{NormalizedRequest, NormalizedResponse, ResponseBody};
use crate::observability::metrics;
use crate::routing::matcher::PathPattern;

/// Whether a route tolerates a body that failed to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyPolicy {
    /// Malformed bodies are rejected with 400 before the handler runs.
    #[default]
    Structured,
    /// The handler runs regardless of body state.
    Lenient,
}

/// A (method, pattern, handler) registration.
pub struct Route {
    name: String,
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
    body_policy: BodyPolicy,
}

impl Route {
    pub fn new(method: Method, pattern: &str, handler: impl Handler + 'static) -> Self {
        Self {
            name: format!("{method} {pattern}"),
            method,
            pattern: PathPattern::parse(pattern),
            handler: Arc::new(handler),
            body_policy: BodyPolicy::default(),
        }
    }

    pub fn lenient(mut self) -> Self {
        self.body_policy = BodyPolicy::Lenient;
        self
    }

    /// Route identifier for logs and metrics, e.g. `GET /tarefas/{id}`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body_policy(&self) -> BodyPolicy {
        self.body_policy
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("body_policy", &self.body_policy)
            .finish()
    }
}

/// Collects routes in registration order.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn build(self) -> Router {
        tracing::debug!(routes = self.routes.len(), "Route table built");
        Router {
            routes: self.routes,
        }
    }
}

/// The immutable route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Find the first route matching `method` and `path`.
    ///
    /// `HEAD` without a route of its own is served by the `GET` route.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.find(method, path).or_else(|| {
            if *method == Method::HEAD {
                self.find(&Method::GET, path)
            } else {
                None
            }
        })
    }

    fn find(&self, method: &Method, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    /// Body policy of the route that would serve this request, if any.
    pub fn body_policy(&self, method: &Method, path: &str) -> Option<BodyPolicy> {
        self.resolve(method, path).map(|(route, _)| route.body_policy)
    }

    /// Dispatch to the matching handler. Always yields a response.
    pub async fn dispatch(&self, req: NormalizedRequest) -> NormalizedResponse {
        let Some((route, params)) = self.resolve(req.method(), req.path()) else {
            tracing::debug!(
                request_id = %req.request_id(),
                method = %req.method(),
                path = %req.path(),
                "No route matched"
            );
            return NormalizedResponse::error(StatusCode::NOT_FOUND, "not found");
        };

        let head_only = *req.method() == Method::HEAD && route.method != Method::HEAD;
        let req = req.with_path_params(params);
        let request_id = req.request_id().to_string();
        let budget = req.context().remaining();

        let call = AssertUnwindSafe(route.handler.call(req)).catch_unwind();
        let outcome = match budget {
            Some(budget) => match tokio::time::timeout(budget, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let error_id = Uuid::new_v4();
                    tracing::warn!(
                        request_id = %request_id,
                        route = %route.name,
                        error_id = %error_id,
                        budget_ms = budget.as_millis() as u64,
                        "Handler exceeded invocation deadline"
                    );
                    metrics::record_handler_failure(&route.name, "timeout");
                    return NormalizedResponse::failure(
                        StatusCode::GATEWAY_TIMEOUT,
                        "handler timed out",
                        error_id,
                    );
                }
            },
            None => call.await,
        };

        let result: HandlerResult = outcome
            .unwrap_or_else(|_| Err(HandlerError::new("handler panicked")));

        match result {
            Ok(response) if head_only => response.with_body(ResponseBody::Empty),
            Ok(response) => response,
            Err(err) => {
                let error_id = Uuid::new_v4();
                tracing::error!(
                    request_id = %request_id,
                    route = %route.name,
                    error_id = %error_id,
                    error = %err,
                    "Handler failed"
                );
                metrics::record_handler_failure(&route.name, "error");
                NormalizedResponse::internal_error(error_id)
            }
        }
    }
}
