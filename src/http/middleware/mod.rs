//! Middleware chain.
//!
//! # Data Flow
//! ```text
//! Chain::run(req)
//!     → cors.rs        (outermost: preflight short-circuit, decorates every response)
//!     → body.rs        (size limit, malformed-body rejection)
//!     → Router::dispatch
//! ```
//!
//! # Design Decisions
//! - Steps wrap the rest of the chain rather than run in a flat list, so an
//!   outer step sees whatever response an inner step or the router produced
//! - The first step added is the outermost
//! - A step may short-circuit by returning without calling `next`

pub mod body;
pub mod cors;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::http::{NormalizedRequest, NormalizedResponse};
use crate::routing::Router;

pub use body::BodyParsing;
pub use cors::Cors;

/// A step wrapping the remainder of the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        req: NormalizedRequest,
        next: Next<'_>,
    ) -> Result<NormalizedResponse, AdapterError>;
}

/// The rest of the chain after the current step.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    router: &'a Router,
}

impl Next<'_> {
    pub async fn run(self, req: NormalizedRequest) -> Result<NormalizedResponse, AdapterError> {
        match self.rest.split_first() {
            Some((step, rest)) => {
                let next = Next {
                    rest,
                    router: self.router,
                };
                step.handle(req, next).await
            }
            None => Ok(self.router.dispatch(req).await),
        }
    }
}

/// Middleware steps in front of a router.
pub struct Chain {
    steps: Vec<Arc<dyn Middleware>>,
    router: Arc<Router>,
}

impl Chain {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            steps: Vec::new(),
            router,
        }
    }

    /// Add a step inside all previously added ones.
    pub fn step(mut self, step: impl Middleware + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, req: NormalizedRequest) -> Result<NormalizedResponse, AdapterError> {
        Next {
            rest: &self.steps,
            router: &self.router,
        }
        .run(req)
        .await
    }
}
