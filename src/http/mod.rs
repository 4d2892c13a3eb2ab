//! HTTP model and local serving.
//!
//! # Data Flow
//! ```text
//! Lambda mode:  invocation event → event::normalize → NormalizedRequest
//! Serve mode:   TCP → server.rs (axum) → payload 2.0 event → same path
//!
//! NormalizedRequest → middleware → router → NormalizedResponse
//! ```
//!
//! # Design Decisions
//! - One request/response model for both modes, so local runs exercise the
//!   exact adaptation path the platform sees

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{InvocationContext, NormalizedRequest, ParsedBody};
pub use response::{NormalizedResponse, ResponseBody};
pub use server::LocalServer;
