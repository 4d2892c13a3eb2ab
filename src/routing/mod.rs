//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! NormalizedRequest (method, path)
//!     → router.rs (scan routes in registration order)
//!     → matcher.rs (match path pattern, bind {params})
//!     → Handler::call
//!     → NormalizedResponse (handler result, 404, 500 or 504)
//!
//! Route table construction (at startup):
//!     Router::builder().route(..)...
//!     → build()
//!     → Freeze as immutable Router, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Routes registered once at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::PathPattern;
pub use router::{BodyPolicy, Route, Router, RouterBuilder};
