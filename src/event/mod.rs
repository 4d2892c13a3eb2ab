//! Platform invocation boundary.
//!
//! # Data Flow
//! ```text
//! raw JSON payload
//!     → types.rs (InvocationEvent, payload 1.0 or 2.0)
//!     → normalize.rs (→ NormalizedRequest)
//!     → [middleware chain + router]
//!     → serialize.rs (NormalizedResponse → InvocationResult)
//!     → raw JSON result
//! ```
//!
//! # Design Decisions
//! - The payload version is detected once and the result envelope mirrors it
//! - Normalization is the only step allowed to reject an event outright

pub mod normalize;
pub mod serialize;
pub mod types;

pub use normalize::normalize;
pub use serialize::serialize;
pub use types::{InvocationEvent, InvocationResult, PayloadVersion};
