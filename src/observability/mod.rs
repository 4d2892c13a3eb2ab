//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Adapter, router and middleware produce:
//!     → logging.rs (structured tracing events, request_id on every line)
//!     → metrics.rs (invocation counters, latency histogram, failures)
//!
//! Consumers:
//!     → Lambda: stdout JSON lines, picked up by the platform log stream
//!     → Serve mode: stdout + optional Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Failure detail (handler errors) goes to logs only, keyed by error ID
//! - Metrics calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
