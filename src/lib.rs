//! Tarefas API: an HTTP application hosted behind a serverless invocation
//! adapter.

pub mod adapter;
pub mod config;
pub mod error;
pub mod event;
pub mod handlers;
pub mod http;
pub mod observability;
pub mod routing;

pub use adapter::Adapter;
pub use config::AppConfig;
pub use error::AdapterError;
