//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the log filter from `RUST_LOG`, falling back to config
//!
//! # Design Decisions
//! - JSON lines when `json_logs` is set (forced on in lambda mode), pretty
//!   otherwise
//! - `try_init` so tests and embedders that already installed a subscriber
//!   get an error instead of a panic

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(fmt::layer().json().with_ansi(false).with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}

fn default_directives(level: &str) -> String {
    format!("tarefas_api={level},tower_http={level},lambda_runtime=info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_crate() {
        assert_eq!(
            default_directives("debug"),
            "tarefas_api=debug,tower_http=debug,lambda_runtime=info"
        );
    }
}
