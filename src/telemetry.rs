use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// RUST_LOG wins when set; otherwise the configured level applies. Calling
/// this twice (tests, embedding hosts that already installed a subscriber)
/// leaves the first subscriber in place.
pub fn init_telemetry(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(json = config.json, level = %config.log_level, "Telemetry initialized");
    }
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping everything one machine does during a replay or session
pub fn create_dispatch_span(machine: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "transport_machine",
        machine = machine,
        correlation.id = correlation_id,
    )
}
