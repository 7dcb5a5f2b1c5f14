use thiserror::Error;

/// Errors from the crate's fallible edges. The state machine itself never
/// fails: unknown transitions are logged and dropped.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Failed to load .env file: {0}")]
    Env(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event on script line {line}: {source}")]
    Script {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
