use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TransportError;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "transport-fsm.toml";

/// Environment variable prefix (`TRANSPORT_FSM__MACHINE__HISTORY_CAPACITY=64`)
pub const ENV_PREFIX: &str = "TRANSPORT_FSM";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// State machine behaviour
    pub machine: MachineConfig,
    /// Logging and metrics
    pub observability: ObservabilityConfig,
    /// Simulated engine used by replays
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Transition records kept in the journal (0 disables it)
    pub history_capacity: usize,
    /// What a second locate does while one is in flight
    pub locate_while_locating: LocateWhileLocating,
    /// Whether a finished or cancelled locate stays pending for later butler passes
    pub finished_locate: FinishedLocate,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 256,
            locate_while_locating: LocateWhileLocating::Resume,
            finished_locate: FinishedLocate::Keep,
        }
    }
}

/// Policy for `Locate` arriving in `Locating`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateWhileLocating {
    /// Go to `Rolling` without issuing the new locate
    #[default]
    Resume,
    /// Issue the new locate and keep locating
    Interrupt,
}

/// Policy for the stored locate once `LocateDone` or a stop in `Locating` ends it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishedLocate {
    /// Leave `pending_locate_after_stop` set; the next butler pass re-issues the locate
    #[default]
    Keep,
    /// Clear `pending_locate_after_stop` so a later butler pass ends in `Stopped`
    Forget,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON log lines
    pub json: bool,
    /// Log metric totals after a replay
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Answer requests with completion events
    pub auto_complete: bool,
    /// Ask for one butler pass per locate before completing it
    pub butler_on_locate: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            auto_complete: true,
            butler_on_locate: false,
        }
    }
}

impl TransportConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `transport-fsm.toml` in the working directory
    /// 3. Environment variables (prefixed with TRANSPORT_FSM)
    pub fn load() -> Result<Self, TransportError> {
        let path = Path::new(CONFIG_FILE);
        Self::build(path.exists().then_some(path))
    }

    /// Same as [`load`](Self::load) but reads an explicit file, which must exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        Self::build(Some(path.as_ref()))
    }

    fn build(file: Option<&Path>) -> Result<Self, TransportError> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TransportError> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<(), TransportError> {
        if Path::new(".env").exists() {
            dotenvy::dotenv().map_err(|e| TransportError::Env(e.to_string()))?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<TransportConfig, TransportError>> =
    std::sync::LazyLock::new(|| {
        let _ = TransportConfig::load_env_file();
        TransportConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static TransportConfig, &'static TransportError> {
    CONFIG.as_ref()
}

