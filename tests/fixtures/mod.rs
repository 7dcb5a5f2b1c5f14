/// Shared helpers for the transport integration tests
use std::path::PathBuf;
use std::sync::Arc;

use transport_fsm::{SimulatedEngine, TransportConfig, TransportMachine};

pub fn script_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scripts")
        .join(name)
}

/// Machine over a simulated engine that only records calls
pub fn manual_machine() -> (Arc<SimulatedEngine>, TransportMachine) {
    let mut config = TransportConfig::default();
    config.simulator.auto_complete = false;
    SimulatedEngine::with_machine(&config)
}

/// Machine over a simulated engine that completes every request
pub fn auto_machine() -> (Arc<SimulatedEngine>, TransportMachine) {
    SimulatedEngine::with_machine(&TransportConfig::default())
}
