// Transport FSM Library - transport control for a real-time playback engine
// This exposes the state machine, its dispatcher and the replay tooling

pub mod config;
pub mod error;
pub mod observability;
pub mod script;
pub mod simulator;
pub mod telemetry;
pub mod transport;

// Re-export key types for easy access
pub use crate::config::{
    config, FinishedLocate, LocateWhileLocating, MachineConfig, ObservabilityConfig, SimulatorConfig, TransportConfig,
};
pub use error::TransportError;
pub use observability::{TransportMetrics, TransportStats};
pub use simulator::SimulatedEngine;
pub use telemetry::{create_dispatch_span, generate_correlation_id, init_telemetry};
pub use transport::{
    ApiCall, Disposition, EventKind, LocateRequest, SamplePos, TransitionRecord, TransportApi,
    TransportEvent, TransportHandle, TransportMachine, TransportSnapshot, TransportState,
};
