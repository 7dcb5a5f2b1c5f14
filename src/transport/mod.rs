// Transport Module - play/stop/locate control with butler and declick phases
//
// The dispatcher owns reentrancy and ordering; the state machine owns the
// transition table. Everything the table does to the outside world goes
// through the TransportApi collaborator.

pub mod api;
pub mod dispatcher;
pub mod history;
pub mod state_machine;
pub mod types;

#[cfg(test)]
pub mod mocks;


pub use api::{ApiCall, TransportApi};
pub use dispatcher::{TransportHandle, TransportMachine};
pub use history::{TransitionJournal, TransitionRecord};
pub use state_machine::TransportFsm;
pub use types::{
    Disposition, EventKind, LocateRequest, SamplePos, TransportEvent, TransportSnapshot,
    TransportState,
};
