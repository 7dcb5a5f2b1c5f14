// Mock collaborator for testing - records calls, optionally reacts with events

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use super::api::{ApiCall, TransportApi};
use super::dispatcher::{TransportHandle, TransportMachine};
use super::types::{LocateRequest, TransportEvent, TransportSnapshot};
use crate::config::MachineConfig;

/// Records every call. Reactions submit events back into the machine from
/// inside the matching call, the way a real engine reports completions.
#[derive(Debug, Default)]
pub struct RecordingApi {
    pub calls: Mutex<Vec<ApiCall>>,
    pub roll_after_locate: AtomicBool,
    reactions: Mutex<Vec<(ApiCall, Vec<TransportEvent>)>>,
    /// Snapshot visible from inside each call that triggered a reaction
    pub seen_during_reaction: Mutex<Vec<TransportSnapshot>>,
    fail_on: Mutex<Option<ApiCall>>,
    handle: OnceLock<TransportHandle>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_roll_after_locate(&self, roll: bool) {
        self.roll_after_locate.store(roll, Ordering::SeqCst);
    }

    /// The next time `call` happens, submit `events` in order (one-shot)
    pub fn react_to(&self, call: ApiCall, events: Vec<TransportEvent>) {
        self.reactions.lock().unwrap().push((call, events));
    }

    /// The next time `call` happens, panic after running its reactions (one-shot)
    pub fn fail_on(&self, call: ApiCall) {
        *self.fail_on.lock().unwrap() = Some(call);
    }

    pub fn get_calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);

        let events = {
            let mut reactions = self.reactions.lock().unwrap();
            reactions
                .iter()
                .position(|(c, _)| *c == call)
                .map(|index| reactions.remove(index).1)
        };

        if let Some(events) = events {
            let handle = self.handle.get().expect("mock not attached to a machine");
            for event in events {
                handle.submit(event);
            }
            if let Some(snapshot) = handle.snapshot() {
                self.seen_during_reaction.lock().unwrap().push(snapshot);
            }
        }

        let fail = self.fail_on.lock().unwrap().take_if(|c| *c == call).is_some();
        if fail {
            panic!("engine failed during {call}");
        }
    }
}

impl TransportApi for RecordingApi {
    fn start_transport(&self) {
        self.record(ApiCall::StartTransport);
    }

    fn stop_transport(&self, abort: bool, clear_state: bool) {
        self.record(ApiCall::StopTransport { abort, clear_state });
    }

    fn locate(&self, request: LocateRequest) {
        self.record(ApiCall::Locate(request));
    }

    fn schedule_butler_for_transport_work(&self) {
        self.record(ApiCall::ScheduleButler);
    }

    fn butler_completed_transport_work(&self) {
        self.record(ApiCall::ButlerCompleted);
    }

    fn should_roll_after_locate(&self) -> bool {
        self.record(ApiCall::ShouldRollAfterLocate);
        self.roll_after_locate.load(Ordering::SeqCst)
    }
}

/// Machine bound to a fresh recording mock
pub fn recording_machine(config: &MachineConfig) -> (Arc<RecordingApi>, TransportMachine) {
    let api = RecordingApi::new();
    let machine = TransportMachine::new(api.clone(), config);
    api.handle.set(machine.handle()).unwrap();
    (api, machine)
}
