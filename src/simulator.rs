// Simulated engine - a TransportApi that stands in for the audio engine
//
// It records every call and, when auto-completing, answers each request the
// way the real engine would: by submitting the matching completion event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, warn};

use crate::config::{SimulatorConfig, TransportConfig};
use crate::transport::{
    ApiCall, LocateRequest, TransportApi, TransportEvent, TransportHandle, TransportMachine,
    TransportState,
};

#[derive(Debug)]
pub struct SimulatedEngine {
    config: SimulatorConfig,
    auto_complete: AtomicBool,
    handle: OnceLock<TransportHandle>,
    calls: Mutex<Vec<ApiCall>>,
    rolling: AtomicBool,
    last_locate_rolls: AtomicBool,
    roll_override: Mutex<Option<bool>>,
    /// The current locate already had its butler pass
    locate_butlered: AtomicBool,
}

impl SimulatedEngine {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            auto_complete: AtomicBool::new(config.auto_complete),
            config,
            handle: OnceLock::new(),
            calls: Mutex::new(Vec::new()),
            rolling: AtomicBool::new(false),
            last_locate_rolls: AtomicBool::new(false),
            roll_override: Mutex::new(None),
            locate_butlered: AtomicBool::new(false),
        }
    }

    /// Engine that only records calls
    pub fn manual() -> Self {
        Self::new(SimulatorConfig {
            auto_complete: false,
            butler_on_locate: false,
        })
    }

    /// Build an engine and a machine bound to it
    pub fn with_machine(config: &TransportConfig) -> (Arc<Self>, TransportMachine) {
        let engine = Arc::new(Self::new(config.simulator.clone()));
        let machine = TransportMachine::new(engine.clone(), &config.machine);
        engine.attach(machine.handle());
        (engine, machine)
    }

    /// Pause or resume completion events without rebuilding the engine
    pub fn set_auto_complete(&self, enabled: bool) {
        self.auto_complete.store(enabled, Ordering::SeqCst);
    }

    /// Connect the engine to the machine it feeds completion events into.
    /// Returns false if it was already attached.
    pub fn attach(&self, handle: TransportHandle) -> bool {
        self.handle.set(handle).is_ok()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn count(&self, call: ApiCall) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    /// Force the answer to `should_roll_after_locate` (None follows the last locate)
    pub fn set_roll_after_locate(&self, roll: Option<bool>) {
        *self
            .roll_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = roll;
    }

    /// The engine's own view. The machine can enter `Rolling` from `Locating`
    /// without calling `start_transport`, so this may lag behind it.
    pub fn is_rolling(&self) -> bool {
        self.rolling.load(Ordering::SeqCst)
    }

    fn record(&self, call: ApiCall) {
        debug!(call = %call, "Engine call");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn complete(&self, event: TransportEvent) {
        if !self.auto_complete.load(Ordering::SeqCst) {
            return;
        }
        match self.handle.get() {
            Some(handle) => handle.submit(event),
            None => warn!(event = %event.kind(), "Simulated engine not attached to a machine"),
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl TransportApi for SimulatedEngine {
    fn start_transport(&self) {
        self.record(ApiCall::StartTransport);
        self.rolling.store(true, Ordering::SeqCst);
    }

    fn stop_transport(&self, abort: bool, clear_state: bool) {
        self.record(ApiCall::StopTransport { abort, clear_state });
        let was_rolling = self.rolling.swap(false, Ordering::SeqCst);

        // actions see the state they are leaving; only a stop out of Rolling declicks
        let declicking = match self.handle.get().and_then(TransportHandle::snapshot) {
            Some(snapshot) => snapshot.state == TransportState::Rolling,
            None => was_rolling,
        };
        if declicking {
            self.complete(TransportEvent::DeclickDone);
        }
    }

    fn locate(&self, request: LocateRequest) {
        self.record(ApiCall::Locate(request));
        self.last_locate_rolls
            .store(request.with_roll, Ordering::SeqCst);

        if self.config.butler_on_locate && !self.locate_butlered.swap(true, Ordering::SeqCst) {
            self.complete(TransportEvent::ButlerRequired);
        } else {
            self.locate_butlered.store(false, Ordering::SeqCst);
            self.complete(TransportEvent::LocateDone);
        }
    }

    fn schedule_butler_for_transport_work(&self) {
        self.record(ApiCall::ScheduleButler);
        self.complete(TransportEvent::ButlerDone);
    }

    fn butler_completed_transport_work(&self) {
        self.record(ApiCall::ButlerCompleted);
    }

    fn should_roll_after_locate(&self) -> bool {
        self.record(ApiCall::ShouldRollAfterLocate);
        let forced = *self
            .roll_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        forced.unwrap_or_else(|| self.last_locate_rolls.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_with_roll_completes_to_rolling() {
        let (engine, machine) = SimulatedEngine::with_machine(&TransportConfig::default());

        machine.submit(TransportEvent::Locate(LocateRequest::new(48000).rolling()));

        assert_eq!(machine.state(), TransportState::Rolling);
        assert!(engine.is_rolling());
        assert_eq!(engine.count(ApiCall::ShouldRollAfterLocate), 1);
    }

    #[test]
    fn test_butler_pass_before_locate_completes() {
        let mut config = TransportConfig::default();
        config.simulator.butler_on_locate = true;
        let (engine, machine) = SimulatedEngine::with_machine(&config);

        machine.submit(TransportEvent::locate(1000));

        assert_eq!(machine.state(), TransportState::Stopped);
        assert_eq!(
            engine.calls(),
            vec![
                ApiCall::Locate(LocateRequest::new(1000)),
                ApiCall::ScheduleButler,
                ApiCall::ButlerCompleted,
                ApiCall::Locate(LocateRequest::new(1000)),
                ApiCall::ShouldRollAfterLocate,
            ]
        );
    }

    #[test]
    fn test_stop_after_start_while_locating_still_declicks() {
        let (engine, machine) = SimulatedEngine::with_machine(&TransportConfig::default());
        engine.set_auto_complete(false);
        machine.submit(TransportEvent::locate(100));
        engine.set_auto_complete(true);

        // rolls without start_transport, so the engine never saw it start
        machine.submit(TransportEvent::Start);
        assert_eq!(machine.state(), TransportState::Rolling);
        assert!(!engine.is_rolling());

        machine.submit(TransportEvent::stop());
        assert_eq!(machine.state(), TransportState::Stopped);
        assert!(machine
            .history()
            .iter()
            .any(|r| r.event == TransportEvent::DeclickDone));
    }

    #[test]
    fn test_stop_while_locating_does_not_declick() {
        let (engine, machine) = SimulatedEngine::with_machine(&TransportConfig::default());
        engine.set_auto_complete(false);
        machine.submit(TransportEvent::locate(100));
        engine.set_auto_complete(true);

        machine.submit(TransportEvent::stop());

        assert_eq!(machine.state(), TransportState::Stopped);
        assert_eq!(machine.stats().ignored, 0);
    }

    #[test]
    fn test_manual_engine_never_submits() {
        let engine = Arc::new(SimulatedEngine::manual());
        let machine = TransportMachine::with_defaults(engine.clone());
        engine.attach(machine.handle());

        machine.submit(TransportEvent::Start);
        machine.submit(TransportEvent::stop());

        assert_eq!(machine.state(), TransportState::DeclickOut);
    }
}
