use statig::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::api::TransportApi;
use super::dispatcher::EventQueue;
use super::types::{Disposition, LocateRequest, TransportEvent, TransportSnapshot, TransportState};
use crate::config::{FinishedLocate, LocateWhileLocating};

/// Transition table storage.
///
/// Only the dispatcher drives this machine, one event at a time. Actions call
/// out to the [`TransportApi`]; anything the API submits back lands in the
/// dispatcher queue and never re-enters a running handler.
pub struct TransportFsm {
    api: Arc<dyn TransportApi>,
    queue: Arc<EventQueue>,
    locate_while_locating: LocateWhileLocating,
    finished_locate: FinishedLocate,
    current: TransportState,
    /// true when the current declick/butler sequence ends in a locate, false when it ends in a stop
    pending_locate_after_stop: bool,
    last_locate: LocateRequest,
    deferred: VecDeque<TransportEvent>,
    disposition: Disposition,
}

impl TransportFsm {
    pub(crate) fn new(
        api: Arc<dyn TransportApi>,
        queue: Arc<EventQueue>,
        locate_while_locating: LocateWhileLocating,
        finished_locate: FinishedLocate,
    ) -> Self {
        Self {
            api,
            queue,
            locate_while_locating,
            finished_locate,
            current: TransportState::Stopped,
            pending_locate_after_stop: false,
            last_locate: LocateRequest::default(),
            deferred: VecDeque::new(),
            disposition: Disposition::Applied,
        }
    }

    fn no_transition(&mut self, event: &TransportEvent) -> Outcome<State> {
        self.disposition = Disposition::Ignored;
        warn!(
            state = %self.current,
            event = %event.kind(),
            "No transition for event in current state, ignoring"
        );
        Handled
    }

    fn defer(&mut self, event: &TransportEvent) -> Outcome<State> {
        self.disposition = Disposition::Deferred;
        self.deferred.push_back(*event);
        debug!(
            state = %self.current,
            event = %event.kind(),
            held = self.deferred.len(),
            "Deferring event until state exit"
        );
        Handled
    }

    fn store_locate(&mut self, request: LocateRequest) {
        self.pending_locate_after_stop = true;
        self.last_locate = request;
    }

    fn finish_locate(&mut self) {
        if self.finished_locate == FinishedLocate::Forget {
            self.pending_locate_after_stop = false;
        }
    }
}

#[state_machine(initial = "State::stopped()")]
impl TransportFsm {
    #[state(entry_action = "enter_stopped")]
    fn stopped(&mut self, event: &TransportEvent) -> Outcome<State> {
        self.disposition = Disposition::Applied;
        match *event {
            TransportEvent::Start => {
                self.api.start_transport();
                Transition(State::rolling())
            }
            TransportEvent::Stop { .. } => Handled,
            TransportEvent::Locate(request) => {
                self.store_locate(request);
                self.api.locate(request);
                Transition(State::locating())
            }
            TransportEvent::ButlerDone => {
                self.api.butler_completed_transport_work();
                Handled
            }
            TransportEvent::ButlerRequired => {
                self.api.schedule_butler_for_transport_work();
                Transition(State::butler_wait())
            }
            _ => self.no_transition(event),
        }
    }

    #[state(entry_action = "enter_rolling")]
    fn rolling(&mut self, event: &TransportEvent) -> Outcome<State> {
        self.disposition = Disposition::Applied;
        match *event {
            TransportEvent::Stop { abort, clear_state } => {
                self.pending_locate_after_stop = false;
                self.api.stop_transport(abort, clear_state);
                Transition(State::declick_out())
            }
            TransportEvent::Start => Handled,
            TransportEvent::Locate(request) => {
                self.store_locate(request);
                self.api.stop_transport(false, false);
                Transition(State::declick_out())
            }
            TransportEvent::ButlerDone => Handled,
            _ => self.no_transition(event),
        }
    }

    #[state(entry_action = "enter_declick_out")]
    fn declick_out(&mut self, event: &TransportEvent) -> Outcome<State> {
        self.disposition = Disposition::Applied;
        match *event {
            TransportEvent::DeclickDone if self.pending_locate_after_stop => {
                self.api.locate(self.last_locate);
                Transition(State::locating())
            }
            TransportEvent::DeclickDone => {
                // fade finished, tell the engine it is now fully stopped
                self.api.stop_transport(false, false);
                Transition(State::stopped())
            }
            TransportEvent::ButlerRequired => {
                self.api.schedule_butler_for_transport_work();
                Transition(State::butler_wait())
            }
            _ => self.no_transition(event),
        }
    }

    #[state(entry_action = "enter_locating")]
    fn locating(&mut self, event: &TransportEvent) -> Outcome<State> {
        self.disposition = Disposition::Applied;
        match *event {
            TransportEvent::LocateDone => {
                self.finish_locate();
                if self.api.should_roll_after_locate() {
                    self.api.start_transport();
                    Transition(State::rolling())
                } else {
                    Transition(State::stopped())
                }
            }
            TransportEvent::Stop { abort, clear_state } => {
                self.finish_locate();
                self.api.stop_transport(abort, clear_state);
                Transition(State::stopped())
            }
            TransportEvent::Start => Transition(State::rolling()),
            TransportEvent::Locate(request) => match self.locate_while_locating {
                LocateWhileLocating::Resume => {
                    warn!(
                        target_sample = request.target,
                        in_flight = self.last_locate.target,
                        "Locate while locating: resuming roll without issuing the new locate"
                    );
                    Transition(State::rolling())
                }
                LocateWhileLocating::Interrupt => {
                    info!(
                        target_sample = request.target,
                        in_flight = self.last_locate.target,
                        "Locate while locating: interrupting in-flight locate"
                    );
                    self.store_locate(request);
                    self.api.locate(request);
                    Handled
                }
            },
            TransportEvent::ButlerDone => Handled,
            TransportEvent::ButlerRequired => {
                self.api.schedule_butler_for_transport_work();
                Transition(State::butler_wait())
            }
            _ => self.no_transition(event),
        }
    }

    #[state(entry_action = "enter_butler_wait", exit_action = "exit_butler_wait")]
    fn butler_wait(&mut self, event: &TransportEvent) -> Outcome<State> {
        self.disposition = Disposition::Applied;
        match *event {
            TransportEvent::ButlerDone => {
                self.api.butler_completed_transport_work();
                if self.pending_locate_after_stop {
                    // locate phase two: the butler has refilled, seek again
                    self.api.locate(self.last_locate);
                    Transition(State::locating())
                } else {
                    Transition(State::stopped())
                }
            }
            TransportEvent::ButlerRequired => {
                self.api.schedule_butler_for_transport_work();
                Handled
            }
            TransportEvent::Start | TransportEvent::Stop { .. } => self.defer(event),
            _ => self.no_transition(event),
        }
    }

    #[action]
    fn enter_stopped(&mut self) {
        self.enter(TransportState::Stopped);
    }

    #[action]
    fn enter_rolling(&mut self) {
        self.enter(TransportState::Rolling);
    }

    #[action]
    fn enter_declick_out(&mut self) {
        self.enter(TransportState::DeclickOut);
    }

    #[action]
    fn enter_locating(&mut self) {
        self.enter(TransportState::Locating);
    }

    #[action]
    fn enter_butler_wait(&mut self) {
        self.enter(TransportState::ButlerWait);
    }

    #[action]
    fn exit_butler_wait(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let released: Vec<TransportEvent> = self.deferred.drain(..).collect();
        debug!(count = released.len(), "Releasing deferred events");
        self.queue.requeue_front(released);
    }
}

impl TransportFsm {
    fn enter(&mut self, state: TransportState) {
        debug!(from = %self.current, to = %state, "Entering transport state");
        self.current = state;
    }

    pub fn state(&self) -> TransportState {
        self.current
    }

    pub fn pending_locate_after_stop(&self) -> bool {
        self.pending_locate_after_stop
    }

    pub fn last_locate(&self) -> LocateRequest {
        self.last_locate
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// What the most recent `handle` did with its event
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            state: self.current,
            pending_locate_after_stop: self.pending_locate_after_stop,
            last_locate: self.last_locate,
            deferred: self.deferred.len(),
        }
    }
}
