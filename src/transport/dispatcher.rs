// Event dispatcher - serializes submissions onto the transition table
//
// Any thread may submit. The thread that takes the depth counter from 0 to 1
// drains the queue; everyone else (including actions running on that thread)
// only appends. No two `apply` calls ever overlap and no handler re-enters.

use chrono::Utc;
use statig::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, warn};

use super::api::TransportApi;
use super::history::{TransitionJournal, TransitionRecord};
use super::state_machine::TransportFsm;
use super::types::{TransportEvent, TransportSnapshot, TransportState};
use crate::config::MachineConfig;
use crate::observability::{TransportMetrics, TransportStats};

/// Pending events plus the bookkeeping readers are allowed to see
pub(crate) struct EventQueue {
    inner: Mutex<QueueState>,
    metrics: Arc<TransportMetrics>,
}

struct QueueState {
    depth: usize,
    pending: VecDeque<TransportEvent>,
    snapshot: TransportSnapshot,
    journal: TransitionJournal,
}

impl EventQueue {
    fn new(history_capacity: usize, metrics: Arc<TransportMetrics>) -> Self {
        Self {
            inner: Mutex::new(QueueState {
                depth: 0,
                pending: VecDeque::new(),
                snapshot: TransportSnapshot::default(),
                journal: TransitionJournal::new(history_capacity),
            }),
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put released deferred events ahead of everything else, keeping their order
    pub(crate) fn requeue_front(&self, events: Vec<TransportEvent>) {
        self.metrics.record_replayed(events.len());
        let mut queue = self.lock();
        for event in events.into_iter().rev() {
            queue.pending.push_front(event);
        }
    }
}

struct Shared {
    queue: Arc<EventQueue>,
    fsm: Mutex<StateMachine<TransportFsm>>,
    sequence: AtomicU64,
}

/// Resets the depth counter if an action unwinds mid-transition
struct DepthGuard<'a> {
    queue: &'a EventQueue,
    armed: bool,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut queue = self.queue.lock();
            error!(
                pending = queue.pending.len(),
                "Transition unwound while applying an event; resetting dispatcher depth"
            );
            queue.depth = 0;
        }
    }
}

impl Shared {
    fn submit(&self, event: TransportEvent) {
        self.queue.metrics.record_submit();
        let mut next = {
            let mut queue = self.queue.lock();
            if queue.depth > 0 {
                queue.pending.push_back(event);
                self.queue.metrics.record_queued();
                debug!(
                    event = %event.kind(),
                    depth = queue.depth,
                    pending = queue.pending.len(),
                    "Queued event behind running transition"
                );
                return;
            }
            queue.depth += 1;
            // events stranded by an unwound transition still go first
            if queue.pending.is_empty() {
                Some(event)
            } else {
                warn!(
                    stranded = queue.pending.len(),
                    "Draining events left by an unwound transition"
                );
                queue.pending.push_back(event);
                queue.pending.pop_front()
            }
        };

        let mut guard = DepthGuard {
            queue: &self.queue,
            armed: true,
        };
        while let Some(event) = next {
            next = self.apply(event);
        }
        guard.armed = false;
    }

    /// Run one event through the table, then pop the next one. Depth drops back
    /// to 0 in the same critical section that finds the queue empty.
    fn apply(&self, event: TransportEvent) -> Option<TransportEvent> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tracing::debug_span!("transport_apply", event = %event.kind(), seq = sequence);
        let _entered = span.enter();

        let (from, snapshot, disposition) = {
            let mut fsm = self.fsm.lock().unwrap_or_else(PoisonError::into_inner);
            let from = fsm.inner().state();
            fsm.handle(&event);
            (from, fsm.inner().snapshot(), fsm.inner().disposition())
        };

        debug!(
            from = %from,
            to = %snapshot.state,
            disposition = %disposition,
            "Processed transport event"
        );
        self.queue.metrics.record_disposition(disposition);

        let mut queue = self.queue.lock();
        queue.snapshot = snapshot;
        queue.journal.push(TransitionRecord {
            sequence,
            event,
            from,
            to: snapshot.state,
            disposition,
            timestamp: Utc::now(),
        });
        let next = queue.pending.pop_front();
        if next.is_none() {
            queue.depth -= 1;
        }
        next
    }
}

/// One transport state machine per engine.
///
/// `submit` is the only mutator. It is safe to call from any thread and from
/// inside [`TransportApi`] calls made by a running transition.
pub struct TransportMachine {
    shared: Arc<Shared>,
}

impl TransportMachine {
    pub fn new(api: Arc<dyn TransportApi>, config: &MachineConfig) -> Self {
        let metrics = Arc::new(TransportMetrics::new());
        let queue = Arc::new(EventQueue::new(config.history_capacity, metrics));
        let fsm = TransportFsm::new(
            api,
            queue.clone(),
            config.locate_while_locating,
            config.finished_locate,
        )
        .state_machine();

        Self {
            shared: Arc::new(Shared {
                queue,
                fsm: Mutex::new(fsm),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn with_defaults(api: Arc<dyn TransportApi>) -> Self {
        Self::new(api, &MachineConfig::default())
    }

    /// Submit an event. Applied immediately when the machine is idle,
    /// otherwise queued behind the transition in progress.
    pub fn submit(&self, event: TransportEvent) {
        self.shared.submit(event);
    }

    /// Non-owning submission handle for collaborators
    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn state(&self) -> TransportState {
        self.snapshot().state
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        self.shared.queue.lock().snapshot
    }

    pub fn history(&self) -> Vec<TransitionRecord> {
        self.shared.queue.lock().journal.records()
    }

    pub fn metrics(&self) -> &TransportMetrics {
        &self.shared.queue.metrics
    }

    pub fn stats(&self) -> TransportStats {
        self.shared.queue.metrics.get_stats()
    }

    /// No transition running and nothing queued
    pub fn is_idle(&self) -> bool {
        let queue = self.shared.queue.lock();
        queue.depth == 0 && queue.pending.is_empty()
    }
}

impl std::fmt::Debug for TransportMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.shared.queue.lock();
        f.debug_struct("TransportMachine")
            .field("snapshot", &queue.snapshot)
            .field("depth", &queue.depth)
            .field("pending", &queue.pending.len())
            .finish()
    }
}

/// Cloneable submission handle that does not keep the machine alive
#[derive(Clone, Debug, Default)]
pub struct TransportHandle {
    shared: Weak<Shared>,
}

impl TransportHandle {
    pub fn submit(&self, event: TransportEvent) {
        match self.shared.upgrade() {
            Some(shared) => shared.submit(event),
            None => warn!(event = %event.kind(), "Transport machine is gone, dropping event"),
        }
    }

    /// Last consistent snapshot, if the machine still exists
    pub fn snapshot(&self) -> Option<TransportSnapshot> {
        self.shared.upgrade().map(|shared| shared.queue.lock().snapshot)
    }
}
