// Core value types for the transport state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample position on the engine timeline
pub type SamplePos = i64;

/// A locate (seek) request, also kept as the stored `last_locate`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocateRequest {
    pub target: SamplePos,
    #[serde(default)]
    pub with_roll: bool,
    #[serde(default)]
    pub with_flush: bool,
    #[serde(default)]
    pub with_loop: bool,
    #[serde(default)]
    pub force: bool,
}

impl LocateRequest {
    pub fn new(target: SamplePos) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn rolling(mut self) -> Self {
        self.with_roll = true;
        self
    }
}

/// Events that drive the transport state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransportEvent {
    /// Request to begin rolling
    Start,
    /// Request to halt
    Stop {
        #[serde(default)]
        abort: bool,
        #[serde(default)]
        clear_state: bool,
    },
    /// Request to seek, optionally resuming playback afterwards
    Locate(LocateRequest),
    /// The engine needs the butler to do transport work
    ButlerRequired,
    /// The butler finished its transport work
    ButlerDone,
    /// The declick fade-out finished
    DeclickDone,
    /// The realtime seek finished
    LocateDone,
}

impl TransportEvent {
    pub fn stop() -> Self {
        TransportEvent::Stop {
            abort: false,
            clear_state: false,
        }
    }

    pub fn locate(target: SamplePos) -> Self {
        TransportEvent::Locate(LocateRequest::new(target))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Start => EventKind::Start,
            TransportEvent::Stop { .. } => EventKind::Stop,
            TransportEvent::Locate(_) => EventKind::Locate,
            TransportEvent::ButlerRequired => EventKind::ButlerRequired,
            TransportEvent::ButlerDone => EventKind::ButlerDone,
            TransportEvent::DeclickDone => EventKind::DeclickDone,
            TransportEvent::LocateDone => EventKind::LocateDone,
        }
    }
}

/// Payload-free discriminant of a [`TransportEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Stop,
    Locate,
    ButlerRequired,
    ButlerDone,
    DeclickDone,
    LocateDone,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Locate => "locate",
            EventKind::ButlerRequired => "butler_required",
            EventKind::ButlerDone => "butler_done",
            EventKind::DeclickDone => "declick_done",
            EventKind::LocateDone => "locate_done",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Transport states. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Stopped,
    Rolling,
    /// Fading out before the engine is silent
    DeclickOut,
    /// Waiting for the realtime seek to finish
    Locating,
    /// Waiting for the butler; holds `Start` and `Stop`
    ButlerWait,
}

impl TransportState {
    pub const ALL: [TransportState; 5] = [
        TransportState::Stopped,
        TransportState::Rolling,
        TransportState::DeclickOut,
        TransportState::Locating,
        TransportState::ButlerWait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Stopped => "stopped",
            TransportState::Rolling => "rolling",
            TransportState::DeclickOut => "declick_out",
            TransportState::Locating => "locating",
            TransportState::ButlerWait => "butler_wait",
        }
    }

    /// States that wait on an external completion event
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            TransportState::DeclickOut | TransportState::Locating | TransportState::ButlerWait
        )
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What a single `apply` did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// A table row fired
    Applied,
    /// Held until the current state is left
    Deferred,
    /// No row for this state and event
    Ignored,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Disposition::Applied => "applied",
            Disposition::Deferred => "deferred",
            Disposition::Ignored => "ignored",
        };
        f.pad(s)
    }
}

/// Consistent copy of the machine taken between two transitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSnapshot {
    pub state: TransportState,
    pub pending_locate_after_stop: bool,
    pub last_locate: LocateRequest,
    /// Number of events currently held by the active state
    pub deferred: usize,
}
