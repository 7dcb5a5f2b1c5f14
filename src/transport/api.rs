// Collaborator interface consumed by transition actions

use serde::{Deserialize, Serialize};

use super::types::LocateRequest;

/// Engine operations the transport state machine drives.
///
/// Calls are synchronous and must not block. They never fail synchronously:
/// an engine that cannot start, stop or seek reports that by not emitting the
/// matching completion event. Implementations may submit further events into
/// the machine from inside any of these calls; those are queued and applied
/// after the current transition has finished.
pub trait TransportApi: Send + Sync {
    /// Begin (or resume) playback
    fn start_transport(&self);

    /// Halt playback; `abort` discards in-flight work, `clear_state` resets engine state
    fn stop_transport(&self, abort: bool, clear_state: bool);

    /// Seek to `request.target`
    fn locate(&self, request: LocateRequest);

    /// Hand transport work to the butler
    fn schedule_butler_for_transport_work(&self);

    /// Acknowledge that the butler finished its transport work
    fn butler_completed_transport_work(&self);

    /// Whether playback resumes once the current locate is done
    fn should_roll_after_locate(&self) -> bool;
}

/// A recorded collaborator call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ApiCall {
    StartTransport,
    StopTransport { abort: bool, clear_state: bool },
    Locate(LocateRequest),
    ScheduleButler,
    ButlerCompleted,
    ShouldRollAfterLocate,
}

impl std::fmt::Display for ApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiCall::StartTransport => write!(f, "start_transport()"),
            ApiCall::StopTransport { abort, clear_state } => {
                write!(f, "stop_transport(abort={abort}, clear_state={clear_state})")
            }
            ApiCall::Locate(l) => write!(
                f,
                "locate(target={}, roll={}, flush={}, loop={}, force={})",
                l.target, l.with_roll, l.with_flush, l.with_loop, l.force
            ),
            ApiCall::ScheduleButler => write!(f, "schedule_butler_for_transport_work()"),
            ApiCall::ButlerCompleted => write!(f, "butler_completed_transport_work()"),
            ApiCall::ShouldRollAfterLocate => write!(f, "should_roll_after_locate()"),
        }
    }
}
