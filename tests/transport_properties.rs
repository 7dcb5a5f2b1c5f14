// Property-based testing for the transport state machine
// Arbitrary event sequences must keep the machine consistent

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use transport_fsm::{
    ApiCall, Disposition, EventKind, LocateRequest, SimulatedEngine, TransportConfig,
    TransportEvent, TransportState,
};

// Generated stand-in for TransportEvent with a bounded target range
#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Start,
    Stop { abort: bool, clear_state: bool },
    Locate {
        #[proptest(strategy = "0i64..=480_000")]
        target: i64,
        with_roll: bool,
    },
    ButlerRequired,
    ButlerDone,
    DeclickDone,
    LocateDone,
}

impl From<Step> for TransportEvent {
    fn from(step: Step) -> Self {
        match step {
            Step::Start => TransportEvent::Start,
            Step::Stop { abort, clear_state } => TransportEvent::Stop { abort, clear_state },
            Step::Locate { target, with_roll } => TransportEvent::Locate(LocateRequest {
                with_roll,
                ..LocateRequest::new(target)
            }),
            Step::ButlerRequired => TransportEvent::ButlerRequired,
            Step::ButlerDone => TransportEvent::ButlerDone,
            Step::DeclickDone => TransportEvent::DeclickDone,
            Step::LocateDone => TransportEvent::LocateDone,
        }
    }
}

fn config(auto_complete: bool, butler_on_locate: bool) -> TransportConfig {
    let mut config = TransportConfig::default();
    config.machine.history_capacity = 4096;
    config.simulator.auto_complete = auto_complete;
    config.simulator.butler_on_locate = butler_on_locate;
    config
}

proptest! {
    #[test]
    fn prop_every_event_is_accounted_for(
        steps in prop::collection::vec(any::<Step>(), 0..64),
        auto_complete in any::<bool>(),
        butler_on_locate in any::<bool>(),
    ) {
        let (_engine, machine) = SimulatedEngine::with_machine(&config(auto_complete, butler_on_locate));

        for step in steps {
            machine.submit(step.into());
            prop_assert!(machine.is_idle());
            prop_assert!(TransportState::ALL.contains(&machine.state()));
        }

        let stats = machine.stats();
        let snapshot = machine.snapshot();
        prop_assert_eq!(stats.processed(), stats.submitted + stats.replayed);
        prop_assert_eq!(stats.deferred, stats.replayed + snapshot.deferred as u64);
        prop_assert_eq!(machine.history().len() as u64, stats.processed());

        // held events only exist while the butler is working
        if snapshot.deferred > 0 {
            prop_assert_eq!(snapshot.state, TransportState::ButlerWait);
        }
    }

    #[test]
    fn prop_journal_is_a_consistent_chain(
        steps in prop::collection::vec(any::<Step>(), 1..64),
    ) {
        let (_engine, machine) = SimulatedEngine::with_machine(&config(true, false));
        for step in steps {
            machine.submit(step.into());
        }

        let history = machine.history();
        prop_assert_eq!(history[0].from, TransportState::Stopped);
        for pair in history.windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
            prop_assert_eq!(pair[0].sequence + 1, pair[1].sequence);
        }
        for record in &history {
            if record.disposition != Disposition::Applied {
                prop_assert_eq!(record.from, record.to);
            }
            if record.disposition == Disposition::Deferred {
                prop_assert!(matches!(record.event.kind(), EventKind::Start | EventKind::Stop));
            }
        }
    }

    #[test]
    fn prop_roll_query_happens_once_per_locate_done(
        steps in prop::collection::vec(any::<Step>(), 0..64),
    ) {
        let (engine, machine) = SimulatedEngine::with_machine(&config(false, false));
        for step in steps {
            machine.submit(step.into());
        }

        let applied_locate_done = machine
            .history()
            .iter()
            .filter(|r| r.event == TransportEvent::LocateDone && r.disposition == Disposition::Applied)
            .count();
        prop_assert_eq!(engine.count(ApiCall::ShouldRollAfterLocate), applied_locate_done);
    }

    #[test]
    fn prop_start_while_rolling_never_calls_engine(
        steps in prop::collection::vec(any::<Step>(), 0..32),
    ) {
        let (engine, machine) = SimulatedEngine::with_machine(&config(false, false));
        for step in steps {
            machine.submit(step.into());
        }
        if machine.state() == TransportState::Rolling {
            let before = engine.calls().len();
            machine.submit(TransportEvent::Start);
            prop_assert_eq!(engine.calls().len(), before);
            prop_assert_eq!(machine.state(), TransportState::Rolling);
        }
    }
}
