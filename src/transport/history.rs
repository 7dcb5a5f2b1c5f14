// Bounded journal of processed events, oldest evicted first

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::{Disposition, TransportEvent, TransportState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Position in processing order, starting at 1
    pub sequence: u64,
    pub event: TransportEvent,
    pub from: TransportState,
    pub to: TransportState,
    pub disposition: Disposition,
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn changed_state(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug)]
pub struct TransitionJournal {
    capacity: usize,
    records: VecDeque<TransitionRecord>,
}

impl TransitionJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn push(&mut self, record: TransitionRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> Vec<TransitionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence: u64) -> TransitionRecord {
        TransitionRecord {
            sequence,
            event: TransportEvent::Start,
            from: TransportState::Stopped,
            to: TransportState::Rolling,
            disposition: Disposition::Applied,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_journal_evicts_oldest() {
        let mut journal = TransitionJournal::new(2);
        journal.push(record(1));
        journal.push(record(2));
        journal.push(record(3));

        let sequences: Vec<u64> = journal.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
    }

    #[test]
    fn test_zero_capacity_disables_journal() {
        let mut journal = TransitionJournal::new(0);
        journal.push(record(1));
        assert!(journal.is_empty());
    }
}
