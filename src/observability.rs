use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::transport::Disposition;

/// Dispatcher counters
#[derive(Debug, Default)]
pub struct TransportMetrics {
    pub submitted: AtomicU64,
    pub queued: AtomicU64,
    pub applied: AtomicU64,
    pub deferred: AtomicU64,
    pub replayed: AtomicU64,
    pub ignored: AtomicU64,
}

impl TransportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A submission arrived while another event was being applied
    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replayed(&self, count: usize) {
        self.replayed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_disposition(&self, disposition: Disposition) {
        let counter = match disposition {
            Disposition::Applied => &self.applied,
            Disposition::Deferred => &self.deferred,
            Disposition::Ignored => &self.ignored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TransportStats {
        TransportStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            submitted = stats.submitted,
            queued = stats.queued,
            applied = stats.applied,
            deferred = stats.deferred,
            replayed = stats.replayed,
            ignored = stats.ignored,
            "Transport metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    pub submitted: u64,
    pub queued: u64,
    pub applied: u64,
    pub deferred: u64,
    pub replayed: u64,
    pub ignored: u64,
}

impl TransportStats {
    /// Events run through the table, fresh submissions and replays alike
    pub fn processed(&self) -> u64 {
        self.applied + self.deferred + self.ignored
    }
}
