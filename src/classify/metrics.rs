//! Classifier counters.

use super::decision::Classification;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between a classifier and its worker.
#[derive(Debug, Default)]
pub struct ClassifierMetrics {
    observed: AtomicU64,
    forwarded: AtomicU64,
    skipped_not_delete: AtomicU64,
    skipped_no_prev_value: AtomicU64,
    skipped_no_lease: AtomicU64,
    skipped_lease_alive: AtomicU64,
    skipped_unexpected_ttl: AtomicU64,
    oracle_failures: AtomicU64,
}

impl ClassifierMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_observed(&self) {
        self.observed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_oracle_failure(&self) {
        self.oracle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skip(&self, classification: Classification) {
        let counter = match classification {
            Classification::NotDelete => &self.skipped_not_delete,
            Classification::NoPrevValue => &self.skipped_no_prev_value,
            Classification::NoLease => &self.skipped_no_lease,
            Classification::LeaseAlive { .. } => &self.skipped_lease_alive,
            Classification::UnexpectedTtl { .. } => &self.skipped_unexpected_ttl,
            Classification::Expired => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self) -> ClassifierMetricsSnapshot {
        ClassifierMetricsSnapshot {
            observed: self.observed.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            skipped_not_delete: self.skipped_not_delete.load(Ordering::Relaxed),
            skipped_no_prev_value: self.skipped_no_prev_value.load(Ordering::Relaxed),
            skipped_no_lease: self.skipped_no_lease.load(Ordering::Relaxed),
            skipped_lease_alive: self.skipped_lease_alive.load(Ordering::Relaxed),
            skipped_unexpected_ttl: self.skipped_unexpected_ttl.load(Ordering::Relaxed),
            oracle_failures: self.oracle_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time classifier counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierMetricsSnapshot {
    /// Notifications taken from the source.
    pub observed: u64,
    /// Notifications forwarded as expiry events.
    pub forwarded: u64,
    /// Put notifications dropped.
    pub skipped_not_delete: u64,
    /// Deletions without a previous key-value.
    pub skipped_no_prev_value: u64,
    /// Deletions of keys without a lease.
    pub skipped_no_lease: u64,
    /// Deletions while the lease was still live.
    pub skipped_lease_alive: u64,
    /// Deletions where the store reported an out-of-range TTL.
    pub skipped_unexpected_ttl: u64,
    /// Lease queries that failed or timed out.
    pub oracle_failures: u64,
}

impl ClassifierMetricsSnapshot {
    /// Total notifications dropped without an error.
    pub fn skipped(&self) -> u64 {
        self.skipped_not_delete
            + self.skipped_no_prev_value
            + self.skipped_no_lease
            + self.skipped_lease_alive
            + self.skipped_unexpected_ttl
    }

    /// Render as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_are_counted_by_reason() {
        let metrics = ClassifierMetrics::new();
        metrics.record_observed();
        metrics.record_observed();
        metrics.record_skip(Classification::NoLease);
        metrics.record_skip(Classification::LeaseAlive {
            remaining_seconds: 3,
        });
        metrics.record_skip(Classification::Expired);

        let snap = metrics.snapshot();
        assert_eq!(snap.observed, 2);
        assert_eq!(snap.skipped_no_lease, 1);
        assert_eq!(snap.skipped_lease_alive, 1);
        assert_eq!(snap.skipped(), 2);
        assert!(snap.to_json().contains("\"skipped_no_lease\":1"));
    }
}
