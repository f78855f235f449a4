//! Lease bookkeeping for the in-memory store.
//!
//! A lease owns a deadline and the set of keys attached to it. When the
//! deadline passes the store revokes the lease, which deletes its keys.

use crate::core::time::{ms_to_ceil_seconds, Tick};
use crate::event::LeaseId;
use std::collections::{HashMap, HashSet};

/// A lease record.
#[derive(Debug, Clone)]
pub struct LeaseRecord {
    /// Lease identifier.
    pub lease_id: LeaseId,

    /// TTL in milliseconds.
    pub ttl_ms: u64,

    /// Tick when the lease was granted.
    pub granted_at: Tick,

    /// Tick when the lease expires unless renewed.
    pub deadline: Tick,

    /// Keys attached to this lease.
    pub attached_keys: HashSet<Vec<u8>>,
}

impl LeaseRecord {
    /// Create a new lease.
    pub fn new(lease_id: LeaseId, ttl_ms: u64, granted_at: Tick) -> Self {
        Self {
            lease_id,
            ttl_ms,
            granted_at,
            deadline: granted_at.add_ms(ttl_ms),
            attached_keys: HashSet::new(),
        }
    }

    /// Check if the lease has expired at the given tick.
    pub fn is_expired_at(&self, tick: Tick) -> bool {
        tick.is_at_or_after(self.deadline)
    }

    /// Remaining TTL in whole seconds at the given tick.
    pub fn remaining_seconds_at(&self, tick: Tick) -> i64 {
        ms_to_ceil_seconds(tick.ms_until(self.deadline))
    }

    /// Granted TTL in whole seconds.
    pub fn granted_seconds(&self) -> i64 {
        ms_to_ceil_seconds(self.ttl_ms)
    }

    /// Renew the lease from the given tick.
    pub fn keepalive(&mut self, now: Tick) {
        self.deadline = now.add_ms(self.ttl_ms);
    }
}

/// Lease table.
#[derive(Debug)]
pub struct LeaseManager {
    leases: HashMap<LeaseId, LeaseRecord>,
    next_lease_id: i64,
}

impl LeaseManager {
    /// Create an empty lease table.
    pub fn new() -> Self {
        Self {
            leases: HashMap::new(),
            next_lease_id: 1,
        }
    }

    /// Number of live leases.
    pub fn lease_count(&self) -> usize {
        self.leases.len()
    }

    /// Get a lease by ID.
    pub fn get(&self, lease_id: LeaseId) -> Option<&LeaseRecord> {
        self.leases.get(&lease_id)
    }

    /// Grant a new lease with an auto-assigned ID.
    pub fn grant(&mut self, ttl_ms: u64, now: Tick) -> LeaseId {
        let id = LeaseId(self.next_lease_id);
        self.next_lease_id += 1;
        self.leases.insert(id, LeaseRecord::new(id, ttl_ms, now));
        id
    }

    /// Remove a lease, returning it if it existed.
    pub fn revoke(&mut self, lease_id: LeaseId) -> Option<LeaseRecord> {
        self.leases.remove(&lease_id)
    }

    /// Renew a lease. Returns false if it does not exist.
    pub fn keepalive(&mut self, lease_id: LeaseId, now: Tick) -> bool {
        match self.leases.get_mut(&lease_id) {
            Some(lease) => {
                lease.keepalive(now);
                true
            }
            None => false,
        }
    }

    /// Attach a key to a lease. Returns false if the lease does not exist.
    pub fn attach_key(&mut self, lease_id: LeaseId, key: Vec<u8>) -> bool {
        match self.leases.get_mut(&lease_id) {
            Some(lease) => {
                lease.attached_keys.insert(key);
                true
            }
            None => false,
        }
    }

    /// Detach a key from a lease.
    pub fn detach_key(&mut self, lease_id: LeaseId, key: &[u8]) {
        if let Some(lease) = self.leases.get_mut(&lease_id) {
            lease.attached_keys.remove(key);
        }
    }

    /// IDs of leases whose deadline has passed at `now`, oldest deadline first.
    pub fn collect_expired(&self, now: Tick) -> Vec<LeaseId> {
        let mut expired: Vec<&LeaseRecord> = self
            .leases
            .values()
            .filter(|lease| lease.is_expired_at(now))
            .collect();
        expired.sort_by_key(|lease| (lease.deadline, lease.lease_id));
        expired.into_iter().map(|lease| lease.lease_id).collect()
    }
}

impl Default for LeaseManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_assigns_increasing_ids() {
        let mut leases = LeaseManager::new();
        let a = leases.grant(1_000, Tick::zero());
        let b = leases.grant(1_000, Tick::zero());
        assert!(b > a);
        assert!(!a.is_none());
        assert_eq!(leases.lease_count(), 2);
    }

    #[test]
    fn expiry_collection_orders_by_deadline() {
        let mut leases = LeaseManager::new();
        let long = leases.grant(5_000, Tick::zero());
        let short = leases.grant(1_000, Tick::zero());
        assert!(leases.collect_expired(Tick::new(999)).is_empty());
        assert_eq!(leases.collect_expired(Tick::new(1_000)), vec![short]);
        assert_eq!(leases.collect_expired(Tick::new(6_000)), vec![short, long]);
    }

    #[test]
    fn keepalive_pushes_deadline() {
        let mut leases = LeaseManager::new();
        let id = leases.grant(1_000, Tick::zero());
        assert!(leases.keepalive(id, Tick::new(900)));
        assert!(leases.collect_expired(Tick::new(1_500)).is_empty());
        assert_eq!(leases.get(id).map(|l| l.remaining_seconds_at(Tick::new(1_500))), Some(1));
        assert!(!leases.keepalive(LeaseId(99), Tick::new(900)));
    }
}
