//! In-memory lease-aware key-value store.
//!
//! Keys may be attached to leases. A lease whose deadline passes is revoked
//! by [`MemoryStore::expire_due`] (or the background loop started with
//! [`MemoryStore::spawn_expiry_loop`]), deleting every attached key. Each
//! mutation is delivered to matching watches in revision order.
//!
//! Each watch buffers a bounded number of undelivered notifications. A
//! watch whose buffer is full when a mutation arrives is terminated rather
//! than allowed to grow, ending its stream.

use super::lease::LeaseManager;
use crate::core::error::{ExpiryError, ExpiryResult, TerminationReason};
use crate::core::time::{MonotonicClock, Tick};
use crate::event::{ChangeNotification, EventKind, LeaseId};
use crate::oracle::{LeaseOracle, TtlQueryResult};
use crate::source::{key_in_range, NotificationStream, WatchOptions, WatchSource};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;

/// A stored key-value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRecord {
    /// The key.
    pub key: Vec<u8>,
    /// The value.
    pub value: Vec<u8>,
    /// Revision when this key was created.
    pub create_revision: i64,
    /// Revision of the last modification.
    pub mod_revision: i64,
    /// Version counter, increments on each put.
    pub version: i64,
    /// Attached lease, or [`LeaseId::NONE`].
    pub lease: LeaseId,
}

/// Default per-watch buffer of undelivered notifications.
pub const DEFAULT_WATCH_CAPACITY: usize = 1024;

struct Watcher {
    id: i64,
    key: Vec<u8>,
    range_end: Vec<u8>,
    options: WatchOptions,
    tx: mpsc::Sender<ChangeNotification>,
}

impl Watcher {
    fn matches(&self, key: &[u8], kind: EventKind) -> bool {
        key_in_range(key, &self.key, &self.range_end) && self.options.admits(kind)
    }
}

#[derive(Default)]
struct StoreState {
    revision: i64,
    index: BTreeMap<Vec<u8>, KvRecord>,
    leases: LeaseManager,
    watchers: Vec<Watcher>,
    next_watch_id: i64,
}

impl StoreState {
    fn next_revision(&mut self) -> i64 {
        self.revision += 1;
        self.revision
    }

    fn notify(&mut self, kind: EventKind, key: &[u8], prev: Option<&KvRecord>, revision: i64) {
        self.watchers.retain(|watcher| {
            if !watcher.matches(key, kind) {
                return !watcher.tx.is_closed();
            }
            let notification = match prev.filter(|_| watcher.options.prev_kv) {
                Some(prev) => ChangeNotification {
                    key: key.to_vec(),
                    kind,
                    prev_value: Some(prev.value.clone()),
                    prev_lease: prev.lease,
                    revision,
                },
                None => ChangeNotification {
                    key: key.to_vec(),
                    kind,
                    prev_value: None,
                    prev_lease: LeaseId::NONE,
                    revision,
                },
            };
            match watcher.tx.try_send(notification) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        watch_id = watcher.id,
                        revision,
                        "watch buffer full; terminating watch"
                    );
                    false
                }
                // The subscriber went away.
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }

    fn delete_key(&mut self, key: &[u8]) -> Option<KvRecord> {
        let prev = self.index.remove(key)?;
        if !prev.lease.is_none() {
            self.leases.detach_key(prev.lease, key);
        }
        let revision = self.next_revision();
        self.notify(EventKind::Delete, key, Some(&prev), revision);
        Some(prev)
    }

    /// Remove the lease first so a query racing the deletions already sees
    /// it gone.
    fn revoke_lease(&mut self, lease_id: LeaseId) -> Option<usize> {
        let lease = self.leases.revoke(lease_id)?;
        let mut keys: Vec<Vec<u8>> = lease.attached_keys.into_iter().collect();
        keys.sort();
        let mut deleted = 0;
        for key in keys {
            if self.delete_key(&key).is_some() {
                deleted += 1;
            }
        }
        Some(deleted)
    }
}

/// In-memory lease-aware key-value store.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    clock: MonotonicClock,
    watch_capacity: usize,
}

impl MemoryStore {
    /// Create an empty store whose clock starts now.
    pub fn new() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }

    /// Create an empty store whose watches buffer at most `capacity`
    /// undelivered notifications (minimum 1).
    pub fn with_watch_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            clock: MonotonicClock::start(),
            watch_capacity: capacity.max(1),
        }
    }

    /// Current store time.
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Current revision.
    pub fn revision(&self) -> i64 {
        self.state.lock().revision
    }

    /// Number of live watches.
    pub fn watch_count(&self) -> usize {
        self.state
            .lock()
            .watchers
            .iter()
            .filter(|w| !w.tx.is_closed())
            .count()
    }

    /// Number of live leases.
    pub fn lease_count(&self) -> usize {
        self.state.lock().leases.lease_count()
    }

    /// Get the current record for a key.
    pub fn get(&self, key: &[u8]) -> Option<KvRecord> {
        self.state.lock().index.get(key).cloned()
    }

    /// Grant a lease with the given TTL in seconds.
    pub fn grant(&self, ttl_seconds: i64) -> ExpiryResult<LeaseId> {
        if ttl_seconds <= 0 {
            return Err(ExpiryError::InvalidRequest {
                message: format!("lease TTL must be positive, got {}", ttl_seconds),
            });
        }
        let ttl_ms = u64::try_from(ttl_seconds)
            .unwrap_or(u64::MAX)
            .saturating_mul(1_000);
        self.grant_ms(ttl_ms)
    }

    /// Grant a lease with a millisecond TTL.
    pub fn grant_ms(&self, ttl_ms: u64) -> ExpiryResult<LeaseId> {
        if ttl_ms == 0 {
            return Err(ExpiryError::InvalidRequest {
                message: "lease TTL must be positive".to_string(),
            });
        }
        let now = self.now();
        let id = self.state.lock().leases.grant(ttl_ms, now);
        tracing::debug!(lease_id = %id, ttl_ms, "lease granted");
        Ok(id)
    }

    /// Renew a lease. Returns the remaining TTL in seconds.
    pub fn keep_alive(&self, lease_id: LeaseId) -> ExpiryResult<i64> {
        let now = self.now();
        let mut state = self.state.lock();
        if !state.leases.keepalive(lease_id, now) {
            return Err(ExpiryError::LeaseNotFound {
                lease_id: lease_id.get(),
            });
        }
        Ok(state
            .leases
            .get(lease_id)
            .map(|lease| lease.remaining_seconds_at(now))
            .unwrap_or_default())
    }

    /// Store a value, optionally attached to a lease. Returns the revision.
    pub fn put(
        &self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        lease: LeaseId,
    ) -> ExpiryResult<i64> {
        let key = key.into();
        let mut state = self.state.lock();

        if !lease.is_none() && state.leases.get(lease).is_none() {
            return Err(ExpiryError::LeaseNotFound {
                lease_id: lease.get(),
            });
        }

        let revision = state.next_revision();
        let prev = state.index.get(&key).cloned();
        if let Some(ref p) = prev {
            if !p.lease.is_none() && p.lease != lease {
                state.leases.detach_key(p.lease, &key);
            }
        }
        if !lease.is_none() {
            state.leases.attach_key(lease, key.clone());
        }

        let record = KvRecord {
            key: key.clone(),
            value: value.into(),
            create_revision: prev.as_ref().map_or(revision, |p| p.create_revision),
            mod_revision: revision,
            version: prev.as_ref().map_or(1, |p| p.version + 1),
            lease,
        };
        state.index.insert(key.clone(), record);
        state.notify(EventKind::Put, &key, prev.as_ref(), revision);
        Ok(revision)
    }

    /// Delete a key explicitly. Returns false if it did not exist.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.state.lock().delete_key(key).is_some()
    }

    /// Revoke a lease, deleting its keys. Returns the number of keys deleted.
    pub fn revoke(&self, lease_id: LeaseId) -> ExpiryResult<usize> {
        let deleted = self
            .state
            .lock()
            .revoke_lease(lease_id)
            .ok_or(ExpiryError::LeaseNotFound {
                lease_id: lease_id.get(),
            })?;
        tracing::debug!(lease_id = %lease_id, deleted, "lease revoked");
        Ok(deleted)
    }

    /// Remaining TTL of a lease, or the expired sentinel if it is gone.
    pub fn time_to_live(&self, lease_id: LeaseId) -> TtlQueryResult {
        let now = self.now();
        let state = self.state.lock();
        match state.leases.get(lease_id) {
            Some(lease) => TtlQueryResult::alive(
                lease_id,
                lease.remaining_seconds_at(now),
                lease.granted_seconds(),
            ),
            None => TtlQueryResult::expired(lease_id),
        }
    }

    /// Revoke every lease whose deadline has passed. Returns how many.
    pub fn expire_due(&self) -> usize {
        let now = self.now();
        let mut state = self.state.lock();
        let expired = state.leases.collect_expired(now);
        for lease_id in &expired {
            let deleted = state.revoke_lease(*lease_id).unwrap_or_default();
            tracing::debug!(lease_id = %lease_id, deleted, now = %now, "lease expired");
        }
        expired.len()
    }

    /// Run [`Self::expire_due`] every `period` until the store is dropped.
    pub fn spawn_expiry_loop(&self, period: Duration) -> JoinHandle<()> {
        let state: Weak<Mutex<StoreState>> = Arc::downgrade(&self.state);
        let clock = self.clock;
        let watch_capacity = self.watch_capacity;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                let store = MemoryStore {
                    state,
                    clock,
                    watch_capacity,
                };
                store.expire_due();
            }
        })
    }

    /// End every open watch, as a store does when history is compacted
    /// past the watch position.
    pub fn terminate_watches(&self, reason: TerminationReason) -> usize {
        let watchers = std::mem::take(&mut self.state.lock().watchers);
        for watcher in &watchers {
            tracing::info!(watch_id = watcher.id, reason = %reason, "watch terminated");
        }
        watchers.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WatchSource for MemoryStore {
    async fn watch(&self, key: &[u8], options: WatchOptions) -> ExpiryResult<NotificationStream> {
        let (tx, rx) = mpsc::channel(self.watch_capacity);
        let id = {
            let mut state = self.state.lock();
            state.next_watch_id += 1;
            let id = state.next_watch_id;
            state.watchers.push(Watcher {
                id,
                key: key.to_vec(),
                range_end: options.range_end(key),
                options,
                tx,
            });
            id
        };
        tracing::debug!(watch_id = id, key = %String::from_utf8_lossy(key), "watch created");
        Ok(ReceiverStream::new(rx).boxed())
    }
}

#[async_trait]
impl LeaseOracle for MemoryStore {
    async fn time_to_live(&self, lease_id: LeaseId) -> ExpiryResult<TtlQueryResult> {
        Ok(MemoryStore::time_to_live(self, lease_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_rejects_unknown_lease() {
        let store = MemoryStore::new();
        let err = store.put("k", "v", LeaseId(42)).unwrap_err();
        assert!(matches!(err, ExpiryError::LeaseNotFound { lease_id: 42 }));
    }

    #[test]
    fn revoke_deletes_attached_keys() {
        let store = MemoryStore::new();
        let lease = store.grant(10).unwrap();
        store.put("a", "1", lease).unwrap();
        store.put("b", "2", lease).unwrap();
        store.put("c", "3", LeaseId::NONE).unwrap();

        assert_eq!(store.revoke(lease).unwrap(), 2);
        assert!(store.get(b"a").is_none());
        assert!(store.get(b"c").is_some());
        assert!(store.time_to_live(lease).is_expired());
    }

    #[test]
    fn reattaching_key_moves_it_between_leases() {
        let store = MemoryStore::new();
        let first = store.grant(10).unwrap();
        let second = store.grant(10).unwrap();
        store.put("k", "v1", first).unwrap();
        store.put("k", "v2", second).unwrap();

        assert_eq!(store.revoke(first).unwrap(), 0);
        assert_eq!(store.get(b"k").map(|r| r.version), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn lease_expires_after_ttl() {
        let store = MemoryStore::new();
        let lease = store.grant(1).unwrap();
        store.put("k", "v", lease).unwrap();

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(store.expire_due(), 0);
        assert_eq!(store.time_to_live(lease).remaining_seconds, 1);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.expire_due(), 1);
        assert!(store.get(b"k").is_none());
    }

    #[tokio::test]
    async fn expiry_watch_sees_deletes_with_prev_kv() {
        let store = MemoryStore::new();
        let mut stream = store
            .watch(b"/my-data/", WatchOptions::expiry_watch())
            .await
            .unwrap();
        let lease = store.grant(10).unwrap();
        store.put("/my-data/a", "v", lease).unwrap();
        store.put("/other", "x", LeaseId::NONE).unwrap();
        assert!(store.delete(b"/other"));
        assert!(store.delete(b"/my-data/a"));

        let n = stream.next().await.unwrap();
        assert_eq!(n.kind, EventKind::Delete);
        assert_eq!(n.key, b"/my-data/a");
        assert_eq!(n.prev_value.as_deref(), Some(&b"v"[..]));
        assert_eq!(n.prev_lease, lease);
        assert_eq!(n.revision, store.revision());
    }

    #[tokio::test]
    async fn stalled_watch_is_terminated_instead_of_growing() {
        let store = MemoryStore::with_watch_capacity(4);
        let mut stream = store
            .watch(b"/my-data/", WatchOptions::expiry_watch())
            .await
            .unwrap();

        for i in 0..100 {
            let lease = store.grant(10).unwrap();
            store.put(format!("/my-data/{}", i), "v", lease).unwrap();
            store.revoke(lease).unwrap();
        }
        assert_eq!(store.watch_count(), 0);

        let mut delivered = 0;
        while stream.next().await.is_some() {
            delivered += 1;
        }
        assert_eq!(delivered, 4);
    }
}
