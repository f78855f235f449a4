//! Change notifications and confirmed expiry events.
//!
//! A [`ChangeNotification`] is one mutation observed on the watched key
//! range. An [`ExpiryEvent`] is a notification the classifier has confirmed
//! was caused by lease expiry; it can only be built by the classifier.

use serde::{Deserialize, Serialize};

/// Opaque lease handle held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub i64);

impl LeaseId {
    /// No lease attached to the key.
    pub const NONE: LeaseId = LeaseId(0);

    /// Raw lease identifier.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Check if this is the "no lease" sentinel.
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl Default for LeaseId {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<i64> for LeaseId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for LeaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // etcdctl prints lease ids in hex
        write!(f, "{:x}", self.0)
    }
}

/// Kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Key was created or updated.
    Put,
    /// Key was deleted.
    Delete,
}

/// One observed mutation on a watched key range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// The mutated key.
    pub key: Vec<u8>,

    /// Kind of mutation.
    pub kind: EventKind,

    /// Value held before the mutation, when the store attached it.
    pub prev_value: Option<Vec<u8>>,

    /// Lease the key was attached to before the mutation.
    pub prev_lease: LeaseId,

    /// Store revision of the mutation (0 if unknown).
    pub revision: i64,
}

impl ChangeNotification {
    /// Create a Delete notification carrying the previous key-value.
    pub fn delete(key: impl Into<Vec<u8>>, prev_value: impl Into<Vec<u8>>, prev_lease: LeaseId) -> Self {
        Self {
            key: key.into(),
            kind: EventKind::Delete,
            prev_value: Some(prev_value.into()),
            prev_lease,
            revision: 0,
        }
    }

    /// Create a Delete notification without a previous key-value.
    pub fn delete_without_prev(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            kind: EventKind::Delete,
            prev_value: None,
            prev_lease: LeaseId::NONE,
            revision: 0,
        }
    }

    /// Create a Put notification.
    pub fn put(key: impl Into<Vec<u8>>, prev_value: Option<Vec<u8>>, prev_lease: LeaseId) -> Self {
        Self {
            key: key.into(),
            kind: EventKind::Put,
            prev_value,
            prev_lease,
            revision: 0,
        }
    }

    /// Set the store revision.
    pub fn with_revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    /// Check if this notification is a deletion.
    pub fn is_delete(&self) -> bool {
        self.kind == EventKind::Delete
    }

    /// Key rendered lossily as UTF-8, for logging.
    pub fn key_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

/// A deletion confirmed to have been caused by lease expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryEvent {
    notification: ChangeNotification,
}

impl ExpiryEvent {
    /// Wrap a notification the classifier has confirmed as an expiry.
    pub(crate) fn confirmed(notification: ChangeNotification) -> Self {
        debug_assert!(notification.is_delete());
        debug_assert!(notification.prev_value.is_some());
        debug_assert!(!notification.prev_lease.is_none());
        Self { notification }
    }

    /// The expired key.
    pub fn key(&self) -> &[u8] {
        &self.notification.key
    }

    /// The value the key held when its lease expired.
    pub fn value(&self) -> &[u8] {
        self.notification.prev_value.as_deref().unwrap_or_default()
    }

    /// The lease that expired.
    pub fn lease_id(&self) -> LeaseId {
        self.notification.prev_lease
    }

    /// Store revision of the deletion.
    pub fn revision(&self) -> i64 {
        self.notification.revision
    }

    /// The underlying notification.
    pub fn notification(&self) -> &ChangeNotification {
        &self.notification
    }

    /// Unwrap into the underlying notification.
    pub fn into_notification(self) -> ChangeNotification {
        self.notification
    }
}
