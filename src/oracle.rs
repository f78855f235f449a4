//! Lease oracle capability.
//!
//! The classifier confirms an expiry by asking the store how much time is
//! left on the lease a deleted key was attached to. A lease the store no
//! longer knows about answers with [`EXPIRED_TTL`].

use crate::core::error::ExpiryResult;
use crate::event::LeaseId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remaining TTL reported for a lease that no longer exists.
pub const EXPIRED_TTL: i64 = -1;

/// Outcome of a time-to-live query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlQueryResult {
    /// Lease that was queried.
    pub lease_id: LeaseId,
    /// Remaining TTL in seconds, or [`EXPIRED_TTL`].
    pub remaining_seconds: i64,
    /// TTL the lease was granted with, in seconds (0 if unknown).
    pub granted_seconds: i64,
}

impl TtlQueryResult {
    /// Result for a live lease.
    pub fn alive(lease_id: LeaseId, remaining_seconds: i64, granted_seconds: i64) -> Self {
        Self {
            lease_id,
            remaining_seconds,
            granted_seconds,
        }
    }

    /// Result for a lease the store no longer knows about.
    pub fn expired(lease_id: LeaseId) -> Self {
        Self {
            lease_id,
            remaining_seconds: EXPIRED_TTL,
            granted_seconds: 0,
        }
    }

    /// Check if the store reported the lease as gone.
    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == EXPIRED_TTL
    }
}

/// Answers "how much time remains on this lease".
#[async_trait]
pub trait LeaseOracle: Send + Sync {
    /// Query the remaining TTL of a lease.
    async fn time_to_live(&self, lease_id: LeaseId) -> ExpiryResult<TtlQueryResult>;
}

#[async_trait]
impl<T: LeaseOracle + ?Sized> LeaseOracle for std::sync::Arc<T> {
    async fn time_to_live(&self, lease_id: LeaseId) -> ExpiryResult<TtlQueryResult> {
        (**self).time_to_live(lease_id).await
    }
}
