//! Expiry decision procedure.
//!
//! A deletion is attributed to lease expiry when the key carried a previous
//! value, was attached to a lease, and the store no longer resolves that
//! lease. The lease query runs after the delete was observed, so a lease
//! revoked explicitly in the meantime is indistinguishable from one that
//! lapsed; "no longer resolves" is accepted as sufficient evidence.

use crate::core::error::{ExpiryError, ExpiryResult};
use crate::event::ChangeNotification;
use crate::oracle::{LeaseOracle, TtlQueryResult, EXPIRED_TTL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of classifying one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Not a deletion.
    NotDelete,
    /// The store did not attach the previous key-value.
    NoPrevValue,
    /// The key was not attached to a lease.
    NoLease,
    /// The lease is still live, so the key was deleted explicitly.
    LeaseAlive { remaining_seconds: i64 },
    /// The store answered with a TTL outside its documented range.
    UnexpectedTtl { ttl: i64 },
    /// The lease no longer exists: the key expired.
    Expired,
}

impl Classification {
    /// Check if this outcome forwards the notification.
    pub fn is_expiry(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotDelete => "not_delete",
            Self::NoPrevValue => "no_prev_value",
            Self::NoLease => "no_lease",
            Self::LeaseAlive { .. } => "lease_alive",
            Self::UnexpectedTtl { .. } => "unexpected_ttl",
            Self::Expired => "expired",
        }
    }
}

/// Decide without consulting the store, if possible.
///
/// Returns `None` when the notification needs a lease query.
pub fn precheck(notification: &ChangeNotification) -> Option<Classification> {
    if !notification.is_delete() {
        return Some(Classification::NotDelete);
    }
    if notification.prev_value.is_none() {
        return Some(Classification::NoPrevValue);
    }
    if notification.prev_lease.is_none() {
        return Some(Classification::NoLease);
    }
    None
}

/// Interpret a time-to-live answer.
pub fn interpret_ttl(result: &TtlQueryResult) -> Classification {
    match result.remaining_seconds {
        EXPIRED_TTL => Classification::Expired,
        ttl if ttl >= 0 => Classification::LeaseAlive {
            remaining_seconds: ttl,
        },
        ttl => Classification::UnexpectedTtl { ttl },
    }
}

/// Classify a notification, querying the oracle when needed.
///
/// A failed or timed-out query is returned as an error scoped to this
/// notification.
pub async fn classify<O>(
    oracle: &O,
    notification: &ChangeNotification,
    timeout: Option<Duration>,
) -> ExpiryResult<Classification>
where
    O: LeaseOracle + ?Sized,
{
    if let Some(decided) = precheck(notification) {
        return Ok(decided);
    }

    let lease_id = notification.prev_lease;
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, oracle.time_to_live(lease_id))
            .await
            .map_err(|_| ExpiryError::OracleTimeout {
                lease_id: lease_id.get(),
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })??,
        None => oracle.time_to_live(lease_id).await?,
    };

    Ok(interpret_ttl(&result))
}

/// Decide whether a deletion was caused by lease expiry.
pub async fn is_expiry<O>(oracle: &O, notification: &ChangeNotification) -> ExpiryResult<bool>
where
    O: LeaseOracle + ?Sized,
{
    classify(oracle, notification, None)
        .await
        .map(|c| c.is_expiry())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LeaseId;

    #[test]
    fn precheck_short_circuits() {
        let put = ChangeNotification::put("k", None, LeaseId(3));
        assert_eq!(precheck(&put), Some(Classification::NotDelete));

        let bare = ChangeNotification::delete_without_prev("k");
        assert_eq!(precheck(&bare), Some(Classification::NoPrevValue));

        let unleased = ChangeNotification::delete("k", "v", LeaseId::NONE);
        assert_eq!(precheck(&unleased), Some(Classification::NoLease));

        let leased = ChangeNotification::delete("k", "v", LeaseId(3));
        assert_eq!(precheck(&leased), None);
    }

    #[test]
    fn ttl_interpretation() {
        let lease = LeaseId(3);
        assert_eq!(
            interpret_ttl(&TtlQueryResult::expired(lease)),
            Classification::Expired
        );
        assert_eq!(
            interpret_ttl(&TtlQueryResult::alive(lease, 0, 10)),
            Classification::LeaseAlive {
                remaining_seconds: 0
            }
        );
        assert_eq!(
            interpret_ttl(&TtlQueryResult::alive(lease, -7, 10)),
            Classification::UnexpectedTtl { ttl: -7 }
        );
    }

    #[test]
    fn only_expired_forwards() {
        assert!(Classification::Expired.is_expiry());
        assert!(!Classification::NoLease.is_expiry());
        assert!(!Classification::LeaseAlive {
            remaining_seconds: 5
        }
        .is_expiry());
    }
}
