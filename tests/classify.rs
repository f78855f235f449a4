//! Tests for the per-notification expiry decision.

mod common;

use common::{leased_delete, OracleAnswer, ScriptedOracle};
use leasewatch::classify::{classify, is_expiry, Classification};
use leasewatch::{ChangeNotification, ExpiryClassifier, ExpiryError, LeaseId};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Short-circuit paths
// ============================================================================

#[tokio::test]
async fn absent_prev_value_is_not_expiry_and_skips_query() {
    let oracle = ScriptedOracle::new();
    let notification = ChangeNotification::delete_without_prev("/my-data/a");

    assert!(!is_expiry(&oracle, &notification).await.unwrap());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn absent_lease_is_not_expiry_and_skips_query() {
    let oracle = ScriptedOracle::new();
    let notification = ChangeNotification::delete("/my-data/a", "v", LeaseId::NONE);

    assert!(!is_expiry(&oracle, &notification).await.unwrap());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn put_is_not_delete() {
    let oracle = ScriptedOracle::new();
    let notification = ChangeNotification::put("/my-data/a", Some(b"old".to_vec()), LeaseId(4));

    let decided = classify(&oracle, &notification, None).await.unwrap();
    assert_eq!(decided, Classification::NotDelete);
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn empty_prev_value_still_counts_as_present() {
    let oracle = ScriptedOracle::new();
    let notification = leased_delete("/my-data/a", "", 9);

    assert!(is_expiry(&oracle, &notification).await.unwrap());
    assert_eq!(oracle.queried(), vec![LeaseId(9)]);
}

// ============================================================================
// Oracle answers
// ============================================================================

#[tokio::test]
async fn expiry_iff_ttl_sentinel() {
    let oracle = ScriptedOracle::new().alive(2, 0).alive(3, 30);

    assert!(is_expiry(&oracle, &leased_delete("/k1", "v", 1)).await.unwrap());
    assert!(!is_expiry(&oracle, &leased_delete("/k2", "v", 2)).await.unwrap());
    assert!(!is_expiry(&oracle, &leased_delete("/k3", "v", 3)).await.unwrap());
    assert_eq!(oracle.calls(), 3);
}

#[tokio::test]
async fn live_lease_reports_remaining_ttl() {
    let oracle = ScriptedOracle::new().alive(2, 17);
    let decided = classify(&oracle, &leased_delete("/k", "v", 2), None)
        .await
        .unwrap();
    assert_eq!(
        decided,
        Classification::LeaseAlive {
            remaining_seconds: 17
        }
    );
}

#[tokio::test]
async fn ttl_below_sentinel_is_not_forwarded() {
    let oracle = ScriptedOracle::new().alive(2, -5);
    let decided = classify(&oracle, &leased_delete("/k", "v", 2), None)
        .await
        .unwrap();
    assert_eq!(decided, Classification::UnexpectedTtl { ttl: -5 });
    assert!(!decided.is_expiry());
}

#[tokio::test]
async fn oracle_failure_is_scoped_to_the_item() {
    let oracle = ScriptedOracle::new().failing(5);
    let err = is_expiry(&oracle, &leased_delete("/k", "v", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, ExpiryError::OracleUnavailable { lease_id: 5, .. }));
}

#[tokio::test(start_paused = true)]
async fn slow_oracle_times_out() {
    let oracle = ScriptedOracle::new().answer(6, OracleAnswer::Slow(Duration::from_secs(10), 3));
    let err = classify(
        &oracle,
        &leased_delete("/k", "v", 6),
        Some(Duration::from_millis(500)),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        ExpiryError::OracleTimeout {
            lease_id: 6,
            timeout_ms: 500
        }
    ));
}

// ============================================================================
// Classifier handle
// ============================================================================

#[tokio::test]
async fn classifier_is_stateless_across_calls() {
    let oracle = Arc::new(ScriptedOracle::new());
    let classifier = ExpiryClassifier::new(Arc::clone(&oracle));
    let notification = leased_delete("/my-data/a", "v", 7);

    assert!(classifier.is_expiry(&notification).await.unwrap());
    assert!(classifier.is_expiry(&notification).await.unwrap());
    assert_eq!(oracle.queried(), vec![LeaseId(7), LeaseId(7)]);
}

#[tokio::test]
async fn classifier_accepts_trait_object_oracle() {
    let oracle: Arc<dyn leasewatch::LeaseOracle> = Arc::new(ScriptedOracle::new().alive(1, 4));
    let classifier = ExpiryClassifier::new(oracle);
    assert!(!classifier
        .is_expiry(&leased_delete("/my-data/a", "v", 1))
        .await
        .unwrap());
}
