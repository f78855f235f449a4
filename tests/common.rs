//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use async_trait::async_trait;
use leasewatch::core::config::Config;
use leasewatch::{
    ChangeNotification, ExpiryError, ExpiryEvent, ExpiryResult, ExpiryStream, LeaseId,
    LeaseOracle, TtlQueryResult,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;

/// Key used by the end-to-end expiry scenario.
pub const TEST_KEY: &str = "/my-data/my-test-key";

/// Value used by the end-to-end expiry scenario.
pub const TEST_VALUE: &str = "my value that expired";

/// Prefix watched by the end-to-end scenarios.
pub const TEST_PREFIX: &str = "/my-data/";

/// Scripted answer for one lease.
#[derive(Debug, Clone)]
pub enum OracleAnswer {
    /// Remaining TTL in seconds.
    Ttl(i64),
    /// The query fails.
    Fail,
    /// The query answers after a delay.
    Slow(Duration, i64),
}

/// Lease oracle with canned answers that records every query.
///
/// Leases without a scripted answer are reported as expired.
#[derive(Default)]
pub struct ScriptedOracle {
    answers: Mutex<HashMap<LeaseId, OracleAnswer>>,
    queries: Mutex<Vec<LeaseId>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, lease: i64, answer: OracleAnswer) -> Self {
        self.answers.lock().insert(LeaseId(lease), answer);
        self
    }

    pub fn alive(self, lease: i64, ttl: i64) -> Self {
        self.answer(lease, OracleAnswer::Ttl(ttl))
    }

    pub fn failing(self, lease: i64) -> Self {
        self.answer(lease, OracleAnswer::Fail)
    }

    /// Number of queries issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Leases queried, in order.
    pub fn queried(&self) -> Vec<LeaseId> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl LeaseOracle for ScriptedOracle {
    async fn time_to_live(&self, lease_id: LeaseId) -> ExpiryResult<TtlQueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(lease_id);
        let answer = self.answers.lock().get(&lease_id).cloned();
        match answer {
            None => Ok(TtlQueryResult::expired(lease_id)),
            Some(OracleAnswer::Ttl(ttl)) => Ok(TtlQueryResult::alive(lease_id, ttl, ttl.max(0))),
            Some(OracleAnswer::Fail) => Err(ExpiryError::oracle_unavailable(
                lease_id.get(),
                "connection refused",
            )),
            Some(OracleAnswer::Slow(delay, ttl)) => {
                tokio::time::sleep(delay).await;
                Ok(TtlQueryResult::alive(lease_id, ttl, ttl.max(0)))
            }
        }
    }
}

/// Delete notification for a leased key, as a prev-kv watch reports it.
pub fn leased_delete(key: &str, value: &str, lease: i64) -> ChangeNotification {
    ChangeNotification::delete(key, value, LeaseId(lease))
}

/// Drain an expiry stream to the end.
pub async fn collect(mut stream: ExpiryStream) -> Vec<ExpiryEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.recv().await {
        events.push(event);
    }
    events
}

/// Keys of the given events, as strings.
pub fn keys(events: &[ExpiryEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| String::from_utf8_lossy(e.key()).into_owned())
        .collect()
}

/// Write a configuration file.
pub fn create_config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

/// Create a minimal valid configuration file.
pub fn create_minimal_config() -> NamedTempFile {
    create_config_file(
        r#"
[watch]
prefix = "/my-data/"
"#,
    )
}

/// Load configuration from a temp file.
pub fn load_config(file: &NamedTempFile) -> Config {
    Config::from_file(file.path()).expect("Failed to load config")
}

/// Assert that a result is Ok and return the value.
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}
