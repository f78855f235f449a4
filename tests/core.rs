//! Tests for configuration, errors and time utilities.

mod common;

use common::{assert_ok, create_config_file, create_minimal_config, load_config};
use leasewatch::core::config::{Config, ConfigOverrides};
use leasewatch::core::time::{ms_to_ceil_seconds, MonotonicClock, Tick};
use leasewatch::{ClassifierConfig, ExpiryError, TerminationReason};
use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn minimal_config_loads_with_defaults() {
    let file = create_minimal_config();
    let config = load_config(&file);

    assert_eq!(config.watch.prefix, "/my-data/");
    assert_eq!(config.watch.output_capacity, 1);
    assert_eq!(config.watch.oracle_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(config.etcd.connect_timeout_ms, 3000);
    assert!(config.telemetry.with_target);
}

#[test]
fn full_config_round_trips_every_section() {
    let file = create_config_file(
        r#"
[watch]
prefix = "/leases/"
output_capacity = 8
oracle_timeout_ms = 250

[etcd]
endpoints = ["http://10.0.0.1:2379", "https://10.0.0.2:2379"]
connect_timeout_ms = 1000
request_timeout_ms = 0

[telemetry]
log_level = "debug"
with_target = false
"#,
    );
    let config = load_config(&file);

    assert_eq!(config.watch.prefix, "/leases/");
    assert_eq!(config.etcd.endpoints.len(), 2);
    assert_eq!(config.etcd.request_timeout_ms, 0);
    assert_eq!(config.telemetry.log_level, "debug");

    let classifier = ClassifierConfig::from(&config.watch);
    assert_eq!(classifier.output_capacity, 8);
    assert_eq!(classifier.oracle_timeout, Some(Duration::from_millis(250)));
}

#[test]
fn invalid_values_are_rejected() {
    for content in [
        "[watch]\nprefix = \"\"\n",
        "[watch]\noutput_capacity = 0\n",
        "[etcd]\nendpoints = []\n",
        "[etcd]\nendpoints = [\"127.0.0.1:2379\"]\n",
        "[etcd]\nconnect_timeout_ms = 0\n",
        "[telemetry]\nlog_level = \"loud\"\n",
    ] {
        assert!(Config::from_toml(content).is_err(), "accepted: {}", content);
    }
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = Config::from_file(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.toml"));
}

#[test]
fn overrides_replace_fields() {
    let mut config = assert_ok(Config::from_toml(""));
    config.apply_overrides(&ConfigOverrides {
        log_level: Some("warn".to_string()),
        prefix: Some("/jobs/".to_string()),
        endpoints: None,
    });

    assert_eq!(config.telemetry.log_level, "warn");
    assert_eq!(config.watch.prefix, "/jobs/");
    assert_eq!(config.etcd.endpoints, vec!["http://127.0.0.1:2379"]);
    assert_ok(config.validate());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn oracle_errors_carry_lease_and_timeout() {
    let timeout = ExpiryError::OracleTimeout {
        lease_id: 7,
        timeout_ms: 100,
    };
    assert_eq!(
        timeout.to_string(),
        "lease oracle timed out after 100ms for lease 7"
    );
    assert_eq!(
        TerminationReason::Compacted { revision: 42 }.to_string(),
        "Compacted(revision=42)"
    );
}

// ============================================================================
// Time
// ============================================================================

#[test]
fn partial_seconds_round_up() {
    assert_eq!(ms_to_ceil_seconds(0), 0);
    assert_eq!(ms_to_ceil_seconds(1), 1);
    assert_eq!(ms_to_ceil_seconds(1000), 1);
    assert_eq!(ms_to_ceil_seconds(1001), 2);
}

#[test]
fn tick_arithmetic_saturates() {
    let tick = Tick::new(u64::MAX - 1).add_ms(10);
    assert_eq!(tick, Tick::new(u64::MAX));
    assert_eq!(Tick::new(500).ms_until(Tick::new(100)), 0);
}

#[tokio::test(start_paused = true)]
async fn clock_follows_tokio_time() {
    let clock = MonotonicClock::start();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(clock.now(), Tick::new(1500));
}
