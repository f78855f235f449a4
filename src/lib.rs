//! leasewatch - Lease-expiry notifications on top of a key-value watch.
//!
//! A store that attaches keys to leases deletes those keys when a lease
//! expires, but its watch stream reports the deletion like any other. This
//! crate subscribes to deletions under a key prefix and forwards only the
//! ones whose lease no longer resolves, carrying the value the key held
//! right before it was removed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          WatchSource                            │
//! │      prefix watch, DELETE only, previous key-value attached     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │ ChangeNotification
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       ExpiryClassifier                          │
//! │  prev value? ─► lease attached? ─► LeaseOracle::time_to_live    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │ ExpiryEvent (bounded, in order)
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          ExpiryStream                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::error`] - Error types and gRPC status mapping
//! - [`core::time`] - Monotonic ticks for lease deadlines
//!
//! ## Model and capabilities
//! - [`event`] - Change notifications and expiry events
//! - [`source`] - Watch source capability
//! - [`oracle`] - Lease TTL oracle capability
//!
//! ## Classification
//! - [`classify::decision`] - Per-notification decision
//! - [`classify::pipeline`] - Worker task and output stream
//! - [`classify::metrics`] - Counters
//!
//! ## Adapters
//! - [`adapters::memory`] - In-process lease-aware store
//! - `adapters::etcd` - etcd v3 gRPC client (feature `grpc`)
//!
//! ## Operations
//! - [`ops::telemetry`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use leasewatch::adapters::memory::MemoryStore;
//! use leasewatch::ExpiryClassifier;
//! use std::sync::Arc;
//!
//! # async fn run() -> leasewatch::ExpiryResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let classifier = ExpiryClassifier::new(Arc::clone(&store));
//! let mut expiries = classifier.watch(&*store, b"/my-data/").await?;
//! while let Some(event) = expiries.recv().await {
//!     println!("{} expired", String::from_utf8_lossy(event.key()));
//! }
//! # Ok(())
//! # }
//! ```

// Core infrastructure
pub mod core;

// Data model and capabilities
pub mod event;
pub mod oracle;
pub mod source;

// Expiry classification
pub mod classify;

// Store adapters
pub mod adapters;

// Operations
pub mod ops;

// Re-exports for convenience
pub use self::core::error::{ExpiryError, ExpiryResult, TerminationReason};
pub use self::core::{config, error, time};
pub use classify::{
    CancelHandle, Classification, ClassifierConfig, ClassifierMetricsSnapshot, ExpiryClassifier,
    ExpiryStream, WorkerExit,
};
pub use event::{ChangeNotification, EventKind, ExpiryEvent, LeaseId};
pub use oracle::{LeaseOracle, TtlQueryResult, EXPIRED_TTL};
pub use source::{NotificationStream, WatchFilters, WatchOptions, WatchSource};

/// Connect to the configured etcd cluster and stream lease expiries under
/// `config.watch.prefix`.
#[cfg(feature = "grpc")]
pub async fn watch_expired_leases(config: &config::Config) -> ExpiryResult<ExpiryStream> {
    let client = std::sync::Arc::new(adapters::etcd::EtcdClient::connect(&config.etcd).await?);
    let classifier =
        ExpiryClassifier::with_config(std::sync::Arc::clone(&client), (&config.watch).into());
    classifier
        .watch(&*client, config.watch.prefix.as_bytes())
        .await
}
