//! Expiry classification.
//!
//! - [`decision`] - Per-notification decision procedure
//! - [`pipeline`] - Worker task and output stream
//! - [`metrics`] - Classifier counters

pub mod decision;
pub mod metrics;
pub mod pipeline;

pub use decision::{classify, interpret_ttl, is_expiry, precheck, Classification};
pub use metrics::{ClassifierMetrics, ClassifierMetricsSnapshot};
pub use pipeline::{CancelHandle, ClassifierConfig, ExpiryClassifier, ExpiryStream, WorkerExit};
