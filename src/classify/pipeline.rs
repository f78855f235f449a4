//! Streaming expiry classifier.
//!
//! One worker task per subscription drains the notification stream, runs
//! the decision procedure (including the lease query) for each item in
//! arrival order, and forwards confirmed expiries on a bounded channel.
//!
//! ```text
//! WatchSource ──► worker ──(lease query)──► LeaseOracle
//!                   │
//!                   └──► mpsc (bounded) ──► ExpiryStream
//! ```
//!
//! Cancellation is raced against every suspension point of the worker:
//! waiting for the next notification, waiting for the lease query, and
//! waiting for output capacity. Once observed, the notification stream is
//! dropped (closing the subscription) and the output channel closes. A
//! consumer closing the output is observed at the same points.

use super::decision::{self, Classification};
use super::metrics::{ClassifierMetrics, ClassifierMetricsSnapshot};
use crate::core::config::WatchConfig;
use crate::core::error::{ExpiryError, ExpiryResult};
use crate::event::{ChangeNotification, ExpiryEvent};
use crate::oracle::LeaseOracle;
use crate::source::{WatchOptions, WatchSource};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Classifier runtime settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Capacity of the expiry event channel (minimum 1).
    pub output_capacity: usize,
    /// Lease query timeout.
    pub oracle_timeout: Option<Duration>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            output_capacity: 1,
            oracle_timeout: Some(Duration::from_secs(5)),
        }
    }
}

impl From<&WatchConfig> for ClassifierConfig {
    fn from(config: &WatchConfig) -> Self {
        Self {
            output_capacity: config.output_capacity,
            oracle_timeout: config.oracle_timeout(),
        }
    }
}

/// Why a classifier worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The notification stream ended.
    SourceEnded,
    /// The subscription was cancelled by the consumer.
    Cancelled,
    /// The consumer stopped receiving expiry events.
    ConsumerDropped,
}

impl std::fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceEnded => write!(f, "SourceEnded"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::ConsumerDropped => write!(f, "ConsumerDropped"),
        }
    }
}

/// Handle that cancels a running classifier.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Classifies deletions as lease expiries.
///
/// Stateless across notifications; one classifier may drive any number of
/// independent streams, all sharing its counters.
pub struct ExpiryClassifier<O: ?Sized> {
    oracle: Arc<O>,
    config: ClassifierConfig,
    metrics: Arc<ClassifierMetrics>,
}

impl<O: ?Sized> Clone for ExpiryClassifier<O> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            config: self.config.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<O> ExpiryClassifier<O>
where
    O: LeaseOracle + ?Sized + 'static,
{
    /// Create a classifier with default settings.
    pub fn new(oracle: Arc<O>) -> Self {
        Self::with_config(oracle, ClassifierConfig::default())
    }

    /// Create a classifier with the given settings.
    pub fn with_config(oracle: Arc<O>, config: ClassifierConfig) -> Self {
        Self {
            oracle,
            config,
            metrics: Arc::new(ClassifierMetrics::new()),
        }
    }

    /// Get configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Current counters.
    pub fn metrics(&self) -> ClassifierMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Classify one notification.
    pub async fn classify(&self, notification: &ChangeNotification) -> ExpiryResult<Classification> {
        decision::classify(&*self.oracle, notification, self.config.oracle_timeout).await
    }

    /// Decide whether one notification is a lease expiry.
    pub async fn is_expiry(&self, notification: &ChangeNotification) -> ExpiryResult<bool> {
        self.classify(notification).await.map(|c| c.is_expiry())
    }

    /// Subscribe to `prefix` on `source` and classify its deletions.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn watch<W>(&self, source: &W, prefix: &[u8]) -> ExpiryResult<ExpiryStream>
    where
        W: WatchSource + ?Sized,
    {
        let notifications = source.watch(prefix, WatchOptions::expiry_watch()).await?;
        tracing::info!(
            prefix = %String::from_utf8_lossy(prefix),
            "expiry watch started"
        );
        Ok(self.classify_stream(notifications))
    }

    /// Classify an existing notification stream on a dedicated worker.
    ///
    /// The returned stream yields confirmed expiries in input order and
    /// ends when `notifications` ends or the stream is cancelled. Must be
    /// called from within a tokio runtime.
    pub fn classify_stream<S>(&self, notifications: S) -> ExpiryStream
    where
        S: Stream<Item = ChangeNotification> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.output_capacity.max(1));
        let (cancel, shutdown) = CancelHandle::new();

        let worker = Worker {
            oracle: Arc::clone(&self.oracle),
            oracle_timeout: self.config.oracle_timeout,
            metrics: Arc::clone(&self.metrics),
            output: tx,
            shutdown,
        };
        let handle = tokio::spawn(worker.run(Box::pin(notifications)));

        ExpiryStream {
            events: rx,
            cancel,
            worker: Some(handle),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

struct Worker<O: ?Sized> {
    oracle: Arc<O>,
    oracle_timeout: Option<Duration>,
    metrics: Arc<ClassifierMetrics>,
    output: mpsc::Sender<ExpiryEvent>,
    shutdown: watch::Receiver<bool>,
}

impl<O> Worker<O>
where
    O: LeaseOracle + ?Sized + 'static,
{
    async fn run<S>(mut self, mut notifications: Pin<Box<S>>) -> WorkerExit
    where
        S: Stream<Item = ChangeNotification> + Send + ?Sized,
    {
        let exit = loop {
            let next = tokio::select! {
                biased;
                _ = cancelled(&mut self.shutdown) => break WorkerExit::Cancelled,
                _ = self.output.closed() => break WorkerExit::ConsumerDropped,
                next = notifications.next() => next,
            };
            let Some(notification) = next else {
                break WorkerExit::SourceEnded;
            };
            self.metrics.record_observed();

            let decision = tokio::select! {
                biased;
                _ = cancelled(&mut self.shutdown) => break WorkerExit::Cancelled,
                _ = self.output.closed() => break WorkerExit::ConsumerDropped,
                decision = decision::classify(&*self.oracle, &notification, self.oracle_timeout) => decision,
            };

            match decision {
                Ok(Classification::Expired) => {
                    tracing::debug!(
                        key = %notification.key_lossy(),
                        lease_id = %notification.prev_lease,
                        revision = notification.revision,
                        "lease expiry confirmed"
                    );
                    let event = ExpiryEvent::confirmed(notification);
                    let sent = tokio::select! {
                        biased;
                        _ = cancelled(&mut self.shutdown) => break WorkerExit::Cancelled,
                        sent = self.output.send(event) => sent,
                    };
                    if sent.is_err() {
                        break WorkerExit::ConsumerDropped;
                    }
                    self.metrics.record_forwarded();
                }
                Ok(classification) => {
                    if let Classification::UnexpectedTtl { ttl } = classification {
                        tracing::warn!(
                            key = %notification.key_lossy(),
                            lease_id = %notification.prev_lease,
                            ttl,
                            "store reported an out-of-range lease TTL"
                        );
                    } else {
                        tracing::trace!(
                            key = %notification.key_lossy(),
                            reason = classification.label(),
                            "deletion is not a lease expiry"
                        );
                    }
                    self.metrics.record_skip(classification);
                }
                Err(error) => {
                    self.metrics.record_oracle_failure();
                    tracing::warn!(
                        key = %notification.key_lossy(),
                        lease_id = %notification.prev_lease,
                        error = %error,
                        "lease expiry check failed; notification skipped"
                    );
                }
            }
        };

        // Release the subscription before reporting.
        drop(notifications);
        tracing::info!(exit = %exit, "expiry classifier stopped");
        exit
    }
}

/// Resolves once cancellation is requested or every cancel handle is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Stream of confirmed lease expiries.
///
/// Dropping the stream cancels the classifier and its subscription.
pub struct ExpiryStream {
    events: mpsc::Receiver<ExpiryEvent>,
    cancel: CancelHandle,
    worker: Option<JoinHandle<WorkerExit>>,
    metrics: Arc<ClassifierMetrics>,
}

impl ExpiryStream {
    /// Receive the next expiry event.
    ///
    /// Returns `None` once the classifier has stopped and every buffered
    /// event was received.
    pub async fn recv(&mut self) -> Option<ExpiryEvent> {
        self.events.recv().await
    }

    /// Cancel the classifier.
    ///
    /// Events already buffered remain receivable; no lease query is issued
    /// after the worker observes the cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle that cancels this stream from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Counters of the classifier driving this stream.
    pub fn metrics(&self) -> ClassifierMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stop receiving and wait for the worker to finish.
    ///
    /// Undelivered events are discarded. The worker stops at its next
    /// suspension point without issuing further lease queries.
    pub async fn join(mut self) -> ExpiryResult<WorkerExit> {
        self.events.close();
        self.wait_worker().await
    }

    /// Cancel and wait for the worker to finish.
    pub async fn shutdown(mut self) -> ExpiryResult<WorkerExit> {
        self.cancel.cancel();
        self.wait_worker().await
    }

    async fn wait_worker(&mut self) -> ExpiryResult<WorkerExit> {
        match self.worker.take() {
            Some(handle) => handle
                .await
                .map_err(|e| ExpiryError::internal(format!("classifier worker failed: {}", e))),
            None => Err(ExpiryError::internal("classifier worker already joined")),
        }
    }
}

impl Stream for ExpiryStream {
    type Item = ExpiryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for ExpiryStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
