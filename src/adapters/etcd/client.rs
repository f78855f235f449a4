//! etcd v3 gRPC client.
//!
//! Speaks the two RPCs the expiry watch needs over a raw tonic channel:
//! the bidirectional `Watch` stream and the unary `LeaseTimeToLive` call.

use super::proto;
use crate::core::config::EtcdConfig;
use crate::core::error::{ExpiryError, ExpiryResult, TerminationReason};
use crate::event::{ChangeNotification, EventKind, LeaseId};
use crate::oracle::{LeaseOracle, TtlQueryResult};
use crate::source::{NotificationStream, WatchFilters, WatchOptions, WatchSource};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::Grpc;
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};

const WATCH_PATH: &str = "/etcdserverpb.Watch/Watch";
const LEASE_TIME_TO_LIVE_PATH: &str = "/etcdserverpb.Lease/LeaseTimeToLive";

/// Outbound watch requests buffered before the server reads them.
const WATCH_REQUEST_BUFFER: usize = 4;

/// etcd client handle.
///
/// Cheap to clone; clones share the underlying channel.
#[derive(Clone, Debug)]
pub struct EtcdClient {
    channel: Channel,
    request_timeout: Option<Duration>,
}

impl EtcdClient {
    /// Connect to the configured endpoints.
    ///
    /// A single endpoint is dialed eagerly so a bad address fails here. With
    /// several endpoints requests are balanced and connections are made
    /// lazily.
    pub async fn connect(config: &EtcdConfig) -> ExpiryResult<Self> {
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut endpoints = Vec::with_capacity(config.endpoints.len());
        for uri in &config.endpoints {
            let endpoint = Endpoint::from_shared(uri.clone())
                .map_err(|e| ExpiryError::InvalidRequest {
                    message: format!("invalid etcd endpoint {}: {}", uri, e),
                })?
                .connect_timeout(connect_timeout)
                .tcp_nodelay(true);
            endpoints.push(endpoint);
        }

        let channel = match endpoints.len() {
            0 => {
                return Err(ExpiryError::InvalidRequest {
                    message: "no etcd endpoints configured".to_string(),
                })
            }
            1 => endpoints.remove(0).connect().await?,
            _ => Channel::balance_list(endpoints.into_iter()),
        };

        tracing::info!(endpoints = ?config.endpoints, "connected to etcd");

        let mut client = Self::from_channel(channel);
        if config.request_timeout_ms > 0 {
            client.request_timeout = Some(Duration::from_millis(config.request_timeout_ms));
        }
        Ok(client)
    }

    /// Wrap an existing channel. No per-request timeout is applied.
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            channel,
            request_timeout: None,
        }
    }

    /// Set the deadline applied to unary requests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    async fn ready(&self) -> Result<Grpc<Channel>, Status> {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("etcd channel not ready: {}", e)))?;
        Ok(grpc)
    }

    /// Issue a raw `LeaseTimeToLive` request.
    pub async fn lease_time_to_live(
        &self,
        lease_id: i64,
    ) -> Result<proto::LeaseTimeToLiveResponse, Status> {
        let mut grpc = self.ready().await?;
        let mut request = Request::new(proto::LeaseTimeToLiveRequest {
            id: lease_id,
            keys: false,
        });
        if let Some(timeout) = self.request_timeout {
            request.set_timeout(timeout);
        }
        let codec: ProstCodec<proto::LeaseTimeToLiveRequest, proto::LeaseTimeToLiveResponse> =
            ProstCodec::default();
        let response = grpc
            .unary(
                request,
                PathAndQuery::from_static(LEASE_TIME_TO_LIVE_PATH),
                codec,
            )
            .await?;
        Ok(response.into_inner())
    }

    /// Open a watch stream and wait for the server to confirm creation.
    async fn open_watch(&self, create: proto::WatchCreateRequest) -> ExpiryResult<EtcdWatch> {
        let (requests, rx) = mpsc::channel(WATCH_REQUEST_BUFFER);
        requests
            .send(proto::WatchRequest::create(create))
            .await
            .map_err(|_| ExpiryError::internal("watch request channel closed"))?;

        let mut grpc = self.ready().await.map_err(subscribe_error)?;
        let codec: ProstCodec<proto::WatchRequest, proto::WatchResponse> = ProstCodec::default();
        let mut inbound = grpc
            .streaming(
                Request::new(ReceiverStream::new(rx)),
                PathAndQuery::from_static(WATCH_PATH),
                codec,
            )
            .await
            .map_err(subscribe_error)?
            .into_inner();

        let created = inbound
            .message()
            .await
            .map_err(subscribe_error)?
            .ok_or_else(|| ExpiryError::Subscribe {
                message: "watch stream closed before creation".to_string(),
            })?;
        if created.canceled || !created.created {
            return Err(ExpiryError::Subscribe {
                message: if created.cancel_reason.is_empty() {
                    "watch rejected by server".to_string()
                } else {
                    created.cancel_reason
                },
            });
        }

        Ok(EtcdWatch {
            watch_id: created.watch_id,
            inbound,
            _requests: requests,
            pending: VecDeque::new(),
        })
    }
}

fn subscribe_error(status: Status) -> ExpiryError {
    ExpiryError::Subscribe {
        message: format!("{}: {}", status.code(), status.message()),
    }
}

/// Build the create request for a watch on `key`.
pub fn create_request(key: &[u8], options: &WatchOptions) -> proto::WatchCreateRequest {
    let mut filters = Vec::new();
    if options.filters.contains(WatchFilters::NOPUT) {
        filters.push(proto::FILTER_NOPUT);
    }
    if options.filters.contains(WatchFilters::NODELETE) {
        filters.push(proto::FILTER_NODELETE);
    }
    proto::WatchCreateRequest {
        key: key.to_vec(),
        range_end: options.range_end(key),
        filters,
        prev_kv: options.prev_kv,
        ..Default::default()
    }
}

/// Convert a wire event into a notification.
///
/// Returns `None` for events of unknown type or without any key-value.
pub fn notification_from_event(event: proto::Event) -> Option<ChangeNotification> {
    let kind = match event.r#type {
        proto::EVENT_TYPE_PUT => EventKind::Put,
        proto::EVENT_TYPE_DELETE => EventKind::Delete,
        _ => return None,
    };
    let (key, revision) = match (event.kv, event.prev_kv.as_ref()) {
        (Some(kv), _) => (kv.key, kv.mod_revision),
        (None, Some(prev)) => (prev.key.clone(), 0),
        (None, None) => return None,
    };
    let (prev_value, prev_lease) = match event.prev_kv {
        Some(prev) => (Some(prev.value), LeaseId(prev.lease)),
        None => (None, LeaseId::NONE),
    };
    Some(ChangeNotification {
        key,
        kind,
        prev_value,
        prev_lease,
        revision,
    })
}

/// Split a watch response into notifications, or the reason the watch ended.
pub fn notifications_from_response(
    response: proto::WatchResponse,
    options: &WatchOptions,
) -> Result<Vec<ChangeNotification>, TerminationReason> {
    if response.canceled {
        return Err(if response.compact_revision > 0 {
            TerminationReason::Compacted {
                revision: response.compact_revision,
            }
        } else {
            TerminationReason::Cancelled
        });
    }
    Ok(response
        .events
        .into_iter()
        .filter_map(notification_from_event)
        .filter(|n| options.admits(n.kind))
        .collect())
}

/// An open watch. Holds the request sender so the outbound half stays open.
struct EtcdWatch {
    watch_id: i64,
    inbound: Streaming<proto::WatchResponse>,
    _requests: mpsc::Sender<proto::WatchRequest>,
    pending: VecDeque<ChangeNotification>,
}

impl EtcdWatch {
    async fn next(&mut self, options: &WatchOptions) -> Option<ChangeNotification> {
        loop {
            if let Some(notification) = self.pending.pop_front() {
                return Some(notification);
            }
            let response = match self.inbound.message().await {
                Ok(Some(response)) => response,
                Ok(None) => {
                    self.log_end(TerminationReason::Closed, "");
                    return None;
                }
                Err(status) => {
                    self.log_end(TerminationReason::Transport, status.message());
                    return None;
                }
            };
            let cancel_reason = response.cancel_reason.clone();
            match notifications_from_response(response, options) {
                Ok(batch) => self.pending.extend(batch),
                Err(reason) => {
                    self.log_end(reason, &cancel_reason);
                    return None;
                }
            }
        }
    }

    fn log_end(&self, reason: TerminationReason, detail: &str) {
        match reason {
            TerminationReason::Transport => {
                tracing::warn!(watch_id = self.watch_id, reason = %reason, detail, "etcd watch ended")
            }
            _ => {
                tracing::info!(watch_id = self.watch_id, reason = %reason, detail, "etcd watch ended")
            }
        }
    }
}

#[async_trait]
impl WatchSource for EtcdClient {
    async fn watch(&self, key: &[u8], options: WatchOptions) -> ExpiryResult<NotificationStream> {
        let watch = self.open_watch(create_request(key, &options)).await?;
        tracing::debug!(
            watch_id = watch.watch_id,
            key = %String::from_utf8_lossy(key),
            "etcd watch created"
        );
        let stream = futures::stream::unfold((watch, options), |(mut watch, options)| async move {
            let notification = watch.next(&options).await?;
            Some((notification, (watch, options)))
        });
        Ok(stream.boxed())
    }
}

#[async_trait]
impl LeaseOracle for EtcdClient {
    async fn time_to_live(&self, lease_id: LeaseId) -> ExpiryResult<TtlQueryResult> {
        match self.lease_time_to_live(lease_id.get()).await {
            Ok(response) => Ok(TtlQueryResult {
                lease_id,
                remaining_seconds: response.ttl,
                granted_seconds: response.granted_ttl,
            }),
            // Older servers answer a revoked lease with NotFound instead of TTL -1.
            Err(status) if status.code() == Code::NotFound => Ok(TtlQueryResult::expired(lease_id)),
            Err(status) => Err(ExpiryError::oracle_unavailable(
                lease_id.get(),
                format!("{}: {}", status.code(), status.message()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delete_event(key: &str, value: &str, lease: i64, revision: i64) -> proto::Event {
        proto::Event {
            r#type: proto::EVENT_TYPE_DELETE,
            kv: Some(proto::KeyValue {
                key: key.as_bytes().to_vec(),
                mod_revision: revision,
                ..Default::default()
            }),
            prev_kv: Some(proto::KeyValue {
                key: key.as_bytes().to_vec(),
                value: value.as_bytes().to_vec(),
                lease,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn expiry_watch_request_filters_puts() {
        let request = create_request(b"/my-data/", &WatchOptions::expiry_watch());
        assert_eq!(request.key, b"/my-data/");
        assert_eq!(request.range_end, b"/my-data0");
        assert_eq!(request.filters, vec![proto::FILTER_NOPUT]);
        assert!(request.prev_kv);
    }

    #[test]
    fn delete_event_carries_previous_value_and_lease() {
        let n = notification_from_event(delete_event("/my-data/k", "v", 7, 12)).unwrap();
        assert_eq!(n.kind, EventKind::Delete);
        assert_eq!(n.key, b"/my-data/k");
        assert_eq!(n.prev_value.as_deref(), Some(&b"v"[..]));
        assert_eq!(n.prev_lease, LeaseId(7));
        assert_eq!(n.revision, 12);
    }

    #[test]
    fn delete_without_prev_kv_has_no_value() {
        let mut event = delete_event("/my-data/k", "v", 7, 12);
        event.prev_kv = None;
        let n = notification_from_event(event).unwrap();
        assert!(n.prev_value.is_none());
        assert!(n.prev_lease.is_none());
    }

    #[test]
    fn unknown_event_type_is_dropped() {
        let mut event = delete_event("/my-data/k", "v", 7, 12);
        event.r#type = 9;
        assert!(notification_from_event(event).is_none());
    }

    #[test]
    fn puts_are_dropped_when_filtered() {
        let mut put = delete_event("/my-data/a", "old", 0, 3);
        put.r#type = proto::EVENT_TYPE_PUT;
        let response = proto::WatchResponse {
            events: vec![put, delete_event("/my-data/b", "v", 5, 4)],
            ..Default::default()
        };
        let batch =
            notifications_from_response(response, &WatchOptions::expiry_watch()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].key, b"/my-data/b");
    }

    #[test]
    fn compaction_cancel_ends_watch() {
        let response = proto::WatchResponse {
            canceled: true,
            compact_revision: 42,
            ..Default::default()
        };
        let reason =
            notifications_from_response(response, &WatchOptions::expiry_watch()).unwrap_err();
        assert_eq!(reason, TerminationReason::Compacted { revision: 42 });
    }
}
