//! etcd v3 gRPC adapter.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │       Watch API (stream)     │     │     Lease API (unary)        │
//! │  Create(prefix, prev_kv,     │     │  LeaseTimeToLive(id)         │
//! │         NOPUT filter)        │     │                              │
//! └──────────────┬───────────────┘     └──────────────┬───────────────┘
//!                │ WatchSource                        │ LeaseOracle
//!                └───────────────┬────────────────────┘
//!                            EtcdClient
//! ```
//!
//! # Modules
//!
//! - [`client`] - Channel setup, watch stream and TTL query
//! - [`proto`] - Wire-format message encoding

pub mod client;
pub mod proto;

pub use client::{create_request, notification_from_event, notifications_from_response, EtcdClient};
