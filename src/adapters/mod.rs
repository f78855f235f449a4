//! Store adapters.
//!
//! Each adapter provides a [`crate::source::WatchSource`] and a
//! [`crate::oracle::LeaseOracle`] for one kind of store.

#[cfg(feature = "grpc")]
pub mod etcd;
pub mod memory;
