//! In-process lease-aware store.
//!
//! [`MemoryStore`] implements both [`crate::source::WatchSource`] and
//! [`crate::oracle::LeaseOracle`], so an expiry watch can run end to end
//! without an external etcd cluster.
//!
//! - [`store`] - Keys, revisions and watches
//! - [`lease`] - Lease records and deadlines

pub mod lease;
pub mod store;

pub use lease::{LeaseManager, LeaseRecord};
pub use store::{KvRecord, MemoryStore};
