//! Watch source capability.
//!
//! A watch source turns a store's prefix subscription into a stream of
//! [`ChangeNotification`]s. Sources perform no classification. They must
//! attach previous key-values when asked, drop filtered event kinds, and
//! end the stream (rather than yield an error item) when the subscription
//! terminates.

use crate::core::error::ExpiryResult;
use crate::event::{ChangeNotification, EventKind};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Notification sequence produced by a watch source.
///
/// Dropping the stream cancels the underlying subscription.
pub type NotificationStream = BoxStream<'static, ChangeNotification>;

bitflags::bitflags! {
    /// Event filters for a watch subscription.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WatchFilters: u32 {
        /// Filter out PUT events.
        const NOPUT = 0b0000_0001;
        /// Filter out DELETE events.
        const NODELETE = 0b0000_0010;
    }
}

impl Default for WatchFilters {
    fn default() -> Self {
        Self::empty()
    }
}

/// Subscription options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WatchOptions {
    /// Match every key starting with the given key.
    pub prefix: bool,
    /// Attach the previous key-value to each event.
    pub prev_kv: bool,
    /// Event kinds to drop at the source.
    pub filters: WatchFilters,
}

impl WatchOptions {
    /// Options required by the expiry classifier: prefix match, previous
    /// key-value retained, PUT events filtered out.
    pub fn expiry_watch() -> Self {
        Self {
            prefix: true,
            prev_kv: true,
            filters: WatchFilters::NOPUT,
        }
    }

    /// Check if events of the given kind pass the filters.
    pub fn admits(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Put => !self.filters.contains(WatchFilters::NOPUT),
            EventKind::Delete => !self.filters.contains(WatchFilters::NODELETE),
        }
    }

    /// Compute the range end for a watched key.
    ///
    /// Empty for a single-key watch.
    pub fn range_end(&self, key: &[u8]) -> Vec<u8> {
        if self.prefix {
            prefix_range_end(key)
        } else {
            Vec::new()
        }
    }
}

/// Compute the exclusive range end covering every key with `prefix`.
///
/// Increments the last byte that is not 0xff and truncates after it. A
/// prefix made only of 0xff bytes (or empty) maps to `[0]`, which the
/// store interprets as "every key from here on".
pub fn prefix_range_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    vec![0]
}

/// Check if `key` falls in the watched range `[start, range_end)`.
pub fn key_in_range(key: &[u8], start: &[u8], range_end: &[u8]) -> bool {
    if range_end.is_empty() {
        key == start
    } else if range_end == [0] {
        key >= start
    } else {
        key >= start && key < range_end
    }
}

/// Produces change notifications for a key range.
#[async_trait]
pub trait WatchSource: Send + Sync {
    /// Subscribe to mutations under `key`.
    ///
    /// Returns an error only if the subscription could not be established.
    async fn watch(&self, key: &[u8], options: WatchOptions) -> ExpiryResult<NotificationStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_range_end_increments_last_byte() {
        assert_eq!(prefix_range_end(b"/my-data/"), b"/my-data0".to_vec());
        assert_eq!(prefix_range_end(b"a\xff"), b"b".to_vec());
        assert_eq!(prefix_range_end(b"\xff\xff"), vec![0]);
        assert_eq!(prefix_range_end(b""), vec![0]);
    }

    #[test]
    fn expiry_watch_filters_puts() {
        let options = WatchOptions::expiry_watch();
        assert!(!options.admits(EventKind::Put));
        assert!(options.admits(EventKind::Delete));
        assert!(options.prev_kv);
    }

    #[test]
    fn range_membership() {
        let end = prefix_range_end(b"/my-data/");
        assert!(key_in_range(b"/my-data/my-test-key", b"/my-data/", &end));
        assert!(!key_in_range(b"/my-datum", b"/my-data/", &end));
        assert!(key_in_range(b"k", b"k", b""));
        assert!(!key_in_range(b"k2", b"k", b""));
        assert!(key_in_range(b"zzz", b"a", &[0]));
    }
}
