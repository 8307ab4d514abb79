//! Rate-limit state storage.
//!
//! The RateLimit unit only talks to a [`RateLimitStore`], so the in-process
//! table can be swapped for a shared store without touching unit logic.
//! Entries are never reclaimed; a stale entry is overwritten when its client
//! returns.

use dashmap::DashMap;

/// Request count for one client key within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitEntry {
    /// Requests seen since `window_start`.
    pub count: u64,
    /// Unix time in seconds at which the window opened.
    pub window_start: u64,
}

impl RateLimitEntry {
    /// Creates an entry for a window opening at `now` with no requests yet.
    #[must_use]
    pub const fn fresh(now: u64) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Returns `true` once more than `window_secs` have passed since the
    /// window opened.
    #[must_use]
    pub const fn is_expired(&self, now: u64, window_secs: u64) -> bool {
        now.saturating_sub(self.window_start) > window_secs
    }
}

/// Storage capability for rate-limit entries.
pub trait RateLimitStore: Send + Sync + std::fmt::Debug + 'static {
    /// Returns the entry for `key`, if one exists.
    fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Replaces the entry for `key`.
    fn put(&self, key: &str, entry: RateLimitEntry);

    /// Applies `f` to the current entry for `key` and stores the result.
    ///
    /// The read, the call to `f` and the write happen atomically with respect
    /// to other updates of the same key. Returns the stored entry.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry;
}

/// Single-process store backed by a sharded concurrent map.
///
/// # Example
///
/// ```
/// use courier_middleware::{InMemoryRateLimitStore, RateLimitEntry, RateLimitStore};
///
/// let store = InMemoryRateLimitStore::new();
/// let entry = store.update("10.0.0.1", &mut |current| {
///     let mut entry = current.unwrap_or(RateLimitEntry::fresh(1_000));
///     entry.count += 1;
///     entry
/// });
/// assert_eq!(entry.count, 1);
/// assert_eq!(store.get("10.0.0.1"), Some(entry));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl InMemoryRateLimitStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracked client keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no client has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    fn put(&self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<RateLimitEntry>) -> RateLimitEntry,
    ) -> RateLimitEntry {
        // The entry guard holds the shard write lock until it drops
        match self.entries.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let updated = f(Some(*occupied.get()));
                occupied.insert(updated);
                updated
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let created = f(None);
                vacant.insert(created);
                created
            }
        }
    }
}
