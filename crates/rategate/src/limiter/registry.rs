//! Per-client state registry

use super::token_bucket::TokenBucket;
use crate::config::LimiterConfig;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Mutable part of a client entry, guarded by the entry's own lock
struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Rate state for a single client identity.
///
/// The bucket and the last-seen timestamp live behind a per-entry mutex, so
/// requests from different clients never contend and requests from the same
/// client are serialized.
pub struct ClientState {
    identity: String,
    entry: Mutex<ClientEntry>,
}

impl ClientState {
    fn new(identity: String, bucket: TokenBucket, now: Instant) -> Self {
        Self {
            identity,
            entry: Mutex::new(ClientEntry {
                bucket,
                last_seen: now,
            }),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Run the bucket decision for one request.
    pub fn allow(&self, now: Instant) -> bool {
        self.entry.lock().bucket.allow(now)
    }

    /// Time until this client's next request would be admitted.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.entry.lock().bucket.retry_after(now)
    }

    pub fn available_tokens(&self, now: Instant) -> f64 {
        self.entry.lock().bucket.available(now)
    }

    pub fn last_seen(&self) -> Instant {
        self.entry.lock().last_seen
    }

    /// Record activity. `last_seen` never moves backwards.
    pub fn touch(&self, now: Instant) {
        let mut entry = self.entry.lock();
        if now > entry.last_seen {
            entry.last_seen = now;
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen())
    }
}

/// Concurrent map from client identity to [`ClientState`].
///
/// Structural changes go through DashMap's shard locks; token and timestamp
/// updates go through each entry's own mutex. Lock order is always shard
/// first, entry second.
pub struct ClientRegistry {
    clients: DashMap<String, Arc<ClientState>>,
    capacity: u32,
    refill_per_second: f64,
}

impl ClientRegistry {
    /// Create an empty registry whose new entries get a full bucket of
    /// `capacity` tokens refilled at `refill_per_second`.
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        Self {
            clients: DashMap::new(),
            capacity,
            refill_per_second,
        }
    }

    pub fn from_config(config: &LimiterConfig) -> Self {
        Self::new(config.capacity, config.refill_per_second)
    }

    /// Return the entry for `identity`, inserting a fresh full-capacity one
    /// if absent.
    ///
    /// Insertion is atomic: concurrent callers racing on a new identity all
    /// receive the same [`ClientState`].
    pub fn get_or_create(&self, identity: &str, now: Instant) -> Arc<ClientState> {
        if let Some(existing) = self.clients.get(identity) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .clients
            .entry(identity.to_string())
            .or_insert_with(|| {
                let bucket = TokenBucket::new(self.capacity, self.refill_per_second, now);
                Arc::new(ClientState::new(identity.to_string(), bucket, now))
            });
        Arc::clone(entry.value())
    }

    /// Update `last_seen` for `identity`. No-op if the entry is gone.
    pub fn touch(&self, identity: &str, now: Instant) {
        if let Some(state) = self.clients.get(identity) {
            state.touch(now);
        }
    }

    /// Unconditionally drop the entry for `identity`.
    pub fn remove(&self, identity: &str) -> bool {
        self.clients.remove(identity).is_some()
    }

    /// Drop the entry for `identity` only if it has been idle for longer
    /// than `threshold` at `now`. The check runs under the shard write lock,
    /// so a request that touched the entry after a snapshot keeps it alive.
    pub fn remove_if_idle(&self, identity: &str, now: Instant, threshold: Duration) -> bool {
        self.clients
            .remove_if(identity, |_, state| state.idle_for(now) > threshold)
            .is_some()
    }

    /// Copy out `(identity, last_seen)` for every entry.
    ///
    /// Each shard is read-locked only while its entries are copied.
    pub fn snapshot(&self) -> Vec<(String, Instant)> {
        self.clients
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_seen()))
            .collect()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.clients.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::from_config(&LimiterConfig::default())
    }
}
