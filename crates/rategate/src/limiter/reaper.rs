//! Background eviction of idle clients.

use super::registry::ClientRegistry;
use crate::config::{LimiterConfig, MAX_PERIOD};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically drops registry entries that have been idle for longer than
/// the configured threshold.
///
/// A client evicted while one of its requests is in flight simply starts
/// over with a full bucket on its next request.
pub struct IdleReaper {
    registry: Arc<ClientRegistry>,
    interval: Duration,
    idle_threshold: Duration,
}

impl IdleReaper {
    /// `interval` is clamped to `1ms..=MAX_PERIOD`.
    pub fn new(registry: Arc<ClientRegistry>, interval: Duration, idle_threshold: Duration) -> Self {
        Self {
            registry,
            interval: interval.clamp(Duration::from_millis(1), MAX_PERIOD),
            idle_threshold,
        }
    }

    pub fn from_config(registry: Arc<ClientRegistry>, config: &LimiterConfig) -> Self {
        Self::new(registry, config.sweep_interval, config.idle_timeout)
    }

    /// Run one eviction pass and return the number of entries removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut evicted = 0;

        for (identity, last_seen) in self.registry.snapshot() {
            if now.saturating_duration_since(last_seen) <= self.idle_threshold {
                continue;
            }
            if self
                .registry
                .remove_if_idle(&identity, now, self.idle_threshold)
            {
                debug!(client = %identity, "evicted idle client");
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!(
                evicted,
                remaining = self.registry.len(),
                "idle client sweep complete"
            );
        }
        evicted
    }

    /// Spawn the sweep loop. The first pass runs one full interval after
    /// start; the loop exits as soon as `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = Instant::now();
            let first = start.checked_add(self.interval).unwrap_or(start);
            let mut ticker = tokio::time::interval_at(first, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_secs = self.interval.as_secs_f64(),
                idle_threshold_secs = self.idle_threshold.as_secs_f64(),
                "idle reaper started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("idle reaper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep(Instant::now());
                    }
                }
            }
        })
    }
}
