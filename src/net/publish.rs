//! Rate-limited outbound snapshot broadcasting
//!
//! The publisher is a throttle, not a simulation tick: it emits at most
//! one snapshot per interval of accumulated simulation time, plus
//! unthrottled out-of-band sends when a new peer joins so the newcomer
//! is not blind for a full interval. Out-of-band sends leave the
//! regular cadence untouched.

use crate::constants::replication::PUBLISH_INTERVAL;
use crate::net::channel::RoomChannel;
use crate::net::protocol::PlayerSnapshot;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Minimum seconds between rate-limited broadcasts
    pub interval: f64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval: PUBLISH_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PublishStats {
    pub sent: u64,
    pub forced: u64,
}

pub struct SnapshotPublisher {
    config: PublisherConfig,
    last_sent: Option<f64>,
    stats: PublishStats,
}

impl SnapshotPublisher {
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            config,
            last_sent: None,
            stats: PublishStats::default(),
        }
    }

    /// Broadcast if the interval has elapsed since the last throttled
    /// send. `now` is accumulated simulation time in seconds. Returns
    /// whether a snapshot went out.
    pub fn publish(
        &mut self,
        now: f64,
        snapshot: &PlayerSnapshot,
        channel: &dyn RoomChannel,
    ) -> bool {
        let due = self
            .last_sent
            .map_or(true, |last| now - last >= self.config.interval);
        if !due {
            return false;
        }
        if self.send(snapshot, channel) {
            self.last_sent = Some(now);
            true
        } else {
            false
        }
    }

    /// Out-of-band send for a freshly joined peer; bypasses and does
    /// not reset the throttle.
    pub fn publish_now(&mut self, snapshot: &PlayerSnapshot, channel: &dyn RoomChannel) {
        if self.send(snapshot, channel) {
            self.stats.forced += 1;
        }
    }

    pub fn stats(&self) -> PublishStats {
        self.stats
    }

    fn send(&mut self, snapshot: &PlayerSnapshot, channel: &dyn RoomChannel) -> bool {
        match snapshot.encode() {
            Ok(payload) => {
                channel.broadcast(&payload);
                self.stats.sent += 1;
                true
            }
            Err(err) => {
                log::error!("[Publisher] snapshot not encodable: {err}");
                false
            }
        }
    }
}
