//! Snapshot send cadence.
//!
//! Sends are rate limited to the governor's current interval. A full
//! message goes out every `full_resync_ms`, and immediately (bypassing the
//! rate limit) after a reset or a consumer resync request.

use crate::config::TimingConfig;
use crate::simulation::Simulation;
use crate::snapshot::{SnapshotEncoder, SnapshotMessage};

/// Decides when to send and whether the message is full or delta.
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    encoder: SnapshotEncoder,
    full_resync_ms: f64,
    last_sent_ms: Option<f64>,
    last_full_ms: f64,
    full_pending: bool,
}

impl SnapshotPublisher {
    /// Publisher whose first message is full.
    #[must_use]
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            encoder: SnapshotEncoder::new(),
            full_resync_ms: timing.full_resync_ms,
            last_sent_ms: None,
            last_full_ms: 0.0,
            full_pending: true,
        }
    }

    /// Send a full message on the next poll, regardless of the interval.
    pub fn request_full(&mut self) {
        self.full_pending = true;
    }

    /// True if the next message will be forced full.
    #[must_use]
    pub fn full_pending(&self) -> bool {
        self.full_pending
    }

    /// Build a message if one is due at `now_ms`.
    pub fn poll(&mut self, now_ms: f64, sim: &Simulation, fps: f64) -> Option<SnapshotMessage> {
        let interval = sim.governor().snapshot_interval_ms();
        let due = self
            .last_sent_ms
            .map_or(true, |last| now_ms - last >= interval);
        if !self.full_pending && !due {
            return None;
        }

        let resync_due = now_ms - self.last_full_ms >= self.full_resync_ms;
        let message = if self.full_pending || resync_due {
            self.encoder.full(sim, fps)
        } else {
            self.encoder.delta(sim, fps)
        };
        if message.is_full() {
            self.last_full_ms = now_ms;
        }
        self.full_pending = false;
        self.last_sent_ms = Some(now_ms);
        Some(message)
    }
}
