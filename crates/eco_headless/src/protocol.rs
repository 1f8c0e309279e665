//! JSON-lines protocol of the headless runner.
//!
//! **Input (stdin):** one [`ControlMessage`] per line, tagged by `type`.
//! **Output (stdout):** one [`Event`] per line, tagged by `type`.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","seed":1,"width":2400.0,"height":1440.0}
//! <- {"type":"snapshot","sequence":1,"tick":0,"kind":"full",...}
//! -> {"type":"set_zoom","value":2.0}
//! -> {"type":"paint_force_field","x":300.0,"y":200.0,"polarity":-1.0}
//! <- {"type":"snapshot","sequence":2,"tick":1,"kind":"delta",...}
//! -> {"type":"quit"}
//! <- {"type":"stopped","frames":12,"steps":3,"resets":0,"tick":3}
//! ```

use serde::{Deserialize, Serialize};

use eco_core::control::ControlMessage;
use eco_core::mirror::SnapshotMirror;
use eco_core::snapshot::SnapshotMessage;
use eco_core::world::Regime;

use crate::metrics::Populations;

/// Protocol version announced in [`Event::Ready`].
pub const PROTOCOL_VERSION: &str = "1.0";

/// Parse one stdin line.
///
/// Blank lines yield `Ok(None)`.
pub fn parse_control(line: &str) -> Result<Option<ControlMessage>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Whether a snapshot carried the whole world or only changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// Full message.
    Full,
    /// Delta message.
    Delta,
}

/// What the consumer prints for each applied message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Message sequence number.
    pub sequence: u64,
    /// Simulation tick.
    pub tick: u64,
    /// World seed.
    pub seed: u64,
    /// Full or delta.
    pub kind: SnapshotKind,
    /// Entries carried: every row for a full, upserts plus removes for a delta.
    pub changes: usize,
    /// Mirrored creature counts after applying.
    pub populations: Populations,
    /// Mirrored resources after applying.
    pub resources: usize,
    /// Current regime.
    pub regime: Regime,
    /// Frames per second on the owner side.
    pub fps: f64,
    /// Smoothed step duration.
    pub avg_step_ms: f64,
    /// Heavy-system stride.
    pub update_stride: u32,
}

impl SnapshotSummary {
    /// Describe `message` as seen through `mirror` after it was applied.
    #[must_use]
    pub fn describe(message: &SnapshotMessage, mirror: &SnapshotMirror) -> Self {
        let envelope = message.envelope();
        let lists = mirror.components();
        let (kind, changes) = match message {
            SnapshotMessage::Full(full) => {
                let c = &full.components;
                let rows = c.creature_count()
                    + c.bursts.len()
                    + c.resources.len()
                    + c.force_fields.len();
                (SnapshotKind::Full, rows)
            }
            SnapshotMessage::Delta(delta) => (SnapshotKind::Delta, delta.changes.change_count()),
        };
        Self {
            sequence: envelope.sequence,
            tick: envelope.tick,
            seed: envelope.seed,
            kind,
            changes,
            populations: Populations::of_lists(&lists),
            resources: lists.resources.len(),
            regime: envelope.regime,
            fps: envelope.perf.fps,
            avg_step_ms: envelope.perf.avg_step_ms,
            update_stride: envelope.perf.update_stride,
        }
    }
}

/// Lines written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Session started.
    Ready {
        /// Protocol version.
        version: String,
        /// World seed.
        seed: u64,
        /// World width.
        width: f32,
        /// World height.
        height: f32,
    },
    /// A snapshot was applied to the mirror.
    Snapshot(SnapshotSummary),
    /// The mirror lost sync and asked for a full message.
    Resync {
        /// Why.
        reason: String,
    },
    /// A message could not be used.
    Error {
        /// Error message.
        message: String,
    },
    /// Session ended.
    Stopped {
        /// Owner frames run.
        frames: u64,
        /// Steps run.
        steps: u64,
        /// Extinction resets.
        resets: u64,
        /// Final tick.
        tick: u64,
    },
}

impl Event {
    /// Serialize to a JSON line (with trailing newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::snapshot::SnapshotEncoder;
    use eco_test_utils::fixtures::{small_sim, DT};

    #[test]
    fn test_parse_pause() {
        let msg = parse_control(r#"{"type":"pause"}"#).unwrap();
        assert_eq!(msg, Some(ControlMessage::Pause));
    }

    #[test]
    fn test_parse_paint() {
        let msg = parse_control(r#"  {"type":"paint_force_field","x":10,"y":20,"polarity":-1}  "#)
            .unwrap();
        assert_eq!(
            msg,
            Some(ControlMessage::PaintForceField {
                x: 10.0,
                y: 20.0,
                polarity: -1.0
            })
        );
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_control("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_unknown_type_fails() {
        assert!(parse_control(r#"{"type":"teleport"}"#).is_err());
        assert!(parse_control("not json").is_err());
    }

    #[test]
    fn test_event_json_line() {
        let event = Event::Stopped {
            frames: 3,
            steps: 2,
            resets: 0,
            tick: 2,
        };
        let line = event.to_json_line();
        assert!(line.ends_with('\n'));
        assert!(line.starts_with(r#"{"type":"stopped""#));
        assert_eq!(Event::from_json(line.trim()).unwrap(), event);
    }

    #[test]
    fn test_snapshot_summary() {
        let mut sim = small_sim(4);
        let mut encoder = SnapshotEncoder::new();
        let mut mirror = SnapshotMirror::new();

        let full = encoder.full(&sim, 60.0);
        mirror.apply(&full).unwrap();
        let summary = SnapshotSummary::describe(&full, &mirror);
        assert_eq!(summary.kind, SnapshotKind::Full);
        assert_eq!(summary.populations.agents, 24);
        assert_eq!(summary.populations.total(), 40);
        assert_eq!(summary.resources, sim.store().resources.len());
        assert_eq!(summary.fps, 60.0);

        sim.step(DT);
        let delta = encoder.delta(&sim, 60.0);
        mirror.apply(&delta).unwrap();
        let summary = SnapshotSummary::describe(&delta, &mirror);
        assert_eq!(summary.kind, SnapshotKind::Delta);
        assert_eq!(summary.tick, 1);
        assert!(summary.changes > 0);

        let line = Event::Snapshot(summary).to_json_line();
        assert!(line.contains(r#""type":"snapshot""#));
        assert!(line.contains(r#""kind":"delta""#));
    }
}
