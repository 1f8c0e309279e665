//! Replay checks: deltas rebuild the same world a full capture shows, and
//! a seed replays to the same state hash.

use serde::{Deserialize, Serialize};

use eco_core::config::EcosystemConfig;
use eco_core::mirror::SnapshotMirror;
use eco_core::simulation::Simulation;
use eco_core::snapshot::{ComponentLists, SnapshotEncoder, SnapshotMessage};

use crate::error::Result;

/// Outcome of a delta replay check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Messages encoded and applied.
    pub messages: u64,
    /// Full messages among them.
    pub fulls: u64,
    /// Encoded bytes of full messages.
    pub full_bytes: u64,
    /// Encoded bytes of delta messages.
    pub delta_bytes: u64,
    /// Ticks where the mirror disagreed with a direct capture.
    pub mismatched_ticks: Vec<u64>,
}

impl ReplayReport {
    /// True if the mirror always matched.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatched_ticks.is_empty()
    }

    /// Mean delta size relative to mean full size.
    #[must_use]
    pub fn delta_ratio(&self) -> f64 {
        let deltas = self.messages - self.fulls;
        if deltas == 0 || self.fulls == 0 || self.full_bytes == 0 {
            return 0.0;
        }
        let mean_delta = self.delta_bytes as f64 / deltas as f64;
        let mean_full = self.full_bytes as f64 / self.fulls as f64;
        mean_delta / mean_full
    }
}

/// Step a world for `ticks`, sending a delta every `every` steps through
/// the bincode codec, and compare the mirror with a direct capture after
/// each message.
pub fn verify_delta_replay(
    config: &EcosystemConfig,
    seed: u64,
    ticks: u64,
    every: u64,
) -> Result<ReplayReport> {
    let mut sim = Simulation::new(config.clone(), seed);
    let dt = config.timing.fixed_dt;
    let every = every.max(1);
    let mut encoder = SnapshotEncoder::new();
    let mut mirror = SnapshotMirror::new();
    let mut report = ReplayReport::default();

    let first = encoder.full(&sim, 0.0);
    send(&first, &mut mirror, &mut report)?;

    for step in 1..=ticks {
        let outcome = sim.step(dt);
        if step % every != 0 && !outcome.reset {
            continue;
        }
        let message = encoder.delta(&sim, 0.0);
        send(&message, &mut mirror, &mut report)?;
        if mirror.components() != ComponentLists::capture(sim.store()) {
            tracing::warn!(tick = sim.tick(), "Mirror diverged from capture");
            report.mismatched_ticks.push(sim.tick());
        }
    }

    tracing::info!(
        messages = report.messages,
        fulls = report.fulls,
        mismatches = report.mismatched_ticks.len(),
        "Delta replay check finished"
    );
    Ok(report)
}

fn send(
    message: &SnapshotMessage,
    mirror: &mut SnapshotMirror,
    report: &mut ReplayReport,
) -> Result<()> {
    let bytes = message.to_bytes()?;
    let decoded = SnapshotMessage::from_bytes(&bytes)?;
    mirror.apply(&decoded)?;
    report.messages += 1;
    if decoded.is_full() {
        report.fulls += 1;
        report.full_bytes += bytes.len() as u64;
    } else {
        report.delta_bytes += bytes.len() as u64;
    }
    Ok(())
}

/// Run the same seed `runs` times and return each final state hash.
#[must_use]
pub fn replay_hashes(config: &EcosystemConfig, seed: u64, ticks: u64, runs: u32) -> Vec<u64> {
    (0..runs)
        .map(|_| {
            let mut sim = Simulation::new(config.clone(), seed);
            let dt = config.timing.fixed_dt;
            for _ in 0..ticks {
                sim.step(dt);
            }
            sim.state_hash()
        })
        .collect()
}
