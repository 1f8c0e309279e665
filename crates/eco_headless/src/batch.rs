//! Batch runner for population studies.
//!
//! Runs many seeds of the same world in parallel using rayon and collects
//! [`RunMetrics`] for each.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use eco_core::config::EcosystemConfig;
use eco_core::simulation::Simulation;

use crate::error::{HeadlessError, Result};
use crate::metrics::{record_run, RunMetrics};

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of worlds to run.
    pub runs: u32,
    /// Seed of the first world; the rest follow consecutively.
    pub seed_start: u64,
    /// Steps per world.
    pub ticks: u64,
    /// Worker threads (0 = rayon default).
    pub parallel: u32,
    /// World config shared by every run.
    pub ecosystem: EcosystemConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            runs: 8,
            seed_start: 0,
            ticks: 1000,
            parallel: 0,
            ecosystem: EcosystemConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Config for `runs` worlds.
    #[must_use]
    pub fn new(runs: u32) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set steps per world.
    #[must_use]
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Set worker threads.
    #[must_use]
    pub fn with_parallel(mut self, parallel: u32) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the world config.
    #[must_use]
    pub fn with_ecosystem(mut self, ecosystem: EcosystemConfig) -> Self {
        self.ecosystem = ecosystem;
        self
    }
}

/// Aggregates over all runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs that reset at least once.
    pub runs_with_reset: u32,
    /// Resets across all runs.
    pub total_resets: u64,
    /// Mean final creature count.
    pub mean_final_creatures: f64,
    /// Mean peak agent count.
    pub mean_peak_agents: f64,
    /// Kills across all runs.
    pub total_predations: u64,
}

impl BatchSummary {
    /// Summarize a set of runs.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;
        Self {
            runs_with_reset: runs.iter().filter(|r| r.resets > 0).count() as u32,
            total_resets: runs.iter().map(|r| r.resets).sum(),
            mean_final_creatures: runs
                .iter()
                .map(|r| r.final_populations.total() as f64)
                .sum::<f64>()
                / n,
            mean_peak_agents: runs.iter().map(|r| r.peak.agents as f64).sum::<f64>() / n,
            total_predations: runs.iter().map(|r| r.predations).sum(),
        }
    }
}

/// Results of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// What was run.
    pub config: BatchConfig,
    /// One entry per seed, in seed order.
    pub runs: Vec<RunMetrics>,
    /// Aggregates.
    pub summary: BatchSummary,
    /// Wall time.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run every seed of the batch.
pub fn run_batch(config: BatchConfig) -> Result<BatchResults> {
    let start = Instant::now();
    info!(
        runs = config.runs,
        seed_start = config.seed_start,
        ticks = config.ticks,
        "Starting batch run"
    );

    let run_all = || -> Vec<RunMetrics> {
        (0..config.runs)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                let sim = Simulation::new(config.ecosystem.clone(), seed);
                let metrics = record_run(sim, config.ticks);
                debug!(seed, resets = metrics.resets, "Run finished");
                metrics
            })
            .collect()
    };

    let runs = if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
            .map_err(|e| HeadlessError::Pool(e.to_string()))?
            .install(run_all)
    } else {
        run_all()
    };

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        runs = runs.len(),
        resets = summary.total_resets,
        duration_secs = format!("{duration_seconds:.1}"),
        "Batch execution finished"
    );

    Ok(BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
    })
}
