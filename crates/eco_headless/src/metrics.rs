//! Population metrics for a single run.

use serde::{Deserialize, Serialize};

use eco_core::simulation::{Simulation, StepReport};
use eco_core::snapshot::ComponentLists;
use eco_core::species::Species;

/// Creature counts per species.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Populations {
    /// Agents.
    pub agents: usize,
    /// Predators.
    pub predators: usize,
    /// Apex predators.
    pub apex: usize,
    /// Coral.
    pub coral: usize,
    /// Titans.
    pub titans: usize,
}

impl Populations {
    /// Build from counts in [`Species::ALL`] order.
    #[must_use]
    pub fn from_counts(counts: [usize; 5]) -> Self {
        let [agents, predators, apex, coral, titans] = counts;
        Self {
            agents,
            predators,
            apex,
            coral,
            titans,
        }
    }

    /// Count the live creatures of a world.
    #[must_use]
    pub fn of(sim: &Simulation) -> Self {
        Self::from_counts(sim.store().species_counts())
    }

    /// Count the creatures in mirrored lists.
    #[must_use]
    pub fn of_lists(lists: &ComponentLists) -> Self {
        Self::from_counts(Species::ALL.map(|s| lists.creatures(s).len()))
    }

    /// Count for one species.
    #[must_use]
    pub fn get(&self, species: Species) -> usize {
        match species {
            Species::Agent => self.agents,
            Species::Predator => self.predators,
            Species::Apex => self.apex,
            Species::Coral => self.coral,
            Species::Titan => self.titans,
        }
    }

    /// All creatures.
    #[must_use]
    pub fn total(&self) -> usize {
        self.agents + self.predators + self.apex + self.coral + self.titans
    }

    /// Per-species maximum of two counts.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            agents: self.agents.max(other.agents),
            predators: self.predators.max(other.predators),
            apex: self.apex.max(other.apex),
            coral: self.coral.max(other.coral),
            titans: self.titans.max(other.titans),
        }
    }
}

/// Everything recorded about one seeded run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Seed the run started from.
    pub seed: u64,
    /// Steps executed.
    pub ticks: u64,
    /// Tick counter at the end (lower than `ticks` after a reset).
    pub final_tick: u64,
    /// Extinction resets.
    pub resets: u64,
    /// Kills.
    pub predations: u64,
    /// Offspring.
    pub births: u64,
    /// Starvations.
    pub deaths: u64,
    /// Highest count seen per species.
    pub peak: Populations,
    /// Counts at the end.
    pub final_populations: Populations,
    /// Resources alive at the end.
    pub final_resources: usize,
    /// State hash at the end, for determinism checks.
    pub final_state_hash: u64,
}

/// Accumulates [`RunMetrics`] while a world steps.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: RunMetrics,
}

impl MetricsCollector {
    /// Start recording a world.
    #[must_use]
    pub fn new(sim: &Simulation) -> Self {
        Self {
            metrics: RunMetrics {
                seed: sim.seed(),
                peak: Populations::of(sim),
                ..RunMetrics::default()
            },
        }
    }

    /// Record one step.
    pub fn observe(&mut self, report: &StepReport, sim: &Simulation) {
        let m = &mut self.metrics;
        m.ticks += 1;
        m.predations += report.predations.len() as u64;
        m.births += report.births.len() as u64;
        m.deaths += report.deaths.len() as u64;
        if report.reset {
            m.resets += 1;
        }
        m.peak = m.peak.max(Populations::of(sim));
    }

    /// Finish with the world's final state.
    #[must_use]
    pub fn finish(mut self, sim: &Simulation) -> RunMetrics {
        self.metrics.final_tick = sim.tick();
        self.metrics.final_populations = Populations::of(sim);
        self.metrics.final_resources = sim.store().resources.len();
        self.metrics.final_state_hash = sim.state_hash();
        self.metrics
    }
}

/// Step a world `ticks` times and record what happened.
#[must_use]
pub fn record_run(mut sim: Simulation, ticks: u64) -> RunMetrics {
    let dt = sim.config().timing.fixed_dt;
    let mut collector = MetricsCollector::new(&sim);
    for _ in 0..ticks {
        let report = sim.step(dt);
        collector.observe(&report, &sim);
    }
    collector.finish(&sim)
}
