//! Replay harness: build the same seeded world more than once, step it,
//! and compare state hashes.
//!
//! # Testing Strategy
//!
//! Exact determinism across machines is not a goal, but a seeded world on
//! one build must replay bit for bit. Sources of non-determinism include:
//!
//! - **System randomness**: every draw goes through the injected
//!   [`RandomSource`](eco_core::random::RandomSource), seeded per world.
//!
//! - **HashMap iteration order**: component tables are `BTreeMap`s and the
//!   spatial grid preserves insertion order, so systems visit entities in
//!   ascending id order.
//!
//! - **Wall-clock time**: `Simulation::step` never reads a clock; only the
//!   fixed-step driver does, and it feeds the governor separately.

use std::thread;

use eco_core::simulation::Simulation;

use crate::fixtures::DT;

/// Final hashes of several replays of the same setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// One final hash per replay, in launch order.
    pub hashes: Vec<u64>,
    /// Steps each replay ran.
    pub ticks: u64,
}

impl ReplayOutcome {
    /// True when every replay ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Sorted distinct hashes; one entry for a deterministic run.
    #[must_use]
    pub fn distinct_hashes(&self) -> Vec<u64> {
        let mut distinct = self.hashes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct
    }

    /// # Panics
    ///
    /// Panics, listing every hash, if the replays disagree.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "{} replays of {} ticks ended on {} different states: {:?}",
            self.hashes.len(),
            self.ticks,
            self.distinct_hashes().len(),
            self.hashes
        );
    }
}

/// Replay any stepped state `runs` times and collect its final hashes.
///
/// ```
/// use eco_test_utils::determinism::verify_determinism;
///
/// let outcome = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
/// outcome.assert_deterministic();
/// ```
pub fn verify_determinism<S>(
    runs: usize,
    ticks: u64,
    setup: impl Fn() -> S,
    step: impl Fn(&mut S),
    hash: impl Fn(&S) -> u64,
) -> ReplayOutcome {
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            (0..ticks).for_each(|_| step(&mut state));
            hash(&state)
        })
        .collect();
    ReplayOutcome { hashes, ticks }
}

/// Step a world `ticks` times at the runtime step and return its hash.
#[must_use]
pub fn final_hash(mut sim: Simulation, ticks: u64) -> u64 {
    for _ in 0..ticks {
        sim.step(DT);
    }
    sim.state_hash()
}

/// True if two worlds built by `setup` end in the same state.
pub fn replays_identically(setup: impl Fn() -> Simulation, ticks: u64) -> bool {
    final_hash(setup(), ticks) == final_hash(setup(), ticks)
}

/// Replay one setup on `threads` scoped threads at once.
///
/// Shakes out state that leaks between worlds or depends on scheduling.
pub fn replay_on_threads<F>(setup: F, threads: usize, ticks: u64) -> ReplayOutcome
where
    F: Fn() -> Simulation + Sync,
{
    let setup = &setup;
    let hashes = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| scope.spawn(move || final_hash(setup(), ticks)))
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("replay thread panicked"))
            .collect()
    });
    ReplayOutcome { hashes, ticks }
}

/// Step two worlds from `setup` side by side and report the first tick
/// whose hashes differ. `Some(0)` means they differ before any step.
pub fn first_divergent_tick(setup: impl Fn() -> Simulation, ticks: u64) -> Option<u64> {
    let mut left = setup();
    let mut right = setup();
    for tick in 0..=ticks {
        if tick > 0 {
            left.step(DT);
            right.step(DT);
        }
        if left.state_hash() != right.state_hash() {
            tracing::debug!(tick, "Replays diverged");
            return Some(tick);
        }
    }
    None
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use eco_core::control::ControlMessage;
    use eco_core::math::Vec2;
    use eco_core::species::Species;
    use proptest::prelude::*;

    /// Any species.
    pub fn arb_species() -> impl Strategy<Value = Species> {
        prop::sample::select(Species::ALL.to_vec())
    }

    /// A point inside a `width` by `height` world.
    pub fn arb_point(width: f32, height: f32) -> impl Strategy<Value = Vec2> {
        (0.0..width, 0.0..height).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// A list of points, possibly clustered, inside the world.
    pub fn arb_points(width: f32, height: f32, max: usize) -> impl Strategy<Value = Vec<Vec2>> {
        proptest::collection::vec(arb_point(width, height), 0..max)
    }

    /// A world seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// A control message with usable values.
    pub fn arb_control_message() -> impl Strategy<Value = ControlMessage> {
        prop_oneof![
            Just(ControlMessage::Pause),
            Just(ControlMessage::Resume),
            Just(ControlMessage::Toggle),
            Just(ControlMessage::Resync),
            (0.1_f32..6.0).prop_map(|value| ControlMessage::SetZoom { value }),
            (0.0_f32..2400.0, 0.0_f32..1440.0)
                .prop_map(|(x, y)| ControlMessage::SetCamera { x, y }),
            (0.0_f32..2400.0, 0.0_f32..1440.0, -1.0_f32..1.0)
                .prop_map(|(x, y, polarity)| ControlMessage::PaintForceField { x, y, polarity }),
        ]
    }
}
