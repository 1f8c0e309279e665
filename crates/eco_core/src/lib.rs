//! # Eco Core
//!
//! Multi-species ecosystem simulation core.
//!
//! This crate contains the simulation and its state-sync protocol only:
//! - No rendering
//! - No threads
//! - No system randomness (every draw goes through [`random::RandomSource`])
//!
//! A seeded world replays identically on the same build, which lets the
//! headless runner and the test suite check determinism with state hashes.
//!
//! ## Crate Structure
//!
//! - [`store`] - Entity ids and sparse component tables
//! - [`spatial`] - Uniform grid for neighbour queries
//! - [`systems`] - Per-tick behaviour systems
//! - [`simulation`] - Orchestrator and world reset
//! - [`governor`] - Load bands driving stride and effect quality
//! - [`clock`] - Fixed-step accumulator
//! - [`snapshot`], [`mirror`], [`publisher`] - Full/delta state stream
//! - [`control`] - Pause, camera and paint requests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod components;
pub mod config;
pub mod control;
pub mod error;
pub mod governor;
pub mod math;
pub mod mirror;
pub mod publisher;
pub mod random;
pub mod simulation;
pub mod snapshot;
pub mod spatial;
pub mod species;
pub mod store;
pub mod systems;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{FixedStepClock, FpsCounter, FrameReport};
    pub use crate::components::*;
    pub use crate::config::EcosystemConfig;
    pub use crate::control::{ControlMessage, ControlOutcome, RunControl};
    pub use crate::error::{EcoError, Result};
    pub use crate::governor::{Governor, LoadBand};
    pub use crate::math::Vec2;
    pub use crate::mirror::SnapshotMirror;
    pub use crate::publisher::SnapshotPublisher;
    pub use crate::random::{RandomSource, SeededRandom};
    pub use crate::simulation::{Simulation, StepReport};
    pub use crate::snapshot::{ComponentLists, SnapshotEncoder, SnapshotMessage};
    pub use crate::species::Species;
    pub use crate::store::EntityStore;
    pub use crate::world::{Camera, Globals, Regime};
}
