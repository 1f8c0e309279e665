//! # Eco Headless
//!
//! Headless runner for the ecosystem simulation.
//!
//! Runs the owner/consumer pair without any rendering so the snapshot
//! stream can be driven from scripts and checked in CI.
//!
//! ## Protocol
//!
//! Communication uses JSON lines over stdin/stdout:
//! - **stdin**: control messages (`pause`, `set_zoom`, `paint_force_field`, `quit`, ...)
//! - **stdout**: one event per applied snapshot, plus `ready` and `stopped`
//! - **stderr**: logs
//!
//! ## Threads
//!
//! - **owner**: holds the [`Simulation`](eco_core::simulation::Simulation),
//!   runs the fixed-step clock and publishes bincode snapshots
//! - **consumer**: mirrors snapshots and asks for a resync on gaps
//!
//! ## Batch Mode
//!
//! For population studies, run many seeds in parallel:
//!
//! ```bash
//! eco_headless batch --count 32 --ticks 5000 --output results/
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod owner;
pub mod protocol;
pub mod session;
pub mod verify;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use config::HeadlessConfig;
pub use error::{HeadlessError, Result};
pub use metrics::{Populations, RunMetrics};
pub use protocol::{Event, PROTOCOL_VERSION};
pub use session::Session;
