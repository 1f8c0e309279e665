//! Interactive session: owner and consumer threads joined by channels.
//!
//! ```text
//!   stdin ──ControlMessage──▶ owner ──bincode bytes──▶ consumer ──JSON──▶ stdout
//!                               ▲                          │
//!                               └────────── Resync ────────┘
//! ```

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use eco_core::control::ControlMessage;
use eco_core::simulation::Simulation;

use crate::config::HeadlessConfig;
use crate::consumer::{Consumer, ConsumerSummary};
use crate::error::{HeadlessError, Result};
use crate::owner::{Owner, OwnerSummary};
use crate::protocol::parse_control;

/// Handles to a running session.
#[derive(Debug)]
pub struct Session {
    control: Sender<ControlMessage>,
    owner: JoinHandle<OwnerSummary>,
    consumer: JoinHandle<ConsumerSummary>,
}

impl Session {
    /// Start the owner and consumer threads. The consumer writes events
    /// to `out`.
    pub fn spawn<W>(sim: Simulation, config: &HeadlessConfig, mut out: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (control_tx, control_rx) = mpsc::channel();
        let (snap_tx, snap_rx) = mpsc::channel();
        let frame_period = Duration::from_millis(config.frame_ms.max(1));
        let max_frames = config.max_frames;

        let mut owner_state = Owner::new(sim);
        if config.start_paused {
            owner_state.handle(ControlMessage::Pause);
        }

        let owner = thread::Builder::new()
            .name("eco-owner".to_string())
            .spawn(move || owner_state.run(&control_rx, &snap_tx, frame_period, max_frames))?;

        let consumer_state = Consumer::new(control_tx.clone());
        let consumer = thread::Builder::new()
            .name("eco-consumer".to_string())
            .spawn(move || consumer_state.run(&snap_rx, &mut out))?;

        Ok(Self {
            control: control_tx,
            owner,
            consumer,
        })
    }

    /// Sender for control messages.
    #[must_use]
    pub fn control(&self) -> Sender<ControlMessage> {
        self.control.clone()
    }

    /// Wait for both threads to stop.
    ///
    /// The owner stops on `quit` or its frame limit; the consumer follows
    /// once the snapshot channel closes.
    pub fn join(self) -> Result<(OwnerSummary, ConsumerSummary)> {
        drop(self.control);
        let owner = self
            .owner
            .join()
            .map_err(|_| HeadlessError::ThreadPanicked("owner"))?;
        let consumer = self
            .consumer
            .join()
            .map_err(|_| HeadlessError::ThreadPanicked("consumer"))?;
        Ok((owner, consumer))
    }
}

/// Forward control lines from `reader` until EOF or until the owner is
/// gone. Malformed lines are logged and skipped.
///
/// Returns the number of messages forwarded.
pub fn forward_control_lines<R: BufRead>(reader: R, control: &Sender<ControlMessage>) -> usize {
    let mut forwarded = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read control input");
                break;
            }
        };
        match parse_control(&line) {
            Ok(Some(message)) => {
                if control.send(message).is_err() {
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, line = %line, "Ignoring malformed control line"),
        }
    }
    forwarded
}
