//! The consumer thread: rebuilds world state from snapshot bytes.
//!
//! A delta that does not continue the mirror's sequence is dropped and a
//! single [`ControlMessage::Resync`] goes back to the owner. Further deltas
//! are dropped quietly until a full message arrives.

use std::io::Write;
use std::sync::mpsc::{Receiver, Sender};

use eco_core::control::ControlMessage;
use eco_core::error::EcoError;
use eco_core::mirror::SnapshotMirror;
use eco_core::snapshot::SnapshotMessage;

use crate::protocol::{Event, SnapshotSummary};

/// Totals reported when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerSummary {
    /// Messages applied to the mirror.
    pub applied: u64,
    /// Messages dropped.
    pub rejected: u64,
    /// Resync requests sent.
    pub resyncs: u64,
}

/// Consumer-side state.
#[derive(Debug)]
pub struct Consumer {
    mirror: SnapshotMirror,
    control: Sender<ControlMessage>,
    awaiting_full: bool,
    summary: ConsumerSummary,
}

impl Consumer {
    /// A consumer with an empty mirror that reports back on `control`.
    #[must_use]
    pub fn new(control: Sender<ControlMessage>) -> Self {
        Self {
            mirror: SnapshotMirror::new(),
            control,
            awaiting_full: false,
            summary: ConsumerSummary::default(),
        }
    }

    /// The mirrored state.
    #[must_use]
    pub fn mirror(&self) -> &SnapshotMirror {
        &self.mirror
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> ConsumerSummary {
        self.summary
    }

    /// Decode and apply one message.
    ///
    /// Returns the event to print, if any.
    pub fn receive(&mut self, bytes: &[u8]) -> Option<Event> {
        let message = match SnapshotMessage::from_bytes(bytes) {
            Ok(message) => message,
            Err(e) => {
                self.summary.rejected += 1;
                tracing::warn!(error = %e, "Undecodable snapshot");
                let message = e.to_string();
                return Some(
                    self.request_resync(message.clone())
                        .unwrap_or(Event::Error { message }),
                );
            }
        };

        match self.mirror.apply(&message) {
            Ok(()) => {
                if message.is_full() {
                    self.awaiting_full = false;
                }
                self.summary.applied += 1;
                Some(Event::Snapshot(SnapshotSummary::describe(
                    &message,
                    &self.mirror,
                )))
            }
            Err(e @ (EcoError::SequenceGap { .. } | EcoError::MissingBaseline)) => {
                self.summary.rejected += 1;
                tracing::debug!(error = %e, "Dropped delta");
                self.request_resync(e.to_string())
            }
            Err(e) => {
                self.summary.rejected += 1;
                Some(Event::Error {
                    message: e.to_string(),
                })
            }
        }
    }

    fn request_resync(&mut self, reason: String) -> Option<Event> {
        if self.awaiting_full {
            return None;
        }
        self.awaiting_full = true;
        self.summary.resyncs += 1;
        if self.control.send(ControlMessage::Resync).is_err() {
            tracing::warn!("Owner gone, cannot request resync");
        }
        tracing::info!(%reason, "Requested full snapshot");
        Some(Event::Resync { reason })
    }

    /// Apply messages until the owner hangs up, writing one JSON line per
    /// event to `out`.
    pub fn run<W: Write>(mut self, snapshots: &Receiver<Vec<u8>>, out: &mut W) -> ConsumerSummary {
        for bytes in snapshots {
            let Some(event) = self.receive(&bytes) else {
                continue;
            };
            if let Err(e) = out
                .write_all(event.to_json_line().as_bytes())
                .and_then(|()| out.flush())
            {
                tracing::error!(error = %e, "Failed to write event");
                break;
            }
        }
        tracing::info!(
            applied = self.summary.applied,
            rejected = self.summary.rejected,
            resyncs = self.summary.resyncs,
            "Consumer stopped"
        );
        self.summary
    }
}
