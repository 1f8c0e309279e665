//! The owner thread: sole holder of the simulation.
//!
//! Each frame the owner drains pending control messages, advances the
//! fixed-step clock, and hands a snapshot to the consumer when the
//! publisher says one is due. Snapshots leave as bincode bytes, so the
//! consumer never touches owner memory.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eco_core::clock::{FixedStepClock, FpsCounter, FrameReport};
use eco_core::control::{ControlMessage, ControlOutcome, RunControl};
use eco_core::publisher::SnapshotPublisher;
use eco_core::simulation::Simulation;
use eco_core::snapshot::SnapshotMessage;

/// Totals reported when the owner stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerSummary {
    /// Frames run.
    pub frames: u64,
    /// Simulation steps run.
    pub steps: u64,
    /// Extinction resets.
    pub resets: u64,
    /// Snapshots handed to the consumer.
    pub sent: u64,
    /// Tick at exit.
    pub tick: u64,
    /// Seed at exit.
    pub seed: u64,
}

/// Owner-side state.
#[derive(Debug)]
pub struct Owner {
    sim: Simulation,
    clock: FixedStepClock,
    fps: FpsCounter,
    publisher: SnapshotPublisher,
    control: RunControl,
    summary: OwnerSummary,
}

impl Owner {
    /// Take ownership of a world.
    #[must_use]
    pub fn new(sim: Simulation) -> Self {
        let timing = &sim.config().timing;
        let clock = FixedStepClock::new(timing);
        let publisher = SnapshotPublisher::new(timing);
        Self {
            sim,
            clock,
            fps: FpsCounter::default(),
            publisher,
            control: RunControl::new(),
            summary: OwnerSummary::default(),
        }
    }

    /// The owned world.
    #[must_use]
    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    /// True while ticks are suspended.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// True once a quit was received.
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.control.should_quit()
    }

    /// Apply one control message between frames.
    pub fn handle(&mut self, message: ControlMessage) -> ControlOutcome {
        let was_paused = self.control.is_paused();
        let outcome = self.control.apply(message, &mut self.sim);
        if was_paused && !self.control.is_paused() {
            // Time spent paused is not owed to the simulation
            self.clock.clear();
        }
        if self.control.take_resync() {
            self.publisher.request_full();
        }
        tracing::debug!(?message, ?outcome, "Applied control message");
        outcome
    }

    /// Apply everything waiting on `control`. Returns false once the
    /// channel is closed.
    pub fn drain(&mut self, control: &Receiver<ControlMessage>) -> bool {
        loop {
            match control.try_recv() {
                Ok(message) => {
                    self.handle(message);
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Run one frame of `frame_ms` wall time at `now_ms` since start.
    ///
    /// Returns the frame report and the snapshot due, if any.
    pub fn frame(&mut self, frame_ms: f64, now_ms: f64) -> (FrameReport, Option<SnapshotMessage>) {
        let fps = self.fps.frame(frame_ms);
        self.summary.frames += 1;

        let report = if self.control.is_paused() {
            FrameReport {
                band: self.sim.governor().band(),
                ..FrameReport::default()
            }
        } else {
            self.clock.advance(frame_ms, &mut self.sim)
        };
        self.summary.steps += u64::from(report.steps);
        if report.reset {
            self.summary.resets += 1;
            self.publisher.request_full();
        }

        // Pause only stops ticks; camera and field changes still go out
        let snapshot = self.publisher.poll(now_ms, &self.sim, fps);
        if snapshot.is_some() {
            self.summary.sent += 1;
        }
        (report, snapshot)
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> OwnerSummary {
        OwnerSummary {
            tick: self.sim.tick(),
            seed: self.sim.seed(),
            ..self.summary
        }
    }

    /// Run the frame loop until quit, the frame limit, or the consumer
    /// hanging up.
    ///
    /// `max_frames == 0` means no limit.
    pub fn run(
        mut self,
        control: &Receiver<ControlMessage>,
        snapshots: &Sender<Vec<u8>>,
        frame_period: Duration,
        max_frames: u64,
    ) -> OwnerSummary {
        let started = Instant::now();
        let mut last = started;
        let mut control_open = true;

        loop {
            if control_open {
                control_open = self.drain(control);
            }
            if self.should_quit() {
                tracing::info!("Quit requested");
                break;
            }

            let now = Instant::now();
            let frame_ms = now.duration_since(last).as_secs_f64() * 1000.0;
            last = now;
            let now_ms = now.duration_since(started).as_secs_f64() * 1000.0;

            let (report, snapshot) = self.frame(frame_ms, now_ms);
            if report.reset {
                tracing::info!(seed = self.sim.seed(), "World reset, full snapshot queued");
            }
            if let Some(message) = snapshot {
                match message.to_bytes() {
                    Ok(bytes) => {
                        if snapshots.send(bytes).is_err() {
                            tracing::info!("Consumer hung up");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Dropping snapshot");
                        self.publisher.request_full();
                    }
                }
            }

            if max_frames > 0 && self.summary.frames >= max_frames {
                break;
            }
            thread::sleep(frame_period.saturating_sub(now.elapsed()));
        }

        let summary = self.summary();
        tracing::info!(
            frames = summary.frames,
            steps = summary.steps,
            resets = summary.resets,
            sent = summary.sent,
            "Owner stopped"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use eco_test_utils::fixtures::{empty_sim, small_sim};

    #[test]
    fn test_first_frame_sends_full() {
        let mut owner = Owner::new(small_sim(1));
        let (report, snapshot) = owner.frame(16.0, 16.0);
        assert_eq!(report.steps, 0);
        assert!(snapshot.unwrap().is_full());
    }

    #[test]
    fn test_frames_accumulate_steps() {
        let mut owner = Owner::new(small_sim(1));
        let mut steps = 0;
        for i in 1..=8 {
            let (report, _) = owner.frame(16.0, f64::from(i) * 16.0);
            steps += report.steps;
        }
        // 128 ms of wall time at 60 ms per step
        assert_eq!(steps, 2);
        assert_eq!(owner.sim().tick(), 2);
        assert_eq!(owner.summary().steps, 2);
    }

    #[test]
    fn test_pause_freezes_ticks_but_keeps_sending() {
        let mut owner = Owner::new(small_sim(1));
        owner.frame(16.0, 0.0);
        owner.handle(ControlMessage::Pause);
        owner.handle(ControlMessage::SetZoom { value: 2.0 });

        let mut delivered = Vec::new();
        for i in 1..=20 {
            let (report, snapshot) = owner.frame(100.0, f64::from(i) * 100.0);
            assert_eq!(report.steps, 0);
            delivered.extend(snapshot);
        }

        assert_eq!(owner.sim().tick(), 0);
        assert!(!delivered.is_empty());
        for message in &delivered {
            assert_eq!(message.envelope().tick, 0);
            assert_eq!(message.envelope().camera.zoom, 2.0);
        }
    }

    #[test]
    fn test_extinction_reset_sends_full() {
        let mut owner = Owner::new(empty_sim(4));
        let (_, first) = owner.frame(16.0, 0.0);
        assert!(first.unwrap().is_full());
        let seed = owner.sim().seed();

        let (report, snapshot) = owner.frame(60.0, 60.0);

        assert!(report.reset);
        assert_eq!(owner.summary().resets, 1);
        let message = snapshot.unwrap();
        assert!(message.is_full());
        assert_eq!(message.envelope().seed, owner.sim().seed());
        assert_ne!(owner.sim().seed(), seed);
    }

    #[test]
    fn test_resume_discards_paused_time() {
        let mut owner = Owner::new(small_sim(1));
        owner.handle(ControlMessage::Pause);
        owner.frame(50.0, 50.0);
        owner.handle(ControlMessage::Resume);

        let (report, _) = owner.frame(30.0, 80.0);
        assert_eq!(report.steps, 0);
        let (report, _) = owner.frame(30.0, 110.0);
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn test_resync_forces_full() {
        let mut owner = Owner::new(small_sim(1));
        owner.frame(16.0, 0.0);
        let (_, snapshot) = owner.frame(60.0, 60.0);
        assert!(!snapshot.unwrap().is_full());

        owner.handle(ControlMessage::Resync);
        let (_, snapshot) = owner.frame(1.0, 61.0);
        assert!(snapshot.unwrap().is_full());
    }

    #[test]
    fn test_drain_applies_queue_and_reports_close() {
        let mut owner = Owner::new(small_sim(1));
        let (tx, rx) = mpsc::channel();
        tx.send(ControlMessage::SetZoom { value: 2.0 }).unwrap();
        tx.send(ControlMessage::Quit).unwrap();
        assert!(owner.drain(&rx));
        assert_eq!(owner.sim().camera().zoom, 2.0);
        assert!(owner.should_quit());

        drop(tx);
        assert!(!owner.drain(&rx));
    }

    #[test]
    fn test_run_stops_at_frame_limit() {
        let owner = Owner::new(small_sim(1));
        let (_control_tx, control_rx) = mpsc::channel();
        let (snap_tx, snap_rx) = mpsc::channel();

        let summary = owner.run(&control_rx, &snap_tx, Duration::from_millis(1), 4);

        assert_eq!(summary.frames, 4);
        let first = snap_rx.try_recv().unwrap();
        assert!(SnapshotMessage::from_bytes(&first).unwrap().is_full());
    }

    #[test]
    fn test_run_stops_on_quit() {
        let owner = Owner::new(small_sim(1));
        let (control_tx, control_rx) = mpsc::channel();
        let (snap_tx, _snap_rx) = mpsc::channel();
        control_tx.send(ControlMessage::Quit).unwrap();

        let summary = owner.run(&control_rx, &snap_tx, Duration::from_millis(1), 0);

        assert_eq!(summary.frames, 0);
    }
}
