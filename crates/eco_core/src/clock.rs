//! Fixed-step driver.
//!
//! Turns irregular wall-clock frames into a bounded number of whole
//! `step(fixed_dt)` calls. Each step is timed and the measurement is fed to
//! the governor.

use std::time::Instant;

use crate::config::TimingConfig;
use crate::governor::LoadBand;
use crate::simulation::{Simulation, StepReport};

/// Result of advancing one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Steps run this frame.
    pub steps: u32,
    /// True if a step ended in an extinction reset. The frame stops there.
    pub reset: bool,
    /// Kills across all steps.
    pub predations: usize,
    /// Births across all steps.
    pub births: usize,
    /// Starvations across all steps.
    pub deaths: usize,
    /// Band chosen after the last step.
    pub band: LoadBand,
}

impl FrameReport {
    fn absorb(&mut self, step: &StepReport) {
        self.steps += 1;
        self.predations += step.predations.len();
        self.births += step.births.len();
        self.deaths += step.deaths.len();
    }
}

/// Accumulator for fixed-timestep stepping.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepClock {
    step_ms: f64,
    max_frame_ms: f64,
    max_steps: u32,
    accumulator_ms: f64,
}

impl FixedStepClock {
    /// Create a clock from the timing configuration.
    #[must_use]
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            // Round to whole microseconds so 0.06_f32 becomes exactly 60 ms
            step_ms: (f64::from(timing.fixed_dt) * 1_000_000.0).round() / 1000.0,
            max_frame_ms: timing.max_frame_ms,
            max_steps: timing.max_steps_per_frame.max(1),
            accumulator_ms: 0.0,
        }
    }

    /// Time banked but not yet stepped.
    #[must_use]
    pub fn accumulator_ms(&self) -> f64 {
        self.accumulator_ms
    }

    /// Duration of one step in milliseconds.
    #[must_use]
    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    /// Add `frame_ms` of wall time (capped) and run as many whole steps as
    /// the accumulator allows, up to the per-frame limit. Leftover time is
    /// kept for the next frame.
    pub fn advance(&mut self, frame_ms: f64, sim: &mut Simulation) -> FrameReport {
        if frame_ms.is_finite() && frame_ms > 0.0 {
            self.accumulator_ms += frame_ms.min(self.max_frame_ms);
        }
        let dt = (self.step_ms / 1000.0) as f32;
        let mut report = FrameReport {
            band: sim.governor().band(),
            ..FrameReport::default()
        };

        while self.accumulator_ms >= self.step_ms && report.steps < self.max_steps {
            let started = Instant::now();
            let step = sim.step(dt);
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            report.absorb(&step);

            if step.reset {
                self.accumulator_ms = 0.0;
                report.reset = true;
                report.band = sim.governor().band();
                break;
            }

            report.band = sim.record_step_time(elapsed_ms);
            self.accumulator_ms -= self.step_ms;
        }

        report
    }

    /// Drop any banked time, e.g. when resuming from pause.
    pub fn clear(&mut self) {
        self.accumulator_ms = 0.0;
    }
}

/// Frames-per-second estimate over fixed windows.
#[derive(Debug, Clone, PartialEq)]
pub struct FpsCounter {
    window_ms: f64,
    elapsed_ms: f64,
    frames: u32,
    fps: f64,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(500.0)
    }
}

impl FpsCounter {
    /// Counter that recomputes the rate every `window_ms`.
    #[must_use]
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            elapsed_ms: 0.0,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Record one frame of `frame_ms` and return the current estimate.
    pub fn frame(&mut self, frame_ms: f64) -> f64 {
        if frame_ms.is_finite() && frame_ms >= 0.0 {
            self.elapsed_ms += frame_ms;
        }
        self.frames += 1;
        if self.elapsed_ms >= self.window_ms {
            self.fps = f64::from(self.frames) * 1000.0 / self.elapsed_ms;
            self.frames = 0;
            self.elapsed_ms = 0.0;
        }
        self.fps
    }

    /// Last computed rate.
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EcosystemConfig;

    fn small_sim() -> Simulation {
        let config = EcosystemConfig::from_ron_str(
            "(population: (agents: 10, predators: 2, apex: 1, coral: 1, titans: 1, resources: 30))",
        )
        .unwrap();
        Simulation::new(config, 21)
    }

    #[test]
    fn test_whole_steps_and_leftover() {
        let mut sim = small_sim();
        let mut clock = FixedStepClock::new(&TimingConfig::default());

        let report = clock.advance(130.0, &mut sim);
        assert_eq!(report.steps, 2);
        assert!((clock.accumulator_ms() - 10.0).abs() < 1e-6);
        assert_eq!(sim.tick(), 2);

        let report = clock.advance(50.0, &mut sim);
        assert_eq!(report.steps, 1);
        assert!(clock.accumulator_ms() < 1e-6);
    }

    #[test]
    fn test_frame_cap_limits_catch_up() {
        let mut sim = small_sim();
        let mut clock = FixedStepClock::new(&TimingConfig::default());

        // A 5 s stall counts as 200 ms: three steps, 20 ms left over
        let report = clock.advance(5000.0, &mut sim);
        assert_eq!(report.steps, 3);
        assert!((clock.accumulator_ms() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_step_limit_per_frame() {
        let mut sim = small_sim();
        let timing = TimingConfig {
            max_frame_ms: 10_000.0,
            ..TimingConfig::default()
        };
        let mut clock = FixedStepClock::new(&timing);
        let report = clock.advance(1000.0, &mut sim);
        assert_eq!(report.steps, 8);
        assert!(clock.accumulator_ms() > 0.0);
    }

    #[test]
    fn test_reset_clears_accumulator() {
        let mut sim = small_sim();
        for id in sim.store().creatures.ids() {
            sim.store_mut().destroy_entity(id);
        }
        let mut clock = FixedStepClock::new(&TimingConfig::default());
        let report = clock.advance(200.0, &mut sim);
        assert!(report.reset);
        assert_eq!(report.steps, 1);
        assert_eq!(clock.accumulator_ms(), 0.0);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn test_invalid_frame_time_is_ignored() {
        let mut sim = small_sim();
        let mut clock = FixedStepClock::new(&TimingConfig::default());
        assert_eq!(clock.advance(f64::NAN, &mut sim).steps, 0);
        assert_eq!(clock.advance(-5.0, &mut sim).steps, 0);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn test_fps_window() {
        let mut fps = FpsCounter::default();
        for _ in 0..29 {
            assert_eq!(fps.frame(16.0), 0.0);
        }
        // 32 frames of 16 ms reach the 500 ms window
        fps.frame(16.0);
        fps.frame(16.0);
        let rate = fps.frame(16.0);
        assert!((rate - 62.5).abs() < 1e-9);
    }
}
