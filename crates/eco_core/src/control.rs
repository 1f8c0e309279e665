//! Control messages accepted by the simulation owner.
//!
//! Messages arrive by value from another thread. Each is applied between
//! frames, never mid-step. Values that cannot be used (non-finite numbers)
//! are dropped with a warning and leave the world unchanged.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::Vec2;
use crate::simulation::Simulation;

/// A request from the consumer side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Stop issuing ticks.
    Pause,
    /// Start issuing ticks again.
    Resume,
    /// Flip between paused and running.
    Toggle,
    /// Set camera zoom. Clamped to the accepted range.
    SetZoom {
        /// Requested zoom factor.
        value: f32,
    },
    /// Move the camera centre.
    SetCamera {
        /// Centre x.
        x: f32,
        /// Centre y.
        y: f32,
    },
    /// Paint an attractor (positive) or repeller (negative).
    PaintForceField {
        /// World x.
        x: f32,
        /// World y.
        y: f32,
        /// Sign and scale of the field, clamped to `[-1, 1]`.
        polarity: f32,
    },
    /// Ask for a full snapshot on the next send.
    Resync,
    /// Stop the owner loop.
    Quit,
}

/// What applying a message changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Run state changed (or was confirmed).
    RunState {
        /// Whether ticks are now suspended.
        paused: bool,
    },
    /// Camera moved or zoomed.
    Camera,
    /// A field was created or moved.
    FieldPainted(EntityId),
    /// A full snapshot is due.
    ResyncRequested,
    /// The owner should stop.
    Quit,
    /// The message carried unusable values and was dropped.
    Ignored,
}

/// Owner-side run state driven by control messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunControl {
    paused: bool,
    resync_requested: bool,
    quit: bool,
}

impl RunControl {
    /// Running, no pending requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while ticks are suspended.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// True once a quit was received.
    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.quit
    }

    /// Take a pending resync request, clearing it.
    pub fn take_resync(&mut self) -> bool {
        std::mem::take(&mut self.resync_requested)
    }

    /// Apply one message to the run state and the world.
    pub fn apply(&mut self, message: ControlMessage, sim: &mut Simulation) -> ControlOutcome {
        match message {
            ControlMessage::Pause => self.set_paused(true),
            ControlMessage::Resume => self.set_paused(false),
            ControlMessage::Toggle => self.set_paused(!self.paused),
            ControlMessage::SetZoom { value } => {
                if !value.is_finite() {
                    tracing::warn!(value, "Ignoring non-finite zoom");
                    return ControlOutcome::Ignored;
                }
                sim.camera_mut().set_zoom(value);
                ControlOutcome::Camera
            }
            ControlMessage::SetCamera { x, y } => {
                if !(x.is_finite() && y.is_finite()) {
                    tracing::warn!(x, y, "Ignoring non-finite camera centre");
                    return ControlOutcome::Ignored;
                }
                sim.camera_mut().set_center(x, y);
                ControlOutcome::Camera
            }
            ControlMessage::PaintForceField { x, y, polarity } => {
                if !(x.is_finite() && y.is_finite() && polarity.is_finite()) {
                    tracing::warn!(x, y, polarity, "Ignoring malformed force field");
                    return ControlOutcome::Ignored;
                }
                let id = sim.paint_force_field(Vec2::new(x, y), polarity.clamp(-1.0, 1.0));
                ControlOutcome::FieldPainted(id)
            }
            ControlMessage::Resync => {
                self.resync_requested = true;
                ControlOutcome::ResyncRequested
            }
            ControlMessage::Quit => {
                self.quit = true;
                ControlOutcome::Quit
            }
        }
    }

    fn set_paused(&mut self, paused: bool) -> ControlOutcome {
        if paused != self.paused {
            tracing::debug!(paused, "Run state changed");
        }
        self.paused = paused;
        ControlOutcome::RunState { paused }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EcosystemConfig;
    use crate::world::{MAX_ZOOM, MIN_ZOOM};

    fn sim() -> Simulation {
        Simulation::empty(EcosystemConfig::default(), 1)
    }

    #[test]
    fn test_pause_resume_toggle() {
        let mut sim = sim();
        let mut control = RunControl::new();
        assert!(!control.is_paused());

        control.apply(ControlMessage::Pause, &mut sim);
        assert!(control.is_paused());
        control.apply(ControlMessage::Resume, &mut sim);
        assert!(!control.is_paused());
        let outcome = control.apply(ControlMessage::Toggle, &mut sim);
        assert_eq!(outcome, ControlOutcome::RunState { paused: true });
    }

    #[test]
    fn test_zoom_is_clamped_and_nan_ignored() {
        let mut sim = sim();
        let mut control = RunControl::new();

        control.apply(ControlMessage::SetZoom { value: 10.0 }, &mut sim);
        assert_eq!(sim.camera().zoom, MAX_ZOOM);
        control.apply(ControlMessage::SetZoom { value: 0.01 }, &mut sim);
        assert_eq!(sim.camera().zoom, MIN_ZOOM);

        let outcome = control.apply(ControlMessage::SetZoom { value: f32::NAN }, &mut sim);
        assert_eq!(outcome, ControlOutcome::Ignored);
        assert_eq!(sim.camera().zoom, MIN_ZOOM);
    }

    #[test]
    fn test_camera_ignores_infinite() {
        let mut sim = sim();
        let mut control = RunControl::new();
        control.apply(ControlMessage::SetCamera { x: 10.0, y: 20.0 }, &mut sim);
        control.apply(
            ControlMessage::SetCamera {
                x: f32::INFINITY,
                y: 0.0,
            },
            &mut sim,
        );
        assert_eq!((sim.camera().x, sim.camera().y), (10.0, 20.0));
    }

    #[test]
    fn test_paint_reuses_nearby_field() {
        let mut sim = sim();
        let mut control = RunControl::new();
        let paint = |x, polarity| ControlMessage::PaintForceField {
            x,
            y: 100.0,
            polarity,
        };

        let ControlOutcome::FieldPainted(first) = control.apply(paint(100.0, 1.0), &mut sim) else {
            panic!("expected a painted field");
        };
        let ControlOutcome::FieldPainted(second) = control.apply(paint(120.0, -3.0), &mut sim)
        else {
            panic!("expected a painted field");
        };
        assert_eq!(first, second);
        assert_eq!(sim.store().force_fields.len(), 1);
        assert_eq!(sim.store().force_fields.get(first).unwrap().strength, -50.0);
    }

    #[test]
    fn test_resync_and_quit_flags() {
        let mut sim = sim();
        let mut control = RunControl::new();
        assert!(!control.take_resync());
        control.apply(ControlMessage::Resync, &mut sim);
        assert!(control.take_resync());
        assert!(!control.take_resync());

        control.apply(ControlMessage::Quit, &mut sim);
        assert!(control.should_quit());
    }
}
