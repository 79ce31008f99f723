//! Carriage position tracking.
//!
//! The authoritative estimate is an integer step count integrated from
//! issued steps, confined to the rail window.

use crate::config::units::{Millimeters, Steps};
use crate::config::StepLimits;

/// Carriage position tracker.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    /// Steps from the min endstop.
    steps: Steps,
    steps_per_mm: f32,
    limits: StepLimits,
}

impl Position {
    /// Tracker at the origin.
    #[inline]
    pub fn new(steps_per_mm: f32, limits: StepLimits) -> Self {
        Self {
            steps: Steps::default(),
            steps_per_mm,
            limits,
        }
    }

    /// Current position in steps.
    #[inline]
    pub fn steps(&self) -> Steps {
        self.steps
    }

    /// Current position in mm.
    #[inline]
    pub fn mm(&self) -> f32 {
        self.steps.to_mm(self.steps_per_mm).0
    }

    /// Highest reachable step.
    #[inline]
    pub fn max_steps(&self) -> i64 {
        self.limits.max_steps
    }

    /// Set position in steps, clamped to the rail.
    #[inline]
    pub fn set_steps(&mut self, steps: i64) {
        self.steps = Steps(self.limits.clamp(steps));
    }

    /// Move by a number of steps, clamped to the rail.
    #[inline]
    pub fn move_steps(&mut self, delta: i64) {
        self.set_steps(self.steps.0 + delta);
    }

    /// Set the current position as the origin.
    #[inline]
    pub fn set_origin(&mut self) {
        self.steps = Steps::default();
    }

    /// Snap to the far end of the rail.
    #[inline]
    pub fn set_far_end(&mut self) {
        self.steps = Steps(self.limits.max_steps);
    }

    /// Step index nearest to `mm`, clamped to the rail.
    #[inline]
    pub fn steps_for(&self, mm: f32) -> i64 {
        self.limits
            .clamp(Steps::from_mm(Millimeters(mm), self.steps_per_mm).0)
    }
}
