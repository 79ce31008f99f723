//! Travel bounds and motion caps.

use serde::Deserialize;

use super::units::{Millimeters, MmPerSec, MmPerSecSquared};

/// Physical travel window `[0, length]` in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelLimits {
    /// Maximum reachable position (the min endstop is always 0).
    pub length: Millimeters,
}

impl TravelLimits {
    /// Create new travel limits.
    pub fn new(length: Millimeters) -> Self {
        Self { length }
    }

    /// Check if limits are valid (finite, positive length).
    pub fn is_valid(&self) -> bool {
        self.length.0.is_finite() && self.length.0 > 0.0
    }

    /// Clamp a target onto the rail.
    pub fn clamp(&self, target: Millimeters) -> Millimeters {
        target.clamp(Millimeters(0.0), self.length)
    }
}

/// Travel window converted to steps (for runtime use).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLimits {
    /// Maximum position in steps (minimum is 0).
    pub max_steps: i64,
}

impl StepLimits {
    /// Create step limits from a travel window and steps per mm.
    pub fn from_travel(travel: &TravelLimits, steps_per_mm: f32) -> Self {
        Self {
            max_steps: libm::floorf(travel.length.0 * steps_per_mm) as i64,
        }
    }

    /// Clamp a step position into the window.
    pub fn clamp(&self, steps: i64) -> i64 {
        steps.clamp(0, self.max_steps)
    }
}

/// Hardware motion caps (`[limits]` section).
#[derive(Debug, Clone, Deserialize)]
pub struct MotionLimits {
    /// Maximum carriage speed.
    #[serde(default = "default_max_speed", rename = "max_speed_mm_s")]
    pub max_speed: MmPerSec,

    /// Maximum carriage acceleration.
    #[serde(default = "default_max_accel", rename = "max_accel_mm_s2")]
    pub max_acceleration: MmPerSecSquared,
}

fn default_max_speed() -> MmPerSec {
    MmPerSec(120.0)
}

fn default_max_accel() -> MmPerSecSquared {
    MmPerSecSquared(300.0)
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            max_speed: default_max_speed(),
            max_acceleration: default_max_accel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_limits_clamp() {
        let limits = TravelLimits::new(Millimeters(1200.0));

        assert_eq!(limits.clamp(Millimeters(1230.0)), Millimeters(1200.0));
        assert_eq!(limits.clamp(Millimeters(-5.0)), Millimeters(0.0));
        assert_eq!(limits.clamp(Millimeters(600.0)), Millimeters(600.0));
    }

    #[test]
    fn test_travel_limits_validity() {
        assert!(TravelLimits::new(Millimeters(1200.0)).is_valid());
        assert!(!TravelLimits::new(Millimeters(0.0)).is_valid());
        assert!(!TravelLimits::new(Millimeters(f32::NAN)).is_valid());
    }

    #[test]
    fn test_step_limits() {
        let travel = TravelLimits::new(Millimeters(1200.0));
        let steps = StepLimits::from_travel(&travel, 400.0);

        assert_eq!(steps.max_steps, 480_000);
        assert_eq!(steps.clamp(-1), 0);
        assert_eq!(steps.clamp(480_001), 480_000);
    }
}
