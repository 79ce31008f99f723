//! Mechanical constraints derived from the slider configuration.

use super::limits::{StepLimits, TravelLimits};
use super::slider::SliderConfig;
use super::units::{Millimeters, MmPerSec, MmPerSecSquared, Steps};

/// Derived mechanical parameters computed from [`SliderConfig`].
///
/// These are computed once at initialization and used for all step generation.
#[derive(Debug, Clone)]
pub struct MechanicalConstraints {
    /// Micro-steps per millimetre of carriage travel.
    pub steps_per_mm: f32,

    /// Rail travel window in steps.
    pub limits: StepLimits,

    /// Rail travel window.
    pub travel: TravelLimits,

    /// Maximum speed in mm/s.
    pub max_speed: MmPerSec,

    /// Maximum acceleration in mm/s².
    pub max_acceleration: MmPerSecSquared,
}

impl MechanicalConstraints {
    /// Compute mechanical constraints from the slider configuration.
    pub fn from_config(config: &SliderConfig) -> Self {
        let steps_per_mm = config.steps_per_mm();
        let travel = config.travel();

        Self {
            steps_per_mm,
            limits: StepLimits::from_travel(&travel, steps_per_mm),
            travel,
            max_speed: config.limits.max_speed,
            max_acceleration: config.limits.max_acceleration,
        }
    }

    /// Rail length in mm.
    #[inline]
    pub fn travel_mm(&self) -> f32 {
        self.travel.length.0
    }

    /// Convert millimetres to the nearest step.
    #[inline]
    pub fn mm_to_steps(&self, mm: f32) -> i64 {
        Steps::from_mm(Millimeters(mm), self.steps_per_mm).0
    }

    /// Convert mm/s to steps/s.
    #[inline]
    pub fn speed_to_steps(&self, mm_per_sec: f32) -> f32 {
        mm_per_sec * self.steps_per_mm
    }

    /// Clamp a millimetre position onto the rail.
    #[inline]
    pub fn clamp_mm(&self, mm: f32) -> f32 {
        self.travel.clamp(Millimeters(mm)).0
    }
}
