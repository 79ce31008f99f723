//! Trapezoidal ramps for straight-line moves.
//!
//! Jog, prime and homing back-off moves are not curve-sampled: they follow
//! a time-parameterised trapezoid (accelerate, cruise, decelerate) that the
//! controller tracks tick by tick.

use libm::{fabsf, sqrtf};

/// Current phase of a ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampPhase {
    /// Accelerating from rest toward cruise speed.
    Accelerating,
    /// Moving at constant cruise speed.
    Cruising,
    /// Decelerating to rest.
    Decelerating,
    /// Ramp complete.
    Complete,
}

/// Time-parameterised trapezoidal move over a signed distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    /// Signed distance in mm.
    distance: f32,
    /// Peak speed reached (cruise speed, or less for a triangle ramp).
    peak_speed: f32,
    /// Acceleration used on both flanks.
    acceleration: f32,
    accel_time: f32,
    cruise_time: f32,
}

impl Ramp {
    /// Build a ramp covering `distance` mm.
    ///
    /// Falls back to a triangle when the move is too short to reach
    /// `cruise_speed`. Non-positive speed or acceleration yields a zero ramp.
    pub fn new(distance: f32, cruise_speed: f32, acceleration: f32) -> Self {
        let length = fabsf(distance);
        if length == 0.0 || !(cruise_speed > 0.0) || !(acceleration > 0.0) {
            return Self::zero();
        }

        // distance covered while reaching cruise speed and stopping again
        let ramp_distance = cruise_speed * cruise_speed / acceleration;

        let (peak_speed, cruise_time) = if ramp_distance >= length {
            (sqrtf(length * acceleration), 0.0)
        } else {
            (cruise_speed, (length - ramp_distance) / cruise_speed)
        };

        Self {
            distance,
            peak_speed,
            acceleration,
            accel_time: peak_speed / acceleration,
            cruise_time,
        }
    }

    /// A ramp with no motion.
    pub fn zero() -> Self {
        Self {
            distance: 0.0,
            peak_speed: 0.0,
            acceleration: 0.0,
            accel_time: 0.0,
            cruise_time: 0.0,
        }
    }

    /// True if the ramp covers no distance.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.distance == 0.0
    }

    /// Signed distance in mm.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Peak speed in mm/s.
    #[inline]
    pub fn peak_speed(&self) -> f32 {
        self.peak_speed
    }

    /// Total ramp duration in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        2.0 * self.accel_time + self.cruise_time
    }

    /// Phase at time `t`.
    pub fn phase_at(&self, t: f32) -> RampPhase {
        if self.is_zero() || t >= self.duration() {
            RampPhase::Complete
        } else if t < self.accel_time {
            RampPhase::Accelerating
        } else if t < self.accel_time + self.cruise_time {
            RampPhase::Cruising
        } else {
            RampPhase::Decelerating
        }
    }

    /// Signed offset from the start at time `t`.
    ///
    /// Returns exactly `distance()` once the ramp is complete.
    pub fn offset_at(&self, t: f32) -> f32 {
        let t = t.max(0.0);
        let a = self.acceleration;
        let accel_distance = 0.5 * a * self.accel_time * self.accel_time;

        let travelled = match self.phase_at(t) {
            RampPhase::Complete => return self.distance,
            RampPhase::Accelerating => 0.5 * a * t * t,
            RampPhase::Cruising => accel_distance + self.peak_speed * (t - self.accel_time),
            RampPhase::Decelerating => {
                let remaining = self.duration() - t;
                fabsf(self.distance) - 0.5 * a * remaining * remaining
            }
        };

        travelled.min(fabsf(self.distance)) * self.distance.signum()
    }

    /// Fraction of the distance covered at time `t`, in `[0, 1]`.
    pub fn progress_at(&self, t: f32) -> f32 {
        if self.is_zero() {
            return 1.0;
        }
        (self.offset_at(t) / self.distance).clamp(0.0, 1.0)
    }
}
