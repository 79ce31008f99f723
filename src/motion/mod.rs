//! Motion module for slider-motion.
//!
//! Provides easing evaluation, motion profile wire types, trajectory
//! planning and the trapezoidal ramps used for straight-line moves.

mod builder;
pub mod easing;
mod planner;
mod profile;
mod ramp;

/// Maximum number of keyframes in one profile.
pub const MAX_KEYFRAMES: usize = 64;

pub use builder::ProfileBuilder;
pub use easing::{ease, CubicBezier, Easing, EasingSpec};
pub use planner::{plan, Samples, Trajectory};
pub use profile::{
    Keyframe, Keyframes, MotionProfile, DEFAULT_MAX_ACCEL_MM_S2, DEFAULT_MAX_SPEED_MM_S,
};
pub use ramp::{Ramp, RampPhase};
