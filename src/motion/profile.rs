//! Motion profile wire types and validation.
//!
//! A profile document looks like:
//!
//! ```json
//! {
//!   "length_mm": 1200.0,
//!   "keyframes": [
//!     {"t": 0.0, "pos_mm": 0.0, "ease": {"type": "linear"}},
//!     {"t": 4.0, "pos_mm": 400.0, "ease": {"type": "cubic-bezier", "p": [0.25, 0.1, 0.25, 1.0]}}
//!   ],
//!   "max_speed_mm_s": 120.0,
//!   "max_accel_mm_s2": 300.0
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

use super::easing::EasingSpec;
use super::MAX_KEYFRAMES;

/// Profile speed cap used when the document omits one.
pub const DEFAULT_MAX_SPEED_MM_S: f32 = 120.0;

/// Profile acceleration cap used when the document omits one.
pub const DEFAULT_MAX_ACCEL_MM_S2: f32 = 300.0;

fn default_max_speed() -> f32 {
    DEFAULT_MAX_SPEED_MM_S
}

fn default_max_accel() -> f32 {
    DEFAULT_MAX_ACCEL_MM_S2
}

/// A timed waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in seconds from the start of the sequence.
    pub t: f32,
    /// Carriage position in mm.
    pub pos_mm: f32,
    /// Easing of the segment that ends at this keyframe.
    #[serde(default)]
    pub ease: EasingSpec,
}

impl Keyframe {
    /// Keyframe reached with linear easing.
    pub fn new(t: f32, pos_mm: f32) -> Self {
        Self {
            t,
            pos_mm,
            ease: EasingSpec::Linear,
        }
    }

    /// Keyframe reached with the given easing.
    pub fn eased(t: f32, pos_mm: f32, ease: EasingSpec) -> Self {
        Self { t, pos_mm, ease }
    }
}

/// Keyframe list with the planner's capacity.
pub type Keyframes = heapless::Vec<Keyframe, MAX_KEYFRAMES>;

/// A keyframed motion sequence plus its runtime caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Travel bound for every keyframe position.
    pub length_mm: f32,
    /// Waypoints, strictly increasing in `t` once validated.
    pub keyframes: Keyframes,
    /// Speed cap enforced while running.
    #[serde(default = "default_max_speed")]
    pub max_speed_mm_s: f32,
    /// Acceleration cap enforced while running.
    #[serde(default = "default_max_accel")]
    pub max_accel_mm_s2: f32,
}

impl MotionProfile {
    /// Total sequence duration (time of the last keyframe).
    ///
    /// Meaningful only for a validated profile.
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map(|k| k.t).unwrap_or(0.0)
    }

    /// Position of the first keyframe, if any.
    pub fn start_position(&self) -> Option<f32> {
        self.keyframes.first().map(|k| k.pos_mm)
    }

    /// Normalize and validate in place.
    ///
    /// Sorts keyframes by time and clamps bezier x controls to `[0, 1]`.
    /// On error the profile may already be partially normalized.
    ///
    /// # Errors
    ///
    /// Any [`ProfileError`]; these are the `InvalidProfile` causes.
    pub fn validate(&mut self) -> Result<()> {
        check_positive(self.length_mm, ProfileError::InvalidLength)?;
        check_positive(self.max_speed_mm_s, ProfileError::InvalidMaxSpeed)?;
        check_positive(self.max_accel_mm_s2, ProfileError::InvalidMaxAcceleration)?;

        if self.keyframes.len() < 2 {
            return Err(ProfileError::TooFewKeyframes(self.keyframes.len()).into());
        }

        for k in self.keyframes.iter_mut() {
            if !k.t.is_finite() || k.t < 0.0 {
                return Err(ProfileError::InvalidTime(k.t).into());
            }
            if !k.pos_mm.is_finite() || k.pos_mm < 0.0 || k.pos_mm > self.length_mm {
                return Err(ProfileError::PositionOutOfRange {
                    pos_mm: k.pos_mm,
                    length_mm: self.length_mm,
                }
                .into());
            }
            k.ease.compile()?;
            k.ease = k.ease.normalized();
        }

        // duplicates are rejected below, so ordering among equal keys is moot
        self.keyframes.sort_unstable_by(|a, b| a.t.total_cmp(&b.t));

        if let Some(pair) = self.keyframes.windows(2).find(|w| w[1].t <= w[0].t) {
            return Err(ProfileError::DuplicateTime(pair[1].t).into());
        }

        Ok(())
    }

    /// Consume, validate and return the normalized profile.
    ///
    /// # Errors
    ///
    /// See [`MotionProfile::validate`].
    pub fn validated(mut self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Decode and validate a JSON profile document.
    ///
    /// # Errors
    ///
    /// `ProfileError::ParseError` for malformed JSON or unknown easing
    /// types, otherwise any validation error.
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: MotionProfile = serde_json::from_str(json).map_err(|e| {
            ProfileError::ParseError(crate::error::short_message(&e.to_string()))
        })?;
        profile.validated()
    }

    /// Encode as a JSON profile document.
    ///
    /// # Errors
    ///
    /// `ProfileError::ParseError` if encoding fails.
    #[cfg(feature = "std")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            ProfileError::ParseError(crate::error::short_message(&e.to_string())).into()
        })
    }
}

fn check_positive(value: f32, err: fn(f32) -> ProfileError) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(err(value).into())
    }
}
