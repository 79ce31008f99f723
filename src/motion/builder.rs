//! Profile builder for programmatic sequence creation.

use crate::error::{ProfileError, Result};

use super::easing::EasingSpec;
use super::profile::{
    Keyframe, Keyframes, MotionProfile, DEFAULT_MAX_ACCEL_MM_S2, DEFAULT_MAX_SPEED_MM_S,
};

/// Builder for creating motion profiles.
///
/// ```rust,ignore
/// let profile = ProfileBuilder::new()
///     .length(1200.0)
///     .keyframe(0.0, 0.0)
///     .eased_keyframe(4.0, 400.0, EasingSpec::cubic_bezier(0.25, 0.1, 0.25, 1.0))
///     .keyframe(7.0, 1200.0)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    length_mm: Option<f32>,
    keyframes: Keyframes,
    overflow: bool,
    max_speed_mm_s: f32,
    max_accel_mm_s2: f32,
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileBuilder {
    /// Create a new profile builder.
    pub fn new() -> Self {
        Self {
            length_mm: None,
            keyframes: Keyframes::new(),
            overflow: false,
            max_speed_mm_s: DEFAULT_MAX_SPEED_MM_S,
            max_accel_mm_s2: DEFAULT_MAX_ACCEL_MM_S2,
        }
    }

    /// Set the travel length in mm.
    pub fn length(mut self, length_mm: f32) -> Self {
        self.length_mm = Some(length_mm);
        self
    }

    /// Add a keyframe reached with linear easing.
    pub fn keyframe(self, t: f32, pos_mm: f32) -> Self {
        self.push(Keyframe::new(t, pos_mm))
    }

    /// Add a keyframe reached with the given easing.
    pub fn eased_keyframe(self, t: f32, pos_mm: f32, ease: EasingSpec) -> Self {
        self.push(Keyframe::eased(t, pos_mm, ease))
    }

    /// Set the speed cap in mm/s.
    pub fn max_speed(mut self, mm_per_sec: f32) -> Self {
        self.max_speed_mm_s = mm_per_sec;
        self
    }

    /// Set the acceleration cap in mm/s².
    pub fn max_accel(mut self, mm_per_sec2: f32) -> Self {
        self.max_accel_mm_s2 = mm_per_sec2;
        self
    }

    fn push(mut self, keyframe: Keyframe) -> Self {
        if self.keyframes.push(keyframe).is_err() {
            self.overflow = true;
        }
        self
    }

    /// Build and validate the profile.
    ///
    /// Without an explicit length, the largest keyframe position is used.
    ///
    /// # Errors
    ///
    /// `TooManyKeyframes` if more keyframes were added than fit, otherwise
    /// any validation error.
    pub fn build(self) -> Result<MotionProfile> {
        if self.overflow {
            return Err(ProfileError::TooManyKeyframes.into());
        }

        let length_mm = self.length_mm.unwrap_or_else(|| {
            self.keyframes
                .iter()
                .map(|k| k.pos_mm)
                .fold(0.0, f32::max)
        });

        MotionProfile {
            length_mm,
            keyframes: self.keyframes,
            max_speed_mm_s: self.max_speed_mm_s,
            max_accel_mm_s2: self.max_accel_mm_s2,
        }
        .validated()
    }
}
