//! Easing evaluation: normalized segment progress to eased progress.
//!
//! The wire-level [`EasingSpec`] is validated once into an [`Easing`], which
//! is then evaluated infallibly on every control tick.

use libm::fabsf;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// Newton-Raphson iteration budget.
const NEWTON_ITERATIONS: usize = 8;
/// Derivative magnitude below which Newton gives up.
const NEWTON_MIN_SLOPE: f32 = 1e-6;
/// Residual accepted from the Newton phase.
const NEWTON_TOLERANCE: f32 = 1e-4;
/// Bisection iteration budget.
const BISECTION_ITERATIONS: usize = 12;
/// Residual at which bisection stops early.
const BISECTION_TOLERANCE: f32 = 1e-5;

/// Easing curve as it appears in a motion profile document.
///
/// ```json
/// {"type": "linear"}
/// {"type": "cubic-bezier", "p": [0.25, 0.1, 0.25, 1.0]}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EasingSpec {
    /// Constant-speed blend.
    #[default]
    Linear,
    /// CSS-style cubic Bezier with endpoints (0,0) and (1,1).
    CubicBezier {
        /// Control points `[x1, y1, x2, y2]`.
        p: [f32; 4],
    },
}

impl EasingSpec {
    /// Bezier easing from control points.
    pub fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        EasingSpec::CubicBezier { p: [x1, y1, x2, y2] }
    }

    /// Validate into an evaluable curve.
    ///
    /// x control coordinates are clamped to `[0, 1]` so that `x(t)` stays
    /// monotonic; y coordinates are kept as given (overshoot is allowed).
    ///
    /// # Errors
    ///
    /// `ProfileError::InvalidEasing` if any control value is not finite.
    pub fn compile(&self) -> Result<Easing> {
        match *self {
            EasingSpec::Linear => Ok(Easing::Linear),
            EasingSpec::CubicBezier { p } => {
                if p.iter().any(|v| !v.is_finite()) {
                    return Err(ProfileError::InvalidEasing.into());
                }
                Ok(Easing::CubicBezier(CubicBezier::new(p[0], p[1], p[2], p[3])))
            }
        }
    }

    /// Copy with x control coordinates clamped to `[0, 1]`.
    pub(crate) fn normalized(&self) -> Self {
        match *self {
            EasingSpec::Linear => EasingSpec::Linear,
            EasingSpec::CubicBezier { p } => EasingSpec::CubicBezier {
                p: [p[0].clamp(0.0, 1.0), p[1], p[2].clamp(0.0, 1.0), p[3]],
            },
        }
    }
}

/// Evaluate an easing spec at segment progress `u`.
///
/// # Errors
///
/// `ProfileError::InvalidEasing` for malformed control points.
pub fn ease(spec: &EasingSpec, u: f32) -> Result<f32> {
    Ok(spec.compile()?.apply(u))
}

/// Validated easing curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    /// `y = clamp(u, 0, 1)`.
    Linear,
    /// Two-control-point Bezier.
    CubicBezier(CubicBezier),
}

impl Easing {
    /// Eased progress for segment progress `u`.
    #[inline]
    pub fn apply(&self, u: f32) -> f32 {
        match self {
            Easing::Linear => linear(u),
            Easing::CubicBezier(curve) => curve.sample(u),
        }
    }
}

/// Clamp progress into `[0, 1]`.
#[inline]
pub fn linear(u: f32) -> f32 {
    if u <= 0.0 {
        0.0
    } else if u >= 1.0 {
        1.0
    } else {
        u
    }
}

/// Cubic Bezier with fixed endpoints (0,0) and (1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl CubicBezier {
    /// Build a curve, clamping x1 and x2 into `[0, 1]`.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.clamp(0.0, 1.0),
            y1,
            x2: x2.clamp(0.0, 1.0),
            y2,
        }
    }

    /// Control points after clamping.
    pub fn control_points(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    #[inline]
    fn bezier(t: f32, c1: f32, c2: f32) -> f32 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * c1 + 3.0 * mt * t * t * c2 + t * t * t
    }

    #[inline]
    fn x_at(&self, t: f32) -> f32 {
        Self::bezier(t, self.x1, self.x2)
    }

    #[inline]
    fn y_at(&self, t: f32) -> f32 {
        Self::bezier(t, self.y1, self.y2)
    }

    #[inline]
    fn dx_at(&self, t: f32) -> f32 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.x1 + 6.0 * mt * t * (self.x2 - self.x1) + 3.0 * t * t * (1.0 - self.x2)
    }

    /// Curve parameter whose x equals `u`.
    ///
    /// Newton-Raphson from `t = u`, falling back to bisection when Newton
    /// stalls on a flat tangent or fails to converge.
    fn solve_t(&self, u: f32) -> f32 {
        let mut t = u;
        for _ in 0..NEWTON_ITERATIONS {
            let slope = self.dx_at(t);
            if fabsf(slope) < NEWTON_MIN_SLOPE {
                break;
            }
            t = (t - (self.x_at(t) - u) / slope).clamp(0.0, 1.0);
        }

        if fabsf(self.x_at(t) - u) <= NEWTON_TOLERANCE {
            return t;
        }

        // x(t) is monotonic because x1, x2 are in [0, 1]
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        for _ in 0..BISECTION_ITERATIONS {
            t = 0.5 * (lo + hi);
            let x = self.x_at(t);
            if fabsf(x - u) <= BISECTION_TOLERANCE {
                break;
            }
            if x < u {
                lo = t;
            } else {
                hi = t;
            }
        }
        t
    }

    /// Eased progress for segment progress `u`.
    pub fn sample(&self, u: f32) -> f32 {
        if u <= 0.0 {
            return 0.0;
        }
        if u >= 1.0 {
            return 1.0;
        }
        self.y_at(self.solve_t(u))
    }
}
