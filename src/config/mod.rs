//! Configuration module for slider-motion.
//!
//! Provides types for loading and validating the slider's mechanics, motion
//! caps, homing parameters, pin assignment and control-loop settings from
//! TOML files (with `std` feature) or pre-built values.

mod limits;
mod mechanical;
mod slider;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use limits::{MotionLimits, StepLimits, TravelLimits};
pub use mechanical::MechanicalConstraints;
pub use slider::{ControllerConfig, HomingConfig, MechanicsConfig, PinConfig, SliderConfig};
pub use validation::{validate_config, MAX_TICK_PERIOD_MS, MIN_TICK_PERIOD_MS};

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Microsteps, Millimeters, MmPerSec, MmPerSecSquared, Steps};
