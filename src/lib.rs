//! # slider-motion
//!
//! Keyframed motion control for a motorized camera slider with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Keyframed profiles**: Positions over time with per-segment cubic-bezier easing
//! - **Deterministic controller**: Homing, jogging, priming and runs driven by a fixed tick
//! - **Endstop guarded**: Unexpected limit switch trips stop the carriage immediately
//! - **embedded-hal 1.0**: Uses `OutputPin` for STEP/DIR/ENABLE, `InputPin` for endstops
//! - **Simulator**: The whole state machine runs without hardware
//! - **no_std compatible**: Planner, HAL and state machine work without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use slider_motion::{ControllerHandle, MotionProfile, Simulator, SliderConfig};
//!
//! let config: SliderConfig = slider_motion::load_config("slider.toml")?;
//!
//! // Simulated hardware; use GpioHardwareBuilder for real pins
//! let sim = Simulator::new(&config);
//! let slider = ControllerHandle::spawn(sim.hal(), &config)?;
//!
//! slider.home()?;
//! let profile = MotionProfile::from_json(&request_body)?;
//! slider.prime(profile.clone())?;
//! slider.run(profile)?;
//!
//! println!("{:?}", slider.status());
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Control thread, simulator, presets, TOML config and JSON profiles

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod controller;
pub mod error;
pub mod hal;
pub mod motion;
#[cfg(feature = "std")]
pub mod presets;

// Re-exports for ergonomic API
pub use config::{validate_config, MechanicalConstraints, SliderConfig};
pub use controller::{Command, Controller, ControllerState, SliderStatus};
pub use error::{Error, FaultReason, Result};
pub use hal::{Direction, Endstop, GpioHardwareBuilder, Hal, Limit, StepperDriver};
pub use motion::{plan, EasingSpec, Keyframe, MotionProfile, ProfileBuilder, Trajectory};

// std-only runtime pieces
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};
#[cfg(feature = "std")]
pub use controller::ControllerHandle;
#[cfg(feature = "std")]
pub use hal::{probe, DynHal, HalKind, Simulator};
#[cfg(feature = "std")]
pub use presets::{JsonFilePresetStore, MemoryPresetStore, PresetStore};

// Unit types
pub use config::units::{Microsteps, Millimeters, MmPerSec, MmPerSecSquared, Steps};
