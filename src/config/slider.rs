//! Slider configuration - root configuration structure.
//!
//! Every field has a default matching the reference build (NEMA17, DRV8825
//! at 1/16, TR8x8 lead screw, 1200 mm rail), so an empty document is valid.

use serde::Deserialize;

use super::limits::{MotionLimits, TravelLimits};
use super::units::{Microsteps, Millimeters, MmPerSec};

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SliderConfig {
    /// Drive train and rail geometry.
    #[serde(default)]
    pub mechanics: MechanicsConfig,

    /// Hardware speed/acceleration caps.
    #[serde(default)]
    pub limits: MotionLimits,

    /// Homing procedure parameters.
    #[serde(default)]
    pub homing: HomingConfig,

    /// GPIO line assignment and signal polarity.
    #[serde(default)]
    pub pins: PinConfig,

    /// Control loop parameters.
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl SliderConfig {
    /// Travel window of the rail.
    pub fn travel(&self) -> TravelLimits {
        TravelLimits::new(self.mechanics.travel)
    }

    /// Micro-steps per millimetre of carriage travel.
    pub fn steps_per_mm(&self) -> f32 {
        self.mechanics.steps_per_mm()
    }

    /// Override selected fields from `SLIDER_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    #[cfg(feature = "std")]
    pub fn apply_env_overrides(&mut self) {
        fn var<T: core::str::FromStr>(name: &str) -> Option<T> {
            let raw = std::env::var(name).ok()?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    log::warn!("ignoring {}={:?}: not a valid value", name, raw);
                    None
                }
            }
        }

        if let Some(v) = var("SLIDER_TRAVEL_MM") {
            self.mechanics.travel = Millimeters(v);
        }
        if let Some(v) = var("SLIDER_MAX_SPEED") {
            self.limits.max_speed = MmPerSec(v);
        }
        if let Some(v) = var("SLIDER_MAX_ACCEL") {
            self.limits.max_acceleration = super::units::MmPerSecSquared(v);
        }
        if let Some(v) = var("SLIDER_STEP_PIN") {
            self.pins.step = v;
        }
        if let Some(v) = var("SLIDER_DIR_PIN") {
            self.pins.dir = v;
        }
        if let Some(v) = var("SLIDER_ENABLE_PIN") {
            self.pins.enable = v;
        }
        if let Some(v) = var("SLIDER_MIN_PIN") {
            self.pins.min_endstop = v;
        }
        if let Some(v) = var("SLIDER_MAX_PIN") {
            self.pins.max_endstop = v;
        }
        if let Ok(v) = std::env::var("SLIDER_INVERT_ENDSTOPS") {
            self.pins.invert_endstops =
                matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }
}

/// Drive train and rail geometry (`[mechanics]`).
#[derive(Debug, Clone, Deserialize)]
pub struct MechanicsConfig {
    /// Base steps per revolution (200 for 1.8° motors).
    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u16,

    /// Driver microstep setting.
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Carriage travel per motor revolution.
    #[serde(default = "default_lead", rename = "lead_mm_per_rev")]
    pub lead: Millimeters,

    /// Usable rail length between the endstops.
    #[serde(default = "default_travel", rename = "travel_mm")]
    pub travel: Millimeters,
}

fn default_steps_per_revolution() -> u16 {
    200
}

fn default_lead() -> Millimeters {
    Millimeters(8.0)
}

fn default_travel() -> Millimeters {
    Millimeters(1200.0)
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        Self {
            steps_per_revolution: default_steps_per_revolution(),
            microsteps: Microsteps::default(),
            lead: default_lead(),
            travel: default_travel(),
        }
    }
}

impl MechanicsConfig {
    /// Total micro-steps per motor revolution.
    pub fn total_steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution as u32 * self.microsteps.value() as u32
    }

    /// Micro-steps per millimetre of carriage travel.
    pub fn steps_per_mm(&self) -> f32 {
        self.total_steps_per_revolution() as f32 / self.lead.0
    }
}

/// Homing procedure parameters (`[homing]`).
#[derive(Debug, Clone, Deserialize)]
pub struct HomingConfig {
    /// Speed while seeking the min endstop.
    #[serde(default = "default_homing_speed", rename = "speed_mm_s")]
    pub speed: MmPerSec,

    /// Distance to back off after the first trigger.
    #[serde(default = "default_backoff", rename = "backoff_mm")]
    pub backoff: Millimeters,

    /// Slow re-approach speed.
    #[serde(default = "default_approach_speed", rename = "approach_speed_mm_s")]
    pub approach_speed: MmPerSec,

    /// Maximum re-approach travel before giving up.
    #[serde(default = "default_approach_travel", rename = "approach_travel_mm")]
    pub approach_travel: Millimeters,

    /// Extra seek travel allowed beyond the rail length.
    #[serde(default = "default_margin", rename = "margin_mm")]
    pub margin: Millimeters,
}

fn default_homing_speed() -> MmPerSec {
    MmPerSec(30.0)
}

fn default_backoff() -> Millimeters {
    Millimeters(5.0)
}

fn default_approach_speed() -> MmPerSec {
    MmPerSec(15.0)
}

fn default_approach_travel() -> Millimeters {
    Millimeters(10.0)
}

fn default_margin() -> Millimeters {
    Millimeters(10.0)
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            speed: default_homing_speed(),
            backoff: default_backoff(),
            approach_speed: default_approach_speed(),
            approach_travel: default_approach_travel(),
            margin: default_margin(),
        }
    }
}

/// GPIO assignment, BCM numbering (`[pins]`).
#[derive(Debug, Clone, Deserialize)]
pub struct PinConfig {
    /// STEP output.
    #[serde(default = "default_step_pin")]
    pub step: u8,

    /// DIR output.
    #[serde(default = "default_dir_pin")]
    pub dir: u8,

    /// ENABLE output.
    #[serde(default = "default_enable_pin")]
    pub enable: u8,

    /// Min (home) endstop input.
    #[serde(default = "default_min_pin")]
    pub min_endstop: u8,

    /// Max endstop input.
    #[serde(default = "default_max_pin")]
    pub max_endstop: u8,

    /// ENABLE low turns the driver on (DRV8825 / A4988).
    #[serde(default = "default_true")]
    pub enable_active_low: bool,

    /// Endstops read high when triggered instead of low.
    #[serde(default)]
    pub invert_endstops: bool,

    /// STEP high time in microseconds.
    #[serde(default = "default_step_pulse_us")]
    pub step_pulse_us: u32,
}

fn default_step_pin() -> u8 {
    18
}

fn default_dir_pin() -> u8 {
    23
}

fn default_enable_pin() -> u8 {
    24
}

fn default_min_pin() -> u8 {
    17
}

fn default_max_pin() -> u8 {
    27
}

fn default_true() -> bool {
    true
}

fn default_step_pulse_us() -> u32 {
    4
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            step: default_step_pin(),
            dir: default_dir_pin(),
            enable: default_enable_pin(),
            min_endstop: default_min_pin(),
            max_endstop: default_max_pin(),
            enable_active_low: true,
            invert_endstops: false,
            step_pulse_us: default_step_pulse_us(),
        }
    }
}

impl PinConfig {
    /// All assigned lines, in `step, dir, enable, min, max` order.
    pub fn lines(&self) -> [u8; 5] {
        [self.step, self.dir, self.enable, self.min_endstop, self.max_endstop]
    }
}

/// Control loop parameters (`[controller]`).
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Tick period in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u32,

    /// Bounded command channel depth.
    #[serde(default = "default_queue_depth")]
    pub command_queue_depth: usize,
}

fn default_tick_period_ms() -> u32 {
    20
}

fn default_queue_depth() -> usize {
    16
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            command_queue_depth: default_queue_depth(),
        }
    }
}

impl ControllerConfig {
    /// Tick period in seconds.
    pub fn tick_period_s(&self) -> f32 {
        self.tick_period_ms as f32 / 1000.0
    }
}
