//! Error types for slider-motion.
//!
//! Provides unified error handling across configuration, profile validation,
//! controller commands, hardware access and preset storage.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all slider-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motion profile rejected (malformed keyframes, easing, limits)
    Profile(ProfileError),
    /// Controller refused or aborted a command
    Motion(MotionError),
    /// Driver or endstop access failed
    Hardware(HalError),
    /// Named preset lookup or persistence error
    Preset(PresetError),
}

impl Error {
    /// True for every cause of an `InvalidProfile` rejection.
    pub fn is_invalid_profile(&self) -> bool {
        matches!(self, Error::Profile(_))
    }
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Steps per revolution must be > 0
    InvalidStepsPerRevolution(u16),
    /// Lead screw travel per revolution must be > 0
    InvalidLead(f32),
    /// Travel length must be > 0
    InvalidTravel(f32),
    /// Invalid max speed (must be > 0)
    InvalidMaxSpeed(f32),
    /// Invalid max acceleration (must be > 0)
    InvalidMaxAcceleration(f32),
    /// Homing speeds and distances must be > 0
    InvalidHoming(&'static str),
    /// Tick period outside the supported window
    InvalidTickPeriod(u32),
    /// Command queue must hold at least one request
    InvalidQueueDepth(usize),
    /// Two functions mapped to the same GPIO line
    DuplicatePin(u8),
    /// Hardware builder is missing a pin or delay provider
    MissingHardware(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Reasons a motion profile is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// Fewer than two keyframes
    TooFewKeyframes(usize),
    /// More keyframes than the planner can hold
    TooManyKeyframes,
    /// Travel length must be finite and > 0
    InvalidLength(f32),
    /// Profile speed cap must be finite and > 0
    InvalidMaxSpeed(f32),
    /// Profile acceleration cap must be finite and > 0
    InvalidMaxAcceleration(f32),
    /// Keyframe time negative or not finite
    InvalidTime(f32),
    /// Two keyframes share the same time
    DuplicateTime(f32),
    /// Keyframe position outside `[0, length_mm]`
    PositionOutOfRange {
        /// Offending position
        pos_mm: f32,
        /// Profile travel length
        length_mm: f32,
    },
    /// Bezier control points malformed (wrong arity or non-finite)
    InvalidEasing,
    /// JSON document could not be decoded
    ParseError(heapless::String<128>),
}

/// Why the controller entered `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultReason {
    /// Endstop never triggered within the maximum homing travel
    HomingTimeout,
    /// An endstop tripped where it was not expected
    UnexpectedEndstop,
    /// The driver or an endstop reported a failure
    HardwareFault,
}

/// Controller command errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Run requested before a successful Home
    NotHomed,
    /// Controller is in `Error`; only Home or Stop are accepted
    Faulted(FaultReason),
    /// Jog distance or speed is not a finite number
    InvalidJog,
    /// The control loop is no longer running
    Disconnected,
}

/// Hardware access errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// A GPIO line operation failed
    Pin,
    /// The hardware backend could not be opened
    Unavailable,
}

/// Preset store errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetError {
    /// No preset stored under this name
    NotFound(heapless::String<32>),
    /// Name empty or longer than 32 characters
    InvalidName,
    /// Backing storage failed
    Storage(heapless::String<128>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Profile(e) => write!(f, "Invalid profile: {}", e),
            Error::Motion(e) => write!(f, "Motion error: {}", e),
            Error::Hardware(e) => write!(f, "Hardware error: {}", e),
            Error::Preset(e) => write!(f, "Preset error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidStepsPerRevolution(v) => {
                write!(f, "Invalid steps per revolution: {}. Must be > 0", v)
            }
            ConfigError::InvalidLead(v) => write!(f, "Invalid lead: {} mm/rev. Must be > 0", v),
            ConfigError::InvalidTravel(v) => write!(f, "Invalid travel: {} mm. Must be > 0", v),
            ConfigError::InvalidMaxSpeed(v) => write!(f, "Invalid max speed: {}. Must be > 0", v),
            ConfigError::InvalidMaxAcceleration(v) => {
                write!(f, "Invalid max acceleration: {}. Must be > 0", v)
            }
            ConfigError::InvalidHoming(field) => write!(f, "Invalid homing {}: must be > 0", field),
            ConfigError::InvalidTickPeriod(ms) => {
                write!(f, "Invalid tick period: {} ms. Must be 5-100", ms)
            }
            ConfigError::InvalidQueueDepth(n) => write!(f, "Invalid command queue depth: {}", n),
            ConfigError::DuplicatePin(pin) => write!(f, "GPIO {} assigned more than once", pin),
            ConfigError::MissingHardware(part) => write!(f, "{} is required", part),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::TooFewKeyframes(n) => {
                write!(f, "At least two keyframes required, got {}", n)
            }
            ProfileError::TooManyKeyframes => {
                write!(f, "Too many keyframes (max {})", crate::motion::MAX_KEYFRAMES)
            }
            ProfileError::InvalidLength(v) => write!(f, "Invalid length: {} mm", v),
            ProfileError::InvalidMaxSpeed(v) => write!(f, "Invalid max speed: {} mm/s", v),
            ProfileError::InvalidMaxAcceleration(v) => {
                write!(f, "Invalid max acceleration: {} mm/s^2", v)
            }
            ProfileError::InvalidTime(t) => write!(f, "Invalid keyframe time: {} s", t),
            ProfileError::DuplicateTime(t) => {
                write!(f, "Keyframe times must be strictly increasing (duplicate t={})", t)
            }
            ProfileError::PositionOutOfRange { pos_mm, length_mm } => {
                write!(f, "Keyframe position {} mm outside [0, {}]", pos_mm, length_mm)
            }
            ProfileError::InvalidEasing => {
                write!(f, "cubic-bezier requires p=[x1,y1,x2,y2] with finite values")
            }
            ProfileError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultReason::HomingTimeout => write!(f, "homing timeout"),
            FaultReason::UnexpectedEndstop => write!(f, "unexpected endstop"),
            FaultReason::HardwareFault => write!(f, "hardware fault"),
        }
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::NotHomed => write!(f, "Slider is not homed"),
            MotionError::Faulted(reason) => {
                write!(f, "Controller faulted ({}); home or stop first", reason)
            }
            MotionError::InvalidJog => write!(f, "Jog distance and speed must be finite"),
            MotionError::Disconnected => write!(f, "Control loop is not running"),
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::Pin => write!(f, "GPIO pin operation failed"),
            HalError::Unavailable => write!(f, "Hardware backend unavailable"),
        }
    }
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::NotFound(name) => write!(f, "Preset '{}' not found", name),
            PresetError::InvalidName => write!(f, "Preset name must be 1-32 characters"),
            PresetError::Storage(msg) => write!(f, "Storage failure: {}", msg),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ProfileError> for Error {
    fn from(e: ProfileError) -> Self {
        Error::Profile(e)
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Error::Motion(e)
    }
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        Error::Hardware(e)
    }
}

impl From<HalError> for FaultReason {
    fn from(_: HalError) -> Self {
        FaultReason::HardwareFault
    }
}

impl From<PresetError> for Error {
    fn from(e: PresetError) -> Self {
        Error::Preset(e)
    }
}

/// Truncating conversion of a message into a fixed-capacity string.
pub(crate) fn short_message<const N: usize>(msg: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for ProfileError {}

#[cfg(feature = "std")]
impl std::error::Error for MotionError {}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

#[cfg(feature = "std")]
impl std::error::Error for PresetError {}
