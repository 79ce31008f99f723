//! Hardware abstraction for the slider's stepper driver and endstops.
//!
//! The controller only ever talks to the [`StepperDriver`] and [`Endstop`]
//! capabilities. Two variants implement them: [`gpio`] drives real pins
//! through embedded-hal 1.0, and [`Simulator`] (std) advances a virtual
//! carriage so the full state machine runs without hardware.

pub mod gpio;
#[cfg(feature = "std")]
mod probe;
#[cfg(feature = "std")]
mod simulator;

use crate::error::HalError;

pub use gpio::{GpioEndstop, GpioHardwareBuilder, GpioStepper};
#[cfg(feature = "std")]
pub use probe::{probe, HalKind};
#[cfg(feature = "std")]
pub use simulator::{SimDriver, SimEndstop, Simulator};

/// Direction of carriage travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Away from the min endstop (increasing position).
    Forward,
    /// Toward the min endstop (decreasing position).
    Reverse,
}

impl Direction {
    /// Direction of a signed step or mm delta.
    #[inline]
    pub fn from_delta(delta: i64) -> Self {
        if delta >= 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }

    /// The endstop this direction travels toward.
    #[inline]
    pub fn limit(self) -> Limit {
        match self {
            Direction::Forward => Limit::Max,
            Direction::Reverse => Limit::Min,
        }
    }
}

/// One end of the rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Home end, position 0.
    Min,
    /// Far end, position `travel_mm`.
    Max,
}

/// Step/direction/enable capability of a stepper driver.
pub trait StepperDriver {
    /// Advance exactly one micro-step in the current direction.
    fn step(&mut self) -> Result<(), HalError>;

    /// Select the direction for subsequent steps.
    fn set_direction(&mut self, direction: Direction) -> Result<(), HalError>;

    /// Energize or release the motor.
    fn enable(&mut self, enabled: bool) -> Result<(), HalError>;

    /// Hint the rate at which the next steps will be issued.
    ///
    /// Timed variants size their pulse spacing from it.
    fn set_step_rate(&mut self, _steps_per_sec: f32) {}
}

/// Limit sensor capability.
pub trait Endstop {
    /// Whether the carriage is at this endstop. Cheap and idempotent.
    fn triggered(&mut self) -> Result<bool, HalError>;
}

#[cfg(feature = "std")]
impl<T: StepperDriver + ?Sized> StepperDriver for Box<T> {
    fn step(&mut self) -> Result<(), HalError> {
        (**self).step()
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), HalError> {
        (**self).set_direction(direction)
    }

    fn enable(&mut self, enabled: bool) -> Result<(), HalError> {
        (**self).enable(enabled)
    }

    fn set_step_rate(&mut self, steps_per_sec: f32) {
        (**self).set_step_rate(steps_per_sec)
    }
}

#[cfg(feature = "std")]
impl<T: Endstop + ?Sized> Endstop for Box<T> {
    fn triggered(&mut self) -> Result<bool, HalError> {
        (**self).triggered()
    }
}

/// A driver with its two endstops.
pub struct Hal<D, E> {
    /// Stepper driver.
    pub driver: D,
    /// Endstop at position 0.
    pub min: E,
    /// Endstop at the far end.
    pub max: E,
}

impl<D: StepperDriver, E: Endstop> Hal<D, E> {
    /// Bundle a driver and its endstops.
    pub fn new(driver: D, min: E, max: E) -> Self {
        Self { driver, min, max }
    }

    /// Poll one endstop.
    #[inline]
    pub fn triggered(&mut self, limit: Limit) -> Result<bool, HalError> {
        match limit {
            Limit::Min => self.min.triggered(),
            Limit::Max => self.max.triggered(),
        }
    }

    /// Box both capabilities so any variant fits one controller type.
    #[cfg(feature = "std")]
    pub fn boxed(self) -> DynHal
    where
        D: Send + 'static,
        E: Send + 'static,
    {
        Hal {
            driver: Box::new(self.driver),
            min: Box::new(self.min),
            max: Box::new(self.max),
        }
    }
}

/// Boxed driver of any variant.
#[cfg(feature = "std")]
pub type DynDriver = Box<dyn StepperDriver + Send>;

/// Boxed endstop of any variant.
#[cfg(feature = "std")]
pub type DynEndstop = Box<dyn Endstop + Send>;

/// Hardware selected at runtime.
#[cfg(feature = "std")]
pub type DynHal = Hal<DynDriver, DynEndstop>;
