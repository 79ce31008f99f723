//! GPIO variant: STEP/DIR/ENABLE outputs and endstop inputs over
//! embedded-hal 1.0.
//!
//! Generic over the pin and delay types so it runs on any platform crate
//! (rppal, linux-embedded-hal, an MCU HAL) and against embedded-hal-mock.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{ControllerConfig, PinConfig, SliderConfig};
use crate::error::{ConfigError, Error, HalError, Result};

use super::{Direction, Endstop, Hal, StepperDriver};

/// Fastest supported step rate.
pub const MAX_STEP_RATE_HZ: u32 = 20_000;

/// Stepper driver on three output pins.
pub struct GpioStepper<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    step_pin: STEP,
    dir_pin: DIR,
    enable_pin: EN,
    delay: DELAY,
    /// STEP high time.
    pulse_us: u32,
    /// Shortest full step period.
    min_interval_us: u32,
    /// Longest full step period.
    max_interval_us: u32,
    /// Period for the next steps.
    interval_us: u32,
    /// Last level written to DIR.
    current_direction: Option<Direction>,
    enable_active_low: bool,
}

impl<STEP, DIR, EN, DELAY> GpioStepper<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    /// Current step period in microseconds.
    #[inline]
    pub fn interval_us(&self) -> u32 {
        self.interval_us
    }

    /// STEP pulse width in microseconds.
    #[inline]
    pub fn pulse_us(&self) -> u32 {
        self.pulse_us
    }

    /// Direction last written to the DIR line.
    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.current_direction
    }
}

impl<STEP, DIR, EN, DELAY> StepperDriver for GpioStepper<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    fn step(&mut self) -> core::result::Result<(), HalError> {
        self.step_pin.set_high().map_err(|_| HalError::Pin)?;
        self.delay.delay_us(self.pulse_us);
        self.step_pin.set_low().map_err(|_| HalError::Pin)?;

        let low_us = self.interval_us.saturating_sub(self.pulse_us);
        if low_us > 0 {
            self.delay.delay_us(low_us);
        }
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> core::result::Result<(), HalError> {
        if self.current_direction == Some(direction) {
            return Ok(());
        }

        let written = match direction {
            Direction::Forward => self.dir_pin.set_high(),
            Direction::Reverse => self.dir_pin.set_low(),
        };
        written.map_err(|_| HalError::Pin)?;

        self.current_direction = Some(direction);
        Ok(())
    }

    fn enable(&mut self, enabled: bool) -> core::result::Result<(), HalError> {
        let written = if enabled != self.enable_active_low {
            self.enable_pin.set_high()
        } else {
            self.enable_pin.set_low()
        };
        written.map_err(|_| HalError::Pin)
    }

    fn set_step_rate(&mut self, steps_per_sec: f32) {
        let interval = if steps_per_sec > 0.0 {
            1_000_000.0 / steps_per_sec
        } else {
            self.max_interval_us as f32
        };
        self.interval_us = (interval as u32).clamp(self.min_interval_us, self.max_interval_us);
    }
}

/// Endstop on one input pin.
///
/// Hall-effect switches pull the line low when the magnet is present, so
/// the default polarity is active-low; `invert` flips it.
pub struct GpioEndstop<PIN: InputPin> {
    pin: PIN,
    invert: bool,
}

impl<PIN: InputPin> GpioEndstop<PIN> {
    /// Wrap an input pin.
    pub fn new(pin: PIN, invert: bool) -> Self {
        Self { pin, invert }
    }
}

impl<PIN: InputPin> Endstop for GpioEndstop<PIN> {
    fn triggered(&mut self) -> core::result::Result<bool, HalError> {
        let low = self.pin.is_low().map_err(|_| HalError::Pin)?;
        Ok(low != self.invert)
    }
}

/// Builder assembling the GPIO variant from pins, a delay provider and
/// the pin configuration.
pub struct GpioHardwareBuilder<STEP, DIR, EN, END, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    END: InputPin,
    DELAY: DelayNs,
{
    step_pin: Option<STEP>,
    dir_pin: Option<DIR>,
    enable_pin: Option<EN>,
    min_endstop: Option<END>,
    max_endstop: Option<END>,
    delay: Option<DELAY>,
    pulse_us: u32,
    enable_active_low: bool,
    invert_endstops: bool,
    tick_period_ms: u32,
}

impl<STEP, DIR, EN, END, DELAY> Default for GpioHardwareBuilder<STEP, DIR, EN, END, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    END: InputPin,
    DELAY: DelayNs,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<STEP, DIR, EN, END, DELAY> GpioHardwareBuilder<STEP, DIR, EN, END, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    END: InputPin,
    DELAY: DelayNs,
{
    /// Create a new builder with the default pin policy.
    pub fn new() -> Self {
        let pins = PinConfig::default();
        Self {
            step_pin: None,
            dir_pin: None,
            enable_pin: None,
            min_endstop: None,
            max_endstop: None,
            delay: None,
            pulse_us: pins.step_pulse_us,
            enable_active_low: pins.enable_active_low,
            invert_endstops: pins.invert_endstops,
            tick_period_ms: ControllerConfig::default().tick_period_ms,
        }
    }

    /// Set the STEP pin.
    pub fn step_pin(mut self, pin: STEP) -> Self {
        self.step_pin = Some(pin);
        self
    }

    /// Set the DIR pin.
    pub fn dir_pin(mut self, pin: DIR) -> Self {
        self.dir_pin = Some(pin);
        self
    }

    /// Set the ENABLE pin.
    pub fn enable_pin(mut self, pin: EN) -> Self {
        self.enable_pin = Some(pin);
        self
    }

    /// Set the min (home) endstop input.
    pub fn min_endstop(mut self, pin: END) -> Self {
        self.min_endstop = Some(pin);
        self
    }

    /// Set the max endstop input.
    pub fn max_endstop(mut self, pin: END) -> Self {
        self.max_endstop = Some(pin);
        self
    }

    /// Set the delay provider.
    pub fn delay(mut self, delay: DELAY) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the STEP pulse width.
    pub fn step_pulse_us(mut self, us: u32) -> Self {
        self.pulse_us = us.max(1);
        self
    }

    /// Set ENABLE polarity.
    pub fn enable_active_low(mut self, active_low: bool) -> Self {
        self.enable_active_low = active_low;
        self
    }

    /// Invert endstop polarity.
    pub fn invert_endstops(mut self, invert: bool) -> Self {
        self.invert_endstops = invert;
        self
    }

    /// Configure pulse width and polarities from the pin section.
    pub fn from_pin_config(self, pins: &PinConfig) -> Self {
        self.step_pulse_us(pins.step_pulse_us)
            .enable_active_low(pins.enable_active_low)
            .invert_endstops(pins.invert_endstops)
    }

    /// Configure from the full slider configuration.
    pub fn from_config(mut self, config: &SliderConfig) -> Self {
        self.tick_period_ms = config.controller.tick_period_ms;
        self.from_pin_config(&config.pins)
    }

    /// Build the driver and endstops.
    ///
    /// STEP is driven low and the motor released before returning.
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingHardware` if a pin or the delay is missing,
    /// `HalError::Pin` if the initial pin writes fail.
    pub fn build(self) -> Result<Hal<GpioStepper<STEP, DIR, EN, DELAY>, GpioEndstop<END>>> {
        let missing = |part| Error::Config(ConfigError::MissingHardware(part));

        let step_pin = self.step_pin.ok_or_else(|| missing("step pin"))?;
        let dir_pin = self.dir_pin.ok_or_else(|| missing("dir pin"))?;
        let enable_pin = self.enable_pin.ok_or_else(|| missing("enable pin"))?;
        let min_endstop = self.min_endstop.ok_or_else(|| missing("min endstop pin"))?;
        let max_endstop = self.max_endstop.ok_or_else(|| missing("max endstop pin"))?;
        let delay = self.delay.ok_or_else(|| missing("delay"))?;

        // at least 2x pulse width and never faster than MAX_STEP_RATE_HZ
        let min_interval_us = (2 * self.pulse_us).max(1_000_000 / MAX_STEP_RATE_HZ);
        // one step may take at most 1/20 of a tick
        let max_interval_us = (self.tick_period_ms * 1000 / 20).max(min_interval_us);

        let mut stepper = GpioStepper {
            step_pin,
            dir_pin,
            enable_pin,
            delay,
            pulse_us: self.pulse_us,
            min_interval_us,
            max_interval_us,
            interval_us: max_interval_us,
            current_direction: None,
            enable_active_low: self.enable_active_low,
        };

        stepper.step_pin.set_low().map_err(|_| HalError::Pin)?;
        stepper.enable(false)?;

        Ok(Hal::new(
            stepper,
            GpioEndstop::new(min_endstop, self.invert_endstops),
            GpioEndstop::new(max_endstop, self.invert_endstops),
        ))
    }
}
