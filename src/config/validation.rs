//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::SliderConfig;

/// Shortest supported tick period.
pub const MIN_TICK_PERIOD_MS: u32 = 5;

/// Longest supported tick period.
pub const MAX_TICK_PERIOD_MS: u32 = 100;

/// Validate a slider configuration.
///
/// Checks:
/// - Mechanics are positive and finite
/// - Speed/acceleration caps are positive
/// - Homing speeds and distances are positive
/// - Tick period and queue depth are in range
/// - No GPIO line is assigned twice
pub fn validate_config(config: &SliderConfig) -> Result<()> {
    validate_mechanics(config)?;
    validate_limits(config)?;
    validate_homing(config)?;
    validate_controller(config)?;
    validate_pins(config)?;
    Ok(())
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn validate_mechanics(config: &SliderConfig) -> Result<()> {
    let m = &config.mechanics;

    if m.steps_per_revolution == 0 {
        return Err(Error::Config(ConfigError::InvalidStepsPerRevolution(
            m.steps_per_revolution,
        )));
    }

    if !positive(m.lead.0) {
        return Err(Error::Config(ConfigError::InvalidLead(m.lead.0)));
    }

    if !config.travel().is_valid() {
        return Err(Error::Config(ConfigError::InvalidTravel(m.travel.0)));
    }

    Ok(())
}

fn validate_limits(config: &SliderConfig) -> Result<()> {
    if !positive(config.limits.max_speed.0) {
        return Err(Error::Config(ConfigError::InvalidMaxSpeed(
            config.limits.max_speed.0,
        )));
    }

    if !positive(config.limits.max_acceleration.0) {
        return Err(Error::Config(ConfigError::InvalidMaxAcceleration(
            config.limits.max_acceleration.0,
        )));
    }

    Ok(())
}

fn validate_homing(config: &SliderConfig) -> Result<()> {
    let h = &config.homing;
    let checks = [
        (h.speed.0, "speed_mm_s"),
        (h.backoff.0, "backoff_mm"),
        (h.approach_speed.0, "approach_speed_mm_s"),
        (h.approach_travel.0, "approach_travel_mm"),
        (h.margin.0, "margin_mm"),
    ];

    for (value, field) in checks {
        if !positive(value) {
            return Err(Error::Config(ConfigError::InvalidHoming(field)));
        }
    }

    Ok(())
}

fn validate_controller(config: &SliderConfig) -> Result<()> {
    let c = &config.controller;

    if !(MIN_TICK_PERIOD_MS..=MAX_TICK_PERIOD_MS).contains(&c.tick_period_ms) {
        return Err(Error::Config(ConfigError::InvalidTickPeriod(c.tick_period_ms)));
    }

    if c.command_queue_depth == 0 {
        return Err(Error::Config(ConfigError::InvalidQueueDepth(
            c.command_queue_depth,
        )));
    }

    Ok(())
}

fn validate_pins(config: &SliderConfig) -> Result<()> {
    let lines = config.pins.lines();
    for (i, pin) in lines.iter().enumerate() {
        if lines[i + 1..].contains(pin) {
            return Err(Error::Config(ConfigError::DuplicatePin(*pin)));
        }
    }
    Ok(())
}
