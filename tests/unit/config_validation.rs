//! Unit tests for configuration parsing and validation.

use slider_motion::config::{parse_config, validate_config, SliderConfig};
use slider_motion::error::{ConfigError, Error};

/// Test that an empty document yields the reference hardware defaults.
#[test]
fn test_empty_config_uses_defaults() {
    let config = parse_config("").expect("Empty config should parse");

    assert_eq!(config.mechanics.steps_per_revolution, 200);
    assert_eq!(config.mechanics.microsteps.value(), 16);
    assert!((config.steps_per_mm() - 400.0).abs() < 1e-4);
    assert_eq!(config.mechanics.travel.0, 1200.0);
    assert_eq!(config.limits.max_speed.0, 120.0);
    assert_eq!(config.limits.max_acceleration.0, 300.0);
    assert_eq!(config.homing.speed.0, 30.0);
    assert_eq!(config.pins.lines(), [18, 23, 24, 17, 27]);
    assert!(config.pins.enable_active_low);
    assert_eq!(config.controller.tick_period_ms, 20);
}

/// Test parsing every section.
#[test]
fn test_parse_full_config() {
    let toml_str = r#"
[mechanics]
steps_per_revolution = 400
microsteps = 8
lead_mm_per_rev = 2.0
travel_mm = 600.0

[limits]
max_speed_mm_s = 40.0
max_accel_mm_s2 = 100.0

[homing]
speed_mm_s = 10.0
backoff_mm = 3.0
approach_speed_mm_s = 2.0
approach_travel_mm = 6.0
margin_mm = 20.0

[pins]
step = 5
dir = 6
enable = 13
min_endstop = 19
max_endstop = 26
enable_active_low = false
invert_endstops = true
step_pulse_us = 2

[controller]
tick_period_ms = 10
command_queue_depth = 4
"#;

    let config = parse_config(toml_str).expect("Full config should parse");
    assert!((config.steps_per_mm() - 1600.0).abs() < 1e-3);
    assert_eq!(config.limits.max_speed.0, 40.0);
    assert_eq!(config.homing.margin.0, 20.0);
    assert!(config.pins.invert_endstops);
    assert!(!config.pins.enable_active_low);
    assert_eq!(config.controller.command_queue_depth, 4);
    assert!((config.controller.tick_period_s() - 0.01).abs() < 1e-6);
}

/// Test that a non power-of-two microstep setting is rejected while parsing.
#[test]
fn test_invalid_microsteps_rejected() {
    let result = parse_config("[mechanics]\nmicrosteps = 3\n");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// Test that a zero travel is rejected.
#[test]
fn test_zero_travel_rejected() {
    let result = parse_config("[mechanics]\ntravel_mm = 0.0\n");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidTravel(_)))
    ));
}

/// Test that tick periods outside 5..=100 ms are rejected.
#[test]
fn test_tick_period_bounds() {
    for (period, ok) in [(4, false), (5, true), (100, true), (101, false)] {
        let mut config = SliderConfig::default();
        config.controller.tick_period_ms = period;
        assert_eq!(validate_config(&config).is_ok(), ok, "tick period {}", period);
    }
}

/// Test that a GPIO line cannot serve two functions.
#[test]
fn test_duplicate_pin_rejected() {
    let mut config = SliderConfig::default();
    config.pins.max_endstop = config.pins.step;

    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::DuplicatePin(18)))
    );
}

/// Test that an empty command queue is rejected.
#[test]
fn test_zero_queue_depth_rejected() {
    let mut config = SliderConfig::default();
    config.controller.command_queue_depth = 0;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidQueueDepth(0)))
    ));
}
