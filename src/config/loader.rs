//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{short_message, ConfigError, Error, Result};

use super::SliderConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
///
/// ```rust,ignore
/// use slider_motion::load_config;
///
/// let config = load_config("/etc/slider.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SliderConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::Config(ConfigError::IoError(short_message(&e.to_string())))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<SliderConfig> {
    let config: SliderConfig = toml::from_str(content)
        .map_err(|e| Error::Config(ConfigError::ParseError(short_message(e.message()))))?;

    super::validation::validate_config(&config)?;

    Ok(config)
}
