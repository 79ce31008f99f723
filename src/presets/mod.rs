//! Named motion-profile presets (std only).
//!
//! A preset is a validated [`MotionProfile`] stored under a short name.
//! [`PresetStore`] is the capability the rest of the system uses; two
//! stores implement it:
//!
//! - [`MemoryPresetStore`]: process-lifetime map, for tests and demos
//! - [`JsonFilePresetStore`]: one JSON document `{name: profile}` on disk

mod file;
mod memory;

use crate::error::{PresetError, Result};
use crate::motion::MotionProfile;

pub use file::JsonFilePresetStore;
pub use memory::MemoryPresetStore;

/// Longest accepted preset name, in bytes.
pub const MAX_PRESET_NAME: usize = 32;

/// Named profile storage.
pub trait PresetStore {
    /// Fetch a preset.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored under `name`.
    fn load(&self, name: &str) -> Result<MotionProfile>;

    /// Store a preset, replacing any previous one of the same name.
    ///
    /// The profile is validated first and stored normalised.
    fn save(&mut self, name: &str, profile: &MotionProfile) -> Result<()>;

    /// Stored names, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Remove a preset. Returns whether it existed.
    fn delete(&mut self, name: &str) -> Result<bool>;
}

/// Check a preset name: 1 to 32 bytes.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_PRESET_NAME {
        return Err(PresetError::InvalidName.into());
    }
    Ok(())
}

pub(crate) fn not_found(name: &str) -> crate::error::Error {
    PresetError::NotFound(crate::error::short_message(name)).into()
}
