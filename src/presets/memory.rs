//! In-memory preset store.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::motion::MotionProfile;

use super::{check_name, not_found, PresetStore};

/// Presets held for the lifetime of the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryPresetStore {
    presets: BTreeMap<String, MotionProfile>,
}

impl MemoryPresetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored presets.
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl PresetStore for MemoryPresetStore {
    fn load(&self, name: &str) -> Result<MotionProfile> {
        check_name(name)?;
        self.presets.get(name).cloned().ok_or_else(|| not_found(name))
    }

    fn save(&mut self, name: &str, profile: &MotionProfile) -> Result<()> {
        check_name(name)?;
        let profile = profile.clone().validated()?;
        self.presets.insert(name.to_owned(), profile);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.presets.keys().cloned().collect())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        check_name(name)?;
        Ok(self.presets.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, PresetError};
    use crate::motion::{Keyframe, ProfileBuilder};

    fn profile() -> MotionProfile {
        ProfileBuilder::new()
            .length(800.0)
            .keyframe(5.0, 600.0)
            .keyframe(0.0, 100.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_save_load_list_delete() {
        let mut store = MemoryPresetStore::new();
        store.save("sunset", &profile()).unwrap();
        store.save("b-roll", &profile()).unwrap();

        assert_eq!(store.list().unwrap(), vec!["b-roll", "sunset"]);
        let loaded = store.load("sunset").unwrap();
        assert_eq!(loaded.keyframes[0].pos_mm, 100.0);

        assert!(store.delete("sunset").unwrap());
        assert!(!store.delete("sunset").unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_preset() {
        let store = MemoryPresetStore::new();
        assert!(matches!(
            store.load("nope"),
            Err(Error::Preset(PresetError::NotFound(name))) if name == "nope"
        ));
    }

    #[test]
    fn test_save_rejects_invalid_profile() {
        let mut store = MemoryPresetStore::new();
        let mut bad = profile();
        bad.keyframes.truncate(1);
        assert!(store.save("bad", &bad).unwrap_err().is_invalid_profile());
        assert!(store.is_empty());

        let mut bad = profile();
        bad.keyframes[1] = Keyframe::new(5.0, 900.0);
        assert!(store.save("bad", &bad).unwrap_err().is_invalid_profile());
    }
}
