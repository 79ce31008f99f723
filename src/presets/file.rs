//! JSON-file preset store.
//!
//! The whole store is one pretty-printed JSON object mapping names to
//! profile documents. Every operation reads the file; every write replaces
//! it through a temporary sibling and a rename, so a crash never leaves a
//! half-written store behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{short_message, PresetError, Result};
use crate::motion::MotionProfile;

use super::{check_name, not_found, PresetStore};

type Document = BTreeMap<String, MotionProfile>;

/// Presets persisted in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFilePresetStore {
    path: PathBuf,
}

fn storage_error(context: &str, e: impl std::fmt::Display) -> crate::error::Error {
    PresetError::Storage(short_message(&format!("{}: {}", context, e))).into()
}

impl JsonFilePresetStore {
    /// Open the store at `path`, creating an empty one if it does not exist.
    ///
    /// # Errors
    ///
    /// `Storage` if the file cannot be created or is not a valid store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };

        if store.path.exists() {
            store.read()?;
        } else {
            log::info!("creating preset store at {}", store.path.display());
            store.write(&Document::new())?;
        }
        Ok(store)
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Document> {
        let content = fs::read_to_string(&self.path).map_err(|e| storage_error("read", e))?;
        serde_json::from_str(&content).map_err(|e| storage_error("parse", e))
    }

    fn write(&self, document: &Document) -> Result<()> {
        let json = serde_json::to_string_pretty(document).map_err(|e| storage_error("encode", e))?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json).map_err(|e| storage_error("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error("rename", e))
    }
}

impl PresetStore for JsonFilePresetStore {
    fn load(&self, name: &str) -> Result<MotionProfile> {
        check_name(name)?;
        let profile = self.read()?.remove(name).ok_or_else(|| not_found(name))?;
        // the file may have been edited by hand
        profile.validated()
    }

    fn save(&mut self, name: &str, profile: &MotionProfile) -> Result<()> {
        check_name(name)?;
        let profile = profile.clone().validated()?;

        let mut document = self.read()?;
        document.insert(name.to_owned(), profile);
        self.write(&document)?;
        log::debug!("saved preset '{}'", name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.read()?.into_keys().collect())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        check_name(name)?;
        let mut document = self.read()?;
        if document.remove(name).is_none() {
            return Ok(false);
        }
        self.write(&document)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::motion::{EasingSpec, ProfileBuilder};

    fn temp_path(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "slider-presets-{}-{}.json",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    fn profile() -> MotionProfile {
        ProfileBuilder::new()
            .length(1200.0)
            .keyframe(0.0, 0.0)
            .eased_keyframe(6.0, 900.0, EasingSpec::cubic_bezier(0.42, 0.0, 0.58, 1.0))
            .max_speed(200.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_open_creates_empty_store() {
        let path = temp_path("create");
        let store = JsonFilePresetStore::open(&path).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_presets_survive_reopen() {
        let path = temp_path("reopen");
        {
            let mut store = JsonFilePresetStore::open(&path).unwrap();
            store.save("wide", &profile()).unwrap();
            store.save("close", &profile()).unwrap();
            assert!(store.delete("close").unwrap());
        }

        let store = JsonFilePresetStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap(), vec!["wide"]);
        assert_eq!(store.load("wide").unwrap(), profile());
        assert!(matches!(
            store.load("close"),
            Err(Error::Preset(PresetError::NotFound(_)))
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFilePresetStore::open(&path),
            Err(Error::Preset(PresetError::Storage(_)))
        ));
        let _ = fs::remove_file(&path);
    }
}
