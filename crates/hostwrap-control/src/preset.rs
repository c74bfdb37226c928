//! Preset files addressed by name.

use crate::error::{ControlError, Result};
use std::path::{Path, PathBuf};

pub const PRESET_EXTENSION: &str = "fxp";

/// A folder of `<name>.fxp` preset files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetLibrary {
    folder: PathBuf,
}

impl PresetLibrary {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Path the preset `name` would live at. `None` for names that would escape
    /// the folder.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.contains('\0');
        if invalid {
            return None;
        }
        Some(self.folder.join(format!("{}.{}", name, PRESET_EXTENSION)))
    }

    /// Existing preset file for `name`.
    pub fn lookup(&self, name: &str) -> Option<PathBuf> {
        self.path_for(name).filter(|p| p.is_file())
    }

    /// Read a preset's bytes. Missing files and invalid names are
    /// `ControlError::MissingPreset`.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self
            .lookup(name)
            .ok_or_else(|| ControlError::MissingPreset(self.folder.join(name)))?;
        Ok(std::fs::read(path)?)
    }
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self::new("presets")
    }
}
