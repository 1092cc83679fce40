use crate::domain::{Profile, Settings};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "launcher_settings.json";

/// JSON persistence for [`Settings`]
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("quarry-launcher");

        Ok(Self::at(config_dir.join(SETTINGS_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or unreadable file yields defaults
    pub fn load(&self) -> Settings {
        if !self.path.exists() {
            return Settings::default();
        }
        match Self::read_file(&self.path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings: {:#}", e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        Self::write_file(&self.path, settings)
    }

    pub fn export_to(&self, settings: &Settings, path: &Path) -> Result<()> {
        Self::write_file(path, settings)
    }

    /// Reads `path` and makes it the active settings
    pub fn import_from(&self, path: &Path) -> Result<Settings> {
        let settings = Self::read_file(path)?;
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn reset(&self) -> Result<Settings> {
        let settings = Settings::default();
        self.save(&settings)?;
        Ok(settings)
    }

    /// Writes `{name: profile}` so the file can be imported elsewhere
    pub fn export_profile(settings: &Settings, name: &str, path: &Path) -> Result<()> {
        let profile = settings
            .profiles
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found", name))?;
        let exported = BTreeMap::from([(name.to_string(), profile.clone())]);
        let json = serde_json::to_string_pretty(&exported)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn read_profiles(path: &Path) -> Result<BTreeMap<String, Profile>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not a profile file", path.display()))
    }

    fn read_file(path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(settings.normalized())
    }

    fn write_file(path: &Path, settings: &Settings) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&settings.clone().normalized())?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}
