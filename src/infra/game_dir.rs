use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The game-data root and the folders the launcher manages inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDirectory {
    root: PathBuf,
}

impl GameDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform default location, e.g. `~/.minecraft` on Linux
    pub fn detect() -> Result<Self> {
        let root = Self::default_root()
            .ok_or_else(|| anyhow::anyhow!("Could not determine the Minecraft data directory"))?;
        Ok(Self::new(root))
    }

    fn default_root() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            // %APPDATA%\.minecraft
            Some(dirs::data_dir()?.join(".minecraft"))
        } else if cfg!(target_os = "macos") {
            Some(dirs::data_dir()?.join("minecraft"))
        } else {
            Some(dirs::home_dir()?.join(".minecraft"))
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("mods")
    }

    pub fn disabled_mods_dir(&self) -> PathBuf {
        self.mods_dir().join("disabled")
    }

    pub fn resource_packs_dir(&self) -> PathBuf {
        self.root.join("resourcepacks")
    }

    /// Creates the root and the managed content folders
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.versions_dir(),
            self.mods_dir(),
            self.disabled_mods_dir(),
            self.resource_packs_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Version directories that contain their `<id>.json`, newest name first
    pub fn installed_versions(&self) -> Vec<String> {
        let mut versions = Vec::new();

        if let Ok(entries) = std::fs::read_dir(self.versions_dir()) {
            for entry in entries.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                if let Some(version_name) = entry.file_name().to_str() {
                    let json_file = entry.path().join(format!("{}.json", version_name));
                    if json_file.exists() {
                        versions.push(version_name.to_string());
                    }
                }
            }
        }

        versions.sort();
        versions.reverse();
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_installed_versions_need_json() {
        let dir = tempfile::tempdir().unwrap();
        let game = GameDirectory::new(dir.path());
        game.ensure_dirs().unwrap();

        for id in ["1.19.4", "1.20.1"] {
            let version_dir = game.versions_dir().join(id);
            fs::create_dir_all(&version_dir).unwrap();
            fs::write(version_dir.join(format!("{id}.json")), "{}").unwrap();
        }
        fs::create_dir_all(game.versions_dir().join("broken")).unwrap();

        assert_eq!(game.installed_versions(), vec!["1.20.1", "1.19.4"]);
        assert!(game.disabled_mods_dir().is_dir());
        assert!(game.resource_packs_dir().is_dir());
    }

    #[test]
    fn test_missing_versions_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let game = GameDirectory::new(dir.path().join("nowhere"));
        assert!(game.installed_versions().is_empty());
    }
}
