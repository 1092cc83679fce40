use crate::infra::game_dir::GameDirectory;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// A file (or pack folder) inside `mods/` or `resourcepacks/`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentEntry {
    pub filename: String,
    pub path: PathBuf,
    pub enabled: bool,
    pub is_dir: bool,
}

/// One managed content folder; the filesystem is the source of truth
#[derive(Clone, Debug)]
pub struct ContentFolder {
    label: &'static str,
    dir: PathBuf,
    disabled_dir: Option<PathBuf>,
    extensions: &'static [&'static str],
    allow_dirs: bool,
}

impl ContentFolder {
    /// `mods/` with `.jar` files; disabled ones live in `mods/disabled/`
    pub fn mods(game: &GameDirectory) -> Self {
        Self {
            label: "mod",
            dir: game.mods_dir(),
            disabled_dir: Some(game.disabled_mods_dir()),
            extensions: &["jar"],
            allow_dirs: false,
        }
    }

    /// `resourcepacks/` with `.zip` files and unpacked pack folders
    pub fn resource_packs(game: &GameDirectory) -> Self {
        Self {
            label: "resource pack",
            dir: game.resource_packs_dir(),
            disabled_dir: None,
            extensions: &["zip"],
            allow_dirs: true,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn list(&self) -> Result<Vec<ContentEntry>> {
        let mut entries = self.scan(&self.dir, true)?;
        if let Some(disabled_dir) = &self.disabled_dir {
            entries.extend(self.scan(disabled_dir, false)?);
        }
        entries.sort_by(|a, b| {
            b.enabled
                .cmp(&a.enabled)
                .then_with(|| a.filename.to_lowercase().cmp(&b.filename.to_lowercase()))
        });
        Ok(entries)
    }

    fn scan(&self, dir: &Path, enabled: bool) -> Result<Vec<ContentEntry>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = entry.path();
            // `mods/disabled` itself is not a mod
            if Some(&path) == self.disabled_dir.as_ref() {
                continue;
            }
            if !self.accepts(&path) {
                continue;
            }
            entries.push(ContentEntry {
                filename: entry.file_name().to_string_lossy().to_string(),
                is_dir: path.is_dir(),
                path,
                enabled,
            });
        }
        Ok(entries)
    }

    fn accepts(&self, path: &Path) -> bool {
        if path.is_dir() {
            return self.allow_dirs;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Copies `source` into the folder; existing entries are not overwritten
    pub fn add(&self, source: &Path) -> Result<ContentEntry> {
        if !self.accepts(source) {
            anyhow::bail!(
                "{} is not a valid {} (expected .{})",
                source.display(),
                self.label,
                self.extensions.join(" or .")
            );
        }
        let file_name = source
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", source.display()))?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let dest = self.dir.join(file_name);
        let disabled_twin = self.disabled_dir.as_ref().map(|d| d.join(file_name));
        if dest.exists() || disabled_twin.is_some_and(|p| p.exists()) {
            anyhow::bail!("{} already exists", file_name.to_string_lossy());
        }

        if source.is_dir() {
            self.ensure_not_ancestor(source)?;
            if let Err(e) = copy_dir(source, &dest) {
                let _ = std::fs::remove_dir_all(&dest);
                return Err(e.context(format!("Failed to copy {}", source.display())));
            }
        } else {
            std::fs::copy(source, &dest)
                .with_context(|| format!("Failed to copy {}", source.display()))?;
        }
        log::info!("Added {} {}", self.label, dest.display());

        Ok(ContentEntry {
            filename: file_name.to_string_lossy().to_string(),
            is_dir: dest.is_dir(),
            path: dest,
            enabled: true,
        })
    }

    pub fn remove(&self, entry: &ContentEntry) -> Result<()> {
        self.ensure_owned(&entry.path)?;
        let removed = if entry.path.is_dir() {
            std::fs::remove_dir_all(&entry.path)
        } else {
            std::fs::remove_file(&entry.path)
        };
        removed.with_context(|| format!("Failed to remove {}", entry.path.display()))?;
        log::info!("Removed {} {}", self.label, entry.path.display());
        Ok(())
    }

    /// Moves a mod between `mods/` and `mods/disabled/`
    pub fn set_enabled(&self, entry: &ContentEntry, enabled: bool) -> Result<ContentEntry> {
        let disabled_dir = self
            .disabled_dir
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{}s cannot be disabled", self.label))?;
        self.ensure_owned(&entry.path)?;
        if entry.enabled == enabled {
            return Ok(entry.clone());
        }

        let target_dir = if enabled { &self.dir } else { disabled_dir };
        std::fs::create_dir_all(target_dir)
            .with_context(|| format!("Failed to create {}", target_dir.display()))?;
        let target = target_dir.join(&entry.filename);
        if target.exists() {
            anyhow::bail!("{} already exists in {}", entry.filename, target_dir.display());
        }
        std::fs::rename(&entry.path, &target)
            .with_context(|| format!("Failed to move {}", entry.filename))?;

        Ok(ContentEntry {
            path: target,
            enabled,
            ..entry.clone()
        })
    }

    pub fn open(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        open::that(&self.dir).with_context(|| format!("Failed to open {}", self.dir.display()))
    }

    /// A folder cannot be copied into itself or into one of its own subfolders
    fn ensure_not_ancestor(&self, source: &Path) -> Result<()> {
        let source = source
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", source.display()))?;
        let dir = self
            .dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", self.dir.display()))?;
        if dir.starts_with(&source) {
            anyhow::bail!(
                "{} contains the {} folder and cannot be added to it",
                source.display(),
                self.label
            );
        }
        Ok(())
    }

    fn ensure_owned(&self, path: &Path) -> Result<()> {
        let parent = path.parent();
        let owned = parent == Some(self.dir.as_path())
            || (self.disabled_dir.is_some() && parent == self.disabled_dir.as_deref());
        if !owned {
            anyhow::bail!("{} is not in the {} folder", path.display(), self.label);
        }
        Ok(())
    }
}

/// Symlinks are skipped so link loops cannot recurse
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            log::debug!("Skipping symlink {}", path.display());
            continue;
        }
        let dest_path = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir(&path, &dest_path)?;
        } else {
            std::fs::copy(&path, &dest_path)
                .with_context(|| format!("Failed to copy {}", path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, GameDirectory, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let game = GameDirectory::new(dir.path().join(".minecraft"));
        game.ensure_dirs().unwrap();
        let downloads = dir.path().join("downloads");
        fs::create_dir_all(&downloads).unwrap();
        (dir, game, downloads)
    }

    #[test]
    fn test_add_list_remove_mod() {
        let (_dir, game, downloads) = setup();
        let mods = ContentFolder::mods(&game);
        let source = downloads.join("sodium-0.5.jar");
        fs::write(&source, b"jar").unwrap();

        let added = mods.add(&source).unwrap();
        assert!(game.mods_dir().join("sodium-0.5.jar").exists());
        assert!(source.exists());
        assert!(mods.add(&source).is_err());

        let listed = mods.list().unwrap();
        assert_eq!(listed, vec![added.clone()]);

        mods.remove(&added).unwrap();
        assert!(!game.mods_dir().join("sodium-0.5.jar").exists());
        assert!(mods.list().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_moves_between_folders() {
        let (_dir, game, downloads) = setup();
        let mods = ContentFolder::mods(&game);
        let source = downloads.join("lithium.jar");
        fs::write(&source, b"jar").unwrap();
        let entry = mods.add(&source).unwrap();

        let disabled = mods.set_enabled(&entry, false).unwrap();
        assert!(!disabled.enabled);
        assert!(game.disabled_mods_dir().join("lithium.jar").exists());
        assert!(!game.mods_dir().join("lithium.jar").exists());
        assert_eq!(mods.list().unwrap(), vec![disabled.clone()]);

        let enabled = mods.set_enabled(&disabled, true).unwrap();
        assert!(enabled.enabled);
        assert!(game.mods_dir().join("lithium.jar").exists());
    }

    #[test]
    fn test_rejects_wrong_file_types() {
        let (_dir, game, downloads) = setup();
        let readme = downloads.join("readme.txt");
        fs::write(&readme, b"hi").unwrap();

        let err = ContentFolder::mods(&game).add(&readme).unwrap_err();
        assert!(err.to_string().contains("not a valid mod"));
        assert!(ContentFolder::resource_packs(&game).add(&readme).is_err());
        fs::write(game.mods_dir().join("notes.txt"), b"x").unwrap();
        assert!(ContentFolder::mods(&game).list().unwrap().is_empty());
    }

    #[test]
    fn test_resource_pack_zip_and_folder() {
        let (_dir, game, downloads) = setup();
        let packs = ContentFolder::resource_packs(&game);

        let zip = downloads.join("Faithful.zip");
        fs::write(&zip, b"zip").unwrap();
        let folder = downloads.join("MyPack");
        fs::create_dir_all(folder.join("assets")).unwrap();
        fs::write(folder.join("pack.mcmeta"), b"{}").unwrap();

        packs.add(&zip).unwrap();
        packs.add(&folder).unwrap();

        let names: Vec<String> = packs.list().unwrap().into_iter().map(|e| e.filename).collect();
        assert_eq!(names, vec!["Faithful.zip", "MyPack"]);
        assert!(game.resource_packs_dir().join("MyPack/pack.mcmeta").exists());

        let entry = packs.list().unwrap().remove(1);
        assert!(packs.set_enabled(&entry, false).is_err());
        packs.remove(&entry).unwrap();
        assert!(!game.resource_packs_dir().join("MyPack").exists());
    }

    #[test]
    fn test_folder_cannot_be_added_into_itself() {
        let (_dir, game, _downloads) = setup();
        let packs = ContentFolder::resource_packs(&game);

        let err = packs.add(&game.resource_packs_dir()).unwrap_err();
        assert!(err.to_string().contains("cannot be added"));
        assert!(!game.resource_packs_dir().join("resourcepacks").exists());

        assert!(packs.add(game.root()).is_err());
        assert!(!game.resource_packs_dir().join(".minecraft").exists());
        assert!(packs.list().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loops_are_not_followed() {
        let (_dir, game, downloads) = setup();
        let packs = ContentFolder::resource_packs(&game);
        let folder = downloads.join("LoopPack");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("pack.mcmeta"), b"{}").unwrap();
        std::os::unix::fs::symlink(&folder, folder.join("again")).unwrap();

        packs.add(&folder).unwrap();

        let copied = game.resource_packs_dir().join("LoopPack");
        assert!(copied.join("pack.mcmeta").exists());
        assert!(!copied.join("again").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_folder_copy_is_cleaned_up() {
        let (_dir, game, downloads) = setup();
        let packs = ContentFolder::resource_packs(&game);
        let folder = downloads.join("BrokenPack");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("pack.mcmeta"), b"{}").unwrap();
        // sockets cannot be opened for reading, so the copy fails part way
        let _listener = std::os::unix::net::UnixListener::bind(folder.join("pack.sock")).unwrap();

        assert!(packs.add(&folder).is_err());
        assert!(!game.resource_packs_dir().join("BrokenPack").exists());
        assert!(packs.add(&folder).unwrap_err().to_string().contains("Failed to copy"));
    }
}
