use crate::domain::Settings;
use crate::infra::{GameDirectory, JavaDetector};
use crate::launcher::domain::{
    CommandBuilder, GameLoader, LaunchCommand, LaunchOptions, ModLoaderKind, VersionEntry,
    VersionType,
};
use crate::launcher::infra::downloader::{ProgressSpan, scale_progress};
use crate::launcher::infra::{
    Downloader, MinecraftInstaller, ProgressCallback, RemoteVersion, find_installed_profile,
    installer_for,
};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Entry point of the launch library used by the rest of the application
#[derive(Clone)]
pub struct LaunchLibrary {
    game_dir: GameDirectory,
    downloader: Downloader,
    installer: MinecraftInstaller,
}

impl LaunchLibrary {
    pub fn new(game_dir: GameDirectory) -> Self {
        let downloader = Downloader::new();
        Self {
            installer: MinecraftInstaller::new(downloader.clone()),
            downloader,
            game_dir,
        }
    }

    pub fn game_dir(&self) -> &GameDirectory {
        &self.game_dir
    }

    pub fn installed_versions(&self) -> Vec<String> {
        self.game_dir.installed_versions()
    }

    /// Remote manifest joined with the local `versions/` directory
    pub async fn list_versions(&self) -> Result<Vec<VersionEntry>> {
        let remote = self
            .installer
            .fetch_available_versions(self.game_dir.root())
            .await?;
        Ok(join_versions(remote, &self.installed_versions()))
    }

    pub async fn install_version(
        &self,
        version_id: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<()> {
        log::info!("Installing Minecraft {}", version_id);
        self.game_dir.ensure_dirs()?;
        self.installer
            .install_version(self.game_dir.root(), version_id, on_progress)
            .await
            .with_context(|| format!("Failed to install Minecraft {}", version_id))
    }

    /// Installs `kind` for `mc_version`, installing the base version first when missing.
    /// Returns the loader profile id.
    pub async fn install_mod_loader(
        &self,
        kind: ModLoaderKind,
        mc_version: &str,
        java: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String> {
        self.game_dir.ensure_dirs()?;

        if !self.installed_versions().iter().any(|v| v == mc_version) {
            log::info!("Minecraft {} missing, installing it before {}", mc_version, kind);
            let base_progress = scale_progress(&on_progress, ProgressSpan::new(0.0, 0.5));
            self.install_version(mc_version, base_progress).await?;
        }

        let loader_progress = scale_progress(&on_progress, ProgressSpan::new(0.5, 1.0));
        let installer = installer_for(kind, self.downloader.clone());
        installer
            .install(self.game_dir.root(), mc_version, java, loader_progress)
            .await
            .with_context(|| format!("Failed to install {} for Minecraft {}", installer.kind(), mc_version))
    }

    /// Version directory to launch for `version` with `loader`
    pub fn resolve_launch_version(&self, version: &str, loader: GameLoader) -> Result<String> {
        match loader.mod_loader() {
            None => Ok(version.to_string()),
            Some(kind) => find_installed_profile(&self.game_dir.versions_dir(), kind, version)?
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "{} is not installed for Minecraft {}. Install it from the Versions tab",
                        kind,
                        version
                    )
                }),
        }
    }

    pub fn build_launch_command(
        &self,
        version: &str,
        loader: GameLoader,
        settings: &Settings,
    ) -> Result<LaunchCommand> {
        let java = JavaDetector::resolve(settings.java_path.as_deref())?;
        let version_id = self.resolve_launch_version(version, loader)?;
        let options = LaunchOptions::from_settings(
            &version_id,
            settings,
            java,
            self.game_dir.root().to_path_buf(),
        );
        CommandBuilder::build(&options)
    }

    pub fn spawn(&self, command: &LaunchCommand) -> Result<Child> {
        Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start Java at {}", command.program.display()))
    }

    pub fn delete_version(&self, version_id: &str) -> Result<()> {
        let id = version_id.trim();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            anyhow::bail!("Invalid version id: '{}'", version_id);
        }
        let dir = self.game_dir.versions_dir().join(id);
        if !dir.is_dir() {
            anyhow::bail!("Version {} is not installed", id);
        }
        std::fs::remove_dir_all(&dir).with_context(|| format!("Failed to delete {}", dir.display()))?;
        log::info!("Deleted version {}", id);
        Ok(())
    }
}

/// Remote versions in manifest order; installed ids the manifest does not know
/// (loader profiles, custom builds) come first as `modded`
pub fn join_versions(remote: Vec<RemoteVersion>, installed: &[String]) -> Vec<VersionEntry> {
    let installed_set: HashSet<&str> = installed.iter().map(String::as_str).collect();
    let remote_ids: HashSet<String> = remote.iter().map(|v| v.id.clone()).collect();

    let mut entries: Vec<VersionEntry> = installed
        .iter()
        .filter(|id| !remote_ids.contains(*id))
        .map(|id| VersionEntry {
            id: id.clone(),
            version_type: VersionType::Modded,
            installed: true,
        })
        .collect();

    entries.extend(remote.into_iter().map(|v| VersionEntry {
        installed: installed_set.contains(v.id.as_str()),
        version_type: VersionType::from_manifest(&v.version_type),
        id: v.id,
    }));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn remote(id: &str, kind: &str) -> RemoteVersion {
        RemoteVersion {
            id: id.to_string(),
            version_type: kind.to_string(),
            release_time: String::new(),
            url: format!("https://piston-meta.mojang.com/{id}.json"),
            sha1: None,
        }
    }

    #[test]
    fn test_join_marks_installed_and_modded() {
        let entries = join_versions(
            vec![
                remote("1.21", "release"),
                remote("24w14a", "snapshot"),
                remote("1.20.1", "release"),
            ],
            &["fabric-loader-0.15.11-1.20.1".to_string(), "1.20.1".to_string()],
        );

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["fabric-loader-0.15.11-1.20.1", "1.21", "24w14a", "1.20.1"]);
        assert_eq!(entries[0].version_type, VersionType::Modded);
        assert!(entries[0].installed);
        assert!(!entries[1].installed);
        assert_eq!(entries[2].version_type, VersionType::Snapshot);
        assert!(entries[3].installed);
    }

    fn library_with_versions(ids: &[&str]) -> (tempfile::TempDir, LaunchLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let game = GameDirectory::new(dir.path());
        for id in ids {
            let version_dir = game.versions_dir().join(id);
            fs::create_dir_all(&version_dir).unwrap();
            fs::write(version_dir.join(format!("{id}.json")), "{}").unwrap();
        }
        (dir, LaunchLibrary::new(game))
    }

    #[test]
    fn test_resolve_launch_version_per_loader() {
        let (_dir, library) =
            library_with_versions(&["1.20.1", "quilt-loader-0.26.4-1.20.1"]);

        assert_eq!(
            library.resolve_launch_version("1.20.1", GameLoader::Vanilla).unwrap(),
            "1.20.1"
        );
        assert_eq!(
            library.resolve_launch_version("1.20.1", GameLoader::Quilt).unwrap(),
            "quilt-loader-0.26.4-1.20.1"
        );
        let err = library
            .resolve_launch_version("1.20.1", GameLoader::Forge)
            .unwrap_err();
        assert!(err.to_string().contains("Forge is not installed"));
    }

    #[test]
    fn test_delete_version() {
        let (_dir, library) = library_with_versions(&["1.19.4", "1.20.1"]);

        library.delete_version("1.19.4").unwrap();
        assert_eq!(library.installed_versions(), vec!["1.20.1"]);
        assert!(library.delete_version("1.19.4").is_err());
        assert!(library.delete_version("../1.20.1").is_err());
        assert!(library.delete_version("").is_err());
    }
}
