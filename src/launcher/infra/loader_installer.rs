use crate::launcher::domain::ModLoaderKind;
use crate::launcher::infra::downloader::{Downloader, ProgressCallback};
use crate::launcher::infra::forge_installer::ForgeInstaller;
use crate::launcher::infra::meta_installer::MetaLoaderInstaller;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Installs one mod loader's version profile into `<minecraft_dir>/versions`.
/// The base Minecraft version must already be installed.
#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    fn kind(&self) -> ModLoaderKind;

    /// Returns the installed profile id
    async fn install(
        &self,
        minecraft_dir: &Path,
        mc_version: &str,
        java: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String>;
}

pub fn installer_for(kind: ModLoaderKind, downloader: Downloader) -> Box<dyn LoaderInstaller> {
    match kind {
        ModLoaderKind::Fabric => Box::new(MetaLoaderInstaller::fabric(downloader)),
        ModLoaderKind::Quilt => Box::new(MetaLoaderInstaller::quilt(downloader)),
        ModLoaderKind::Forge => Box::new(ForgeInstaller::new(downloader)),
    }
}

/// Newest (by json mtime) installed profile of `kind` for `mc_version`
pub fn find_installed_profile(
    versions_dir: &Path,
    kind: ModLoaderKind,
    mc_version: &str,
) -> Result<Option<String>> {
    if !versions_dir.exists() {
        return Ok(None);
    }

    let mut best: Option<(SystemTime, String)> = None;

    for entry in std::fs::read_dir(versions_dir).context("Failed to read versions dir")? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.path().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !kind.matches_profile(&name, mc_version) {
            continue;
        }

        let json_path = profile_json_path(versions_dir, &name);
        let Ok(meta) = std::fs::metadata(&json_path) else {
            continue;
        };
        if meta.len() == 0 {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        match &best {
            Some((best_time, _)) if *best_time >= modified => {}
            _ => best = Some((modified, name)),
        }
    }

    Ok(best.map(|(_, name)| name))
}

pub fn profile_json_path(versions_dir: &Path, version_id: &str) -> PathBuf {
    versions_dir
        .join(version_id)
        .join(format!("{}.json", version_id))
}
