use crate::launcher::domain::{ModLoaderKind, VersionManifest};
use crate::launcher::infra::downloader::{Downloader, ProgressCallback, ProgressSpan, report};
use crate::launcher::infra::loader_installer::{
    LoaderInstaller, find_installed_profile, profile_json_path,
};
use crate::launcher::infra::minecraft_installer::collect_library_downloads;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

const FABRIC_META: &str = "https://meta.fabricmc.net/v2";
const QUILT_META: &str = "https://meta.quiltmc.org/v3";

const PROFILE_START: f32 = 0.1;
const PROFILE_END: f32 = 0.2;
const LIBS_START: f32 = 0.2;
const LIBS_END: f32 = 0.98;

#[derive(Debug, Deserialize)]
struct LoaderVersionResponse {
    loader: LoaderVersion,
}

#[derive(Debug, Deserialize)]
struct LoaderVersion {
    version: String,
    #[serde(default)]
    stable: Option<bool>,
}

/// Fabric and Quilt share one meta API shape and profile format
pub struct MetaLoaderInstaller {
    kind: ModLoaderKind,
    meta_url: &'static str,
    downloader: Downloader,
}

impl MetaLoaderInstaller {
    pub fn fabric(downloader: Downloader) -> Self {
        Self {
            kind: ModLoaderKind::Fabric,
            meta_url: FABRIC_META,
            downloader,
        }
    }

    pub fn quilt(downloader: Downloader) -> Self {
        Self {
            kind: ModLoaderKind::Quilt,
            meta_url: QUILT_META,
            downloader,
        }
    }

    fn loader_versions_url(&self, mc_version: &str) -> String {
        format!(
            "{}/versions/loader/{}",
            self.meta_url,
            urlencoding::encode(mc_version)
        )
    }

    fn profile_url(&self, mc_version: &str, loader_version: &str) -> String {
        format!(
            "{}/versions/loader/{}/{}/profile/json",
            self.meta_url,
            urlencoding::encode(mc_version),
            urlencoding::encode(loader_version)
        )
    }

    async fn fetch_latest_loader_version(&self, mc_version: &str) -> Result<String> {
        let name = self.kind.display_name();
        let versions: Vec<LoaderVersionResponse> = self
            .downloader
            .fetch_json(&self.loader_versions_url(mc_version))
            .await
            .with_context(|| format!("Failed to fetch {} loader versions", name))?;

        pick_loader_version(&versions).ok_or_else(|| {
            anyhow::anyhow!("{} does not support Minecraft {}", name, mc_version)
        })
    }

    async fn download_profile(
        &self,
        versions_dir: &Path,
        mc_version: &str,
        loader_version: &str,
        on_progress: &Option<ProgressCallback>,
    ) -> Result<String> {
        let name = self.kind.display_name();
        report(on_progress, PROFILE_START, format!("Downloading {} profile", name));

        let bytes = self
            .downloader
            .fetch_bytes(&self.profile_url(mc_version, loader_version))
            .await
            .with_context(|| format!("Failed to download {} profile", name))?;
        let profile: VersionManifest = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {} profile", name))?;

        let json_path = profile_json_path(versions_dir, &profile.id);
        if let Some(parent) = json_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create profile directory")?;
        }
        tokio::fs::write(&json_path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", json_path.display()))?;

        report(on_progress, PROFILE_END, format!("{} profile ready", name));
        Ok(profile.id)
    }

    async fn ensure_libraries(
        &self,
        minecraft_dir: &Path,
        version_id: &str,
        on_progress: &Option<ProgressCallback>,
    ) -> Result<()> {
        let profile_path = profile_json_path(&minecraft_dir.join("versions"), version_id);
        let profile = VersionManifest::from_file(&profile_path)?;
        let downloads =
            collect_library_downloads(&profile.libraries, &minecraft_dir.join("libraries"))?;

        self.downloader
            .download_all(
                downloads,
                on_progress,
                ProgressSpan::new(LIBS_START, LIBS_END),
                &format!("Downloading {} libraries", self.kind.display_name()),
            )
            .await
    }
}

#[async_trait]
impl LoaderInstaller for MetaLoaderInstaller {
    fn kind(&self) -> ModLoaderKind {
        self.kind
    }

    async fn install(
        &self,
        minecraft_dir: &Path,
        mc_version: &str,
        _java: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String> {
        let name = self.kind.display_name();
        let versions_dir = minecraft_dir.join("versions");
        report(&on_progress, 0.02, format!("Checking {} installation", name));

        let version_id = match find_installed_profile(&versions_dir, self.kind, mc_version)? {
            Some(existing) => {
                log::info!("Reusing installed {} profile {}", name, existing);
                existing
            }
            None => {
                report(&on_progress, 0.05, format!("Fetching latest {} loader", name));
                let loader_version = self.fetch_latest_loader_version(mc_version).await?;
                log::info!("Installing {} {} for Minecraft {}", name, loader_version, mc_version);
                self.download_profile(&versions_dir, mc_version, &loader_version, &on_progress)
                    .await?
            }
        };

        self.ensure_libraries(minecraft_dir, &version_id, &on_progress)
            .await?;
        report(&on_progress, 1.0, format!("{} ready", name));
        Ok(version_id)
    }
}

/// First stable loader, falling back to the newest listed
fn pick_loader_version(versions: &[LoaderVersionResponse]) -> Option<String> {
    versions
        .iter()
        .find(|v| match v.loader.stable {
            Some(stable) => stable,
            None => !v.loader.version.contains('-'),
        })
        .or_else(|| versions.first())
        .map(|v| v.loader.version.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Vec<LoaderVersionResponse> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_prefers_stable_fabric_loader() {
        let versions = parse(serde_json::json!([
            {"loader": {"version": "0.16.0", "stable": false}},
            {"loader": {"version": "0.15.11", "stable": true}}
        ]));
        assert_eq!(pick_loader_version(&versions).as_deref(), Some("0.15.11"));
    }

    #[test]
    fn test_quilt_skips_prereleases() {
        let versions = parse(serde_json::json!([
            {"loader": {"version": "0.27.0-beta.1"}},
            {"loader": {"version": "0.26.4"}}
        ]));
        assert_eq!(pick_loader_version(&versions).as_deref(), Some("0.26.4"));

        let only_beta = parse(serde_json::json!([{"loader": {"version": "0.27.0-beta.1"}}]));
        assert_eq!(pick_loader_version(&only_beta).as_deref(), Some("0.27.0-beta.1"));
        assert!(pick_loader_version(&[]).is_none());
    }

    #[test]
    fn test_meta_urls() {
        let fabric = MetaLoaderInstaller::fabric(Downloader::new());
        assert_eq!(
            fabric.profile_url("1.20.1", "0.15.11"),
            "https://meta.fabricmc.net/v2/versions/loader/1.20.1/0.15.11/profile/json"
        );
        let quilt = MetaLoaderInstaller::quilt(Downloader::new());
        assert_eq!(
            quilt.loader_versions_url("1.20.1"),
            "https://meta.quiltmc.org/v3/versions/loader/1.20.1"
        );
    }
}
