use crate::launcher::domain::ModLoaderKind;
use crate::launcher::infra::downloader::{
    DownloadItem, Downloader, ProgressCallback, ProgressSpan, report,
};
use crate::launcher::infra::loader_installer::{LoaderInstaller, find_installed_profile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
const FORGE_PROMOTIONS: &str =
    "https://files.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json";

#[derive(Debug, Deserialize)]
struct Promotions {
    promos: HashMap<String, String>,
}

/// Runs the official Forge installer jar in client mode
pub struct ForgeInstaller {
    downloader: Downloader,
}

impl ForgeInstaller {
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }

    async fn resolve_forge_version(&self, mc_version: &str) -> Result<String> {
        let promotions: Promotions = self
            .downloader
            .fetch_json(FORGE_PROMOTIONS)
            .await
            .context("Failed to fetch Forge promotions")?;

        pick_promoted_version(&promotions.promos, mc_version)
            .ok_or_else(|| anyhow::anyhow!("Forge does not support Minecraft {}", mc_version))
    }
}

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    fn kind(&self) -> ModLoaderKind {
        ModLoaderKind::Forge
    }

    async fn install(
        &self,
        minecraft_dir: &Path,
        mc_version: &str,
        java: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> Result<String> {
        let versions_dir = minecraft_dir.join("versions");
        report(&on_progress, 0.02, "Checking Forge installation");

        if let Some(existing) = find_installed_profile(&versions_dir, ModLoaderKind::Forge, mc_version)? {
            log::info!("Reusing installed Forge profile {}", existing);
            report(&on_progress, 1.0, "Forge ready");
            return Ok(existing);
        }

        report(&on_progress, 0.05, "Fetching Forge versions");
        let forge_version = self.resolve_forge_version(mc_version).await?;
        let forge_id = format!("{}-{}", mc_version, forge_version);
        log::info!("Installing Forge {} for Minecraft {}", forge_version, mc_version);

        let work_dir = tempfile::tempdir().context("Failed to create Forge work directory")?;
        let installer_name = format!("forge-{}-installer.jar", forge_id);
        let installer_path = work_dir.path().join(&installer_name);
        self.downloader
            .download_all(
                vec![DownloadItem::new(installer_url(&forge_id), installer_path.clone())],
                &on_progress,
                ProgressSpan::new(0.1, 0.3),
                "Downloading Forge installer",
            )
            .await?;

        let launcher_profiles = minecraft_dir.join("launcher_profiles.json");
        if !launcher_profiles.exists() {
            tokio::fs::write(
                &launcher_profiles,
                br#"{"profiles":{},"selectedProfile":null}"#,
            )
            .await
            .with_context(|| format!("Failed to write {}", launcher_profiles.display()))?;
        }

        report(&on_progress, 0.35, "Running Forge installer (this can take a while)");
        let output = tokio::process::Command::new(java)
            .arg("-jar")
            .arg(&installer_path)
            .arg("--installClient")
            .arg(minecraft_dir)
            .current_dir(work_dir.path())
            .output()
            .await
            .with_context(|| format!("Failed to run Java at {}", java.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let tail: Vec<&str> = stdout.lines().rev().take(15).collect();
            log::error!("Forge installer stdout:\n{}", stdout);
            anyhow::bail!(
                "Forge installer failed (code {:?})\n{}\n{}",
                output.status.code(),
                tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
                stderr.trim()
            );
        }

        report(&on_progress, 0.95, "Locating Forge profile");
        let profile = find_installed_profile(&versions_dir, ModLoaderKind::Forge, mc_version)?
            .ok_or_else(|| {
                anyhow::anyhow!("Forge installer finished but no profile for {} was created", mc_version)
            })?;

        report(&on_progress, 1.0, "Forge ready");
        Ok(profile)
    }
}

fn installer_url(forge_id: &str) -> String {
    format!(
        "{}/net/minecraftforge/forge/{id}/forge-{id}-installer.jar",
        FORGE_MAVEN,
        id = forge_id
    )
}

/// Recommended build for `mc_version`, else the latest one
fn pick_promoted_version(promos: &HashMap<String, String>, mc_version: &str) -> Option<String> {
    promos
        .get(&format!("{}-recommended", mc_version))
        .or_else(|| promos.get(&format!("{}-latest", mc_version)))
        .cloned()
}
