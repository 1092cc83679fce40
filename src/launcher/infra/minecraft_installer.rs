use crate::launcher::domain::{
    AssetIndex, Library, MavenArtifact, VersionManifest, current_os_name,
};
use crate::launcher::infra::downloader::{
    DownloadItem, Downloader, ProgressCallback, ProgressSpan, report, scale_progress,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const GLOBAL_MANIFEST_URL: &str = "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
const MANIFEST_CACHE_FILE: &str = "version_manifest_v2.json";

const STEP_MANIFEST: f32 = 0.05;
const STEP_VERSION_JSON: f32 = 0.1;
const STEP_CLIENT: f32 = 0.3;
const STEP_LIBRARIES: f32 = 0.6;
const STEP_ASSETS: f32 = 0.98;
/// An inherited parent version installs inside `[STEP_VERSION_JSON, STEP_PARENT]`
const STEP_PARENT: f32 = 0.8;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalVersionManifest {
    pub versions: Vec<RemoteVersion>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteVersion {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime", default)]
    pub release_time: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssetIndexFile {
    objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
struct AssetObject {
    hash: String,
    size: u64,
}

#[derive(Clone)]
pub struct MinecraftInstaller {
    downloader: Downloader,
}

impl MinecraftInstaller {
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }

    /// Fresh manifest from Mojang, falling back to the cached copy when offline
    pub async fn load_global_manifest(&self, minecraft_dir: &Path) -> Result<GlobalVersionManifest> {
        let cache_path = minecraft_dir.join(MANIFEST_CACHE_FILE);

        match self.downloader.fetch_bytes(GLOBAL_MANIFEST_URL).await {
            Ok(bytes) => {
                let manifest: GlobalVersionManifest = serde_json::from_slice(&bytes)
                    .context("Failed to parse version manifest")?;
                if let Err(e) = write_cache(&cache_path, &bytes).await {
                    log::warn!("Failed to cache version manifest: {:#}", e);
                }
                Ok(manifest)
            }
            Err(e) => {
                log::warn!("Version manifest download failed, using cache: {:#}", e);
                let content = tokio::fs::read_to_string(&cache_path).await.map_err(|_| {
                    e.context("Could not fetch the version list and no cached copy exists")
                })?;
                serde_json::from_str(&content).context("Failed to parse cached version manifest")
            }
        }
    }

    /// Remote versions, newest first
    pub async fn fetch_available_versions(&self, minecraft_dir: &Path) -> Result<Vec<RemoteVersion>> {
        let manifest = self.load_global_manifest(minecraft_dir).await?;
        let mut versions = manifest.versions;
        versions.sort_by(|a, b| b.release_time.cmp(&a.release_time));
        Ok(versions)
    }

    pub async fn install_version(
        &self,
        minecraft_dir: &Path,
        version_id: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<()> {
        let manifest = if is_manifest_version(minecraft_dir, version_id) {
            None
        } else {
            report(&on_progress, 0.0, "Loading version manifest");
            Some(self.load_global_manifest(minecraft_dir).await?)
        };
        self.install_version_inner(minecraft_dir, version_id, manifest.as_ref(), &on_progress, 0)
            .await?;
        report(&on_progress, 1.0, format!("Minecraft {} ready", version_id));
        Ok(())
    }

    async fn install_version_inner(
        &self,
        minecraft_dir: &Path,
        version_id: &str,
        global: Option<&GlobalVersionManifest>,
        on_progress: &Option<ProgressCallback>,
        depth: u8,
    ) -> Result<()> {
        if depth > 3 {
            anyhow::bail!("Version inheritance too deep at {}", version_id);
        }

        let version_json_path = self
            .ensure_version_json(minecraft_dir, version_id, global, on_progress)
            .await?;

        report(on_progress, STEP_VERSION_JSON, "Reading version metadata");
        let version_manifest = VersionManifest::from_file(&version_json_path)
            .context("Failed to parse version metadata")?;

        let own_progress = match &version_manifest.inherits_from {
            Some(parent) if parent != version_id => {
                let global = match global {
                    Some(g) => Some(g.clone()),
                    None if is_manifest_version(minecraft_dir, parent) => None,
                    None => Some(self.load_global_manifest(minecraft_dir).await?),
                };
                let parent_progress =
                    scale_progress(on_progress, ProgressSpan::new(STEP_VERSION_JSON, STEP_PARENT));
                Box::pin(self.install_version_inner(
                    minecraft_dir,
                    parent,
                    global.as_ref(),
                    &parent_progress,
                    depth + 1,
                ))
                .await?;
                scale_progress(on_progress, ProgressSpan::new(STEP_PARENT, 1.0))
            }
            _ => on_progress.clone(),
        };
        let on_progress = &own_progress;

        if let Some(client) = version_manifest.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            let client_jar = minecraft_dir
                .join("versions")
                .join(version_id)
                .join(format!("{}.jar", version_id));
            let item = DownloadItem::new(&client.url, client_jar)
                .with_size(client.size)
                .with_sha1(&client.sha1);
            self.downloader
                .download_all(
                    vec![item],
                    on_progress,
                    ProgressSpan::new(STEP_VERSION_JSON, STEP_CLIENT),
                    "Downloading client jar",
                )
                .await?;
        }

        let libraries_dir = minecraft_dir.join("libraries");
        let libraries = collect_library_downloads(&version_manifest.libraries, &libraries_dir)?;
        self.downloader
            .download_all(
                libraries,
                on_progress,
                ProgressSpan::new(STEP_CLIENT, STEP_LIBRARIES),
                "Downloading libraries",
            )
            .await?;

        if let Some(asset_index) = &version_manifest.asset_index {
            self.download_assets(minecraft_dir, asset_index, on_progress)
                .await?;
        }

        Ok(())
    }

    async fn ensure_version_json(
        &self,
        minecraft_dir: &Path,
        version_id: &str,
        global: Option<&GlobalVersionManifest>,
        on_progress: &Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        let version_json_path = minecraft_dir
            .join("versions")
            .join(version_id)
            .join(format!("{}.json", version_id));

        if version_json_path.exists() {
            return Ok(version_json_path);
        }

        let entry = global
            .and_then(|g| g.versions.iter().find(|v| v.id == version_id))
            .ok_or_else(|| anyhow::anyhow!("Minecraft version not found: {}", version_id))?;

        let mut item = DownloadItem::new(&entry.url, version_json_path.clone());
        if let Some(sha1) = &entry.sha1 {
            item = item.with_sha1(sha1);
        }
        self.downloader
            .download_all(
                vec![item],
                on_progress,
                ProgressSpan::new(STEP_MANIFEST, STEP_VERSION_JSON),
                "Downloading version metadata",
            )
            .await?;

        Ok(version_json_path)
    }

    async fn download_assets(
        &self,
        minecraft_dir: &Path,
        asset_index: &AssetIndex,
        on_progress: &Option<ProgressCallback>,
    ) -> Result<()> {
        let assets_dir = minecraft_dir.join("assets");
        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", asset_index.id));
        let objects_dir = assets_dir.join("objects");

        let index_item = DownloadItem::new(&asset_index.url, index_path.clone())
            .with_size(asset_index.size)
            .with_sha1(&asset_index.sha1);
        self.downloader
            .download_all(
                vec![index_item],
                on_progress,
                ProgressSpan::new(STEP_LIBRARIES, STEP_LIBRARIES + 0.02),
                "Downloading asset index",
            )
            .await?;

        let index_content = tokio::fs::read_to_string(&index_path)
            .await
            .context("Failed to read asset index")?;
        let index_file: AssetIndexFile =
            serde_json::from_str(&index_content).context("Failed to parse asset index")?;

        let assets = asset_downloads(&index_file, &objects_dir);
        self.downloader
            .download_all(
                assets,
                on_progress,
                ProgressSpan::new(STEP_LIBRARIES + 0.02, STEP_ASSETS),
                "Downloading assets",
            )
            .await
    }
}

fn is_manifest_version(minecraft_dir: &Path, version_id: &str) -> bool {
    minecraft_dir
        .join("versions")
        .join(version_id)
        .join(format!("{}.json", version_id))
        .exists()
}

async fn write_cache(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

fn asset_downloads(index: &AssetIndexFile, objects_dir: &Path) -> Vec<DownloadItem> {
    let mut seen = std::collections::HashSet::new();
    index
        .objects
        .values()
        .filter(|object| object.hash.len() > 2 && seen.insert(object.hash.clone()))
        .map(|object| {
            let prefix = &object.hash[0..2];
            DownloadItem::new(
                format!("{}/{}/{}", RESOURCES_URL, prefix, object.hash),
                objects_dir.join(prefix).join(&object.hash),
            )
            .with_size(object.size)
            .with_sha1(&object.hash)
        })
        .collect()
}

/// Native classifier key for the current platform, e.g. `natives-windows`
pub fn natives_classifier(library: &Library) -> Option<String> {
    let natives = library.natives.as_ref()?;
    let arch = if cfg!(target_pointer_width = "64") { "64" } else { "32" };
    natives
        .get(current_os_name())
        .map(|key| key.replace("${arch}", arch))
}

/// Downloads needed by `libraries` on this OS: main artifacts and native classifiers
pub fn collect_library_downloads(
    libraries: &[Library],
    libraries_dir: &Path,
) -> Result<Vec<DownloadItem>> {
    let mut downloads = Vec::new();

    for library in libraries {
        if !VersionManifest::should_include_library(library) {
            continue;
        }

        if let Some(classifier) = natives_classifier(library)
            && let Some(native) = library
                .downloads
                .as_ref()
                .and_then(|d| d.classifiers.as_ref())
                .and_then(|c| c.get(&classifier))
        {
            downloads.push(
                DownloadItem::new(&native.url, libraries_dir.join(&native.path))
                    .with_size(native.size)
                    .with_sha1(&native.sha1),
            );
        }

        if let Some(artifact) = library.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            if artifact.url.is_empty() {
                continue;
            }
            downloads.push(
                DownloadItem::new(&artifact.url, libraries_dir.join(&artifact.path))
                    .with_size(artifact.size)
                    .with_sha1(&artifact.sha1),
            );
            continue;
        }

        if let Some(base_url) = &library.url {
            let artifact = MavenArtifact::parse(&library.name)?;
            let mut item = DownloadItem::new(
                artifact.url(base_url),
                libraries_dir.join(artifact.relative_path()),
            );
            if let Some(size) = library.size {
                item = item.with_size(size);
            }
            if let Some(sha1) = &library.sha1 {
                item = item.with_sha1(sha1);
            }
            downloads.push(item);
        }
    }

    Ok(downloads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn library(json: serde_json::Value) -> Library {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_collects_artifacts_and_maven_libraries() {
        let libs = vec![
            library(serde_json::json!({
                "name": "com.mojang:brigadier:1.0.18",
                "downloads": {"artifact": {
                    "path": "com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar",
                    "sha1": "c1ef1234", "size": 77000,
                    "url": "https://libraries.minecraft.net/com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar"
                }}
            })),
            library(serde_json::json!({
                "name": "net.fabricmc:intermediary:1.20.1",
                "url": "https://maven.fabricmc.net/"
            })),
            library(serde_json::json!({
                "name": "com.example:never:1.0",
                "url": "https://example.invalid/",
                "rules": [{"action": "allow", "os": {"name": "plan9"}}]
            })),
        ];

        let root = PathBuf::from("/libs");
        let items = collect_library_downloads(&libs, &root).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].size, Some(77000));
        assert_eq!(items[0].sha1.as_deref(), Some("c1ef1234"));
        assert_eq!(
            items[1].url,
            "https://maven.fabricmc.net/net/fabricmc/intermediary/1.20.1/intermediary-1.20.1.jar"
        );
        assert!(items[1].dest.starts_with(&root));
    }

    #[test]
    fn test_native_classifier_is_collected_for_current_os() {
        let os = current_os_name();
        let classifier = format!("natives-{os}");
        let lib = library(serde_json::json!({
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "natives": {os: classifier.clone()},
            "downloads": {"classifiers": {classifier.clone(): {
                "path": format!("org/lwjgl/lwjgl/lwjgl-platform/2.9.4/lwjgl-platform-2.9.4-{classifier}.jar"),
                "sha1": "ab", "size": 10, "url": "https://libraries.minecraft.net/native.jar"
            }}}
        }));

        let items = collect_library_downloads(&[lib], Path::new("/libs")).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://libraries.minecraft.net/native.jar");
    }

    fn write_json(path: &Path, value: serde_json::Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_inherited_install_progress_never_goes_back() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let index = r#"{"objects":{}}"#;
        write_json(
            &root.join("versions/1.20.1/1.20.1.json"),
            serde_json::json!({
                "id": "1.20.1",
                "assetIndex": {"id": "5", "sha1": "", "size": index.len(), "url": "http://localhost/5.json"}
            }),
        );
        std::fs::create_dir_all(root.join("assets/indexes")).unwrap();
        std::fs::write(root.join("assets/indexes/5.json"), index).unwrap();
        write_json(
            &root.join("versions/fabric-loader-0.15.11-1.20.1/fabric-loader-0.15.11-1.20.1.json"),
            serde_json::json!({"id": "fabric-loader-0.15.11-1.20.1", "inheritsFrom": "1.20.1"}),
        );

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |p: f32, _s: String| sink.lock().push(p));

        MinecraftInstaller::new(Downloader::new())
            .install_version(root, "fabric-loader-0.15.11-1.20.1", Some(cb))
            .await
            .unwrap();

        let seen = seen.lock();
        assert!(seen.len() > 4);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went back: {:?}", *seen);
        assert_eq!(seen.last(), Some(&1.0));
    }

    #[test]
    fn test_asset_downloads_dedupe_hashes() {
        let index: AssetIndexFile = serde_json::from_value(serde_json::json!({
            "objects": {
                "a.png": {"hash": "abcdef0123", "size": 3},
                "b.png": {"hash": "abcdef0123", "size": 3},
                "c.ogg": {"hash": "99ff00", "size": 7}
            }
        }))
        .unwrap();

        let mut items = asset_downloads(&index, Path::new("/objects"));
        items.sort_by(|a, b| a.url.cmp(&b.url));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, format!("{}/99/99ff00", RESOURCES_URL));
        assert_eq!(items[1].dest, Path::new("/objects").join("ab").join("abcdef0123"));
    }
}
