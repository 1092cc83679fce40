use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-version metadata file (`versions/<id>/<id>.json`)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionManifest {
    pub id: String,
    #[serde(rename = "mainClass")]
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    #[serde(rename = "minecraftArguments")]
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(rename = "assetIndex")]
    #[serde(default)]
    pub asset_index: Option<AssetIndex>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(rename = "type")]
    #[serde(default)]
    pub version_type: Option<String>,
    #[serde(rename = "inheritsFrom")]
    #[serde(default)]
    pub inherits_from: Option<String>,
}

/// Modern argument format (1.13+)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentValue>,
    #[serde(default)]
    pub jvm: Vec<ArgumentValue>,
}

/// Argument can be a string or a conditional object
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    String(String),
    Conditional {
        rules: Vec<Rule>,
        value: ArgumentValueInner,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArgumentValueInner {
    String(String),
    Array(Vec<String>),
}

impl ArgumentValueInner {
    pub fn values(&self) -> Vec<&str> {
        match self {
            ArgumentValueInner::String(s) => vec![s.as_str()],
            ArgumentValueInner::Array(arr) => arr.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibraryArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, LibraryArtifact>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryArtifact {
    pub path: String,
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    pub action: String,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetIndex {
    pub id: String,
    pub sha1: String,
    pub size: u64,
    #[serde(rename = "totalSize")]
    #[serde(default)]
    pub total_size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<VersionDownloadItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionDownloadItem {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

/// Feature flags consulted by argument rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFeatures {
    pub has_custom_resolution: bool,
}

/// Fully-resolved manifest after applying inheritance
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub main_class: String,
    pub client_jar_id: String,
    pub arguments: Option<Arguments>,
    pub minecraft_arguments: Option<String>,
    pub libraries: Vec<Library>,
    pub asset_index: AssetIndex,
    pub assets: String,
    pub version_type: String,
}

impl VersionManifest {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest: VersionManifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(manifest)
    }

    /// Library inclusion for the current OS
    pub fn should_include_library(library: &Library) -> bool {
        library.rules.is_empty() || rules_allow(&library.rules, &RuleFeatures::default())
    }

    /// Resolve inheritance chain and produce a fully-resolved manifest
    pub fn resolve_from_file(path: &Path) -> anyhow::Result<ResolvedManifest> {
        let versions_dir = path
            .parent()
            .and_then(|p| p.parent())
            .ok_or_else(|| anyhow::anyhow!("Invalid version manifest path"))?;

        let manifest = VersionManifest::from_file(path)?;
        let client_jar_id = manifest
            .jar
            .clone()
            .or_else(|| manifest.inherits_from.clone())
            .unwrap_or_else(|| manifest.id.clone());

        let merged = manifest.resolve_inheritance(versions_dir, 0)?;
        merged.into_resolved(client_jar_id)
    }

    fn resolve_inheritance(self, versions_dir: &Path, depth: u8) -> anyhow::Result<VersionManifest> {
        let Some(parent_id) = self.inherits_from.clone() else {
            return Ok(self);
        };
        if depth > 4 {
            anyhow::bail!("Version inheritance too deep at {}", self.id);
        }

        let parent_path = versions_dir
            .join(&parent_id)
            .join(format!("{parent_id}.json"));
        if !parent_path.exists() {
            anyhow::bail!(
                "Version {} requires {} which is not installed",
                self.id,
                parent_id
            );
        }
        let parent =
            VersionManifest::from_file(&parent_path)?.resolve_inheritance(versions_dir, depth + 1)?;
        Ok(VersionManifest::merge(parent, self))
    }

    fn merge(parent: VersionManifest, child: VersionManifest) -> VersionManifest {
        VersionManifest {
            id: child.id,
            main_class: child.main_class.or(parent.main_class),
            jar: child.jar.or(parent.jar),
            downloads: child.downloads.or(parent.downloads),
            arguments: merge_arguments(parent.arguments, child.arguments),
            minecraft_arguments: child.minecraft_arguments.or(parent.minecraft_arguments),
            libraries: merge_libraries(parent.libraries, child.libraries),
            asset_index: child.asset_index.or(parent.asset_index),
            assets: child.assets.or(parent.assets),
            version_type: child.version_type.or(parent.version_type),
            inherits_from: None,
        }
    }

    fn into_resolved(self, client_jar_id: String) -> anyhow::Result<ResolvedManifest> {
        let asset_index = self
            .asset_index
            .ok_or_else(|| anyhow::anyhow!("Manifest missing assetIndex"))?;
        Ok(ResolvedManifest {
            main_class: self
                .main_class
                .ok_or_else(|| anyhow::anyhow!("Manifest missing mainClass"))?,
            client_jar_id,
            arguments: self.arguments,
            minecraft_arguments: self.minecraft_arguments,
            libraries: self.libraries,
            assets: self.assets.unwrap_or_else(|| asset_index.id.clone()),
            asset_index,
            version_type: self.version_type.unwrap_or_else(|| "release".to_string()),
        })
    }
}

/// Later matching rules override earlier ones; no matching rule means disallowed.
pub fn rules_allow(rules: &[Rule], features: &RuleFeatures) -> bool {
    let mut allowed = false;

    for rule in rules {
        let os_ok = rule.os.as_ref().map(os_matches).unwrap_or(true);
        let features_ok = rule
            .features
            .as_ref()
            .map(|wanted| {
                wanted.iter().all(|(name, expected)| {
                    let actual = match name.as_str() {
                        "has_custom_resolution" => features.has_custom_resolution,
                        _ => false,
                    };
                    actual == *expected
                })
            })
            .unwrap_or(true);

        if os_ok && features_ok {
            allowed = rule.action == "allow";
        }
    }

    allowed
}

fn os_matches(os: &OsRule) -> bool {
    let name_ok = os
        .name
        .as_ref()
        .map(|n| n == current_os_name())
        .unwrap_or(true);
    let arch_ok = os.arch.as_ref().map(|a| matches_arch(a)).unwrap_or(true);
    name_ok && arch_ok
}

/// Current OS name in Mojang manifest format
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn matches_arch(arch: &str) -> bool {
    match arch {
        "x86" => cfg!(target_pointer_width = "32"),
        "x86_64" => cfg!(target_arch = "x86_64"),
        "arm64" | "aarch64" => cfg!(target_arch = "aarch64"),
        _ => true,
    }
}

fn merge_arguments(parent: Option<Arguments>, child: Option<Arguments>) -> Option<Arguments> {
    match (parent, child) {
        (None, None) => None,
        (Some(p), None) => Some(p),
        (None, Some(c)) => Some(c),
        (Some(mut p), Some(c)) => {
            p.game.extend(c.game);
            p.jvm.extend(c.jvm);
            Some(p)
        }
    }
}

/// Libraries are keyed by coordinate without version so that a loader profile
/// replaces the vanilla copy of the same artifact (asm, for instance).
fn merge_libraries(parent: Vec<Library>, child: Vec<Library>) -> Vec<Library> {
    let mut libraries = parent;
    let mut index = HashMap::new();

    for (i, lib) in libraries.iter().enumerate() {
        index.insert(library_key(&lib.name), i);
    }

    for lib in child {
        let key = library_key(&lib.name);
        if let Some(i) = index.get(&key).copied() {
            libraries[i] = lib;
        } else {
            index.insert(key, libraries.len());
            libraries.push(lib);
        }
    }

    libraries
}

fn library_key(name: &str) -> String {
    let parts: Vec<&str> = name.split(':').collect();
    match parts.as_slice() {
        [group, artifact, _version] => format!("{group}:{artifact}"),
        [group, artifact, _version, classifier, ..] => format!("{group}:{artifact}:{classifier}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_version(versions_dir: &Path, id: &str, body: &str) {
        let dir = versions_dir.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{id}.json")), body).unwrap();
    }

    #[test]
    fn test_child_profile_inherits_and_overrides_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let versions = tmp.path().join("versions");

        write_version(
            &versions,
            "1.20.1",
            r#"{
                "id": "1.20.1",
                "mainClass": "net.minecraft.client.main.Main",
                "type": "release",
                "assets": "5",
                "assetIndex": {"id": "5", "sha1": "aa", "size": 1, "totalSize": 2, "url": "http://x"},
                "arguments": {"game": ["--username", "${auth_player_name}"], "jvm": ["-cp", "${classpath}"]},
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.3"},
                    {"name": "com.mojang:brigadier:1.1.8"}
                ]
            }"#,
        );
        write_version(
            &versions,
            "fabric-loader-0.15.0-1.20.1",
            r#"{
                "id": "fabric-loader-0.15.0-1.20.1",
                "inheritsFrom": "1.20.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "arguments": {"game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "]},
                "libraries": [
                    {"name": "org.ow2.asm:asm:9.6", "url": "https://maven.fabricmc.net/"},
                    {"name": "net.fabricmc:fabric-loader:0.15.0", "url": "https://maven.fabricmc.net/"}
                ]
            }"#,
        );

        let resolved = VersionManifest::resolve_from_file(
            &versions
                .join("fabric-loader-0.15.0-1.20.1")
                .join("fabric-loader-0.15.0-1.20.1.json"),
        )
        .unwrap();

        assert_eq!(resolved.main_class, "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(resolved.client_jar_id, "1.20.1");
        assert_eq!(resolved.asset_index.id, "5");
        assert_eq!(resolved.version_type, "release");

        let names: Vec<&str> = resolved.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "org.ow2.asm:asm:9.6",
                "com.mojang:brigadier:1.1.8",
                "net.fabricmc:fabric-loader:0.15.0"
            ]
        );

        let args = resolved.arguments.unwrap();
        assert_eq!(args.jvm.len(), 3);
    }

    #[test]
    fn test_missing_parent_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let versions = tmp.path().join("versions");
        write_version(
            &versions,
            "quilt-loader-0.20.0-1.19.2",
            r#"{"id": "quilt-loader-0.20.0-1.19.2", "inheritsFrom": "1.19.2", "mainClass": "x"}"#,
        );

        let err = VersionManifest::resolve_from_file(
            &versions
                .join("quilt-loader-0.20.0-1.19.2")
                .join("quilt-loader-0.20.0-1.19.2.json"),
        )
        .unwrap_err();

        assert!(err.to_string().contains("1.19.2"));
    }

    #[test]
    fn test_rules_last_match_wins() {
        let rules: Vec<Rule> = serde_json::from_str(&format!(
            r#"[{{"action": "allow"}}, {{"action": "disallow", "os": {{"name": "{}"}}}}]"#,
            current_os_name()
        ))
        .unwrap();
        assert!(!rules_allow(&rules, &RuleFeatures::default()));

        let rules: Vec<Rule> =
            serde_json::from_str(r#"[{"action": "allow", "os": {"name": "templeos"}}]"#).unwrap();
        assert!(!rules_allow(&rules, &RuleFeatures::default()));
    }

    #[test]
    fn test_feature_rules_follow_flags() {
        let rules: Vec<Rule> = serde_json::from_str(
            r#"[{"action": "allow", "features": {"has_custom_resolution": true}}]"#,
        )
        .unwrap();
        assert!(!rules_allow(&rules, &RuleFeatures::default()));
        assert!(rules_allow(
            &rules,
            &RuleFeatures {
                has_custom_resolution: true
            }
        ));

        let demo: Vec<Rule> =
            serde_json::from_str(r#"[{"action": "allow", "features": {"is_demo_user": true}}]"#)
                .unwrap();
        assert!(!rules_allow(
            &demo,
            &RuleFeatures {
                has_custom_resolution: true
            }
        ));
    }

    #[test]
    fn test_library_key_keeps_classifier() {
        assert_eq!(library_key("org.lwjgl:lwjgl:3.3.1"), "org.lwjgl:lwjgl");
        assert_eq!(
            library_key("org.lwjgl:lwjgl:3.3.1:natives-linux"),
            "org.lwjgl:lwjgl:natives-linux"
        );
    }
}
