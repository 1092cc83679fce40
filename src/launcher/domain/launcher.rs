use crate::domain::Settings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Release,
    Snapshot,
    Old,
    Modded,
}

impl VersionType {
    /// Maps the `type` field of the Mojang manifest
    pub fn from_manifest(raw: &str) -> Self {
        match raw {
            "release" => VersionType::Release,
            "snapshot" => VersionType::Snapshot,
            "old_beta" | "old_alpha" => VersionType::Old,
            _ => VersionType::Modded,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VersionType::Release => "release",
            VersionType::Snapshot => "snapshot",
            VersionType::Old => "old",
            VersionType::Modded => "modded",
        }
    }
}

/// One row of the Versions tab
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionEntry {
    pub id: String,
    pub version_type: VersionType,
    pub installed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModLoaderKind {
    Fabric,
    Quilt,
    Forge,
}

impl ModLoaderKind {
    pub const ALL: [ModLoaderKind; 3] =
        [ModLoaderKind::Fabric, ModLoaderKind::Quilt, ModLoaderKind::Forge];

    pub fn id(&self) -> &'static str {
        match self {
            ModLoaderKind::Fabric => "fabric",
            ModLoaderKind::Quilt => "quilt",
            ModLoaderKind::Forge => "forge",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModLoaderKind::Fabric => "Fabric",
            ModLoaderKind::Quilt => "Quilt",
            ModLoaderKind::Forge => "Forge",
        }
    }

    /// Whether an installed version directory name is a profile of this loader for `mc_version`.
    ///
    /// Fabric and Quilt write `<loader>-loader-<loader version>-<mc>`, Forge writes
    /// `<mc>-forge-<forge version>`. The short `<loader>-<mc>` and `<mc>-<loader>` names
    /// are accepted for hand-made profiles.
    pub fn matches_profile(&self, profile_id: &str, mc_version: &str) -> bool {
        let loader = self.id();
        if profile_id == format!("{loader}-{mc_version}")
            || profile_id == format!("{mc_version}-{loader}")
        {
            return true;
        }

        match self {
            ModLoaderKind::Fabric | ModLoaderKind::Quilt => {
                let prefix = format!("{loader}-loader-");
                let suffix = format!("-{mc_version}");
                profile_id.starts_with(&prefix)
                    && profile_id.ends_with(&suffix)
                    && profile_id.len() > prefix.len() + suffix.len()
            }
            ModLoaderKind::Forge => profile_id.starts_with(&format!("{mc_version}-forge")),
        }
    }
}

impl fmt::Display for ModLoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Loader chosen on the Play tab
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameLoader {
    #[default]
    Vanilla,
    Fabric,
    Quilt,
    Forge,
}

impl GameLoader {
    pub const ALL: [GameLoader; 4] = [
        GameLoader::Vanilla,
        GameLoader::Fabric,
        GameLoader::Quilt,
        GameLoader::Forge,
    ];

    pub fn mod_loader(&self) -> Option<ModLoaderKind> {
        match self {
            GameLoader::Vanilla => None,
            GameLoader::Fabric => Some(ModLoaderKind::Fabric),
            GameLoader::Quilt => Some(ModLoaderKind::Quilt),
            GameLoader::Forge => Some(ModLoaderKind::Forge),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self.mod_loader() {
            Some(kind) => kind.display_name(),
            None => "Vanilla",
        }
    }
}

impl From<ModLoaderKind> for GameLoader {
    fn from(kind: ModLoaderKind) -> Self {
        match kind {
            ModLoaderKind::Fabric => GameLoader::Fabric,
            ModLoaderKind::Quilt => GameLoader::Quilt,
            ModLoaderKind::Forge => GameLoader::Forge,
        }
    }
}

/// Transient install request from the Versions tab
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModLoaderSelection {
    pub minecraft_version: String,
    pub kind: ModLoaderKind,
}

/// Everything the Play tab hands to a launch task
#[derive(Clone, Debug)]
pub struct LaunchRequest {
    pub version: String,
    pub loader: GameLoader,
    pub settings: Settings,
}

impl LaunchRequest {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            version: settings.selected_version.trim().to_string(),
            loader: settings.selected_mod_loader,
            settings: settings.clone(),
        }
    }

    /// Checks done on the UI thread before a launch task is queued
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.version.is_empty() {
            anyhow::bail!("Please select a Minecraft version");
        }
        if !self.version.chars().any(|c| c.is_ascii_digit()) {
            anyhow::bail!("Invalid version selected: '{}'", self.version);
        }
        if self.settings.username.trim().is_empty() {
            anyhow::bail!("Please enter a username");
        }
        Ok(())
    }
}

/// Inputs of the command builder, derived from settings
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub version_id: String,
    pub username: String,
    pub java_path: PathBuf,
    pub game_directory: PathBuf,
    pub max_memory_mb: u32,
    pub min_memory_mb: u32,
    pub custom_jvm_args: Vec<String>,
    pub resolution: Option<(u32, u32)>,
    pub fullscreen: bool,
    pub server: Option<(String, String)>,
}

impl LaunchOptions {
    pub fn from_settings(
        version_id: &str,
        settings: &Settings,
        java_path: PathBuf,
        game_directory: PathBuf,
    ) -> Self {
        let max_memory_mb = settings.allocated_ram;
        let server = settings
            .server_address()
            .map(|(ip, port)| (ip.to_string(), port.to_string()));

        Self {
            version_id: version_id.to_string(),
            username: settings.username.trim().to_string(),
            java_path,
            game_directory,
            max_memory_mb,
            min_memory_mb: max_memory_mb / 2,
            custom_jvm_args: settings.jvm_args_list(),
            resolution: settings.resolution(),
            fullscreen: settings.fullscreen,
            server,
        }
    }
}

/// A fully assembled process invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchCommand {
    pub version_id: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl LaunchCommand {
    /// Executable followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.to_string_lossy().to_string());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_matching_per_loader() {
        assert!(ModLoaderKind::Fabric.matches_profile("fabric-loader-0.15.11-1.20.1", "1.20.1"));
        assert!(!ModLoaderKind::Fabric.matches_profile("fabric-loader-0.15.11-1.20.10", "1.20.1"));
        assert!(!ModLoaderKind::Fabric.matches_profile("quilt-loader-0.26.0-1.20.1", "1.20.1"));
        assert!(ModLoaderKind::Quilt.matches_profile("quilt-loader-0.26.0-1.20.1", "1.20.1"));
        assert!(ModLoaderKind::Forge.matches_profile("1.20.1-forge-47.2.0", "1.20.1"));
        assert!(ModLoaderKind::Forge.matches_profile("forge-1.20.1", "1.20.1"));
        assert!(!ModLoaderKind::Forge.matches_profile("1.20.1", "1.20.1"));
    }

    #[test]
    fn test_manifest_type_mapping() {
        assert_eq!(VersionType::from_manifest("release"), VersionType::Release);
        assert_eq!(VersionType::from_manifest("snapshot"), VersionType::Snapshot);
        assert_eq!(VersionType::from_manifest("old_alpha"), VersionType::Old);
        assert_eq!(VersionType::from_manifest("old_beta"), VersionType::Old);
    }

    #[test]
    fn test_launch_request_validation() {
        let mut settings = Settings::default();
        settings.selected_version = "1.20.1".to_string();
        assert!(LaunchRequest::from_settings(&settings).validate().is_ok());

        settings.selected_version = "value".to_string();
        let err = LaunchRequest::from_settings(&settings).validate().unwrap_err();
        assert!(err.to_string().contains("Invalid version"));

        settings.selected_version = "  ".to_string();
        assert!(LaunchRequest::from_settings(&settings).validate().is_err());

        settings.selected_version = "1.20.1".to_string();
        settings.username = "   ".to_string();
        assert!(LaunchRequest::from_settings(&settings).validate().is_err());
    }

    #[test]
    fn test_launch_options_memory_and_server() {
        let mut settings = Settings::default();
        settings.allocated_ram = 6144;
        settings.server_ip = "play.example.net".to_string();
        settings.server_port = String::new();
        settings.custom_jvm_args = "-XX:+UseG1GC\n\n  -Dfoo=bar  ".to_string();

        let options = LaunchOptions::from_settings(
            "1.20.1",
            &settings,
            PathBuf::from("java"),
            PathBuf::from("/games/mc"),
        );

        assert_eq!(options.max_memory_mb, 6144);
        assert_eq!(options.min_memory_mb, 3072);
        assert_eq!(
            options.server,
            Some(("play.example.net".to_string(), "25565".to_string()))
        );
        assert_eq!(options.custom_jvm_args, vec!["-XX:+UseG1GC", "-Dfoo=bar"]);
    }

    #[test]
    fn test_argv_starts_with_program() {
        let command = LaunchCommand {
            version_id: "1.20.1".to_string(),
            program: PathBuf::from("/usr/bin/java"),
            args: vec!["-Xmx4096M".to_string(), "Main".to_string()],
            working_dir: PathBuf::from("/tmp"),
        };
        assert_eq!(command.argv(), vec!["/usr/bin/java", "-Xmx4096M", "Main"]);
    }
}
