use crate::launcher::GameLoader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_RAM_MB: u32 = 1024;
pub const MAX_RAM_MB: u32 = 16384;
pub const DEFAULT_RAM_MB: u32 = 4096;
pub const MAX_RECENT_VERSIONS: usize = 10;
pub const DEFAULT_SERVER_PORT: &str = "25565";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub total_launches: u64,
    pub total_playtime_secs: u64,
    pub last_launch: Option<DateTime<Utc>>,
    pub version_counts: BTreeMap<String, u64>,
    pub most_used_version: String,
}

/// A named launch setup that can be applied to the Play tab
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub version: String,
    #[serde(deserialize_with = "lenient_ram")]
    pub ram: u32,
    pub mod_loader: GameLoader,
    pub username: String,
    pub created: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            version: String::new(),
            ram: DEFAULT_RAM_MB,
            mod_loader: GameLoader::Vanilla,
            username: String::new(),
            created: String::new(),
        }
    }
}

impl Profile {
    /// Snapshot of the current Play tab choices
    pub fn from_settings(settings: &Settings, at: DateTime<Utc>) -> Self {
        Self {
            version: settings.selected_version.trim().to_string(),
            ram: clamp_ram(settings.allocated_ram),
            mod_loader: settings.selected_mod_loader,
            username: settings.username.trim().to_string(),
            created: at.to_rfc3339(),
        }
    }
}

/// Flat launcher configuration persisted as `launcher_settings.json`.
/// Unknown keys are ignored and missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub java_path: Option<String>,
    #[serde(deserialize_with = "lenient_ram")]
    pub allocated_ram: u32,
    pub username: String,
    pub selected_version: String,
    pub selected_mod_loader: GameLoader,
    pub window_width: u32,
    pub window_height: u32,
    pub fullscreen: bool,
    pub custom_jvm_args: String,
    pub server_ip: String,
    pub server_port: String,
    pub favorite_versions: BTreeSet<String>,
    pub recent_versions: Vec<String>,
    pub saved_servers: Vec<String>,
    pub theme: Theme,
    pub statistics: Statistics,
    pub profiles: BTreeMap<String, Profile>,
    pub current_profile: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            java_path: None,
            allocated_ram: DEFAULT_RAM_MB,
            username: "Player".to_string(),
            selected_version: String::new(),
            selected_mod_loader: GameLoader::Vanilla,
            window_width: 854,
            window_height: 480,
            fullscreen: false,
            custom_jvm_args: String::new(),
            server_ip: String::new(),
            server_port: DEFAULT_SERVER_PORT.to_string(),
            favorite_versions: BTreeSet::new(),
            recent_versions: Vec::new(),
            saved_servers: Vec::new(),
            theme: Theme::Light,
            statistics: Statistics::default(),
            profiles: BTreeMap::new(),
            current_profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

/// Accepts numbers, numeric strings and garbage; garbage becomes the default
fn lenient_ram<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let ram = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(DEFAULT_RAM_MB as i64),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(DEFAULT_RAM_MB as i64),
        _ => DEFAULT_RAM_MB as i64,
    };
    Ok(ram.clamp(MIN_RAM_MB as i64, MAX_RAM_MB as i64) as u32)
}

pub fn clamp_ram(ram: u32) -> u32 {
    ram.clamp(MIN_RAM_MB, MAX_RAM_MB)
}

impl Settings {
    /// Applies the load/save invariants
    pub fn normalize(&mut self) {
        self.allocated_ram = clamp_ram(self.allocated_ram);
        if self.recent_versions.len() > MAX_RECENT_VERSIONS {
            let excess = self.recent_versions.len() - MAX_RECENT_VERSIONS;
            self.recent_versions.drain(..excess);
        }
        if self
            .java_path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            self.java_path = None;
        }
        for profile in self.profiles.values_mut() {
            profile.ram = clamp_ram(profile.ram);
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Moves `version` to the end of the recent list
    pub fn record_recent(&mut self, version: &str) {
        self.recent_versions.retain(|v| v != version);
        self.recent_versions.push(version.to_string());
        self.normalize();
    }

    /// Returns whether `version` is a favorite afterwards
    pub fn toggle_favorite(&mut self, version: &str) -> bool {
        if self.favorite_versions.remove(version) {
            false
        } else {
            self.favorite_versions.insert(version.to_string());
            true
        }
    }

    pub fn is_favorite(&self, version: &str) -> bool {
        self.favorite_versions.contains(version)
    }

    /// Stores the current server as `ip:port`; false when empty or already saved
    pub fn save_current_server(&mut self) -> bool {
        let Some((ip, port)) = self.server_address() else {
            return false;
        };
        let entry = format!("{}:{}", ip, port);
        if self.saved_servers.contains(&entry) {
            return false;
        }
        self.saved_servers.push(entry);
        true
    }

    pub fn remove_server(&mut self, entry: &str) {
        self.saved_servers.retain(|s| s != entry);
    }

    /// Fills the server fields from a saved `ip:port` entry
    pub fn use_server(&mut self, entry: &str) {
        match entry.rsplit_once(':') {
            Some((ip, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                self.server_ip = ip.to_string();
                self.server_port = port.to_string();
            }
            _ => {
                self.server_ip = entry.to_string();
                self.server_port = DEFAULT_SERVER_PORT.to_string();
            }
        }
    }

    /// `(ip, port)` when a server is set, the port defaulting to 25565
    pub fn server_address(&self) -> Option<(&str, &str)> {
        let ip = self.server_ip.trim();
        if ip.is_empty() {
            return None;
        }
        let port = match self.server_port.trim() {
            "" => DEFAULT_SERVER_PORT,
            port => port,
        };
        Some((ip, port))
    }

    /// Custom JVM arguments, one per non-empty line
    pub fn jvm_args_list(&self) -> Vec<String> {
        self.custom_jvm_args
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        (self.window_width > 0 && self.window_height > 0)
            .then_some((self.window_width, self.window_height))
    }

    /// Launch bookkeeping: counters, recent list and most-used version
    pub fn record_launch(&mut self, version: &str, at: DateTime<Utc>) {
        let stats = &mut self.statistics;
        stats.total_launches += 1;
        stats.last_launch = Some(at);
        *stats.version_counts.entry(version.to_string()).or_insert(0) += 1;
        stats.most_used_version = stats
            .version_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(v, _)| v.clone())
            .unwrap_or_default();
        self.record_recent(version);
    }

    pub fn record_playtime(&mut self, secs: u64) {
        self.statistics.total_playtime_secs += secs;
    }

    /// Stores the current choices under `name`; returns whether a profile was replaced
    pub fn save_profile(&mut self, name: &str, at: DateTime<Utc>) -> anyhow::Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Please enter a profile name");
        }
        let profile = Profile::from_settings(self, at);
        Ok(self.profiles.insert(name.to_string(), profile).is_some())
    }

    /// Copies a profile into the Play tab fields and makes it current
    pub fn apply_profile(&mut self, name: &str) -> anyhow::Result<()> {
        let profile = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found", name))?;

        self.selected_version = profile.version;
        self.selected_mod_loader = profile.mod_loader;
        self.allocated_ram = clamp_ram(profile.ram);
        if !profile.username.is_empty() {
            self.username = profile.username;
        }
        self.current_profile = name.to_string();
        Ok(())
    }

    pub fn delete_profile(&mut self, name: &str) -> bool {
        let removed = self.profiles.remove(name).is_some();
        if removed && self.current_profile == name {
            self.current_profile = DEFAULT_PROFILE.to_string();
        }
        removed
    }

    /// Adds or replaces profiles by name; returns how many were merged
    pub fn merge_profiles(&mut self, imported: BTreeMap<String, Profile>) -> usize {
        let mut merged = 0;
        for (name, mut profile) in imported {
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            profile.ram = clamp_ram(profile.ram);
            self.profiles.insert(name, profile);
            merged += 1;
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_take_defaults_and_unknown_keys_are_ignored() {
        let settings: Settings = serde_json::from_str(
            r#"{"username": "Alex", "allocated_ram": 8192, "disabled_mods": ["x"], "current_profile": "default"}"#,
        )
        .unwrap();
        assert_eq!(settings.username, "Alex");
        assert_eq!(settings.allocated_ram, 8192);
        assert_eq!(settings.server_port, "25565");
        assert_eq!(settings.selected_mod_loader, GameLoader::Vanilla);
    }

    #[test]
    fn test_ram_is_coerced_and_clamped() {
        let parse = |raw: &str| {
            serde_json::from_str::<Settings>(&format!(r#"{{"allocated_ram": {raw}}}"#))
                .unwrap()
                .allocated_ram
        };
        assert_eq!(parse("512"), MIN_RAM_MB);
        assert_eq!(parse("99999"), MAX_RAM_MB);
        assert_eq!(parse("\"6144\""), 6144);
        assert_eq!(parse("\"lots\""), DEFAULT_RAM_MB);
        assert_eq!(parse("null"), DEFAULT_RAM_MB);
        assert_eq!(parse("2048.0"), 2048);
    }

    #[test]
    fn test_recent_versions_keep_last_ten() {
        let mut settings = Settings::default();
        for i in 0..12 {
            settings.record_recent(&format!("1.{i}"));
        }
        settings.record_recent("1.5");

        assert_eq!(settings.recent_versions.len(), MAX_RECENT_VERSIONS);
        assert_eq!(settings.recent_versions.last().map(String::as_str), Some("1.5"));
        assert_eq!(settings.recent_versions.first().map(String::as_str), Some("1.2"));
    }

    #[test]
    fn test_servers() {
        let mut settings = Settings::default();
        assert!(!settings.save_current_server());

        settings.server_ip = "mc.example.net".to_string();
        settings.server_port = " ".to_string();
        assert!(settings.save_current_server());
        assert!(!settings.save_current_server());
        assert_eq!(settings.saved_servers, vec!["mc.example.net:25565"]);

        settings.use_server("10.0.0.2:25570");
        assert_eq!(settings.server_address(), Some(("10.0.0.2", "25570")));

        settings.remove_server("mc.example.net:25565");
        assert!(settings.saved_servers.is_empty());
    }

    #[test]
    fn test_launch_statistics() {
        let mut settings = Settings::default();
        let now = Utc::now();
        settings.record_launch("1.20.1", now);
        settings.record_launch("1.19.4", now);
        settings.record_launch("1.20.1", now);
        settings.record_playtime(90);

        let stats = &settings.statistics;
        assert_eq!(stats.total_launches, 3);
        assert_eq!(stats.most_used_version, "1.20.1");
        assert_eq!(stats.total_playtime_secs, 90);
        assert_eq!(stats.last_launch, Some(now));
        assert_eq!(settings.recent_versions, vec!["1.19.4", "1.20.1"]);
    }

    #[test]
    fn test_profiles_save_apply_delete() {
        let mut settings = Settings::default();
        settings.selected_version = "1.20.1".to_string();
        settings.selected_mod_loader = GameLoader::Fabric;
        settings.allocated_ram = 6144;
        settings.username = "Alex".to_string();
        let now = Utc::now();

        assert!(settings.save_profile("  ", now).is_err());
        assert!(!settings.save_profile("Modded", now).unwrap());
        assert!(settings.save_profile("Modded", now).unwrap());
        assert_eq!(settings.profiles["Modded"].created, now.to_rfc3339());

        settings.selected_version = "1.8.9".to_string();
        settings.selected_mod_loader = GameLoader::Vanilla;
        settings.allocated_ram = 2048;
        settings.username = "Steve".to_string();

        settings.apply_profile("Modded").unwrap();
        assert_eq!(settings.selected_version, "1.20.1");
        assert_eq!(settings.selected_mod_loader, GameLoader::Fabric);
        assert_eq!(settings.allocated_ram, 6144);
        assert_eq!(settings.username, "Alex");
        assert_eq!(settings.current_profile, "Modded");

        let err = settings.apply_profile("Missing").unwrap_err();
        assert_eq!(err.to_string(), "Profile 'Missing' not found");

        assert!(settings.delete_profile("Modded"));
        assert!(!settings.delete_profile("Modded"));
        assert_eq!(settings.current_profile, DEFAULT_PROFILE);
    }

    #[test]
    fn test_profiles_parse_leniently_and_merge() {
        let imported: BTreeMap<String, Profile> = serde_json::from_str(
            r#"{"PvP": {"version": "1.8.9", "ram": "99999", "mod_loader": "forge",
                        "created": "2024-05-01T10:00:00"},
                "  ": {"version": "1.20.1"}}"#,
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.username = "Steve".to_string();
        assert_eq!(settings.merge_profiles(imported), 1);

        let pvp = &settings.profiles["PvP"];
        assert_eq!(pvp.ram, MAX_RAM_MB);
        assert_eq!(pvp.mod_loader, GameLoader::Forge);
        assert!(pvp.username.is_empty());

        settings.apply_profile("PvP").unwrap();
        assert_eq!(settings.username, "Steve");
    }

    #[test]
    fn test_favorites_toggle() {
        let mut settings = Settings::default();
        assert!(settings.toggle_favorite("1.20.1"));
        assert!(settings.is_favorite("1.20.1"));
        assert!(!settings.toggle_favorite("1.20.1"));
        assert!(!settings.is_favorite("1.20.1"));
    }
}
