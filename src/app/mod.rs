mod app_state;
mod app_ui;
mod effect;
mod runtime;

use crate::launcher::{VersionEntry, VersionType};

pub use app_state::{AppState, ContentKind, format_duration};
pub use app_ui::App;
pub use effect::Effect;
pub use runtime::AppRuntime;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Play,
    Versions,
    Mods,
    ResourcePacks,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Play,
        Tab::Versions,
        Tab::Mods,
        Tab::ResourcePacks,
        Tab::Settings,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Play => "Play",
            Tab::Versions => "Versions",
            Tab::Mods => "Mods",
            Tab::ResourcePacks => "Resource Packs",
            Tab::Settings => "Settings",
        }
    }
}

/// Filter chips on the Versions tab
#[derive(Clone, Debug)]
pub struct VersionFilter {
    pub query: String,
    pub releases: bool,
    pub snapshots: bool,
    pub old: bool,
    pub modded: bool,
    pub installed_only: bool,
    pub favorites_only: bool,
}

impl Default for VersionFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            releases: true,
            snapshots: false,
            old: false,
            modded: true,
            installed_only: false,
            favorites_only: false,
        }
    }
}

impl VersionFilter {
    pub fn matches(&self, entry: &VersionEntry, is_favorite: bool) -> bool {
        let type_shown = match entry.version_type {
            VersionType::Release => self.releases,
            VersionType::Snapshot => self.snapshots,
            VersionType::Old => self.old,
            VersionType::Modded => self.modded,
        };
        let query = self.query.trim().to_lowercase();

        type_shown
            && (!self.installed_only || entry.installed)
            && (!self.favorites_only || is_favorite)
            && (query.is_empty() || entry.id.to_lowercase().contains(&query))
    }
}
