pub mod content;
pub mod play;
pub mod settings;
pub mod versions;

pub use content::ContentView;
pub use settings::SettingsView;
pub use versions::VersionsView;
