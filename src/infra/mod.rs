pub mod content_folder;
pub mod game_dir;
pub mod java_detector;
pub mod settings_store;

pub use content_folder::{ContentEntry, ContentFolder};
pub use game_dir::GameDirectory;
pub use java_detector::JavaDetector;
pub use settings_store::SettingsStore;
