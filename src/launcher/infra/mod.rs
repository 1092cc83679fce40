pub mod downloader;
pub mod forge_installer;
pub mod loader_installer;
pub mod meta_installer;
pub mod minecraft_installer;
pub mod natives_extractor;

pub use downloader::{Downloader, ProgressCallback};
pub use loader_installer::{find_installed_profile, installer_for};
pub use minecraft_installer::{MinecraftInstaller, RemoteVersion};
pub use natives_extractor::NativesExtractor;
