pub mod command_builder;
pub mod launcher;
pub mod maven;
pub mod version_manifest;

pub use command_builder::CommandBuilder;
pub use launcher::*;
pub use maven::MavenArtifact;
pub use version_manifest::{
    AssetIndex, Library, VersionManifest, current_os_name,
};
