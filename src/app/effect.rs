use crate::domain::TaskKind;
use crate::launcher::{LaunchRequest, ModLoaderSelection};

#[derive(Clone, Debug)]
pub enum Effect {
    LoadVersions,

    InstallVersion {
        version_id: String,
    },

    InstallModLoader {
        selection: ModLoaderSelection,
        java_path: Option<String>,
    },

    Launch {
        request: LaunchRequest,
    },

    DetectJava,
}

impl Effect {
    pub fn kind(&self) -> TaskKind {
        match self {
            Effect::LoadVersions => TaskKind::LoadVersions,
            Effect::InstallVersion { .. } => TaskKind::InstallVersion,
            Effect::InstallModLoader { .. } => TaskKind::InstallModLoader,
            Effect::Launch { .. } => TaskKind::Launch,
            Effect::DetectJava => TaskKind::DetectJava,
        }
    }

    /// Status line shown while the task runs
    pub fn describe(&self) -> String {
        match self {
            Effect::LoadVersions => "Loading version list...".to_string(),
            Effect::InstallVersion { version_id } => format!("Installing Minecraft {}...", version_id),
            Effect::InstallModLoader { selection, .. } => format!(
                "Installing {} for Minecraft {}...",
                selection.kind, selection.minecraft_version
            ),
            Effect::Launch { request } => format!(
                "Launching Minecraft {} ({})...",
                request.version,
                request.loader.display_name()
            ),
            Effect::DetectJava => "Searching for Java installations...".to_string(),
        }
    }
}
