use crate::launcher::{ModLoaderKind, VersionEntry};
use std::path::PathBuf;

pub mod log_buffer;
pub mod settings;

pub use log_buffer::LogBuffer;
pub use settings::{Profile, Settings, Theme};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JavaInstallation {
    pub path: PathBuf,
    pub version: String,
    pub is_valid: bool,
}

/// Long operations run by the background task runner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    LoadVersions,
    InstallVersion,
    InstallModLoader,
    Launch,
    DetectJava,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::LoadVersions => "Loading versions",
            TaskKind::InstallVersion => "Installing version",
            TaskKind::InstallModLoader => "Installing mod loader",
            TaskKind::Launch => "Launching",
            TaskKind::DetectJava => "Detecting Java",
        }
    }

    /// Tasks after which the installed version list is stale
    pub fn changes_installs(&self) -> bool {
        matches!(self, TaskKind::InstallVersion | TaskKind::InstallModLoader)
    }
}

#[derive(Clone, Debug)]
pub enum TaskOutcome {
    VersionsLoaded(Vec<VersionEntry>),
    VersionInstalled {
        version_id: String,
    },
    ModLoaderInstalled {
        kind: ModLoaderKind,
        minecraft_version: String,
        profile_id: String,
    },
    Launched {
        version_id: String,
        pid: u32,
    },
    JavaDetected(Vec<JavaInstallation>),
}

/// Messages from workers to the UI thread
#[derive(Clone, Debug)]
pub enum Event {
    TaskStarted {
        kind: TaskKind,
        label: String,
    },
    TaskProgress {
        progress: f32,
        status: String,
    },
    TaskLog(String),
    TaskFinished {
        kind: TaskKind,
        outcome: TaskOutcome,
    },
    TaskFailed {
        kind: TaskKind,
        error: String,
    },
    TaskRejected {
        kind: TaskKind,
    },
    /// Sent before anything can report the same process's exit
    GameStarted {
        version_id: String,
        pid: u32,
    },
    /// The game process ended; not a task, it outlives the launch task
    GameExited {
        version_id: String,
        code: Option<i32>,
        played_secs: u64,
    },
}
