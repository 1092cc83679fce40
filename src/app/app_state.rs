use crate::app::{AppRuntime, Effect};
use crate::domain::*;
use crate::infra::{ContentEntry, ContentFolder, GameDirectory, SettingsStore};
use crate::launcher::{LaunchLibrary, LaunchRequest, ModLoaderSelection, VersionEntry};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The two folders managed from the Mods and Resource Packs tabs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Mods,
    ResourcePacks,
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Mods => "mods",
            ContentKind::ResourcePacks => "resource packs",
        }
    }
}

pub struct AppState {
    pub settings: Settings,
    store: SettingsStore,
    runtime: AppRuntime,
    event_rx: mpsc::Receiver<Event>,

    pub log: LogBuffer,
    pub status: String,
    pub progress: f32,
    pub active_task: Option<TaskKind>,
    last_stage: String,

    pub versions: Vec<VersionEntry>,
    pub installed: Vec<String>,
    pub java_installations: Vec<JavaInstallation>,
    pub running_games: usize,

    mods_folder: ContentFolder,
    packs_folder: ContentFolder,
    pub mods: Vec<ContentEntry>,
    pub resource_packs: Vec<ContentEntry>,
}

impl AppState {
    pub fn new(rt_handle: tokio::runtime::Handle) -> Self {
        let store = SettingsStore::new().unwrap_or_else(|e| {
            log::warn!("{:#}; keeping settings next to the executable", e);
            SettingsStore::at("launcher_settings.json")
        });
        let game_dir = GameDirectory::detect().unwrap_or_else(|e| {
            log::warn!("{:#}; using ./.minecraft", e);
            GameDirectory::new(".minecraft")
        });
        Self::with_paths(rt_handle, store, game_dir)
    }

    pub fn with_paths(
        rt_handle: tokio::runtime::Handle,
        store: SettingsStore,
        game_dir: GameDirectory,
    ) -> Self {
        let settings = store.load();
        if let Err(e) = game_dir.ensure_dirs() {
            log::warn!("{:#}", e);
        }

        let mods_folder = ContentFolder::mods(&game_dir);
        let packs_folder = ContentFolder::resource_packs(&game_dir);
        let library = Arc::new(LaunchLibrary::new(game_dir));
        let (runtime, event_rx) = AppRuntime::new(rt_handle, library);

        let mut state = Self {
            settings,
            store,
            runtime,
            event_rx,
            log: LogBuffer::new(),
            status: "Ready".to_string(),
            progress: 0.0,
            active_task: None,
            last_stage: String::new(),
            versions: Vec::new(),
            installed: Vec::new(),
            java_installations: Vec::new(),
            running_games: 0,
            mods_folder,
            packs_folder,
            mods: Vec::new(),
            resource_packs: Vec::new(),
        };

        state.log.push(format!(
            "Game directory: {}",
            state.library().game_dir().root().display()
        ));
        state.refresh_installed();
        state.refresh_content(ContentKind::Mods);
        state.refresh_content(ContentKind::ResourcePacks);
        state
    }

    pub fn library(&self) -> &Arc<LaunchLibrary> {
        self.runtime.library()
    }

    pub fn settings_path(&self) -> &Path {
        self.store.path()
    }

    pub fn is_busy(&self) -> bool {
        self.active_task.is_some() || self.runtime.is_busy()
    }

    fn run(&mut self, effect: Effect) {
        let kind = effect.kind();
        if self.runtime.enqueue(effect) {
            self.active_task = Some(kind);
            self.progress = 0.0;
            self.last_stage.clear();
        }
    }

    pub fn load_versions(&mut self) {
        self.run(Effect::LoadVersions);
    }

    pub fn install_version(&mut self, version_id: &str) {
        self.run(Effect::InstallVersion {
            version_id: version_id.to_string(),
        });
    }

    pub fn install_mod_loader(&mut self, selection: ModLoaderSelection) {
        if selection.minecraft_version.trim().is_empty() {
            self.report_error("Please select a Minecraft version for the mod loader");
            return;
        }
        self.run(Effect::InstallModLoader {
            selection,
            java_path: self.settings.java_path.clone(),
        });
    }

    pub fn launch(&mut self) {
        let request = LaunchRequest::from_settings(&self.settings);
        if let Err(e) = request.validate() {
            self.report_error(e);
            return;
        }
        self.run(Effect::Launch { request });
    }

    pub fn detect_java(&mut self) {
        self.run(Effect::DetectJava);
    }

    pub fn delete_version(&mut self, version_id: &str) {
        if self.is_busy() {
            self.report_error("Wait for the current task to finish");
            return;
        }
        match self.library().delete_version(version_id) {
            Ok(()) => {
                self.log.push(format!("Deleted version {}", version_id));
                self.status = format!("Deleted {}", version_id);
                if self.settings.selected_version == version_id {
                    self.settings.selected_version.clear();
                }
                self.refresh_installed();
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn refresh_installed(&mut self) {
        self.installed = self.library().installed_versions();
        for entry in &mut self.versions {
            entry.installed = self.installed.contains(&entry.id);
        }
    }

    /// Installed versions for the Play tab, favorites first
    pub fn playable_versions(&self) -> Vec<String> {
        let (mut favorites, others): (Vec<String>, Vec<String>) = self
            .installed
            .iter()
            .cloned()
            .partition(|v| self.settings.is_favorite(v));
        favorites.extend(others);
        favorites
    }

    pub fn select_version(&mut self, version_id: &str) {
        self.settings.selected_version = version_id.to_string();
        self.status = format!("Selected {}", version_id);
    }

    pub fn save_settings(&mut self) {
        self.settings.normalize();
        match self.store.save(&self.settings) {
            Ok(()) => {
                self.status = "Settings saved".to_string();
                self.log.push("Settings saved");
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn export_settings(&mut self, path: &Path) {
        match self.store.export_to(&self.settings, path) {
            Ok(()) => self.log.push(format!("Settings exported to {}", path.display())),
            Err(e) => self.report_error(e),
        }
    }

    pub fn import_settings(&mut self, path: &Path) {
        match self.store.import_from(path) {
            Ok(settings) => {
                self.settings = settings;
                self.log.push(format!("Settings imported from {}", path.display()));
                self.status = "Settings imported".to_string();
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn reset_settings(&mut self) {
        match self.store.reset() {
            Ok(settings) => {
                self.settings = settings;
                self.log.push("Settings reset to defaults");
                self.status = "Settings reset".to_string();
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn save_profile(&mut self, name: &str) {
        match self.settings.save_profile(name, Utc::now()) {
            Ok(replaced) => {
                let verb = if replaced { "updated" } else { "created" };
                self.log.push(format!("Profile '{}' {}", name.trim(), verb));
                self.status = format!("Profile '{}' {}", name.trim(), verb);
                self.persist_quietly();
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn load_profile(&mut self, name: &str) {
        match self.settings.apply_profile(name) {
            Ok(()) => {
                self.log.push(format!("Profile '{}' loaded", name));
                self.status = format!("Profile '{}' loaded", name);
                self.persist_quietly();
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn delete_profile(&mut self, name: &str) {
        if self.settings.delete_profile(name) {
            self.log.push(format!("Profile '{}' deleted", name));
            self.persist_quietly();
        } else {
            self.report_error(format!("Profile '{}' not found", name));
        }
    }

    pub fn export_profile(&mut self, name: &str, path: &Path) {
        match SettingsStore::export_profile(&self.settings, name, path) {
            Ok(()) => self.status = format!("Profile exported to {}", path.display()),
            Err(e) => self.report_error(e),
        }
    }

    pub fn import_profiles(&mut self, path: &Path) {
        match SettingsStore::read_profiles(path) {
            Ok(profiles) => {
                let count = self.settings.merge_profiles(profiles);
                self.log
                    .push(format!("Imported {} profile(s) from {}", count, path.display()));
                self.status = format!("Imported {} profile(s)", count);
                self.persist_quietly();
            }
            Err(e) => self.report_error(e),
        }
    }

    pub fn export_log(&mut self, path: &Path) {
        match self.log.export_to(path) {
            Ok(()) => self.status = format!("Log exported to {}", path.display()),
            Err(e) => self.report_error(e),
        }
    }

    fn folder(&self, kind: ContentKind) -> &ContentFolder {
        match kind {
            ContentKind::Mods => &self.mods_folder,
            ContentKind::ResourcePacks => &self.packs_folder,
        }
    }

    pub fn content(&self, kind: ContentKind) -> &[ContentEntry] {
        match kind {
            ContentKind::Mods => &self.mods,
            ContentKind::ResourcePacks => &self.resource_packs,
        }
    }

    pub fn refresh_content(&mut self, kind: ContentKind) {
        match self.folder(kind).list() {
            Ok(entries) => match kind {
                ContentKind::Mods => self.mods = entries,
                ContentKind::ResourcePacks => self.resource_packs = entries,
            },
            Err(e) => self.report_error(e),
        }
    }

    pub fn add_content(&mut self, kind: ContentKind, sources: Vec<PathBuf>) {
        let mut added = 0;
        for source in sources {
            match self.folder(kind).add(&source) {
                Ok(entry) => {
                    self.log.push(format!("Added {}", entry.filename));
                    added += 1;
                }
                Err(e) => self.report_error(e),
            }
        }
        if added > 0 {
            self.status = format!("Added {} {}", added, kind.label());
        }
        self.refresh_content(kind);
    }

    pub fn remove_content(&mut self, kind: ContentKind, entry: &ContentEntry) {
        match self.folder(kind).remove(entry) {
            Ok(()) => {
                self.log.push(format!("Removed {}", entry.filename));
                self.status = format!("Removed {}", entry.filename);
            }
            Err(e) => self.report_error(e),
        }
        self.refresh_content(kind);
    }

    pub fn set_content_enabled(&mut self, kind: ContentKind, entry: &ContentEntry, enabled: bool) {
        match self.folder(kind).set_enabled(entry, enabled) {
            Ok(updated) => {
                let verb = if enabled { "Enabled" } else { "Disabled" };
                self.log.push(format!("{} {}", verb, updated.filename));
            }
            Err(e) => self.report_error(e),
        }
        self.refresh_content(kind);
    }

    pub fn open_content_folder(&mut self, kind: ContentKind) {
        if let Err(e) = self.folder(kind).open() {
            self.report_error(e);
        }
    }

    pub fn content_dir(&self, kind: ContentKind) -> &Path {
        self.folder(kind).dir()
    }

    pub fn report_error(&mut self, error: impl std::fmt::Display) {
        let message = format!("{:#}", error);
        log::warn!("{}", message);
        self.log.push(format!("Error: {}", message));
        self.status = format!("Error: {}", message);
    }

    pub fn process_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            changed = true;
        }
        changed
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::TaskStarted { kind, label } => {
                self.active_task = Some(kind);
                self.log.push(&label);
                self.status = label;
            }
            Event::TaskProgress { progress, status } => {
                self.progress = progress.clamp(0.0, 1.0);
                let stage = progress_stage(&status);
                if stage != self.last_stage {
                    self.last_stage = stage.to_string();
                    self.log.push(stage);
                }
                self.status = status;
            }
            Event::TaskLog(line) => self.log.push(line),
            Event::TaskFinished { kind, outcome } => {
                self.active_task = None;
                self.progress = 1.0;
                self.apply_outcome(outcome);
                if kind.changes_installs() {
                    self.refresh_installed();
                }
            }
            Event::TaskFailed { kind, error } => {
                self.active_task = None;
                self.progress = 0.0;
                self.report_error(format!("{} failed: {}", kind.label(), error));
            }
            Event::TaskRejected { kind } => {
                self.log.push(format!(
                    "{} skipped: another task is still running",
                    kind.label()
                ));
            }
            Event::GameStarted { version_id, pid } => {
                self.running_games += 1;
                self.log
                    .push(format!("Minecraft {} running (pid {})", version_id, pid));
                self.settings.record_launch(&version_id, Utc::now());
                self.persist_quietly();
            }
            Event::GameExited {
                version_id,
                code,
                played_secs,
            } => {
                self.running_games = self.running_games.saturating_sub(1);
                let code = code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
                self.log.push(format!(
                    "Minecraft {} exited with code {} after {}",
                    version_id,
                    code,
                    format_duration(played_secs)
                ));
                self.settings.record_playtime(played_secs);
                self.persist_quietly();
            }
        }
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::VersionsLoaded(versions) => {
                self.status = format!("{} versions available", versions.len());
                self.versions = versions;
                self.refresh_installed();
            }
            TaskOutcome::VersionInstalled { version_id } => {
                self.log.push(format!("Minecraft {} installed", version_id));
                self.status = format!("Installed {}", version_id);
            }
            TaskOutcome::ModLoaderInstalled {
                kind,
                minecraft_version,
                profile_id,
            } => {
                self.log.push(format!(
                    "{} for Minecraft {} installed as {}",
                    kind, minecraft_version, profile_id
                ));
                self.status = format!("Installed {}", profile_id);
            }
            TaskOutcome::Launched { version_id, pid } => {
                log::info!("Minecraft {} launched with pid {}", version_id, pid);
                self.status = format!("Playing {}", version_id);
            }
            TaskOutcome::JavaDetected(installations) => {
                for java in &installations {
                    self.log
                        .push(format!("Found Java {} at {}", java.version, java.path.display()));
                }
                match crate::infra::JavaDetector::find_best_java(&installations) {
                    Some(best) => {
                        self.settings.java_path = Some(best.path.to_string_lossy().to_string());
                        self.status = format!("Using Java {}", best.version);
                    }
                    None => self.report_error("No working Java installation was found"),
                }
                self.java_installations = installations;
            }
        }
    }

    /// Launch bookkeeping is saved without waiting for the Save button
    fn persist_quietly(&mut self) {
        if let Err(e) = self.store.save(&self.settings) {
            self.report_error(e);
        }
    }
}

/// Status text without its running counter, e.g. "Downloading assets (3/40)" -> "Downloading assets"
fn progress_stage(status: &str) -> &str {
    status.split(" (").next().unwrap_or(status).trim()
}

pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
