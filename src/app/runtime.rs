use crate::app::Effect;
use crate::domain::{Event, TaskOutcome};
use crate::infra::JavaDetector;
use crate::launcher::{LaunchLibrary, ProgressCallback};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// Runs one long task at a time on the tokio runtime and reports back through events
pub struct AppRuntime {
    library: Arc<LaunchLibrary>,
    rt_handle: tokio::runtime::Handle,
    event_tx: mpsc::Sender<Event>,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the task ends, panics included
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AppRuntime {
    pub fn new(
        rt_handle: tokio::runtime::Handle,
        library: Arc<LaunchLibrary>,
    ) -> (Self, mpsc::Receiver<Event>) {
        let (event_tx, event_rx) = mpsc::channel::<Event>(200);

        (
            Self {
                library,
                rt_handle,
                event_tx,
                busy: Arc::new(AtomicBool::new(false)),
            },
            event_rx,
        )
    }

    pub fn library(&self) -> &Arc<LaunchLibrary> {
        &self.library
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Returns immediately; false when another task is still running
    pub fn enqueue(&self, effect: Effect) -> bool {
        let kind = effect.kind();
        if self.busy.swap(true, Ordering::SeqCst) {
            log::warn!("Rejected {:?}: another task is running", kind);
            let _ = self.event_tx.try_send(Event::TaskRejected { kind });
            return false;
        }
        self.run_effect(effect, BusyGuard(self.busy.clone()));
        true
    }

    fn run_effect(&self, effect: Effect, guard: BusyGuard) {
        let kind = effect.kind();
        let label = effect.describe();
        let library = self.library.clone();
        let tx = self.event_tx.clone();
        let rt_handle = self.rt_handle.clone();

        self.rt_handle.spawn(async move {
            log::info!("{}", label);
            let _ = tx.send(Event::TaskStarted { kind, label }).await;

            let work = rt_handle.spawn(execute(effect, library, tx.clone()));
            let result = match work.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("Task crashed: {}", e)),
            };

            // released before the final event so the UI can queue the next task right away
            drop(guard);

            match result {
                Ok(outcome) => {
                    let _ = tx.send(Event::TaskFinished { kind, outcome }).await;
                }
                Err(e) => {
                    log::error!("{} failed: {:#}", kind.label(), e);
                    let _ = tx
                        .send(Event::TaskFailed {
                            kind,
                            error: format!("{:#}", e),
                        })
                        .await;
                }
            }
        });
    }
}

fn progress_sink(tx: &mpsc::Sender<Event>) -> ProgressCallback {
    let tx = tx.clone();
    Arc::new(move |progress: f32, status: String| {
        // dropped when the queue is full; a later update supersedes it anyway
        let _ = tx.try_send(Event::TaskProgress { progress, status });
    })
}

async fn execute(
    effect: Effect,
    library: Arc<LaunchLibrary>,
    tx: mpsc::Sender<Event>,
) -> Result<TaskOutcome> {
    match effect {
        Effect::LoadVersions => {
            let versions = library.list_versions().await?;
            let _ = tx
                .send(Event::TaskLog(format!("Loaded {} versions", versions.len())))
                .await;
            Ok(TaskOutcome::VersionsLoaded(versions))
        }

        Effect::InstallVersion { version_id } => {
            library
                .install_version(&version_id, Some(progress_sink(&tx)))
                .await?;
            Ok(TaskOutcome::VersionInstalled { version_id })
        }

        Effect::InstallModLoader {
            selection,
            java_path,
        } => {
            let java = JavaDetector::resolve(java_path.as_deref())?;
            let profile_id = library
                .install_mod_loader(
                    selection.kind,
                    &selection.minecraft_version,
                    &java,
                    Some(progress_sink(&tx)),
                )
                .await?;
            Ok(TaskOutcome::ModLoaderInstalled {
                kind: selection.kind,
                minecraft_version: selection.minecraft_version,
                profile_id,
            })
        }

        Effect::Launch { request } => {
            request.validate()?;
            let report = progress_sink(&tx);
            report(0.1, "Preparing launch...".to_string());

            let lib = library.clone();
            let command = tokio::task::spawn_blocking(move || {
                lib.build_launch_command(&request.version, request.loader, &request.settings)
            })
            .await
            .context("Launch preparation crashed")??;

            let _ = tx
                .send(Event::TaskLog(format!(
                    "Starting {} with {}",
                    command.version_id,
                    command.program.display()
                )))
                .await;
            log::debug!("Launch command: {:?}", command.argv());

            let mut child = library.spawn(&command)?;
            let pid = child.id();
            report(1.0, format!("Minecraft {} started", command.version_id));
            let _ = tx
                .send(Event::GameStarted {
                    version_id: command.version_id.clone(),
                    pid,
                })
                .await;

            let version_id = command.version_id.clone();
            let exit_tx = tx.clone();
            let started = Instant::now();
            tokio::task::spawn_blocking(move || {
                let code = match child.wait() {
                    Ok(status) => status.code(),
                    Err(e) => {
                        log::warn!("Failed to wait for the game process: {}", e);
                        None
                    }
                };
                let _ = exit_tx.blocking_send(Event::GameExited {
                    version_id,
                    code,
                    played_secs: started.elapsed().as_secs(),
                });
            });

            Ok(TaskOutcome::Launched {
                version_id: command.version_id,
                pid,
            })
        }

        Effect::DetectJava => {
            let installations = tokio::task::spawn_blocking(JavaDetector::detect_java_installations)
                .await
                .context("Java detection crashed")?;
            Ok(TaskOutcome::JavaDetected(installations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Settings, TaskKind};
    use crate::infra::GameDirectory;
    use crate::launcher::{GameLoader, LaunchRequest};
    use std::time::Duration;

    fn runtime_in(dir: &std::path::Path) -> (AppRuntime, mpsc::Receiver<Event>) {
        let library = Arc::new(LaunchLibrary::new(GameDirectory::new(dir)));
        AppRuntime::new(tokio::runtime::Handle::current(), library)
    }

    async fn next_event(rx: &mut mpsc::Receiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_task_is_rejected_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, mut rx) = runtime_in(dir.path());

        assert!(runtime.enqueue(Effect::DetectJava));
        assert!(runtime.is_busy());
        assert!(!runtime.enqueue(Effect::InstallVersion {
            version_id: "1.20.1".to_string(),
        }));

        let mut rejected = false;
        let mut started = false;
        loop {
            match next_event(&mut rx).await {
                Event::TaskRejected { kind } => {
                    assert_eq!(kind, TaskKind::InstallVersion);
                    rejected = true;
                }
                Event::TaskStarted { kind, .. } => {
                    assert_eq!(kind, TaskKind::DetectJava);
                    started = true;
                }
                Event::TaskFinished { kind, outcome } => {
                    assert_eq!(kind, TaskKind::DetectJava);
                    assert!(matches!(outcome, TaskOutcome::JavaDetected(_)));
                    break;
                }
                other => panic!("unexpected event {:?}", other),
            }
        }

        assert!(rejected && started);
        assert!(!runtime.is_busy());
        assert!(runtime.enqueue(Effect::DetectJava));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failures_arrive_as_events() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, mut rx) = runtime_in(dir.path());

        let mut settings = Settings::default();
        settings.selected_version = "1.20.1".to_string();
        settings.selected_mod_loader = GameLoader::Vanilla;
        settings.username = String::new();

        assert!(runtime.enqueue(Effect::Launch {
            request: LaunchRequest::from_settings(&settings),
        }));

        loop {
            match next_event(&mut rx).await {
                Event::TaskStarted { .. } => {}
                Event::TaskFailed { kind, error } => {
                    assert_eq!(kind, TaskKind::Launch);
                    assert!(error.contains("Please enter a username"));
                    break;
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(!runtime.is_busy());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_game_start_is_reported_before_its_exit() {
        let dir = tempfile::tempdir().unwrap();
        let version_dir = dir.path().join("versions").join("1.20.1");
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(version_dir.join("1.20.1.jar"), b"jar").unwrap();
        let manifest = serde_json::json!({
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main",
            "assetIndex": {"id": "5", "sha1": "aa", "size": 1, "url": "http://x"}
        });
        std::fs::write(version_dir.join("1.20.1.json"), manifest.to_string()).unwrap();

        let (runtime, mut rx) = runtime_in(dir.path());
        let mut settings = Settings::default();
        settings.selected_version = "1.20.1".to_string();
        settings.java_path = Some("/bin/true".to_string());

        for _ in 0..10 {
            assert!(runtime.enqueue(Effect::Launch {
                request: LaunchRequest::from_settings(&settings),
            }));

            let mut order = Vec::new();
            while !(order.contains(&"finished") && order.contains(&"exited")) {
                match next_event(&mut rx).await {
                    Event::GameStarted { version_id, .. } => {
                        assert_eq!(version_id, "1.20.1");
                        order.push("started");
                    }
                    Event::GameExited { .. } => order.push("exited"),
                    Event::TaskFinished { kind, .. } => {
                        assert_eq!(kind, TaskKind::Launch);
                        order.push("finished");
                    }
                    Event::TaskFailed { error, .. } => panic!("launch failed: {}", error),
                    _ => {}
                }
            }

            let started = order.iter().position(|e| *e == "started").unwrap();
            let exited = order.iter().position(|e| *e == "exited").unwrap();
            assert!(started < exited, "events out of order: {:?}", order);
        }
    }
}
