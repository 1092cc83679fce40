use rfd::FileDialog;
use std::path::{Path, PathBuf};

pub struct Dialogs;

impl Dialogs {
    pub fn pick_java_executable() -> Option<PathBuf> {
        let mut fd = FileDialog::new().set_title("Select Java Executable");
        if cfg!(target_os = "windows") {
            fd = fd.add_filter("Java", &["exe"]);
        }
        fd.pick_file()
    }

    /// `target_dir` is the folder the picked files are copied into
    pub fn pick_mod_files(target_dir: &Path) -> Option<Vec<PathBuf>> {
        Self::add_dialog(target_dir)
            .set_title("Add Mods")
            .add_filter("Mod", &["jar"])
            .pick_files()
    }

    pub fn pick_resource_pack_files(target_dir: &Path) -> Option<Vec<PathBuf>> {
        Self::add_dialog(target_dir)
            .set_title("Add Resource Packs")
            .add_filter("Resource Pack", &["zip"])
            .pick_files()
    }

    pub fn pick_resource_pack_folder(target_dir: &Path) -> Option<PathBuf> {
        Self::add_dialog(target_dir)
            .set_title("Add Resource Pack Folder")
            .pick_folder()
    }

    fn add_dialog(target_dir: &Path) -> FileDialog {
        let fd = FileDialog::new();
        match add_start_dir([dirs::download_dir(), dirs::home_dir()], target_dir) {
            Some(dir) => fd.set_directory(dir),
            None => fd,
        }
    }

    pub fn save_settings_file() -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("Settings", &["json"])
            .set_title("Export Settings")
            .set_file_name("launcher_settings.json")
            .save_file()
    }

    pub fn pick_settings_file() -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("Settings", &["json"])
            .set_title("Import Settings")
            .pick_file()
    }

    pub fn save_profile_file(name: &str) -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("Profile", &["json"])
            .set_title("Export Profile")
            .set_file_name(format!("{}_profile.json", name))
            .save_file()
    }

    pub fn pick_profile_file() -> Option<PathBuf> {
        FileDialog::new()
            .add_filter("Profile", &["json"])
            .set_title("Import Profile")
            .pick_file()
    }

    pub fn save_log_file() -> Option<PathBuf> {
        let name = format!("launcher_log_{}.txt", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        FileDialog::new()
            .add_filter("Log", &["txt", "log"])
            .set_title("Export Log")
            .set_file_name(name)
            .save_file()
    }
}

/// First existing candidate that is not inside the folder being added to
fn add_start_dir(
    candidates: impl IntoIterator<Item = Option<PathBuf>>,
    target_dir: &Path,
) -> Option<PathBuf> {
    candidates
        .into_iter()
        .flatten()
        .find(|dir| dir.is_dir() && !dir.starts_with(target_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dialog_never_starts_in_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(".minecraft/mods");
        let downloads = dir.path().join("Downloads");
        std::fs::create_dir_all(target.join("disabled")).unwrap();
        std::fs::create_dir_all(&downloads).unwrap();

        assert_eq!(
            add_start_dir([None, Some(downloads.clone())], &target),
            Some(downloads.clone())
        );
        assert_eq!(
            add_start_dir([Some(target.join("disabled")), Some(target.clone())], &target),
            None
        );
        assert_eq!(
            add_start_dir([Some(dir.path().join("missing")), Some(downloads.clone())], &target),
            Some(downloads)
        );
    }
}
