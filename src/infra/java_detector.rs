use crate::domain::JavaInstallation;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct JavaDetector;

impl JavaDetector {
    /// Java to launch with: the configured path when set, otherwise `java` from PATH
    pub fn resolve(configured: Option<&str>) -> Result<PathBuf> {
        match configured.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => {
                let candidate = PathBuf::from(path);
                if candidate.is_file() {
                    return Ok(candidate);
                }
                // bare names like "java" or "javaw"
                if candidate.components().count() == 1
                    && let Ok(found) = which::which(&candidate)
                {
                    return Ok(found);
                }
                anyhow::bail!(
                    "Java executable not found at {}. Fix the Java path in Settings",
                    candidate.display()
                )
            }
            None => which::which(Self::java_executable()).map_err(|_| {
                anyhow::anyhow!(
                    "Java was not found on this system. Install Java or set its path in Settings"
                )
            }),
        }
    }

    /// Detect all Java installations on the system
    pub fn detect_java_installations() -> Vec<JavaInstallation> {
        let mut installations = Vec::new();

        for path in Self::get_search_paths() {
            if let Some(installation) = Self::check_java_at_path(&path) {
                installations.push(installation);
            }
        }

        if let Ok(java_home) = std::env::var("JAVA_HOME") {
            let java_path = PathBuf::from(java_home).join("bin").join(Self::java_executable());
            if let Some(installation) = Self::check_java_at_path(&java_path) {
                installations.push(installation);
            }
        }

        if let Ok(java_path) = which::which(Self::java_executable())
            && let Some(installation) = Self::check_java_at_path(&java_path)
        {
            installations.push(installation);
        }

        installations.sort_by(|a, b| a.path.cmp(&b.path));
        installations.dedup_by(|a, b| a.path == b.path);

        log::info!("Found {} Java installations", installations.len());
        installations
    }

    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if cfg!(target_os = "windows") {
            paths.push(PathBuf::from("C:\\Program Files\\Java"));
            paths.push(PathBuf::from("C:\\Program Files (x86)\\Java"));
            paths.push(PathBuf::from("C:\\Program Files\\Eclipse Adoptium"));
            paths.push(PathBuf::from("C:\\Program Files\\Microsoft\\jdk"));
        } else if cfg!(target_os = "macos") {
            paths.push(PathBuf::from("/Library/Java/JavaVirtualMachines"));
            if let Some(home) = dirs::home_dir() {
                paths.push(home.join("Library/Java/JavaVirtualMachines"));
            }
        } else {
            paths.push(PathBuf::from("/usr/lib/jvm"));
            paths.push(PathBuf::from("/usr/java"));
            if let Some(home) = dirs::home_dir() {
                paths.push(home.join(".jdks"));
            }
        }

        Self::expand_search_paths(paths)
    }

    /// `<base>/<jdk>/bin/java` and the macOS bundle layout `<base>/<jdk>/Contents/Home/bin/java`
    fn expand_search_paths(base_paths: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut java_paths = Vec::new();

        for base in base_paths {
            let Ok(entries) = std::fs::read_dir(&base) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                for bin in [path.join("bin"), path.join("Contents/Home/bin")] {
                    let java_bin = bin.join(Self::java_executable());
                    if java_bin.exists() {
                        java_paths.push(java_bin);
                    }
                }
            }
        }

        java_paths
    }

    fn java_executable() -> &'static str {
        if cfg!(target_os = "windows") {
            "java.exe"
        } else {
            "java"
        }
    }

    fn check_java_at_path(path: &Path) -> Option<JavaInstallation> {
        if !path.exists() {
            return None;
        }

        let output = Command::new(path).arg("-version").output().ok()?;

        if !output.status.success() {
            return Some(JavaInstallation {
                path: path.to_path_buf(),
                version: "Unknown".to_string(),
                is_valid: false,
            });
        }

        // `java -version` prints to stderr
        let version_output = String::from_utf8_lossy(&output.stderr);
        let version = Self::parse_java_version(&version_output)?;

        Some(JavaInstallation {
            path: path.to_path_buf(),
            version,
            is_valid: true,
        })
    }

    fn parse_java_version(output: &str) -> Option<String> {
        for line in output.lines() {
            if line.contains("version")
                && let Some(start) = line.find('"')
                && let Some(end) = line[start + 1..].find('"')
            {
                return Some(line[start + 1..start + 1 + end].to_string());
            }
        }
        None
    }

    /// Highest major version among valid installations
    pub fn find_best_java(installations: &[JavaInstallation]) -> Option<&JavaInstallation> {
        installations
            .iter()
            .filter(|i| i.is_valid)
            .max_by_key(|i| Self::extract_major_version(&i.version).unwrap_or(0))
    }

    /// Handles both "17.0.1" and "1.8.0_301"
    fn extract_major_version(version: &str) -> Option<i32> {
        let parts: Vec<&str> = version.split('.').collect();
        let major = parts.first()?.parse::<i32>().ok()?;
        if major > 1 {
            Some(major)
        } else {
            parts.get(1)?.parse::<i32>().ok()
        }
    }
}
