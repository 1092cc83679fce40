use crate::launcher::domain::{Library, MavenArtifact, VersionManifest};
use crate::launcher::infra::minecraft_installer::natives_classifier;
use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

pub struct NativesExtractor;

impl NativesExtractor {
    /// Extract native libraries from JAR files into a clean `natives_dir`
    pub fn extract_natives(library_jars: &[PathBuf], natives_dir: &Path) -> Result<()> {
        if natives_dir.exists() {
            fs::remove_dir_all(natives_dir).context("Failed to remove old natives directory")?;
        }
        fs::create_dir_all(natives_dir).context("Failed to create natives directory")?;

        log::info!("Extracting natives to: {}", natives_dir.display());

        for jar_path in library_jars {
            if !jar_path.exists() {
                log::warn!("Native JAR not found: {}", jar_path.display());
                continue;
            }
            Self::extract_jar_natives(jar_path, natives_dir)?;
        }

        Ok(())
    }

    fn extract_jar_natives(jar_path: &Path, natives_dir: &Path) -> Result<()> {
        let file = fs::File::open(jar_path)
            .with_context(|| format!("Failed to open JAR: {}", jar_path.display()))?;
        let mut archive =
            zip::ZipArchive::new(file).context("Failed to read JAR as ZIP archive")?;

        let mut extracted_count = 0;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let entry_name = entry.name().to_string();
            if !Self::is_native_file(&entry_name) {
                continue;
            }

            let Some(file_name) = Path::new(&entry_name).file_name() else {
                continue;
            };
            let target_path = natives_dir.join(file_name);
            if target_path.exists() {
                continue;
            }

            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            fs::write(&target_path, contents)
                .with_context(|| format!("Failed to write {}", target_path.display()))?;
            extracted_count += 1;
        }

        log::debug!("Extracted {} natives from {}", extracted_count, jar_path.display());
        Ok(())
    }

    fn is_native_file(filename: &str) -> bool {
        let lower = filename.to_lowercase();
        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &[".dll"]
        } else if cfg!(target_os = "macos") {
            &[".dylib", ".jnilib"]
        } else {
            &[".so"]
        };

        extensions.iter().any(|ext| lower.ends_with(ext)) && !filename.starts_with("META-INF/")
    }

    /// Native jars for this OS: legacy `natives` classifiers and
    /// modern `...:natives-<os>` coordinates
    pub fn get_native_jars(libraries: &[Library], libraries_dir: &Path) -> Vec<PathBuf> {
        let suffix = Self::natives_classifier_suffix();
        let mut native_jars = Vec::new();

        for library in libraries {
            if !VersionManifest::should_include_library(library) {
                continue;
            }

            if let Some(classifier) = natives_classifier(library) {
                let from_downloads = library
                    .downloads
                    .as_ref()
                    .and_then(|d| d.classifiers.as_ref())
                    .and_then(|c| c.get(&classifier))
                    .map(|a| libraries_dir.join(&a.path));
                let path = from_downloads.or_else(|| {
                    MavenArtifact::parse(&format!("{}:{}", library.name, classifier))
                        .ok()
                        .map(|a| libraries_dir.join(a.relative_path()))
                });
                if let Some(path) = path {
                    native_jars.push(path);
                }
                continue;
            }

            if let Ok(artifact) = MavenArtifact::parse(&library.name)
                && artifact.classifier.as_deref() == Some(suffix)
            {
                native_jars.push(libraries_dir.join(artifact.relative_path()));
            }
        }

        native_jars
    }

    fn natives_classifier_suffix() -> &'static str {
        if cfg!(target_os = "windows") {
            "natives-windows"
        } else if cfg!(target_os = "macos") {
            if cfg!(target_arch = "aarch64") {
                "natives-macos-arm64"
            } else {
                "natives-macos"
            }
        } else {
            "natives-linux"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extracts_only_platform_natives() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("natives.jar");
        let native_name = if cfg!(target_os = "windows") {
            "lwjgl.dll"
        } else if cfg!(target_os = "macos") {
            "liblwjgl.dylib"
        } else {
            "liblwjgl.so"
        };

        {
            let file = fs::File::create(&jar).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file(format!("linux/x64/{native_name}"), options).unwrap();
            writer.write_all(b"native").unwrap();
            writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
            writer.write_all(b"Manifest-Version: 1.0").unwrap();
            writer.finish().unwrap();
        }

        let natives_dir = dir.path().join("natives");
        NativesExtractor::extract_natives(&[jar, dir.path().join("missing.jar")], &natives_dir)
            .unwrap();

        assert_eq!(fs::read(natives_dir.join(native_name)).unwrap(), b"native");
        assert!(!natives_dir.join("MANIFEST.MF").exists());
    }

    #[test]
    fn test_modern_native_coordinates() {
        let suffix = NativesExtractor::natives_classifier_suffix();
        let libraries: Vec<Library> = serde_json::from_value(serde_json::json!([
            {"name": format!("org.lwjgl:lwjgl:3.3.1:{suffix}")},
            {"name": "org.lwjgl:lwjgl:3.3.1"}
        ]))
        .unwrap();

        let jars = NativesExtractor::get_native_jars(&libraries, Path::new("/libs"));
        assert_eq!(jars.len(), 1);
        assert!(jars[0].ends_with(format!("lwjgl-3.3.1-{suffix}.jar")));
    }
}
