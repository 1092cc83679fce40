use super::version_manifest::{ArgumentValue, ResolvedManifest, RuleFeatures, rules_allow};
use super::{LaunchCommand, LaunchOptions, MavenArtifact, VersionManifest};
use crate::launcher::infra::NativesExtractor;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const OFFLINE_UUID: &str = "00000000-0000-0000-0000-000000000000";

pub struct CommandBuilder;

impl CommandBuilder {
    /// Resolve the installed version, extract its natives and assemble the java invocation
    pub fn build(options: &LaunchOptions) -> Result<LaunchCommand> {
        let version = &options.version_id;
        let game_dir = &options.game_directory;

        let version_json_path = game_dir
            .join("versions")
            .join(version)
            .join(format!("{}.json", version));
        if !version_json_path.exists() {
            anyhow::bail!("Version {} is not installed", version);
        }

        let manifest = VersionManifest::resolve_from_file(&version_json_path)
            .context("Failed to parse/resolve version manifest")?;

        let libraries_dir = game_dir.join("libraries");
        let natives_dir = game_dir.join("versions").join(version).join("natives");
        let native_jars = NativesExtractor::get_native_jars(&manifest.libraries, &libraries_dir);
        if native_jars.is_empty() {
            log::debug!("{} declares no native jars", version);
        } else {
            NativesExtractor::extract_natives(&native_jars, &natives_dir)
                .context("Failed to extract native libraries")?;
        }

        let classpath = Self::build_classpath(&manifest, game_dir)?;
        let features = RuleFeatures {
            has_custom_resolution: options.resolution.is_some(),
        };
        let vars = Self::launch_variables(&manifest, options, &classpath, &natives_dir);

        let mut args = Self::build_jvm_arguments(&manifest, options, &features, &vars);
        args.push(manifest.main_class.clone());
        args.extend(Self::build_game_arguments(&manifest, options, &features, &vars));

        log::info!("Built launch command for {} with {} arguments", version, args.len());
        log::debug!("Arguments: {:?}", args);

        Ok(LaunchCommand {
            version_id: version.clone(),
            program: options.java_path.clone(),
            args,
            working_dir: game_dir.clone(),
        })
    }

    fn build_classpath(manifest: &ResolvedManifest, game_dir: &Path) -> Result<String> {
        let libraries_dir = game_dir.join("libraries");
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for library in &manifest.libraries {
            if !VersionManifest::should_include_library(library) {
                continue;
            }

            let artifact = library.downloads.as_ref().and_then(|d| d.artifact.as_ref());
            let library_path = match artifact {
                Some(artifact) => libraries_dir.join(&artifact.path),
                // natives-only entries of old manifests
                None if library.natives.is_some() => continue,
                None => match MavenArtifact::parse(&library.name) {
                    Ok(coords) => libraries_dir.join(coords.relative_path()),
                    Err(e) => {
                        log::warn!("{}", e);
                        continue;
                    }
                },
            };

            if !seen.insert(library_path.clone()) {
                continue;
            }
            if library_path.exists() {
                entries.push(library_path.to_string_lossy().to_string());
            } else {
                log::warn!("Library not found: {}", library_path.display());
            }
        }

        let client_jar = game_dir
            .join("versions")
            .join(&manifest.client_jar_id)
            .join(format!("{}.jar", manifest.client_jar_id));
        if !client_jar.exists() {
            anyhow::bail!(
                "Minecraft client jar not found: {} (install {} first)",
                client_jar.display(),
                manifest.client_jar_id
            );
        }
        entries.push(client_jar.to_string_lossy().to_string());

        Ok(entries.join(classpath_separator()))
    }

    fn launch_variables(
        manifest: &ResolvedManifest,
        options: &LaunchOptions,
        classpath: &str,
        natives_dir: &Path,
    ) -> HashMap<&'static str, String> {
        let game_dir = options.game_directory.to_string_lossy().to_string();
        let assets_root = options.game_directory.join("assets");
        let libraries_dir = options.game_directory.join("libraries");
        let (width, height) = options.resolution.unwrap_or((854, 480));

        HashMap::from([
            ("auth_player_name", options.username.clone()),
            ("version_name", options.version_id.clone()),
            ("game_directory", game_dir),
            ("assets_root", assets_root.to_string_lossy().to_string()),
            ("game_assets", assets_root.to_string_lossy().to_string()),
            ("assets_index_name", manifest.assets.clone()),
            ("auth_uuid", OFFLINE_UUID.to_string()),
            ("auth_access_token", "0".to_string()),
            ("auth_session", "0".to_string()),
            ("clientid", String::new()),
            ("auth_xuid", String::new()),
            ("user_type", "legacy".to_string()),
            ("user_properties", "{}".to_string()),
            ("version_type", manifest.version_type.clone()),
            ("natives_directory", natives_dir.to_string_lossy().to_string()),
            ("library_directory", libraries_dir.to_string_lossy().to_string()),
            ("classpath_separator", classpath_separator().to_string()),
            ("launcher_name", "quarry-launcher".to_string()),
            ("launcher_version", env!("CARGO_PKG_VERSION").to_string()),
            ("classpath", classpath.to_string()),
            ("resolution_width", width.to_string()),
            ("resolution_height", height.to_string()),
        ])
    }

    fn build_jvm_arguments(
        manifest: &ResolvedManifest,
        options: &LaunchOptions,
        features: &RuleFeatures,
        vars: &HashMap<&'static str, String>,
    ) -> Vec<String> {
        let mut args = vec![
            format!("-Xms{}M", options.min_memory_mb),
            format!("-Xmx{}M", options.max_memory_mb),
        ];

        for custom in &options.custom_jvm_args {
            match ["-Xmx", "-Xms"].into_iter().find(|p| custom.starts_with(*p)) {
                Some(prefix) => replace_or_push_arg(&mut args, prefix, custom.clone()),
                None => args.push(custom.clone()),
            }
        }

        match &manifest.arguments {
            Some(arguments) if !arguments.jvm.is_empty() => {
                args.extend(collect_arguments(&arguments.jvm, features, vars));
            }
            _ => {
                let legacy = [
                    "-Djava.library.path=${natives_directory}",
                    "-Dminecraft.launcher.brand=${launcher_name}",
                    "-Dminecraft.launcher.version=${launcher_version}",
                    "-cp",
                    "${classpath}",
                ];
                args.extend(legacy.iter().map(|a| substitute_variables(a, vars)));
            }
        }

        let lwjgl_path = format!("-Dorg.lwjgl.librarypath={}", vars["natives_directory"]);
        replace_or_push_arg(&mut args, "-Dorg.lwjgl.librarypath=", lwjgl_path);

        args.into_iter()
            .map(|arg| normalize_argument(&arg))
            .filter(|arg| !arg.is_empty())
            .collect()
    }

    fn build_game_arguments(
        manifest: &ResolvedManifest,
        options: &LaunchOptions,
        features: &RuleFeatures,
        vars: &HashMap<&'static str, String>,
    ) -> Vec<String> {
        let mut args = if let Some(arguments) = &manifest.arguments
            && !arguments.game.is_empty()
        {
            collect_arguments(&arguments.game, features, vars)
        } else if let Some(legacy) = &manifest.minecraft_arguments {
            legacy
                .split_whitespace()
                .map(|arg| substitute_variables(arg, vars))
                .collect()
        } else {
            [
                "--username",
                "${auth_player_name}",
                "--version",
                "${version_name}",
                "--gameDir",
                "${game_directory}",
                "--assetsDir",
                "${assets_root}",
                "--assetIndex",
                "${assets_index_name}",
            ]
            .iter()
            .map(|arg| substitute_variables(arg, vars))
            .collect()
        };

        if let Some((width, height)) = options.resolution
            && !args.iter().any(|a| a == "--width")
        {
            args.extend(["--width".to_string(), width.to_string()]);
            args.extend(["--height".to_string(), height.to_string()]);
        }
        if options.fullscreen {
            args.push("--fullscreen".to_string());
        }
        if let Some((host, port)) = &options.server {
            args.extend(["--server".to_string(), host.clone()]);
            args.extend(["--port".to_string(), port.clone()]);
        }

        args.into_iter()
            .map(|arg| normalize_argument(&arg))
            .filter(|arg| !arg.is_empty())
            .collect()
    }
}

fn collect_arguments(
    values: &[ArgumentValue],
    features: &RuleFeatures,
    vars: &HashMap<&'static str, String>,
) -> Vec<String> {
    let mut args = Vec::new();
    for value in values {
        match value {
            ArgumentValue::String(s) => args.push(substitute_variables(s, vars)),
            ArgumentValue::Conditional { rules, value } => {
                if rules_allow(rules, features) {
                    args.extend(value.values().into_iter().map(|s| substitute_variables(s, vars)));
                }
            }
        }
    }
    args
}

/// Replaces every known `${name}`; unknown placeholders are left as they are
pub fn substitute_variables(template: &str, vars: &HashMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 3 + end]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn normalize_argument(arg: &str) -> String {
    let trimmed = arg.trim();
    if let Some(rest) = trimmed.strip_prefix("-D")
        && let Some((key, value)) = rest.split_once('=')
    {
        return format!("-D{}={}", key, value.trim());
    }
    trimmed.to_string()
}

fn replace_or_push_arg(args: &mut Vec<String>, prefix: &str, value: String) {
    if let Some(pos) = args.iter().position(|arg| arg.starts_with(prefix)) {
        args[pos] = value;
    } else {
        args.push(value);
    }
}

fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") { ";" } else { ":" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn vars() -> HashMap<&'static str, String> {
        HashMap::from([
            ("auth_player_name", "Steve".to_string()),
            ("game_directory", "/games/mc".to_string()),
        ])
    }

    #[test]
    fn test_substitution_keeps_unknown_placeholders() {
        assert_eq!(
            substitute_variables("--username ${auth_player_name}", &vars()),
            "--username Steve"
        );
        assert_eq!(
            substitute_variables("${game_directory}/${unknown}/x", &vars()),
            "/games/mc/${unknown}/x"
        );
        assert_eq!(substitute_variables("${broken", &vars()), "${broken");
    }

    #[test]
    fn test_normalize_trims_property_values() {
        assert_eq!(normalize_argument("  -Dfoo= bar "), "-Dfoo=bar");
        assert_eq!(normalize_argument(" --demo "), "--demo");
    }

    fn fake_install(root: &Path) {
        let version_dir = root.join("versions").join("1.20.1");
        fs::create_dir_all(&version_dir).unwrap();
        fs::write(version_dir.join("1.20.1.jar"), b"jar").unwrap();

        let lib_path = root.join("libraries/com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar");
        fs::create_dir_all(lib_path.parent().unwrap()).unwrap();
        fs::write(&lib_path, b"lib").unwrap();

        let manifest = serde_json::json!({
            "id": "1.20.1",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "assetIndex": {"id": "5", "sha1": "aa", "size": 1, "totalSize": 2, "url": "http://x"},
            "assets": "5",
            "libraries": [{
                "name": "com.mojang:brigadier:1.0.18",
                "downloads": {"artifact": {
                    "path": "com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar",
                    "sha1": "aa", "size": 3, "url": "http://x"
                }}
            }],
            "arguments": {
                "game": [
                    "--username", "${auth_player_name}",
                    "--assetIndex", "${assets_index_name}",
                    {"rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                     "value": ["--width", "${resolution_width}", "--height", "${resolution_height}"]}
                ],
                "jvm": ["-Djava.library.path=${natives_directory}", "-cp", "${classpath}"]
            }
        });
        fs::write(
            version_dir.join("1.20.1.json"),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();
    }

    fn options(root: &Path) -> LaunchOptions {
        LaunchOptions {
            version_id: "1.20.1".to_string(),
            username: "Steve".to_string(),
            java_path: PathBuf::from("java"),
            game_directory: root.to_path_buf(),
            max_memory_mb: 4096,
            min_memory_mb: 2048,
            custom_jvm_args: vec!["-XX:+UseG1GC".to_string(), "-Xmx6G".to_string()],
            resolution: Some((1280, 720)),
            fullscreen: false,
            server: Some(("mc.example.net".to_string(), "25565".to_string())),
        }
    }

    #[test]
    fn test_build_full_command() {
        let dir = tempfile::tempdir().unwrap();
        fake_install(dir.path());

        let command = CommandBuilder::build(&options(dir.path())).unwrap();
        let args = &command.args;

        assert_eq!(command.program, PathBuf::from("java"));
        assert_eq!(args[0], "-Xms2048M");
        assert_eq!(args[1], "-Xmx6G");
        assert!(args.contains(&"-XX:+UseG1GC".to_string()));

        let cp_index = args.iter().position(|a| a == "-cp").unwrap();
        assert!(args[cp_index + 1].contains("brigadier-1.0.18.jar"));
        assert!(args[cp_index + 1].ends_with("1.20.1.jar"));

        let main_index = args
            .iter()
            .position(|a| a == "net.minecraft.client.main.Main")
            .unwrap();
        let game = &args[main_index + 1..];
        assert_eq!(
            game,
            [
                "--username", "Steve", "--assetIndex", "5", "--width", "1280", "--height",
                "720", "--server", "mc.example.net", "--port", "25565"
            ]
        );
        assert!(!args.iter().any(|a| a.contains("${")));
        assert_eq!(command.argv()[0], "java");
    }

    #[test]
    fn test_resolution_rule_skipped_without_custom_size() {
        let dir = tempfile::tempdir().unwrap();
        fake_install(dir.path());
        let mut opts = options(dir.path());
        opts.resolution = None;
        opts.server = None;

        let command = CommandBuilder::build(&opts).unwrap();
        assert!(!command.args.contains(&"--width".to_string()));
    }

    #[test]
    fn test_missing_version_is_readable_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.version_id = "1.8.9".to_string();

        let err = CommandBuilder::build(&opts).unwrap_err();
        assert_eq!(err.to_string(), "Version 1.8.9 is not installed");
    }
}
