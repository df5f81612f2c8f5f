use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::common::config::Config;
use crate::stager::manifest::{ArtifactEntry, Manifest};

/// A named, reusable manifest
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: String,
    pub description: String,
    /// Staging root used when `--root` is not given
    pub root: Option<PathBuf>,
    pub manifest: Manifest,
}

/// On-disk form of a user preset (`<data_dir>/presets/<name>.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_root: Option<PathBuf>,
    #[serde(default)]
    preset: PresetMeta,
    #[serde(default)]
    artifact: Vec<ArtifactEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PresetMeta {
    #[serde(default)]
    description: String,
    #[serde(default)]
    root: Option<PathBuf>,
}

const BUILTIN_NAMES: &[&str] = &["socket"];

impl Preset {
    /// Load a preset by name
    pub fn load(name: &str) -> Result<Self> {
        // First check built-in presets
        if let Some(preset) = builtin_preset(name) {
            return Ok(preset);
        }

        // Then check user presets directory
        let path = Config::presets_dir().join(format!("{}.toml", name));
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preset: {}", path.display()))?;
            return Self::parse(name, &contents)
                .with_context(|| format!("Failed to parse preset: {}", path.display()));
        }

        anyhow::bail!(
            "Preset '{}' not found. Available: {}",
            name,
            Self::available_presets().join(", ")
        )
    }

    /// Build a preset from user preset TOML. Relative sources resolve against
    /// the working directory, the way the built-in presets do.
    pub fn parse(name: &str, contents: &str) -> Result<Self> {
        let file: PresetFile = toml::from_str(contents)?;
        let mut manifest = Manifest::new(".");
        manifest.source_root = file.source_root;
        manifest.artifacts = file.artifact;
        Ok(Preset {
            name: name.to_string(),
            description: file.preset.description,
            root: file.preset.root,
            manifest,
        })
    }

    /// List all available preset names
    pub fn available_presets() -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_NAMES.iter().map(|n| n.to_string()).collect();

        // Add user presets
        if let Ok(entries) = std::fs::read_dir(Config::presets_dir()) {
            let mut user: Vec<String> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map(|ext| ext == "toml").unwrap_or(false))
                .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
                .filter(|name| !names.contains(name))
                .collect();
            user.sort();
            names.extend(user);
        }

        names
    }
}

/// Built-in preset definitions
fn builtin_preset(name: &str) -> Option<Preset> {
    match name {
        // Client and server bundles of the socket file manager, each with
        // its own copy of the shared socket library
        "socket" | "socket_build" => Some(Preset {
            name: "socket".into(),
            description: "Socket file manager: client and server bundles with SocketLib".into(),
            root: Some(PathBuf::from("Socket_build")),
            manifest: Manifest::new(".")
                .with("Client", "FileManager/bin/Debug/FileManager.exe", None)
                .with("Client", "FileManager/bin/Debug/SocketLib.dll", None)
                .with("Server", "ServerForm/bin/Debug/ServerForm.exe", None)
                .with("Server", "ServerForm/bin/Debug/SocketLib.dll", None),
        }),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_socket_preset_layout() {
        let preset = Preset::load("socket").unwrap();
        let placements = preset.manifest.resolve().unwrap();
        let dests: Vec<PathBuf> = placements.iter().map(|p| p.relative_dest()).collect();

        assert_eq!(preset.root.as_deref(), Some(Path::new("Socket_build")));
        assert_eq!(
            dests,
            vec![
                PathBuf::from("Client/FileManager.exe"),
                PathBuf::from("Client/SocketLib.dll"),
                PathBuf::from("Server/ServerForm.exe"),
                PathBuf::from("Server/SocketLib.dll"),
            ]
        );
    }

    #[test]
    fn test_parse_user_preset() {
        let preset = Preset::parse(
            "tools",
            r#"
source_root = "target/release"

[preset]
description = "CLI tools"
root = "dist"

[[artifact]]
group = "bin"
source = "stagehand"
"#,
        )
        .unwrap();

        assert_eq!(preset.description, "CLI tools");
        assert_eq!(preset.root, Some(PathBuf::from("dist")));
        let placements = preset.manifest.resolve().unwrap();
        assert_eq!(placements[0].source, PathBuf::from("./target/release/stagehand"));
    }

    #[test]
    fn test_unknown_preset_lists_available() {
        let err = Preset::load("definitely_not_a_preset_xyz").unwrap_err();
        assert!(err.to_string().contains("socket"));
    }
}
