use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::errors::StageError;

/// A declarative list of artifact placements for one staging run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Directory relative sources resolve against. A relative value is
    /// itself taken relative to the manifest file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,

    /// Placements, in the order they are performed
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ArtifactEntry>,

    /// Where the manifest came from; anchors relative paths
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One declared artifact, as written in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Group (subdirectory of the staging root) the artifact belongs to
    pub group: String,

    /// Path of the pre-built artifact
    pub source: PathBuf,

    /// File name inside the group; defaults to the source's file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A validated placement with its source resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub group: String,
    pub source: PathBuf,
    pub dest_name: String,
}

impl Placement {
    /// Destination path relative to the staging root
    pub fn relative_dest(&self) -> PathBuf {
        Path::new(&self.group).join(&self.dest_name)
    }
}

impl Manifest {
    /// Create an empty manifest whose relative sources resolve against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: None,
            artifacts: Vec::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Append a placement (builder style)
    pub fn with(mut self, group: &str, source: impl Into<PathBuf>, name: Option<&str>) -> Self {
        self.push(group, source, name);
        self
    }

    /// Append a placement
    pub fn push(&mut self, group: &str, source: impl Into<PathBuf>, name: Option<&str>) {
        self.artifacts.push(ArtifactEntry {
            group: group.to_string(),
            source: source.into(),
            name: name.map(str::to_string),
        });
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Load a manifest file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, StageError> {
        let contents = std::fs::read_to_string(path).map_err(|e| StageError::ManifestLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            Self::parse_json(&contents, base_dir)
        } else {
            Self::parse_toml(&contents, base_dir)
        };

        parsed.map_err(|message| StageError::ManifestLoad {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse_toml(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self, String> {
        let mut manifest: Manifest = toml::from_str(contents).map_err(|e| e.to_string())?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    pub fn parse_json(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self, String> {
        let mut manifest: Manifest = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    /// Build a manifest from `GROUP[/NAME]=SOURCE` arguments. Everything after
    /// the first `=` is the source, colons included.
    pub fn from_entries<S: AsRef<str>>(
        entries: &[S],
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, StageError> {
        let mut manifest = Manifest::new(base_dir);
        for raw in entries {
            let raw = raw.as_ref();
            let (dest, source) = raw.split_once('=').ok_or_else(|| {
                StageError::invalid(format!("entry '{}' is not of the form GROUP[/NAME]=SOURCE", raw))
            })?;
            if source.is_empty() {
                return Err(StageError::invalid(format!("entry '{}' has no source path", raw)));
            }
            match dest.split_once('/') {
                Some((group, name)) => manifest.push(group, source, Some(name)),
                None => manifest.push(dest, source, None),
            }
        }
        Ok(manifest)
    }

    /// Directory relative sources are joined onto
    pub fn source_base(&self) -> PathBuf {
        match &self.source_root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => self.base_dir.join(root),
            None => self.base_dir.clone(),
        }
    }

    /// Validate every entry and resolve sources, preserving declared order
    pub fn resolve(&self) -> Result<Vec<Placement>, StageError> {
        if self.artifacts.is_empty() {
            return Err(StageError::invalid("manifest declares no artifacts"));
        }

        let base = self.source_base();
        let mut placements = Vec::with_capacity(self.artifacts.len());

        for (index, entry) in self.artifacts.iter().enumerate() {
            let position = index + 1;
            check_component("group", &entry.group, position)?;

            let dest_name = match &entry.name {
                Some(name) => name.clone(),
                None => entry
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        StageError::invalid(format!(
                            "entry {} ('{}'): cannot derive a file name from source '{}'",
                            position,
                            entry.group,
                            entry.source.display()
                        ))
                    })?,
            };
            check_component("name", &dest_name, position)?;

            let source = if entry.source.is_absolute() {
                entry.source.clone()
            } else {
                base.join(&entry.source)
            };

            placements.push(Placement {
                group: entry.group.clone(),
                source,
                dest_name,
            });
        }

        for index in overwritten(&placements) {
            let p = &placements[index];
            tracing::warn!(
                group = %p.group,
                name = %p.dest_name,
                "placement {} is overwritten by a later entry",
                index + 1
            );
        }

        Ok(placements)
    }
}

/// Indexes of placements whose destination is written again later
pub fn overwritten(placements: &[Placement]) -> Vec<usize> {
    let mut last: BTreeMap<PathBuf, usize> = BTreeMap::new();
    for (index, p) in placements.iter().enumerate() {
        last.insert(p.relative_dest(), index);
    }
    placements
        .iter()
        .enumerate()
        .filter(|(index, p)| last.get(&p.relative_dest()) != Some(index))
        .map(|(index, _)| index)
        .collect()
}

/// The tree a successful run leaves behind: relative destination → source.
/// Later placements win over earlier ones with the same destination.
pub fn expected_tree(placements: &[Placement]) -> BTreeMap<PathBuf, PathBuf> {
    placements
        .iter()
        .map(|p| (p.relative_dest(), p.source.clone()))
        .collect()
}

fn check_component(kind: &str, value: &str, position: usize) -> Result<(), StageError> {
    match name_problem(value) {
        Some(problem) => Err(StageError::invalid(format!(
            "entry {}: {} '{}' {}",
            position, kind, value, problem
        ))),
        None => Ok(()),
    }
}

/// Why `value` cannot be used as a single path component, if it cannot
pub(crate) fn name_problem(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("is empty")
    } else if value == "." || value == ".." {
        Some("must not be '.' or '..'")
    } else if value.contains('/') || value.contains('\\') {
        Some("must not contain path separators")
    } else if value.contains('\0') {
        Some("must not contain NUL")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOCKET_TOML: &str = r#"
source_root = "out"

[[artifact]]
group = "Client"
source = "FileManager.exe"

[[artifact]]
group = "Server"
source = "bin/ServerForm.exe"
name = "Server.exe"
"#;

    #[test]
    fn test_parse_toml_and_resolve() {
        let manifest = Manifest::parse_toml(SOCKET_TOML, "/work").unwrap();
        let placements = manifest.resolve().unwrap();

        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].group, "Client");
        assert_eq!(placements[0].dest_name, "FileManager.exe");
        assert_eq!(placements[0].source, PathBuf::from("/work/out/FileManager.exe"));
        assert_eq!(placements[1].dest_name, "Server.exe");
        assert_eq!(placements[1].relative_dest(), PathBuf::from("Server/Server.exe"));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"artifact":[{"group":"Client","source":"/abs/a.exe"}]}"#;
        let manifest = Manifest::parse_json(json, "/ignored").unwrap();
        let placements = manifest.resolve().unwrap();
        assert_eq!(placements[0].source, PathBuf::from("/abs/a.exe"));
    }

    #[test]
    fn test_empty_manifest_rejected() {
        let err = Manifest::new(".").resolve().unwrap_err();
        assert!(matches!(err, StageError::InvalidManifest { .. }));
    }

    #[test]
    fn test_bad_group_names_rejected() {
        for group in ["", "..", "Client/sub", "a\\b"] {
            let manifest = Manifest::new(".").with(group, "a.exe", None);
            assert!(manifest.resolve().is_err(), "group {:?} should be rejected", group);
        }
    }

    #[test]
    fn test_bad_dest_name_rejected() {
        let manifest = Manifest::new(".").with("Client", "a.exe", Some("../escape.exe"));
        let err = manifest.resolve().unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_from_entries() {
        let manifest = Manifest::from_entries(
            &["Client=bin/a.exe", "Server/b-renamed.exe=bin/b.exe"],
            "/base",
        )
        .unwrap();
        let placements = manifest.resolve().unwrap();
        assert_eq!(placements[0].relative_dest(), PathBuf::from("Client/a.exe"));
        assert_eq!(placements[1].relative_dest(), PathBuf::from("Server/b-renamed.exe"));
        assert_eq!(placements[1].source, PathBuf::from("/base/bin/b.exe"));
    }

    #[test]
    fn test_from_entries_keeps_source_verbatim() {
        let manifest = Manifest::from_entries(
            &["Client/renamed.exe=C:/out/a.exe", "Server=bin/b.exe:stream"],
            "/base",
        )
        .unwrap();
        assert_eq!(manifest.artifacts[0].source, PathBuf::from("C:/out/a.exe"));
        assert_eq!(manifest.artifacts[0].name.as_deref(), Some("renamed.exe"));
        assert_eq!(manifest.artifacts[1].source, PathBuf::from("bin/b.exe:stream"));
        assert_eq!(manifest.artifacts[1].name, None);
    }

    #[test]
    fn test_from_entries_requires_equals() {
        assert!(Manifest::from_entries(&["Client"], ".").is_err());
        assert!(Manifest::from_entries(&["Client="], ".").is_err());
    }

    #[test]
    fn test_duplicates_last_write_wins() {
        let placements = Manifest::new("/src")
            .with("Client", "first/lib.dll", None)
            .with("Client", "second/lib.dll", None)
            .resolve()
            .unwrap();

        assert_eq!(overwritten(&placements), vec![0]);
        let tree = expected_tree(&placements);
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.get(Path::new("Client/lib.dll")),
            Some(&PathBuf::from("/src/second/lib.dll"))
        );
    }
}
