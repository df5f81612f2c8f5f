use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::manifest::{self, Manifest};
use crate::common::errors::StageError;

/// Differences between a staging root and the tree a manifest declares
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub root: PathBuf,
    /// Declared files that match their source byte for byte
    pub matched: Vec<PathBuf>,
    /// Declared but absent
    pub missing: Vec<PathBuf>,
    /// Present but not declared (stale leftovers)
    pub unexpected: Vec<PathBuf>,
    /// Present, but the content differs from the source
    pub mismatched: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.unexpected.is_empty()
            && self.mismatched.is_empty()
            && self.errors.is_empty()
    }
}

/// Compare `root` with what a successful run of `manifest` would leave.
/// Paths in the report are relative to `root`.
pub fn verify(manifest: &Manifest, root: &Path) -> Result<VerifyReport, StageError> {
    let placements = manifest.resolve()?;
    let expected = manifest::expected_tree(&placements);
    let groups: BTreeSet<&str> = placements.iter().map(|p| p.group.as_str()).collect();

    let mut report = VerifyReport {
        root: root.to_path_buf(),
        ..Default::default()
    };
    let mut present: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    if root.exists() && !root.is_dir() {
        report.errors.push(format!(
            "staging root '{}' is not a directory",
            root.display()
        ));
    }

    if root.is_dir() {
        let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.errors.push(e.to_string());
                    continue;
                }
            };
            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };

            if entry.file_type().is_dir() {
                let is_group = entry.depth() == 1
                    && groups.contains(entry.file_name().to_string_lossy().as_ref());
                if !is_group {
                    report.unexpected.push(relative);
                    walker.skip_current_dir();
                }
                continue;
            }

            if expected.contains_key(&relative) {
                present.insert(relative, entry.path().to_path_buf());
            } else {
                report.unexpected.push(relative);
            }
        }
    }

    for (relative, source) in &expected {
        let Some(staged) = present.get(relative) else {
            report.missing.push(relative.clone());
            continue;
        };

        match (file_digest(staged), file_digest(source)) {
            (Ok(a), Ok(b)) if a == b => report.matched.push(relative.clone()),
            (Ok(_), Ok(_)) => report.mismatched.push(relative.clone()),
            (Err(e), _) => report
                .errors
                .push(format!("Failed to read '{}': {}", staged.display(), e)),
            (_, Err(e)) => report
                .errors
                .push(format!("Failed to read source '{}': {}", source.display(), e)),
        }
    }

    tracing::debug!(
        root = %root.display(),
        matched = report.matched.len(),
        missing = report.missing.len(),
        unexpected = report.unexpected.len(),
        mismatched = report.mismatched.len(),
        "verified staging root"
    );

    Ok(report)
}

/// SHA-256 of a file's full contents, hex encoded
pub fn file_digest(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut hasher = Sha256::new();

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
