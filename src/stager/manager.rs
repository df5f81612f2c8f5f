use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::manifest::name_problem;
use crate::common::errors::StageError;

/// How a staging root is rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Clear the root in place, then copy into it
    Direct,
    /// Build in a hidden sibling directory and swap it in on commit
    Atomic,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Atomic => write!(f, "atomic"),
        }
    }
}

/// Owns a staging root for the duration of one run.
///
/// The caller is assumed to have exclusive use of the root; concurrent
/// managers on the same root are not coordinated.
#[derive(Debug)]
pub struct StagingManager {
    root: PathBuf,
    strategy: Strategy,
    /// Directory placements are written into (the root itself for `Direct`)
    target: PathBuf,
    /// Groups whose directory already exists under `target`
    groups: HashSet<String>,
    finished: bool,
}

impl StagingManager {
    /// Manager that rebuilds `root` in place
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_strategy(root, Strategy::Direct)
    }

    /// Manager that builds into a work directory and swaps it into `root`
    pub fn atomic(root: impl Into<PathBuf>) -> Self {
        Self::with_strategy(root, Strategy::Atomic)
    }

    pub fn with_strategy(root: impl Into<PathBuf>, strategy: Strategy) -> Self {
        let root = root.into();
        let target = match strategy {
            Strategy::Direct => root.clone(),
            Strategy::Atomic => sibling(&root, "work"),
        };
        Self {
            root,
            strategy,
            target,
            groups: HashSet::new(),
            finished: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Directory placements currently land in
    pub fn target_dir(&self) -> &Path {
        &self.target
    }

    /// Leave an empty staging area behind, creating it if needed.
    ///
    /// On failure the root is left as it was.
    pub fn reset(&mut self) -> Result<(), StageError> {
        let reset_failed = |source: io::Error| StageError::ResetFailed {
            root: self.root.clone(),
            source,
        };

        let root_is_dir = match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => true,
            Ok(_) => {
                return Err(reset_failed(io::Error::other(
                    "path exists and is not a directory",
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(reset_failed(e)),
        };

        match self.strategy {
            Strategy::Direct => {
                if root_is_dir {
                    replace_dir(&self.root).map_err(reset_failed)?;
                } else {
                    fs::create_dir_all(&self.root).map_err(reset_failed)?;
                }
            }
            Strategy::Atomic => {
                // The live root stays untouched until commit
                fs::create_dir_all(&self.target).map_err(reset_failed)?;
            }
        }

        self.groups.clear();
        tracing::debug!(root = %self.root.display(), strategy = %self.strategy, "staging root reset");
        Ok(())
    }

    /// Copy `source` to `<root>/<group>/<dest_name>`, overwriting any file
    /// already there. Returns the number of bytes copied.
    pub fn place(&mut self, group: &str, source: &Path, dest_name: &str) -> Result<u64, StageError> {
        for (kind, value) in [("group", group), ("name", dest_name)] {
            if let Some(problem) = name_problem(value) {
                return Err(StageError::invalid(format!("{} '{}' {}", kind, value, problem)));
            }
        }

        let group_dir = self.target.join(group);
        let dest = group_dir.join(dest_name);
        let copy_failed = |source_err: io::Error, dest: &Path| StageError::CopyFailed {
            group: group.to_string(),
            source_path: source.to_path_buf(),
            dest: dest.to_path_buf(),
            source: source_err,
        };

        match fs::metadata(source) {
            Ok(meta) if meta.is_dir() => {
                return Err(copy_failed(io::Error::other("source is a directory"), &dest));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StageError::SourceMissing {
                    group: group.to_string(),
                    source_path: source.to_path_buf(),
                    dest_name: dest_name.to_string(),
                });
            }
            Err(e) => return Err(copy_failed(e, &dest)),
        }

        if !self.groups.contains(group) {
            fs::create_dir_all(&group_dir).map_err(|e| copy_failed(e, &group_dir))?;
            self.groups.insert(group.to_string());
        }

        let bytes = fs::copy(source, &dest).map_err(|e| copy_failed(e, &dest))?;
        tracing::debug!(
            group,
            source = %source.display(),
            dest = %dest.display(),
            bytes,
            "placed artifact"
        );
        Ok(bytes)
    }

    /// Make the staged tree live. A no-op for `Direct`.
    pub fn commit(&mut self) -> Result<(), StageError> {
        if self.finished || self.strategy == Strategy::Direct {
            self.finished = true;
            return Ok(());
        }

        let commit_failed = |source: io::Error| StageError::CommitFailed {
            root: self.root.clone(),
            source,
        };

        let previous = if self.root.exists() {
            let aside = sibling(&self.root, "old");
            fs::rename(&self.root, &aside).map_err(commit_failed)?;
            Some(aside)
        } else {
            if let Some(parent) = self.root.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(commit_failed)?;
            }
            None
        };

        if let Err(e) = fs::rename(&self.target, &self.root) {
            if let Some(previous) = &previous {
                if let Err(restore) = fs::rename(previous, &self.root) {
                    tracing::error!(
                        previous = %previous.display(),
                        "failed to restore previous staging root: {}",
                        restore
                    );
                }
            }
            return Err(commit_failed(e));
        }

        if let Some(previous) = previous {
            remove_best_effort(&previous);
        }

        self.target = self.root.clone();
        self.finished = true;
        tracing::debug!(root = %self.root.display(), "atomic staging committed");
        Ok(())
    }

    /// Give up on the run. `Atomic` discards its work directory; `Direct`
    /// keeps whatever was already placed.
    pub fn abort(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.strategy == Strategy::Atomic && self.target.exists() {
            remove_best_effort(&self.target);
        }
    }
}

impl Drop for StagingManager {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Hidden sibling path used for work and set-aside trees
fn sibling(root: &Path, tag: &str) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "staging".to_string());
    let hidden = format!(".{}.{}-{}", name, tag, Uuid::new_v4().simple());
    match root.parent() {
        Some(parent) => parent.join(hidden),
        None => PathBuf::from(hidden),
    }
}

/// Swap `dir` for a fresh empty directory.
///
/// The old tree is renamed aside in one step, so any failure leaves `dir`
/// exactly as it was. Nothing is deleted until the swap has happened; a root
/// that cannot be renamed (a mount point, for instance) fails the reset.
fn replace_dir(dir: &Path) -> io::Result<()> {
    let aside = sibling(dir, "stale");
    fs::rename(dir, &aside)?;
    if let Err(e) = fs::create_dir(dir) {
        fs::rename(&aside, dir)?;
        return Err(e);
    }
    remove_best_effort(&aside);
    Ok(())
}

fn remove_best_effort(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        tracing::warn!(path = %path.display(), "failed to remove leftover staging tree: {}", e);
    }
}
