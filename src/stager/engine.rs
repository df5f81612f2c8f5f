use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::manager::{StagingManager, Strategy};
use super::manifest::{self, Manifest, Placement};
use crate::common::errors::{RunFailure, StageError};
use crate::common::format;
use crate::common::safety;

/// Knobs for a single staging run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub strategy: Strategy,
    pub show_progress: bool,
    /// Refuse roots such as `/`, `$HOME` or a directory holding the sources
    pub check_safety: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Direct,
            show_progress: false,
            check_safety: true,
        }
    }
}

/// One artifact that made it into the staging root
#[derive(Debug, Clone, Serialize)]
pub struct PlacedArtifact {
    pub group: String,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub size_bytes: u64,
}

/// Report from a successful staging run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub strategy: Strategy,
    /// Distinct groups, in order of first appearance
    pub groups: Vec<String>,
    pub artifacts: Vec<PlacedArtifact>,
    pub total_bytes: u64,
    pub duration_secs: f64,
}

/// Rebuild `root` from `manifest`.
///
/// Resets the root once, places every artifact in declared order and stops
/// at the first failure. With `Strategy::Direct` the artifacts placed before
/// a failure stay where they are; re-running the manifest starts over from a
/// clean root.
pub fn run_manifest(
    manifest: &Manifest,
    root: &Path,
    options: &RunOptions,
) -> Result<RunReport, RunFailure> {
    let placements = manifest
        .resolve()
        .map_err(|e| RunFailure::before_start(manifest.len(), e))?;
    run_placements(&placements, root, options)
}

/// Same as [`run_manifest`] for placements that are already resolved
pub fn run_placements(
    placements: &[Placement],
    root: &Path,
    options: &RunOptions,
) -> Result<RunReport, RunFailure> {
    let started = Instant::now();
    let total = placements.len();

    if options.check_safety {
        safety::check_root(root, placements.iter().map(|p| p.source.as_path()))
            .map_err(|e| RunFailure::before_start(total, e))?;
    }

    let mut manager = StagingManager::with_strategy(root, options.strategy);
    manager
        .reset()
        .map_err(|e| RunFailure::before_start(total, e))?;

    tracing::info!(
        root = %root.display(),
        strategy = %options.strategy,
        artifacts = total,
        "staging started"
    );

    let pb = if options.show_progress {
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} Staging... {msg}")
            .map(|s| s.progress_chars("━━░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let mut artifacts = Vec::with_capacity(total);

    for (index, placement) in placements.iter().enumerate() {
        if let Some(ref pb) = pb {
            pb.set_message(format::elide_middle(
                &placement.relative_dest().display().to_string(),
                40,
            ));
        }

        match manager.place(&placement.group, &placement.source, &placement.dest_name) {
            Ok(size_bytes) => artifacts.push(PlacedArtifact {
                group: placement.group.clone(),
                source: placement.source.clone(),
                dest: root.join(placement.relative_dest()),
                size_bytes,
            }),
            Err(error) => {
                if let Some(ref pb) = pb {
                    pb.finish_and_clear();
                }
                manager.abort();
                tracing::warn!(completed = index, total, "staging aborted: {}", error);
                return Err(RunFailure {
                    completed: index,
                    total,
                    error,
                });
            }
        }

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    manager.commit().map_err(|error| RunFailure {
        completed: total,
        total,
        error,
    })?;

    let mut groups: Vec<String> = Vec::new();
    for p in placements {
        if !groups.contains(&p.group) {
            groups.push(p.group.clone());
        }
    }

    let total_bytes = artifacts.iter().map(|a| a.size_bytes).sum();
    let report = RunReport {
        root: root.to_path_buf(),
        strategy: options.strategy,
        groups,
        artifacts,
        total_bytes,
        duration_secs: started.elapsed().as_secs_f64(),
    };

    tracing::info!(
        root = %root.display(),
        artifacts = report.artifacts.len(),
        bytes = report.total_bytes,
        "staging finished"
    );

    Ok(report)
}

/// One line of a dry-run plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanItem {
    pub group: String,
    pub source: PathBuf,
    pub dest: PathBuf,
    pub source_exists: bool,
    pub size_bytes: Option<u64>,
    /// A later entry writes the same destination
    pub overwritten: bool,
}

/// What a run would do, computed without touching the filesystem
#[derive(Debug, Clone, Serialize)]
pub struct StagePlan {
    pub root: PathBuf,
    pub root_exists: bool,
    pub items: Vec<PlanItem>,
    /// Why the root would be refused, if it would be
    pub unsafe_root: Option<String>,
}

impl StagePlan {
    pub fn missing_sources(&self) -> impl Iterator<Item = &PlanItem> {
        self.items.iter().filter(|i| !i.source_exists)
    }

    pub fn total_bytes(&self) -> u64 {
        self.items.iter().filter_map(|i| i.size_bytes).sum()
    }

    /// Whether a real run is expected to succeed
    pub fn is_ready(&self) -> bool {
        self.unsafe_root.is_none() && self.missing_sources().next().is_none()
    }
}

/// Validate `manifest` against `root` and report what a run would place
pub fn plan(manifest: &Manifest, root: &Path) -> Result<StagePlan, StageError> {
    let placements = manifest.resolve()?;
    let overwritten = manifest::overwritten(&placements);

    let unsafe_root = match safety::check_root(root, placements.iter().map(|p| p.source.as_path())) {
        Ok(()) => None,
        Err(StageError::UnsafeRoot { reason, .. }) => Some(reason),
        Err(other) => return Err(other),
    };

    let items = placements
        .iter()
        .enumerate()
        .map(|(index, p)| {
            let meta = std::fs::metadata(&p.source).ok().filter(|m| m.is_file());
            PlanItem {
                group: p.group.clone(),
                source: p.source.clone(),
                dest: root.join(p.relative_dest()),
                source_exists: meta.is_some(),
                size_bytes: meta.map(|m| m.len()),
                overwritten: overwritten.contains(&index),
            }
        })
        .collect();

    Ok(StagePlan {
        root: root.to_path_buf(),
        root_exists: root.exists(),
        items,
        unsafe_root,
    })
}
