use std::path::PathBuf;
use thiserror::Error;

/// Typed errors for staging operations.
/// The CLI wraps these in `anyhow` for reporting, but library callers can
/// match on the exact failure and the entry it belongs to.
#[derive(Debug, Error)]
pub enum StageError {
    /// The staging root could not be cleared or created
    #[error("failed to reset staging root '{}': {source}", root.display())]
    ResetFailed {
        root: PathBuf,
        source: std::io::Error,
    },

    /// A declared source artifact does not exist
    #[error(
        "[{group}] source artifact missing: '{}' (for '{dest_name}')",
        source_path.display()
    )]
    SourceMissing {
        group: String,
        source_path: PathBuf,
        dest_name: String,
    },

    /// Copying an artifact into the staging root failed
    #[error(
        "[{group}] failed to copy '{}' to '{}': {source}",
        source_path.display(),
        dest.display()
    )]
    CopyFailed {
        group: String,
        source_path: PathBuf,
        dest: PathBuf,
        source: std::io::Error,
    },

    /// Swapping an atomically built tree into place failed
    #[error("failed to commit staged tree into '{}': {source}", root.display())]
    CommitFailed {
        root: PathBuf,
        source: std::io::Error,
    },

    /// The staging root is a path that must never be wiped
    #[error("refusing to use '{}' as staging root: {reason}", root.display())]
    UnsafeRoot { root: PathBuf, reason: String },

    /// The manifest is structurally invalid
    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    /// A manifest file could not be read or parsed
    #[error("failed to load manifest '{}': {message}", path.display())]
    ManifestLoad { path: PathBuf, message: String },
}

impl StageError {
    /// The group the failing entry belongs to, if the error is tied to one
    pub fn group(&self) -> Option<&str> {
        match self {
            StageError::SourceMissing { group, .. } | StageError::CopyFailed { group, .. } => {
                Some(group)
            }
            _ => None,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StageError::InvalidManifest {
            message: message.into(),
        }
    }
}

/// A manifest run that stopped part-way.
///
/// `completed` placements succeeded before `error` aborted the run, so the
/// failing entry is item `completed + 1` (1-based) of `total`.
#[derive(Debug, Error)]
#[error("staging stopped after {completed} of {total} placements: {error}")]
pub struct RunFailure {
    pub completed: usize,
    pub total: usize,
    pub error: StageError,
}

impl RunFailure {
    pub fn before_start(total: usize, error: StageError) -> Self {
        Self {
            completed: 0,
            total,
            error,
        }
    }
}
