use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::engine::RunReport;
use super::manager::Strategy;
use crate::common::config::Config;
use crate::common::errors::RunFailure;

/// Audit record of one stage run, appended to the daily run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub root: PathBuf,
    pub strategy: Strategy,
    /// Where the manifest came from (file path, preset name, or "cli")
    pub origin: String,
    pub placed: usize,
    pub total: usize,
    pub total_bytes: u64,
    pub success: bool,
    /// Group of the entry that stopped a failed run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_group: Option<String>,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn success(origin: &str, report: &RunReport) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            root: report.root.clone(),
            strategy: report.strategy,
            origin: origin.to_string(),
            placed: report.artifacts.len(),
            total: report.artifacts.len(),
            total_bytes: report.total_bytes,
            success: true,
            failed_group: None,
            error: None,
        }
    }

    pub fn failure(origin: &str, root: &Path, strategy: Strategy, failure: &RunFailure) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            root: root.to_path_buf(),
            strategy,
            origin: origin.to_string(),
            placed: failure.completed,
            total: failure.total,
            total_bytes: 0,
            success: false,
            failed_group: failure.error.group().map(str::to_string),
            error: Some(failure.error.to_string()),
        }
    }

    /// Append to today's log in the stagehand logs directory
    pub fn append(&self) -> Result<PathBuf> {
        self.append_to(&Config::logs_dir())
    }

    /// Append as one JSON line to `runs-YYYY-MM-DD.jsonl` under `log_dir`
    pub fn append_to(&self, log_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create logs dir: {}", log_dir.display()))?;

        let log_date = self.timestamp.format("%Y-%m-%d").to_string();
        let log_path = log_dir.join(format!("runs-{}.jsonl", log_date));

        let line = serde_json::to_string(self).context("Failed to serialize run record")?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open run log: {}", log_path.display()))?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write run log: {}", log_path.display()))?;

        Ok(log_path)
    }
}
