use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that relocates the stagehand data directory
pub const HOME_ENV: &str = "STAGEHAND_HOME";

/// Global stagehand configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Staging root used when neither `--root` nor a preset names one
    #[serde(default = "default_root")]
    pub default_root: PathBuf,

    /// Build into a work directory and swap it into place on success
    #[serde(default)]
    pub atomic: bool,

    /// Append a JSONL record for every stage run
    #[serde(default = "default_true")]
    pub record_runs: bool,

    /// Also write tracing output to a daily log file
    #[serde(default)]
    pub log_to_file: bool,

    /// Output format preference
    #[serde(default)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Quiet,
}

fn default_root() -> PathBuf {
    PathBuf::from("staging")
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_root: default_root(),
            atomic: false,
            record_runs: true,
            log_to_file: false,
            output_format: OutputFormat::Human,
        }
    }
}

impl Config {
    /// Get the stagehand data directory ($STAGEHAND_HOME or ~/.stagehand)
    pub fn data_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".stagehand")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Get the logs directory
    pub fn logs_dir() -> PathBuf {
        Self::data_dir().join("logs")
    }

    /// Get the user presets directory
    pub fn presets_dir() -> PathBuf {
        Self::data_dir().join("presets")
    }

    /// Load config from file, or fall back to defaults if it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let dir = Self::data_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        let path = Self::config_path();
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Initialize all stagehand directories
    pub fn init_dirs() -> Result<()> {
        let dirs = [Self::data_dir(), Self::logs_dir(), Self::presets_dir()];
        for dir in &dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Set a single key from its string form (used by `config set`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "default_root" => self.default_root = PathBuf::from(value),
            "atomic" => self.atomic = parse_bool(key, value)?,
            "record_runs" => self.record_runs = parse_bool(key, value)?,
            "log_to_file" => self.log_to_file = parse_bool(key, value)?,
            "output_format" => {
                self.output_format = match value {
                    "human" => OutputFormat::Human,
                    "json" => OutputFormat::Json,
                    "quiet" => OutputFormat::Quiet,
                    other => anyhow::bail!(
                        "Invalid output_format '{}'. Expected human, json, or quiet",
                        other
                    ),
                }
            }
            other => anyhow::bail!(
                "Unknown config key '{}'. Known keys: default_root, atomic, record_runs, log_to_file, output_format",
                other
            ),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => anyhow::bail!("Invalid value '{}' for {}: expected true or false", other, key),
    }
}
