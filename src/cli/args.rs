use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// stagehand: rebuild a build-output staging directory from a manifest
#[derive(Parser, Debug)]
#[command(
    name = "stagehand",
    version,
    about = "Rebuild a build-output staging directory from an artifact manifest",
    long_about = "stagehand clears (or creates) a staging root and copies pre-built artifacts\n\
                   into named group folders, failing fast with the offending entry named.",
    after_help = "EXAMPLES:\n  \
        stagehand stage --preset socket                    Rebuild Socket_build/{Client,Server}\n  \
        stagehand stage --root dist --manifest stage.toml  Stage from a manifest file\n  \
        stagehand stage --root dist --entry Client=bin/app.exe --atomic\n  \
        stagehand plan --preset socket                     Preview without touching disk\n  \
        stagehand verify --preset socket                   Check the staged tree\n  \
        stagehand preset list                              Show available presets"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (defaults to the configured output_format)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode, minimal output
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// Where the placements come from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ManifestSource {
    /// Manifest file (TOML, or JSON with a .json extension)
    #[arg(long, short, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Named preset (built-in or from the presets directory)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Inline placement, repeatable
    #[arg(long = "entry", short, value_name = "GROUP[/NAME]=SOURCE")]
    pub entries: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reset the staging root and copy every artifact into place
    Stage {
        /// Staging root (defaults to the preset's root, then the configured default)
        #[arg(long, short, value_name = "DIR")]
        root: Option<PathBuf>,

        #[command(flatten)]
        source: ManifestSource,

        /// Build in a work directory and swap it in only if every copy succeeds
        #[arg(long, conflicts_with = "direct")]
        atomic: bool,

        /// Reset the root in place even if the config enables atomic staging
        #[arg(long)]
        direct: bool,

        /// Simulate: show what would be staged
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what a stage run would do without touching the filesystem
    Plan {
        #[arg(long, short, value_name = "DIR")]
        root: Option<PathBuf>,

        #[command(flatten)]
        source: ManifestSource,
    },

    /// Compare a staged tree against its manifest
    Verify {
        #[arg(long, short, value_name = "DIR")]
        root: Option<PathBuf>,

        #[command(flatten)]
        source: ManifestSource,
    },

    /// Inspect presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PresetAction {
    /// List available presets
    List,

    /// Show the placements of a preset
    Show {
        /// Preset name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset to default configuration
    Reset,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Initialize stagehand directories and default config
    Init,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
