use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use stagehand::cli::args::{Cli, Commands, ConfigAction, ManifestSource, OutputFormat, PresetAction};
use stagehand::cli::output;
use stagehand::common::config::{self, Config};
use stagehand::common::format;
use stagehand::presets::Preset;
use stagehand::stager::{self, Manifest, RunOptions, RunRecord, Strategy};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load()?;
    let _log_guard = init_logging(cli.verbose, &config);

    let format = resolve_format(&cli, &config);

    match cli.command {
        Commands::Stage {
            ref root,
            ref source,
            atomic,
            direct,
            dry_run,
        } => {
            let strategy = if atomic || (config.atomic && !direct) {
                Strategy::Atomic
            } else {
                Strategy::Direct
            };
            if dry_run {
                cmd_plan(&format, &config, root.clone(), source)
            } else {
                cmd_stage(&cli, &format, &config, root.clone(), source, strategy)
            }
        }

        Commands::Plan {
            ref root,
            ref source,
        } => cmd_plan(&format, &config, root.clone(), source),

        Commands::Verify {
            ref root,
            ref source,
        } => cmd_verify(&format, &config, root.clone(), source),

        Commands::Preset { ref action } => cmd_preset(&format, action),

        Commands::Config { action } => cmd_config(action),

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let shell = match shell {
                stagehand::cli::args::CompletionShell::Bash => clap_complete::Shell::Bash,
                stagehand::cli::args::CompletionShell::Zsh => clap_complete::Shell::Zsh,
                stagehand::cli::args::CompletionShell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(shell, &mut cmd, "stagehand", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Stderr logging, plus a daily log file when the config asks for one.
/// The returned guard flushes the file writer on drop.
fn init_logging(verbose: bool, config: &Config) -> Option<WorkerGuard> {
    let filter = if verbose {
        EnvFilter::new("stagehand=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = if config.log_to_file {
        let appender = tracing_appender::rolling::daily(Config::logs_dir(), "stagehand.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn resolve_format(cli: &Cli, config: &Config) -> OutputFormat {
    if cli.quiet {
        return OutputFormat::Quiet;
    }
    match &cli.format {
        Some(format) => format.clone(),
        None => match config.output_format {
            config::OutputFormat::Human => OutputFormat::Human,
            config::OutputFormat::Json => OutputFormat::Json,
            config::OutputFormat::Quiet => OutputFormat::Quiet,
        },
    }
}

/// A manifest together with the root to stage it into and a label for logs
struct Loaded {
    manifest: Manifest,
    root: PathBuf,
    origin: String,
}

fn load_manifest(source: &ManifestSource, root: Option<PathBuf>, config: &Config) -> Result<Loaded> {
    if let Some(ref path) = source.manifest {
        let manifest = Manifest::from_file(path)?;
        return Ok(Loaded {
            manifest,
            root: root.unwrap_or_else(|| config.default_root.clone()),
            origin: path.display().to_string(),
        });
    }

    if let Some(ref name) = source.preset {
        let preset = Preset::load(name)?;
        let root = root
            .or_else(|| preset.root.clone())
            .unwrap_or_else(|| config.default_root.clone());
        return Ok(Loaded {
            manifest: preset.manifest,
            root,
            origin: format!("preset:{}", preset.name),
        });
    }

    let manifest = Manifest::from_entries(source.entries.as_slice(), ".")?;
    Ok(Loaded {
        manifest,
        root: root.unwrap_or_else(|| config.default_root.clone()),
        origin: "cli".to_string(),
    })
}

// ─── Stage ────────────────────────────────────────────────────────────────────

fn cmd_stage(
    cli: &Cli,
    format: &OutputFormat,
    config: &Config,
    root: Option<PathBuf>,
    source: &ManifestSource,
    strategy: Strategy,
) -> Result<()> {
    let loaded = load_manifest(source, root, config)?;
    let options = RunOptions {
        strategy,
        show_progress: matches!(format, OutputFormat::Human),
        check_safety: true,
    };

    let result = stager::run_manifest(&loaded.manifest, &loaded.root, &options);

    if config.record_runs {
        let record = match &result {
            Ok(report) => RunRecord::success(&loaded.origin, report),
            Err(failure) => RunRecord::failure(&loaded.origin, &loaded.root, strategy, failure),
        };
        if let Err(e) = record.append() {
            tracing::warn!("could not record run: {:#}", e);
        }
    }

    let report = result.with_context(|| {
        format!("Failed to stage {} into {}", loaded.origin, loaded.root.display())
    })?;

    match format {
        OutputFormat::Human => output::print_run_report(&report, cli.verbose),
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Quiet => output::print_run_quiet(&report),
    }

    Ok(())
}

// ─── Plan ─────────────────────────────────────────────────────────────────────

fn cmd_plan(
    format: &OutputFormat,
    config: &Config,
    root: Option<PathBuf>,
    source: &ManifestSource,
) -> Result<()> {
    let loaded = load_manifest(source, root, config)?;
    let plan = stager::plan(&loaded.manifest, &loaded.root)?;

    match format {
        OutputFormat::Human => output::print_plan(&plan),
        OutputFormat::Json => output::print_json(&plan),
        OutputFormat::Quiet => println!(
            "{}  {}  {}",
            plan.items.len(),
            plan.missing_sources().count(),
            format::format_size(plan.total_bytes())
        ),
    }

    Ok(())
}

// ─── Verify ───────────────────────────────────────────────────────────────────

fn cmd_verify(
    format: &OutputFormat,
    config: &Config,
    root: Option<PathBuf>,
    source: &ManifestSource,
) -> Result<()> {
    let loaded = load_manifest(source, root, config)?;
    let report = stager::verify(&loaded.manifest, &loaded.root)?;

    match format {
        OutputFormat::Human => output::print_verify(&report),
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Quiet => println!(
            "{}  {}  {}  {}",
            report.matched.len(),
            report.missing.len(),
            report.unexpected.len(),
            report.mismatched.len()
        ),
    }

    if !report.is_clean() {
        anyhow::bail!(
            "{} does not match its manifest",
            loaded.root.display()
        );
    }
    Ok(())
}

// ─── Preset ───────────────────────────────────────────────────────────────────

fn cmd_preset(format: &OutputFormat, action: &PresetAction) -> Result<()> {
    match action {
        PresetAction::List => {
            let names = Preset::available_presets();
            match format {
                OutputFormat::Json => output::print_json(&names),
                OutputFormat::Quiet => {
                    for name in &names {
                        println!("{}", name);
                    }
                }
                OutputFormat::Human => output::print_preset_list(&names),
            }
        }
        PresetAction::Show { name } => {
            let preset = Preset::load(name)?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "name": preset.name,
                        "description": preset.description,
                        "root": preset.root,
                        "manifest": preset.manifest,
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                _ => output::print_preset(&preset),
            }
        }
    }
    Ok(())
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            let toml = toml::to_string_pretty(&config)?;
            println!();
            println!("  {} Configuration ({})", "⚙", format::format_path(&Config::config_path()).dimmed());
            println!();
            for line in toml.lines() {
                println!("  {}", line);
            }
            println!();
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("  {} Configuration reset to defaults", "✓".green());
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("  {} {} = {}", "✓".green(), key.bold(), value);
        }
        ConfigAction::Init => {
            Config::init_dirs()?;
            if !Config::config_path().exists() {
                Config::default().save()?;
            }
            println!(
                "  {} Initialized {}",
                "✓".green(),
                format::format_path(&Config::data_dir()).cyan()
            );
        }
    }
    Ok(())
}
