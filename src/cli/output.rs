use colored::*;
use serde::Serialize;

use crate::common::format::{self, format_path, format_size};
use crate::presets::Preset;
use crate::stager::{RunReport, StagePlan, VerifyReport};

fn print_header(title: &str) {
    println!();
    println!("{}", title.bold().underline());
    println!();
}

fn print_kv(key: &str, value: &str) {
    println!("  {:<13} {}", format!("{}:", key).dimmed(), value);
}

/// Print any report as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}

/// Print a successful stage run in human-readable format
pub fn print_run_report(report: &RunReport, verbose: bool) {
    println!();
    println!(
        "  {} Staged {} in {} into {}",
        "✓".green(),
        format::plural(report.artifacts.len(), "artifact").bold(),
        format::plural(report.groups.len(), "group"),
        format_path(&report.root).cyan()
    );
    println!("{}", "─".repeat(60).dimmed());

    for group in &report.groups {
        let items: Vec<_> = report
            .artifacts
            .iter()
            .filter(|a| &a.group == group)
            .collect();
        let group_bytes: u64 = items.iter().map(|a| a.size_bytes).sum();
        println!(
            "  {} {} ({})",
            "●".green(),
            group.bold(),
            format_size(group_bytes)
        );
        for item in items {
            let name = item
                .dest
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            println!(
                "    {:<40} {:>10}",
                format::elide_middle(&name, 40),
                format_size(item.size_bytes)
            );
            if verbose {
                println!("      {} {}", "↳".dimmed(), format_path(&item.source).dimmed());
            }
        }
    }

    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  {} {} in {} ({} strategy)",
        "💾",
        format_size(report.total_bytes),
        format::format_duration(report.duration_secs).cyan(),
        report.strategy
    );
    println!();
}

/// Print a minimal summary
pub fn print_run_quiet(report: &RunReport) {
    println!(
        "{}  {}  {}",
        report.artifacts.len(),
        format_size(report.total_bytes),
        report.root.display()
    );
}

/// Print a dry-run plan
pub fn print_plan(plan: &StagePlan) {
    println!();
    println!(
        "  {} Plan for {}{}",
        "ℹ️",
        format_path(&plan.root).cyan(),
        if plan.root_exists {
            " (existing contents will be removed)".dimmed().to_string()
        } else {
            " (will be created)".dimmed().to_string()
        }
    );
    println!("{}", "─".repeat(60).dimmed());

    for (index, item) in plan.items.iter().enumerate() {
        let status = if !item.source_exists {
            "missing".red().bold()
        } else if item.overwritten {
            "overwritten".yellow()
        } else {
            "ok".green()
        };
        let size = item
            .size_bytes
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>3}. {:<8} {:<30} {:>10}  {}",
            index + 1,
            item.group,
            format::elide_middle(
                &item
                    .dest
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                30
            ),
            size,
            status
        );
        println!("       {} {}", "↳".dimmed(), format_path(&item.source).dimmed());
    }

    println!("{}", "─".repeat(60).dimmed());
    if let Some(ref reason) = plan.unsafe_root {
        println!("  {} Root would be refused: {}", "⚠".yellow(), reason.yellow());
    }
    let missing = plan.missing_sources().count();
    if missing > 0 {
        println!(
            "  {} {} missing, a run would stop at the first one",
            "⚠".yellow(),
            format::plural(missing, "artifact").yellow()
        );
    }
    if plan.is_ready() {
        println!(
            "  {} Ready: {} ({})",
            "✓".green(),
            format::plural(plan.items.len(), "artifact"),
            format_size(plan.total_bytes())
        );
    }
    println!();
}

/// Print a verification report
pub fn print_verify(report: &VerifyReport) {
    println!();
    if report.is_clean() {
        println!(
            "  {} {} matches its manifest ({})",
            "✓".green(),
            format_path(&report.root).cyan(),
            format::plural(report.matched.len(), "artifact")
        );
        println!();
        return;
    }

    println!(
        "  {} {} differs from its manifest",
        "✗".red(),
        format_path(&report.root).cyan()
    );
    let sections = [
        ("Missing", &report.missing),
        ("Unexpected", &report.unexpected),
        ("Content differs", &report.mismatched),
    ];
    for (label, paths) in sections {
        if paths.is_empty() {
            continue;
        }
        println!();
        println!("  {} {} ({})", "●".yellow(), label.yellow().bold(), paths.len());
        for path in paths {
            println!("    {} {}", "→".dimmed(), path.display());
        }
    }
    if !report.errors.is_empty() {
        println!();
        println!("  {} {} errors:", "⚠".yellow(), report.errors.len());
        for error in &report.errors {
            println!("    {} {}", "→".dimmed(), error.dimmed());
        }
    }
    println!();
}

/// Print the list of presets
pub fn print_preset_list(names: &[String]) {
    print_header("Presets");
    for name in names {
        match Preset::load(name) {
            Ok(preset) => println!(
                "  {:<16} {}",
                name.bold(),
                preset.description.dimmed()
            ),
            Err(e) => println!("  {:<16} {}", name.bold(), e.to_string().red()),
        }
    }
    println!();
}

/// Print a preset's details and placements
pub fn print_preset(preset: &Preset) {
    print_header(&format!("Preset: {}", preset.name));
    if !preset.description.is_empty() {
        print_kv("Description", &preset.description);
    }
    if let Some(ref root) = preset.root {
        print_kv("Root", &root.display().to_string());
    }
    print_kv(
        "Sources from",
        &format_path(&preset.manifest.source_base()),
    );
    println!();
    for entry in &preset.manifest.artifacts {
        let name = entry
            .name
            .clone()
            .or_else(|| {
                entry
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_default();
        println!(
            "    {} {}/{}  {} {}",
            "•".dimmed(),
            entry.group.bold(),
            name,
            "←".dimmed(),
            entry.source.display().to_string().dimmed()
        );
    }
    println!();
}
