//! Inspect and check command handlers
//!
//! Show what each archive contains and whether a set of archives can be merged.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::archive::{collect_archive_paths, ArchiveSource};
use crate::config::MergeConfig;
use crate::identity::check_compatibility;
use crate::inspect::{ArchiveInspection, InspectionStatus};
use crate::pipeline::{InspectedInput, InspectedSet};
use crate::VerbosityLevel;

/// Maximum number of top-level items to display per archive
const MAX_TOP_LEVEL_TO_DISPLAY: usize = 20;

/// Read every archive named on the command line.
///
/// Unreadable files are reported as failed inputs instead of aborting.
pub(crate) fn load_inputs(paths: &[PathBuf], config: &MergeConfig) -> Result<InspectedSet> {
    let archive_paths = collect_archive_paths(paths);
    if archive_paths.is_empty() {
        anyhow::bail!("No archives found in the given paths");
    }

    let mut sources = Vec::new();
    let mut unreadable = Vec::new();
    for path in &archive_paths {
        match ArchiveSource::from_file(path) {
            Ok(source) => sources.push(source),
            Err(error) => {
                log::warn!("Failed to read {}: {}", path.display(), error);
                unreadable.push(InspectedInput::Failed {
                    name: path.display().to_string(),
                    error,
                });
            }
        }
    }

    let mut set = InspectedSet::inspect(sources, &config.layout());
    set.inputs.extend(unreadable);
    Ok(set)
}

fn print_inspection(inspection: &ArchiveInspection, verbosity: VerbosityLevel) {
    println!("\n{}", inspection.display_name.bold());

    match &inspection.status {
        InspectionStatus::Valid => println!("   {} {}", "Status:".dimmed(), "valid".green()),
        InspectionStatus::Invalid(reason) => {
            println!("   {} {}", "Status:".dimmed(), reason.red());
            return;
        }
    }

    let root = if inspection.root_prefix.is_empty() {
        "(archive root)".to_string()
    } else {
        inspection.root_prefix.clone()
    };
    println!("   {} {}", "Root:".dimmed(), root);
    println!("   {} {}", "Files:".dimmed(), inspection.entries.len());

    if let Some(analysis) = &inspection.analysis {
        println!("   {} {}", "Messages:".dimmed(), analysis.message_count);
        if let (Some(first), Some(last)) = (analysis.first_date, analysis.last_date) {
            println!(
                "   {} {} to {}",
                "Period:".dimmed(),
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            );
        }
    }

    if verbosity == VerbosityLevel::Quiet {
        return;
    }

    let limit = if verbosity == VerbosityLevel::Verbose {
        usize::MAX
    } else {
        MAX_TOP_LEVEL_TO_DISPLAY
    };

    for item in inspection.top_level.iter().take(limit) {
        if item.is_directory {
            println!("     {}/ ({} files)", item.name.cyan(), item.child_count);
        } else {
            println!("     {} ({} bytes)", item.name, item.size);
        }
    }

    if inspection.top_level.len() > limit {
        println!(
            "     {} and {} more",
            "...".dimmed(),
            inspection.top_level.len() - limit
        );
    }
}

fn print_inputs(set: &InspectedSet, verbosity: VerbosityLevel) {
    for input in &set.inputs {
        match input {
            InspectedInput::Inspected(inspection) => print_inspection(inspection, verbosity),
            InspectedInput::Failed { name, error } => {
                println!("\n{}", name.bold());
                println!("   {} {}", "Error:".dimmed(), error.to_string().red());
            }
        }
    }
}

/// Handle inspect command
pub fn handle_inspect(paths: &[PathBuf], verbosity: VerbosityLevel) -> Result<()> {
    let config = MergeConfig::load().context("Failed to load configuration")?;
    let set = load_inputs(paths, &config)?;

    println!("{}", "Archive Inspection".cyan().bold());
    println!("{}", "=".repeat(80).cyan());
    print_inputs(&set, verbosity);
    println!();

    Ok(())
}

/// Handle check command
pub fn handle_check(paths: &[PathBuf], verbosity: VerbosityLevel) -> Result<()> {
    let config = MergeConfig::load().context("Failed to load configuration")?;
    let set = load_inputs(paths, &config)?;

    if verbosity != VerbosityLevel::Quiet {
        print_inputs(&set, verbosity);
        println!();
    }

    for (name, reason) in set.rejected() {
        println!("{} {}: {}", "Skipping".yellow(), name, reason);
    }

    let report = check_compatibility(&set.valid(), &set.store)?;

    println!(
        "{} All archives belong to {} ({}, id {})",
        "✓".green(),
        report.identity.chat_name.bold(),
        report.identity.chat_type,
        report.identity.chat_id
    );
    for warning in &report.warnings {
        println!("  {} {}", "!".yellow().bold(), warning);
    }

    Ok(())
}
