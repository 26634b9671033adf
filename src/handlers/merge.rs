//! Merge command handler
//!
//! Runs the full combine and writes the output archive plus its report.

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::Confirm;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;
use crate::handlers::inspect::load_inputs;
use crate::pipeline::combine_archives;
use crate::report::{save_latest_report, CombineReport, ReportFormat};
use crate::VerbosityLevel;

/// Options of the merge command
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Output file; defaults to `combined_<chat>.zip` in the configured output directory
    pub output: Option<PathBuf>,

    /// Overwrite an existing output file without asking
    pub force: bool,

    /// Also write the report to this file
    pub report: Option<PathBuf>,

    /// Format of the report file: json or markdown
    pub format: String,
}

fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

/// Decide whether an existing file may be overwritten
fn confirm_overwrite(path: &Path, force: bool) -> Result<bool> {
    if force || !path.exists() {
        return Ok(true);
    }

    if !is_interactive() {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Confirm::new(&format!("{} already exists. Overwrite it?", path.display()))
        .with_default(false)
        .prompt()
        .context("Failed to get confirmation")
}

/// Handle merge command
pub fn handle_merge(paths: &[PathBuf], options: &MergeOptions, verbosity: VerbosityLevel) -> Result<()> {
    let report_format: Option<ReportFormat> = match &options.report {
        Some(_) => Some(options.format.parse()?),
        None => None,
    };

    let config = MergeConfig::load().context("Failed to load configuration")?;
    let layout = config.layout();

    if verbosity != VerbosityLevel::Quiet {
        println!("{}", "Inspecting archives...".cyan());
    }
    let set = load_inputs(paths, &config)?;

    for (name, reason) in set.rejected() {
        println!("  {} {}: {}", "Skipping".yellow(), name, reason);
    }

    if verbosity != VerbosityLevel::Quiet {
        println!("{}", "Merging...".cyan());
    }
    let scorer = config.recency.scorer();
    let outcome = combine_archives(&set, &layout, scorer.as_ref())
        .context("Combine aborted, no output was written")?;

    let output = match &options.output {
        Some(path) => path.clone(),
        None => config
            .output_dir
            .clone()
            .unwrap_or_default()
            .join(&outcome.file_name),
    };

    if !confirm_overwrite(&output, options.force)? {
        println!("{}", "Merge cancelled, nothing written.".yellow());
        return Ok(());
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&output, &outcome.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let report = CombineReport::new(&set, &outcome, &output);
    if let Err(e) = save_latest_report(&report) {
        log::warn!("Could not save the combine report: {e:#}");
    }
    if let (Some(report_path), Some(format)) = (&options.report, report_format) {
        report.save(report_path, format)?;
    }

    match verbosity {
        VerbosityLevel::Quiet => println!("{}", output.display()),
        _ => report.print_summary(),
    }

    Ok(())
}
