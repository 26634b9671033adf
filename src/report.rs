use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::ConfigManager;
use crate::identity::ConversationIdentity;
use crate::inspect::InspectionStatus;
use crate::merge::MergeStats;
use crate::pipeline::{CombineOutcome, InspectedInput, InspectedSet};

/// Report of one combine run
///
/// Summarizes which archives took part, what the merge did to the message log
/// and what ended up in the output container.
#[derive(Debug, Serialize, Deserialize)]
pub struct CombineReport {
    /// RFC 3339 timestamp of when the report was generated
    pub timestamp: String,

    /// The conversation all merged archives belong to
    pub identity: ConversationIdentity,

    /// One line per supplied archive, including the ones left out
    pub archives: Vec<ArchiveLine>,

    /// Compatibility warnings, already rendered for display
    pub warnings: Vec<String>,

    pub stats: MergeStats,

    /// Ordinary files in the output, the message log excluded
    pub total_files: usize,

    pub folders: BTreeSet<String>,

    /// Where the combined archive was written
    pub output: String,
}

/// How a single input archive fared
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveLine {
    pub name: String,

    /// Export root inside the archive, empty for the archive root
    pub root_prefix: String,

    /// "merged" or the reason the archive was left out
    pub status: String,

    /// Messages in the archive's log, when it could be read
    pub messages: Option<usize>,
}

impl CombineReport {
    /// Build a report from an inspected set and the finished combine
    pub fn new(set: &InspectedSet, outcome: &CombineOutcome, output: &Path) -> Self {
        let archives = set
            .inputs
            .iter()
            .map(|input| match input {
                InspectedInput::Inspected(i) => ArchiveLine {
                    name: i.display_name.clone(),
                    root_prefix: i.root_prefix.clone(),
                    status: match &i.status {
                        InspectionStatus::Valid => "merged".to_string(),
                        InspectionStatus::Invalid(reason) => {
                            format!("skipped: {reason}")
                        }
                    },
                    messages: i.analysis.as_ref().map(|a| a.message_count),
                },
                InspectedInput::Failed { name, error } => ArchiveLine {
                    name: name.clone(),
                    root_prefix: String::new(),
                    status: format!("failed: {error}"),
                    messages: None,
                },
            })
            .collect();

        CombineReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            identity: outcome.compatibility.identity.clone(),
            archives,
            warnings: outcome
                .compatibility
                .warnings
                .iter()
                .map(|w| w.to_string())
                .collect(),
            stats: outcome.merge_stats,
            total_files: outcome.package.total_files,
            folders: outcome.package.folders.clone(),
            output: output.display().to_string(),
        }
    }

    /// Generate a markdown report
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Chat Export Combine Report\n\n");
        output.push_str(&format!("**Generated:** {}\n", self.timestamp));
        output.push_str(&format!(
            "**Chat:** {} (`{}`, {})\n",
            self.identity.chat_name, self.identity.chat_id, self.identity.chat_type
        ));
        output.push_str(&format!("**Output:** `{}`\n\n", self.output));

        output.push_str("## Archives\n\n");
        for (i, archive) in self.archives.iter().enumerate() {
            output.push_str(&format!("{}. `{}`: {}", i + 1, archive.name, archive.status));
            if let Some(count) = archive.messages {
                output.push_str(&format!(", {count} messages"));
            }
            if !archive.root_prefix.is_empty() {
                output.push_str(&format!(", root `{}`", archive.root_prefix));
            }
            output.push('\n');
        }
        output.push('\n');

        if !self.warnings.is_empty() {
            output.push_str("## Warnings\n\n");
            for warning in &self.warnings {
                output.push_str(&format!("- {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str("## Result\n\n");
        output.push_str(&format!(
            "- **Input messages:** {}\n",
            self.stats.total_input_messages
        ));
        output.push_str(&format!(
            "- **Unique messages:** {}\n",
            self.stats.unique_messages
        ));
        output.push_str(&format!(
            "- **Duplicates removed:** {}\n",
            self.stats.duplicates_removed
        ));
        output.push_str(&format!("- **Edits promoted:** {}\n", self.stats.edits_promoted));
        output.push_str(&format!("- **Files:** {}\n", self.total_files));
        if !self.folders.is_empty() {
            let folders: Vec<_> = self.folders.iter().map(|f| format!("`{f}`")).collect();
            output.push_str(&format!("- **Folders:** {}\n", folders.join(", ")));
        }

        output
    }

    /// Generate a JSON report
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")
    }

    /// Print a colored console summary
    pub fn print_summary(&self) {
        println!("\n{}", "=== Combine Report ===".bold().cyan());
        println!("{}: {}", "Timestamp".bold(), self.timestamp);
        println!(
            "{}: {} ({})",
            "Chat".bold(),
            self.identity.chat_name.yellow(),
            self.identity.chat_id
        );

        println!("\n{}", "Archives:".bold());
        for (i, archive) in self.archives.iter().enumerate() {
            let status = if archive.status == "merged" {
                archive.status.green()
            } else {
                archive.status.red()
            };
            println!("{}. {}: {}", (i + 1).to_string().cyan(), archive.name, status);
        }

        if !self.warnings.is_empty() {
            println!("\n{}", "Warnings:".bold());
            for warning in &self.warnings {
                println!("  {} {}", "!".yellow().bold(), warning);
            }
        }

        println!("\n{}", "Result:".bold());
        println!(
            "  Messages: {} unique of {} ({} duplicates removed)",
            self.stats.unique_messages.to_string().green(),
            self.stats.total_input_messages,
            self.stats.duplicates_removed
        );
        println!("  Files: {}", self.total_files);
        println!("  Output: {}", self.output.cyan());
        println!();
    }

    /// Save report to file
    pub fn save(&self, path: &Path, format: ReportFormat) -> Result<()> {
        let content = match format {
            ReportFormat::Json => self.to_json()?,
            ReportFormat::Markdown => self.to_markdown(),
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        println!(
            "{} {}",
            "Report saved to:".green().bold(),
            path.display().to_string().cyan()
        );

        Ok(())
    }
}

/// File formats a report can be saved in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            _ => Err(anyhow::anyhow!(
                "Unsupported format: {s} (expected json or markdown)"
            )),
        }
    }
}

/// Show the latest combine report
pub fn generate_report(format: &str, output: Option<&Path>) -> Result<()> {
    let Some(report) = load_latest_report()? else {
        println!("{}", "No combine has been recorded yet.".yellow());
        return Ok(());
    };

    if let Some(output_path) = output {
        report.save(output_path, format.parse()?)?;
    } else {
        match format.to_lowercase().as_str() {
            "json" => println!("{}", report.to_json()?),
            "markdown" | "md" => println!("{}", report.to_markdown()),
            _ => report.print_summary(),
        }
    }

    Ok(())
}

/// Load the latest combine report from the config directory
pub fn load_latest_report() -> Result<Option<CombineReport>> {
    let report_path = ConfigManager::latest_report_path()?;

    if !report_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&report_path)
        .with_context(|| format!("Failed to read report from {}", report_path.display()))?;

    let report = serde_json::from_str(&content).context("Failed to parse combine report")?;

    Ok(Some(report))
}

/// Remember a report as the latest one
pub fn save_latest_report(report: &CombineReport) -> Result<()> {
    ConfigManager::ensure_config_dir()?;
    let report_path = ConfigManager::latest_report_path()?;

    fs::write(&report_path, report.to_json()?)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    Ok(())
}
