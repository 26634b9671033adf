//! Configuration command handlers
//!
//! Shows and updates the persisted settings in `config.toml`.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{ConfigManager, MergeConfig};
use crate::package::RecencyStrategy;

/// Requested changes to the configuration; `None` leaves a value untouched
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub message_log_file_name: Option<String>,
    pub recency: Option<RecencyStrategy>,
    pub exclude_patterns: Option<String>,
    pub metadata_dirs: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.message_log_file_name.is_none()
            && self.recency.is_none()
            && self.exclude_patterns.is_none()
            && self.metadata_dirs.is_none()
            && self.output_dir.is_none()
    }

    /// Apply the changes, returning one line per changed setting.
    ///
    /// Nothing is changed when the result would not be a valid configuration.
    pub fn apply(self, config: &mut MergeConfig) -> Result<Vec<String>> {
        let mut updated = config.clone();
        let mut changes = Vec::new();

        if let Some(name) = self.message_log_file_name {
            changes.push(format!("Set message log file name to {name}"));
            updated.message_log_file_name = name;
        }

        if let Some(recency) = self.recency {
            changes.push(format!("Set recency strategy to {recency}"));
            updated.recency = recency;
        }

        if let Some(patterns) = self.exclude_patterns {
            updated.exclude_patterns = split_list(&patterns);
            changes.push(format!("Set exclude patterns: {:?}", updated.exclude_patterns));
        }

        if let Some(dirs) = self.metadata_dirs {
            updated.metadata_dirs = split_list(&dirs);
            changes.push(format!("Set metadata directories: {:?}", updated.metadata_dirs));
        }

        if let Some(dir) = self.output_dir {
            changes.push(format!("Set output directory to {}", dir.display()));
            updated.output_dir = Some(dir);
        }

        updated.validate()?;
        *config = updated;
        Ok(changes)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Update the configuration
pub fn handle_config_update(update: ConfigUpdate) -> Result<()> {
    let mut config = MergeConfig::load().context("Failed to load configuration")?;

    for change in update.apply(&mut config)? {
        println!("{}", change.green());
    }

    config.save().context("Failed to save configuration")?;
    println!("{}", "Configuration saved successfully!".green().bold());

    Ok(())
}

/// Show the current configuration
pub fn handle_config_show() -> Result<()> {
    let config = MergeConfig::load().context("Failed to load configuration")?;

    println!("{}", "Current Configuration:".bold());
    println!(
        "  {}: {}",
        "Config file".cyan(),
        ConfigManager::config_file_path()?.display()
    );
    println!(
        "  {}: {}",
        "Message log file".cyan(),
        config.message_log_file_name
    );
    println!("  {}: {}", "Recency strategy".cyan(), config.recency);
    println!(
        "  {}: {}",
        "Metadata directories".cyan(),
        if config.metadata_dirs.is_empty() {
            "None".to_string()
        } else {
            config.metadata_dirs.join(", ")
        }
    );
    println!(
        "  {}: {}",
        "Exclude patterns".cyan(),
        if config.exclude_patterns.is_empty() {
            "None".to_string()
        } else {
            config.exclude_patterns.join(", ")
        }
    );
    println!(
        "  {}: {}",
        "Output directory".cyan(),
        config
            .output_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "Current directory".to_string())
    );

    Ok(())
}
