use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;

use crate::config::ConfigManager;
use crate::VerbosityLevel;

/// Rotate the log file once it grows past this size (10MB)
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Console level implied by the command-line verbosity flags
fn level_for(verbosity: VerbosityLevel) -> LevelFilter {
    match verbosity {
        VerbosityLevel::Quiet => LevelFilter::Warn,
        VerbosityLevel::Normal => LevelFilter::Info,
        VerbosityLevel::Verbose => LevelFilter::Debug,
    }
}

/// Initialize the logging system
///
/// Console output goes to stderr so that reports printed to stdout stay clean.
/// `RUST_LOG` overrides the level implied by `--verbose`/`--quiet`:
///
/// ```bash
/// # Show every file-winner decision
/// RUST_LOG=debug chat-export-merge merge a.zip b.zip
///
/// # No console output (file logging continues)
/// RUST_LOG=off chat-export-merge merge a.zip b.zip
/// ```
///
/// A line is also appended to `chat-export-merge.log` in the config directory
/// for every run.
pub fn init_logger(verbosity: VerbosityLevel) -> Result<()> {
    ConfigManager::ensure_config_dir()?;
    rotate_log_if_needed()?;

    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or_else(|| level_for(verbosity));

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok(); // Ignore error if logger is already initialized

    log_to_file(&format!("Logger initialized with level: {level:?}"))?;

    Ok(())
}

/// Append a line to the log file only
pub fn log_to_file(message: &str) -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;

    Ok(())
}

/// Rename the log file to `.log.old` once it exceeds the size limit
pub fn rotate_log_if_needed() -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;

    let Ok(metadata) = std::fs::metadata(&log_path) else {
        return Ok(());
    };
    if metadata.len() <= MAX_LOG_SIZE {
        return Ok(());
    }

    let old_log_path = log_path.with_extension("log.old");
    if old_log_path.exists() {
        std::fs::remove_file(&old_log_path)?;
    }
    std::fs::rename(&log_path, &old_log_path)?;

    log::info!("Log file rotated to {}", old_log_path.display());
    Ok(())
}
