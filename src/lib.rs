//! # chat-export-merge
//!
//! Combines several chat-export archives of the same conversation into one archive.
//!
//! ## Overview
//!
//! A chat export is a ZIP archive holding a structured message log (`result.json`)
//! next to the media it references. Exports taken at different times, or of different
//! date ranges, overlap and repeat each other. `chat-export-merge` finds the export
//! inside each archive (however deeply it is nested), makes sure all archives belong to
//! the same conversation, merges their message logs with deterministic deduplication
//! and writes one flat archive holding the union of everything.
//!
//! ## Pipeline
//!
//! 1. **Inspect** every archive independently ([`inspect`])
//! 2. **Check** that the valid archives share one conversation identity ([`identity`])
//! 3. **Merge** their message logs ([`merge`])
//! 4. **Package** the merged log with the reconciled media files ([`package`])
//!
//! [`pipeline`] chains the steps; once inspection is done the rest is all-or-nothing.

/// Raw archive access and in-memory ZIP writing.
///
/// Wraps the `zip` crate for listing and reading the entries of an input archive,
/// keeps the raw bytes of inspected archives available to later stages, and builds
/// the output container.
pub mod archive;

/// Platform-agnostic configuration directory management and persisted settings.
pub mod config;

/// Error taxonomy shared by all pipeline stages.
pub mod error;

/// Export layout: message-log file name and the archive paths that are never part of an export.
pub mod filter;

/// Conversation identity and compatibility checks across archives.
///
/// Refuses to merge exports of different conversations and warns when archives
/// cover overlapping time ranges.
pub mod identity;

/// Archive inspection: locating the export root inside an arbitrarily nested archive.
pub mod inspect;

/// Logging configuration and utilities.
///
/// Sets up console logging (configurable via `RUST_LOG` or `--verbose`/`--quiet`) plus
/// a persistent log file in the config directory with size-based rotation.
pub mod logger;

/// Message merge engine.
///
/// Deduplicates messages by id across all archives, keeping the first copy unless a
/// later copy carries an edit marker, and produces a log sorted by id.
pub mod merge;

/// Message-log parsing with schema-agnostic passthrough of unknown fields.
pub mod parser;

/// File reconciliation between archives and assembly of the output container.
pub mod package;

/// End-to-end orchestration of inspect, check, merge and package.
pub mod pipeline;

/// Combine report generation and formatting (JSON, Markdown, console).
pub mod report;

/// Command handlers used by the CLI binary.
pub mod handlers;

/// How much the CLI prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerbosityLevel {
    /// Only errors and the final result
    Quiet,
    /// Progress and summaries
    #[default]
    Normal,
    /// Everything, including per-archive details
    Verbose,
}

impl VerbosityLevel {
    /// Resolve the `--verbose` / `--quiet` flags; verbose wins when both are set
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            VerbosityLevel::Verbose
        } else if quiet {
            VerbosityLevel::Quiet
        } else {
            VerbosityLevel::Normal
        }
    }
}
