use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::thread;

use crate::archive::{ArchiveSource, ArchiveStore, RawEntry};
use crate::error::{EngineResult, MergeError};
use crate::filter::ExportLayout;
use crate::parser::MessageLog;

/// Whether an inspected archive can take part in a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum InspectionStatus {
    Valid,
    Invalid(String),
}

impl InspectionStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, InspectionStatus::Valid)
    }
}

/// One item at the top of an export's root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopLevelItem {
    pub name: String,
    pub is_directory: bool,

    /// Uncompressed size for files, always 0 for directories
    pub size: u64,

    /// Number of files below a directory, always 0 for files
    pub child_count: usize,
}

/// Display-only facts about a valid archive's message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub message_count: usize,
    pub first_date: Option<NaiveDateTime>,
    pub last_date: Option<NaiveDateTime>,
}

/// Result of inspecting one input archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveInspection {
    /// Unique id assigned at inspection time
    pub identifier: String,

    /// Name the archive was supplied under
    pub display_name: String,

    /// Prefix under which the export root was found, empty or ending in `/`
    pub root_prefix: String,

    /// Raw path of the message log, not root-adjusted
    pub message_log_path: Option<String>,

    /// Root-relative file paths, directories excluded
    pub entries: Vec<String>,

    /// Directories first, then files, each group sorted by name
    pub top_level: Vec<TopLevelItem>,

    pub status: InspectionStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisSummary>,
}

impl ArchiveInspection {
    /// Strip the root prefix from a raw archive path.
    ///
    /// Returns `None` for paths outside the root and for the root itself.
    pub fn relative_path<'p>(&self, raw: &'p str) -> Option<&'p str> {
        let rel = raw.strip_prefix(self.root_prefix.as_str())?;
        (!rel.is_empty()).then_some(rel)
    }

    /// Root-relative location of the message log
    pub fn relative_log_path(&self) -> Option<&str> {
        self.message_log_path
            .as_deref()
            .and_then(|p| self.relative_path(p))
    }

    /// Parse this archive's message log from its raw source
    pub fn read_message_log(&self, source: &ArchiveSource) -> EngineResult<MessageLog> {
        let log_path = match (&self.status, &self.message_log_path) {
            (InspectionStatus::Valid, Some(path)) => path,
            _ => {
                return Err(MergeError::MissingLog {
                    archive: self.display_name.clone(),
                })
            }
        };

        let mut zip = source.open()?;
        let bytes = source.read_entry(&mut zip, log_path)?;

        MessageLog::from_slice(&bytes).map_err(|e| MergeError::log_parse(&self.display_name, e))
    }
}

/// Inspect one archive: find its export root, list its entries and summarize the top level
pub fn inspect_archive(
    source: &ArchiveSource,
    layout: &ExportLayout,
) -> EngineResult<ArchiveInspection> {
    let raw_entries = source.list_entries()?;
    let entries: Vec<&RawEntry> = raw_entries
        .iter()
        .filter(|e| layout.should_include(&e.path))
        .collect();

    let mut inspection = ArchiveInspection {
        identifier: uuid::Uuid::new_v4().to_string(),
        display_name: source.name.clone(),
        root_prefix: String::new(),
        message_log_path: None,
        entries: Vec::new(),
        top_level: Vec::new(),
        status: InspectionStatus::Valid,
        analysis: None,
    };

    // First match wins when an archive holds several logs
    let Some(log_entry) = entries
        .iter()
        .find(|e| !e.is_dir && layout.is_message_log(&e.path))
    else {
        warn!("No message log found in {}", source.name);
        inspection.status = InspectionStatus::Invalid("no message log found".to_string());
        return Ok(inspection);
    };

    if let Some(idx) = log_entry.path.rfind('/') {
        inspection.root_prefix = log_entry.path[..=idx].to_string();
    }
    inspection.message_log_path = Some(log_entry.path.clone());
    debug!(
        "Export root of {} is '{}'",
        source.name, inspection.root_prefix
    );

    let mut children: HashMap<&str, usize> = HashMap::new();
    let mut relative: Vec<(&str, &RawEntry)> = Vec::new();

    for &entry in &entries {
        let Some(rel) = inspection.relative_path(&entry.path) else {
            continue;
        };
        relative.push((rel, entry));

        if entry.is_dir {
            continue;
        }
        inspection.entries.push(rel.to_string());
        if let Some((segment, _)) = rel.split_once('/') {
            *children.entry(segment).or_default() += 1;
        }
    }

    let mut seen = HashSet::new();
    for (rel, entry) in relative {
        let (name, is_directory) = match rel.split_once('/') {
            Some((segment, _)) => (segment, true),
            None => (rel, entry.is_dir),
        };

        // First occurrence decides whether a name is a file or a directory
        if !seen.insert(name) {
            continue;
        }

        inspection.top_level.push(if is_directory {
            TopLevelItem {
                name: name.to_string(),
                is_directory: true,
                size: 0,
                child_count: children.get(name).copied().unwrap_or(0),
            }
        } else {
            TopLevelItem {
                name: name.to_string(),
                is_directory: false,
                size: entry.size,
                child_count: 0,
            }
        });
    }

    inspection.top_level.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.cmp(&b.name))
    });

    info!(
        "Inspected {}: {} entries under '{}'",
        source.name,
        inspection.entries.len(),
        inspection.root_prefix
    );

    Ok(inspection)
}

/// Inspect every source concurrently, one result per source in input order.
///
/// A failure only affects its own archive.
pub fn inspect_all(
    sources: &[ArchiveSource],
    layout: &ExportLayout,
) -> Vec<EngineResult<ArchiveInspection>> {
    thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| scope.spawn(move || inspect_archive(source, layout)))
            .collect();

        handles
            .into_iter()
            .zip(sources)
            .map(|(handle, source)| {
                handle.join().unwrap_or_else(|_| {
                    Err(MergeError::Io {
                        archive: source.name.clone(),
                        source: std::io::Error::other("inspection thread panicked"),
                    })
                })
            })
            .collect()
    })
}

/// Attach message count and date span to a valid inspection.
///
/// Hands back the parsed log so later stages need not read it again.
pub fn attach_analysis(
    inspection: &mut ArchiveInspection,
    store: &ArchiveStore,
) -> EngineResult<MessageLog> {
    let source = store.get(&inspection.identifier, &inspection.display_name)?;
    let log = inspection.read_message_log(source)?;
    let span = log.date_span();

    inspection.analysis = Some(AnalysisSummary {
        message_count: log.message_count(),
        first_date: span.map(|(first, _)| first),
        last_date: span.map(|(_, last)| last),
    });

    Ok(log)
}
