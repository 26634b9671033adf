use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::archive::{ArchiveSource, ArchiveStore, ZipBuilder};
use crate::error::{EngineResult, MergeError};
use crate::filter::ExportLayout;
use crate::inspect::ArchiveInspection;
use crate::merge::MergedLog;

/// A same-path file candidate offered to a [`RecencyScorer`]
#[derive(Debug, Clone, Copy)]
pub struct FileCandidate<'a> {
    /// Position of the source archive in the input order
    pub archive_index: usize,
    pub relative_path: &'a str,

    /// Stored modification time, `YYYYMMDDhhmmss` packed into an integer
    pub modified: Option<i64>,
}

/// Ranks same-path files from different archives. A later candidate only
/// replaces the current winner when its score is strictly higher.
pub trait RecencyScorer {
    fn score(&self, candidate: &FileCandidate<'_>) -> i64;
}

/// Placeholder ranking: every copy scores the same, so the first archive wins
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSeenScorer;

impl RecencyScorer for FirstSeenScorer {
    fn score(&self, _candidate: &FileCandidate<'_>) -> i64 {
        0
    }
}

/// Ranks by the modification time stored in the archive entry
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedTimeScorer;

impl RecencyScorer for ModifiedTimeScorer {
    fn score(&self, candidate: &FileCandidate<'_>) -> i64 {
        candidate.modified.unwrap_or(i64::MIN)
    }
}

/// Configurable choice of [`RecencyScorer`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecencyStrategy {
    #[default]
    FirstSeen,
    ModifiedTime,
}

impl RecencyStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            RecencyStrategy::FirstSeen => "first-seen",
            RecencyStrategy::ModifiedTime => "modified-time",
        }
    }

    pub fn scorer(&self) -> Box<dyn RecencyScorer + Send + Sync> {
        match self {
            RecencyStrategy::FirstSeen => Box::new(FirstSeenScorer),
            RecencyStrategy::ModifiedTime => Box::new(ModifiedTimeScorer),
        }
    }
}

impl fmt::Display for RecencyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecencyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-seen" => Ok(RecencyStrategy::FirstSeen),
            "modified-time" => Ok(RecencyStrategy::ModifiedTime),
            other => Err(format!(
                "unknown recency strategy '{other}' (expected first-seen or modified-time)"
            )),
        }
    }
}

/// Winning copy of one root-relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWinner {
    pub archive_index: usize,

    /// Central-directory index of the winning entry
    pub entry_index: usize,
    pub score: i64,
}

/// Root-relative path to winning copy, built during reconciliation only
#[derive(Debug, Default)]
pub struct FileWinnerTable {
    winners: BTreeMap<String, FileWinner>,
}

impl FileWinnerTable {
    /// Offer a copy; returns true when it became the winner for its path
    pub fn offer(&mut self, relative_path: &str, candidate: FileWinner) -> bool {
        match self.winners.get_mut(relative_path) {
            None => {
                self.winners.insert(relative_path.to_string(), candidate);
                true
            }
            Some(current) if candidate.score > current.score => {
                *current = candidate;
                true
            }
            Some(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn get(&self, relative_path: &str) -> Option<&FileWinner> {
        self.winners.get(relative_path)
    }

    /// Winners in lexicographic path order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileWinner)> {
        self.winners.iter()
    }
}

/// What the packager wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    /// Ordinary files written, the message log not included
    pub total_files: usize,

    /// Whether the merged message log was written
    pub message_log_written: bool,

    /// Top-level folders among the written files
    pub folders: BTreeSet<String>,
}

/// The finished output container
#[derive(Debug, Clone)]
pub struct CombinedArchive {
    pub bytes: Vec<u8>,
    pub summary: PackageSummary,
}

fn packed_time(dt: zip::DateTime) -> i64 {
    let parts = [
        (i64::from(dt.year()), 1),
        (i64::from(dt.month()), 100),
        (i64::from(dt.day()), 100),
        (i64::from(dt.hour()), 100),
        (i64::from(dt.minute()), 100),
        (i64::from(dt.second()), 100),
    ];
    parts.iter().fold(0, |acc, (value, scale)| acc * scale + value)
}

/// Pick one winning copy for every non-log path across all archives
pub fn reconcile_files(
    inspections: &[ArchiveInspection],
    store: &ArchiveStore,
    layout: &ExportLayout,
    scorer: &dyn RecencyScorer,
) -> EngineResult<FileWinnerTable> {
    let mut table = FileWinnerTable::default();

    for (archive_index, inspection) in inspections.iter().enumerate() {
        let source = store.get(&inspection.identifier, &inspection.display_name)?;
        let mut zip = source.open()?;

        for i in 0..zip.len() {
            let file = zip.by_index_raw(i).map_err(|e| MergeError::Decode {
                archive: source.name.clone(),
                source: e,
            })?;

            if file.is_dir() || !layout.should_include(file.name()) {
                continue;
            }
            let Some(relative) = inspection.relative_path(file.name()) else {
                continue;
            };
            // Replaced wholesale by the merged log
            if relative == layout.message_log {
                continue;
            }

            let candidate = FileCandidate {
                archive_index,
                relative_path: relative,
                modified: file.last_modified().map(packed_time),
            };
            let winner = FileWinner {
                archive_index,
                entry_index: i,
                score: scorer.score(&candidate),
            };

            if table.offer(relative, winner) {
                debug!("{} taken from {}", relative, source.name);
            }
        }
    }

    Ok(table)
}

/// Write the merged log and every winning file into one flat-rooted container
pub fn package(
    inspections: &[ArchiveInspection],
    store: &ArchiveStore,
    layout: &ExportLayout,
    table: &FileWinnerTable,
    merged: &MergedLog,
) -> EngineResult<CombinedArchive> {
    let mut builder = ZipBuilder::new();
    let mut summary = PackageSummary::default();

    let log_bytes = merged.to_json_bytes().map_err(|e| MergeError::Package {
        source: std::io::Error::other(e).into(),
    })?;
    builder.add_file(&layout.message_log, &log_bytes)?;
    summary.message_log_written = true;

    let mut opened = Vec::with_capacity(inspections.len());
    for inspection in inspections {
        let source: &ArchiveSource = store.get(&inspection.identifier, &inspection.display_name)?;
        opened.push((source, source.open()?));
    }

    for (relative, winner) in table.iter() {
        let (source, zip) = opened
            .get_mut(winner.archive_index)
            .ok_or_else(|| MergeError::MissingSource {
                archive: format!("#{}", winner.archive_index),
            })?;
        let contents = source.read_entry_at(zip, winner.entry_index)?;
        builder.add_file(relative, &contents)?;

        summary.total_files += 1;
        if let Some((folder, _)) = relative.split_once('/') {
            summary.folders.insert(folder.to_string());
        }
    }

    let bytes = builder.finish()?;
    info!(
        "Packaged {} files in {} folders ({} bytes)",
        summary.total_files,
        summary.folders.len(),
        bytes.len()
    );

    Ok(CombinedArchive { bytes, summary })
}

/// Reconcile files across archives and package them with the merged log
pub fn combine(
    inspections: &[ArchiveInspection],
    store: &ArchiveStore,
    layout: &ExportLayout,
    scorer: &dyn RecencyScorer,
    merged: &MergedLog,
) -> EngineResult<CombinedArchive> {
    let table = reconcile_files(inspections, store, layout, scorer)?;
    package(inspections, store, layout, &table, merged)
}
