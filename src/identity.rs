use chrono::NaiveDateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::archive::ArchiveStore;
use crate::error::{EngineResult, MergeError};
use crate::inspect::{ArchiveInspection, InspectionStatus};
use crate::parser::MessageLog;

/// Which conversation an export belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationIdentity {
    pub chat_id: i64,
    pub chat_name: String,
    pub chat_type: String,
}

impl ConversationIdentity {
    pub fn of(log: &MessageLog) -> Self {
        ConversationIdentity {
            chat_id: log.chat_id,
            chat_name: log.chat_name.clone(),
            chat_type: log.chat_type.clone(),
        }
    }
}

/// Inclusive range of message timestamps in one archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

impl DateSpan {
    pub fn intersects(&self, other: &DateSpan) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

/// Non-fatal findings of a compatibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompatibilityWarning {
    /// Two archives cover overlapping periods, so they share messages
    OverlappingTimeRanges { first: String, second: String },
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityWarning::OverlappingTimeRanges { first, second } => write!(
                f,
                "'{first}' and '{second}' have overlapping time ranges; duplicate messages will be removed"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub identity: ConversationIdentity,
    pub warnings: Vec<CompatibilityWarning>,
}

/// Parse the message log of every inspection, in order.
///
/// Refuses archives that were not inspected as valid.
pub(crate) fn load_logs(
    inspections: &[ArchiveInspection],
    store: &ArchiveStore,
) -> EngineResult<Vec<MessageLog>> {
    inspections
        .iter()
        .map(|inspection| {
            if let InspectionStatus::Invalid(_) = inspection.status {
                return Err(MergeError::MissingLog {
                    archive: inspection.display_name.clone(),
                });
            }
            let source = store.get(&inspection.identifier, &inspection.display_name)?;
            inspection.read_message_log(source)
        })
        .collect()
}

/// Require every log to carry the same chat id as the first one
pub(crate) fn ensure_same_conversation(
    inspections: &[ArchiveInspection],
    logs: &[MessageLog],
) -> EngineResult<ConversationIdentity> {
    let (reference_log, reference) = match (logs.first(), inspections.first()) {
        (Some(log), Some(inspection)) => (log, inspection),
        _ => return Err(MergeError::NotEnoughArchives { found: 0 }),
    };

    for (log, inspection) in logs.iter().zip(inspections).skip(1) {
        if log.chat_id != reference_log.chat_id {
            return Err(MergeError::IdentityMismatch {
                expected: reference_log.chat_id,
                expected_archive: reference.display_name.clone(),
                found: log.chat_id,
                found_archive: inspection.display_name.clone(),
            });
        }
    }

    Ok(ConversationIdentity::of(reference_log))
}

/// Every unordered pair of archives whose date spans intersect
fn overlapping_pairs(
    inspections: &[ArchiveInspection],
    logs: &[MessageLog],
) -> Vec<CompatibilityWarning> {
    let spans: Vec<Option<DateSpan>> = logs
        .iter()
        .map(|log| log.date_span().map(|(first, last)| DateSpan { first, last }))
        .collect();

    let mut warnings = Vec::new();
    for i in 0..spans.len() {
        for j in (i + 1)..spans.len() {
            if let (Some(a), Some(b)) = (&spans[i], &spans[j]) {
                if a.intersects(b) {
                    warnings.push(CompatibilityWarning::OverlappingTimeRanges {
                        first: inspections[i].display_name.clone(),
                        second: inspections[j].display_name.clone(),
                    });
                }
            }
        }
    }

    warnings
}

/// Confirm that the inspected archives are exports of one conversation.
///
/// Needs at least two valid archives. A chat id mismatch refuses the whole set;
/// overlapping time ranges are only reported.
pub fn check_compatibility(
    inspections: &[ArchiveInspection],
    store: &ArchiveStore,
) -> EngineResult<CompatibilityReport> {
    if inspections.len() < 2 {
        return Err(MergeError::NotEnoughArchives {
            found: inspections.len(),
        });
    }

    let logs = load_logs(inspections, store)?;
    check_logs(inspections, &logs)
}

/// Same check over logs that were already parsed, one per inspection
pub fn check_logs(
    inspections: &[ArchiveInspection],
    logs: &[MessageLog],
) -> EngineResult<CompatibilityReport> {
    if logs.len() < 2 {
        return Err(MergeError::NotEnoughArchives { found: logs.len() });
    }

    let identity = ensure_same_conversation(inspections, logs)?;
    let warnings = overlapping_pairs(inspections, logs);

    for warning in &warnings {
        warn!("{warning}");
    }
    info!(
        "{} archives belong to chat {} ({})",
        logs.len(),
        identity.chat_id,
        identity.chat_name
    );

    Ok(CompatibilityReport { identity, warnings })
}
