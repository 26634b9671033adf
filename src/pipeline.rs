use log::{info, warn};
use std::collections::HashMap;

use crate::archive::{ArchiveSource, ArchiveStore};
use crate::error::{EngineResult, MergeError};
use crate::filter::ExportLayout;
use crate::identity::{check_logs, CompatibilityReport};
use crate::inspect::{attach_analysis, inspect_all, ArchiveInspection, InspectionStatus};
use crate::merge::{merge_logs, MergeStats};
use crate::package::{combine, PackageSummary, RecencyScorer};
use crate::parser::MessageLog;

/// Per-archive outcome of the inspection stage
#[derive(Debug)]
pub enum InspectedInput {
    /// Inspected successfully, possibly as `Invalid`
    Inspected(ArchiveInspection),

    /// The archive could not be read at all
    Failed { name: String, error: MergeError },
}

/// Inspected archives together with raw access to their bytes
#[derive(Debug, Default)]
pub struct InspectedSet {
    pub inputs: Vec<InspectedInput>,
    pub store: ArchiveStore,

    /// Logs parsed during analysis, keyed by inspection identifier
    logs: HashMap<String, MessageLog>,
}

impl InspectedSet {
    /// Inspect every source; failures stay attached to their archive.
    ///
    /// Valid archives also get their analysis summary attached.
    pub fn inspect(sources: Vec<ArchiveSource>, layout: &ExportLayout) -> Self {
        let results = inspect_all(&sources, layout);
        let mut set = InspectedSet::default();

        for (source, result) in sources.into_iter().zip(results) {
            match result {
                Ok(inspection) => {
                    set.store.insert(inspection.identifier.clone(), source);
                    set.inputs.push(InspectedInput::Inspected(inspection));
                }
                Err(error) => {
                    warn!("Failed to inspect {}: {}", source.name, error);
                    set.inputs.push(InspectedInput::Failed {
                        name: source.name,
                        error,
                    });
                }
            }
        }

        for input in &mut set.inputs {
            if let InspectedInput::Inspected(inspection) = input {
                if !inspection.status.is_valid() {
                    continue;
                }
                match attach_analysis(inspection, &set.store) {
                    Ok(log) => {
                        set.logs.insert(inspection.identifier.clone(), log);
                    }
                    Err(e) => warn!("Could not analyse {}: {}", inspection.display_name, e),
                }
            }
        }

        set
    }

    /// Inspections whose status is `Valid`, in input order
    pub fn valid(&self) -> Vec<ArchiveInspection> {
        self.inputs
            .iter()
            .filter_map(|input| match input {
                InspectedInput::Inspected(i) if i.status.is_valid() => Some(i.clone()),
                _ => None,
            })
            .collect()
    }

    /// Message logs of the given inspections, in order.
    ///
    /// Logs parsed during analysis are reused; the rest are read now, so a
    /// broken log still surfaces its parse error here.
    pub fn message_logs(&self, inspections: &[ArchiveInspection]) -> EngineResult<Vec<MessageLog>> {
        inspections
            .iter()
            .map(|inspection| match self.logs.get(&inspection.identifier) {
                Some(log) => Ok(log.clone()),
                None => {
                    let source = self
                        .store
                        .get(&inspection.identifier, &inspection.display_name)?;
                    inspection.read_message_log(source)
                }
            })
            .collect()
    }

    /// Archives left out of the merge, with the reason shown to the user
    pub fn rejected(&self) -> Vec<(String, String)> {
        self.inputs
            .iter()
            .filter_map(|input| match input {
                InspectedInput::Inspected(i) => match &i.status {
                    InspectionStatus::Valid => None,
                    InspectionStatus::Invalid(reason) => {
                        Some((i.display_name.clone(), reason.clone()))
                    }
                },
                InspectedInput::Failed { name, error } => Some((name.clone(), error.to_string())),
            })
            .collect()
    }
}

/// Everything a finished combine hands back to the caller
#[derive(Debug, Clone)]
pub struct CombineOutcome {
    pub compatibility: CompatibilityReport,
    pub merge_stats: MergeStats,
    pub package: PackageSummary,

    /// The output container
    pub bytes: Vec<u8>,

    /// Suggested file name for the output container
    pub file_name: String,
}

/// Check, merge and package the valid archives of an inspected set.
///
/// Any failure aborts the whole combine; no partial container is produced.
pub fn combine_archives(
    set: &InspectedSet,
    layout: &ExportLayout,
    scorer: &dyn RecencyScorer,
) -> EngineResult<CombineOutcome> {
    let valid = set.valid();
    if valid.len() < 2 {
        return Err(MergeError::NotEnoughArchives { found: valid.len() });
    }

    let logs = set.message_logs(&valid)?;
    let compatibility = check_logs(&valid, &logs)?;
    let merged = merge_logs(&compatibility.identity, logs);
    let combined = combine(&valid, &set.store, layout, scorer, &merged.log)?;

    let file_name = output_file_name(&merged.log.chat_name);
    info!("Combined {} archives into {}", valid.len(), file_name);

    Ok(CombineOutcome {
        compatibility,
        merge_stats: merged.stats,
        package: combined.summary,
        bytes: combined.bytes,
        file_name,
    })
}

/// Name of the output container: `combined_<subject>.zip`
pub fn output_file_name(chat_name: &str) -> String {
    let subject: String = chat_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if subject.trim_matches('_').is_empty() {
        "combined_chat.zip".to_string()
    } else {
        format!("combined_{subject}.zip")
    }
}
