use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::archive::ArchiveStore;
use crate::error::EngineResult;
use crate::identity::{ensure_same_conversation, load_logs, ConversationIdentity};
use crate::inspect::ArchiveInspection;
use crate::parser::{MessageLog, MessageRecord};

/// The combined message log of one conversation, sorted by message id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedLog {
    #[serde(rename = "name")]
    pub chat_name: String,

    #[serde(rename = "type")]
    pub chat_type: String,

    #[serde(rename = "id")]
    pub chat_id: i64,

    pub messages: Vec<MessageRecord>,
}

impl MergedLog {
    pub fn identity(&self) -> ConversationIdentity {
        ConversationIdentity {
            chat_id: self.chat_id,
            chat_name: self.chat_name.clone(),
            chat_type: self.chat_type.clone(),
        }
    }

    /// Serialize for the message-log slot of the output container
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

/// Statistics about a merge operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Messages across all inputs, before deduplication
    pub total_input_messages: usize,

    /// Messages in the merged log
    pub unique_messages: usize,

    /// Number of duplicate messages dropped
    pub duplicates_removed: usize,

    /// Times an edited copy replaced an unedited one
    pub edits_promoted: usize,
}

/// Result of merging message logs
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub log: MergedLog,
    pub stats: MergeStats,
}

/// Deduplicates messages across logs by id.
///
/// The first copy of an id is kept unless a later copy carries an edit marker and
/// the kept one does not. Feed logs in the order the archives were supplied.
#[derive(Debug, Default)]
pub struct MessageMerger {
    kept: BTreeMap<i64, MessageRecord>,
    stats: MergeStats,
}

impl MessageMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every message of one log
    pub fn ingest(&mut self, messages: impl IntoIterator<Item = MessageRecord>) {
        for message in messages {
            self.stats.total_input_messages += 1;
            self.offer(message);
        }
    }

    fn offer(&mut self, message: MessageRecord) {
        match self.kept.entry(message.id()) {
            Entry::Vacant(slot) => {
                slot.insert(message);
            }
            Entry::Occupied(mut slot) => {
                if message.is_edited() && !slot.get().is_edited() {
                    debug!("Message {} replaced by its edited copy", message.id());
                    self.stats.edits_promoted += 1;
                    slot.insert(message);
                }
            }
        }
    }

    /// Kept messages in ascending id order, plus final statistics
    pub fn finish(self) -> (Vec<MessageRecord>, MergeStats) {
        let mut stats = self.stats;
        let messages: Vec<MessageRecord> = self.kept.into_values().collect();

        stats.unique_messages = messages.len();
        stats.duplicates_removed = stats
            .total_input_messages
            .saturating_sub(stats.unique_messages);

        (messages, stats)
    }
}

/// Merge already parsed logs of one conversation.
///
/// Identity fields come from the first log; callers check that all logs agree.
pub fn merge_logs(identity: &ConversationIdentity, logs: Vec<MessageLog>) -> MergeOutcome {
    let mut merger = MessageMerger::new();
    for log in logs {
        merger.ingest(log.messages);
    }

    let (messages, stats) = merger.finish();
    info!(
        "Merged {} messages into {} ({} duplicates, {} edits promoted)",
        stats.total_input_messages,
        stats.unique_messages,
        stats.duplicates_removed,
        stats.edits_promoted
    );

    MergeOutcome {
        log: MergedLog {
            chat_name: identity.chat_name.clone(),
            chat_type: identity.chat_type.clone(),
            chat_id: identity.chat_id,
            messages,
        },
        stats,
    }
}

/// Merge the message logs of the given archives into one log.
///
/// A log that cannot be parsed, or a chat id that differs from the first
/// archive's, aborts the merge.
pub fn merge_archives(
    inspections: &[ArchiveInspection],
    store: &ArchiveStore,
) -> EngineResult<MergeOutcome> {
    let logs = load_logs(inspections, store)?;
    let identity = ensure_same_conversation(inspections, &logs)?;

    Ok(merge_logs(&identity, logs))
}
