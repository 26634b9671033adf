use chat_export_merge::identity::ConversationIdentity;
use chat_export_merge::merge::{merge_logs, MessageMerger};
use chat_export_merge::parser::{MessageLog, MessageRecord};
use rstest::rstest;
use serde_json::json;

/// Helper to create a message log from (id, edited) pairs
fn create_log(messages: &[(i64, bool)]) -> MessageLog {
    MessageLog {
        chat_id: 1,
        chat_name: "Test".to_string(),
        chat_type: "personal_chat".to_string(),
        messages: messages
            .iter()
            .map(|&(id, edited)| {
                let value = if edited {
                    json!({"id": id, "edited": "2025-01-01T00:00:00", "text": format!("Message {id} (edited)")})
                } else {
                    json!({"id": id, "text": format!("Message {id}")})
                };
                MessageRecord::try_from(value).unwrap()
            })
            .collect(),
    }
}

fn identity() -> ConversationIdentity {
    ConversationIdentity {
        chat_id: 1,
        chat_name: "Test".to_string(),
        chat_type: "personal_chat".to_string(),
    }
}

#[rstest]
#[case::disjoint(vec![vec![(1, false), (2, false)], vec![(3, false), (4, false)]])]
#[case::overlapping(vec![vec![(1, false), (2, false), (3, false)], vec![(2, false), (3, true), (4, false)]])]
#[case::reversed(vec![vec![(9, false), (5, false), (1, false)], vec![(8, true), (2, false)]])]
#[case::three_archives(vec![vec![(1, false)], vec![(1, true), (2, false)], vec![(2, true), (1, false), (3, false)]])]
#[case::repeats_within_log(vec![vec![(4, false), (4, true), (4, false)]])]
fn test_merged_ids_unique_and_sorted(#[case] logs: Vec<Vec<(i64, bool)>>) {
    let logs: Vec<_> = logs.iter().map(|m| create_log(m)).collect();
    let total: usize = logs.iter().map(|l| l.message_count()).sum();

    let outcome = merge_logs(&identity(), logs);
    let ids: Vec<_> = outcome.log.messages.iter().map(|m| m.id()).collect();

    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not strictly ascending: {ids:?}");
    assert_eq!(outcome.stats.total_input_messages, total);
    assert_eq!(
        outcome.stats.duplicates_removed,
        total - outcome.stats.unique_messages
    );
}

#[test]
fn test_merging_a_set_with_itself() {
    let a = [(1, false), (2, true), (3, false)];
    let b = [(3, false), (4, false)];

    let once = merge_logs(&identity(), vec![create_log(&a), create_log(&b)]);
    let twice = merge_logs(
        &identity(),
        vec![create_log(&a), create_log(&b), create_log(&a), create_log(&b)],
    );

    // a and b share id 3, so the single merge already drops one copy
    assert_eq!(once.stats.duplicates_removed, 1);
    assert_eq!(twice.stats.unique_messages, once.stats.unique_messages);
    assert_eq!(
        twice.stats.duplicates_removed,
        once.stats.duplicates_removed + once.stats.total_input_messages
    );
}

#[test]
fn test_merging_a_disjoint_set_with_itself() {
    let a = [(1, false), (2, true)];
    let b = [(3, false), (4, false)];

    let once = merge_logs(&identity(), vec![create_log(&a), create_log(&b)]);
    let twice = merge_logs(
        &identity(),
        vec![create_log(&a), create_log(&b), create_log(&a), create_log(&b)],
    );

    assert_eq!(once.stats.duplicates_removed, 0);
    assert_eq!(twice.stats.unique_messages, once.stats.unique_messages);
    assert_eq!(twice.stats.duplicates_removed, once.stats.total_input_messages);
}

#[test]
fn test_edit_promotion_is_one_directional() {
    let mut merger = MessageMerger::new();
    merger.ingest(create_log(&[(1, false)]).messages);
    merger.ingest(create_log(&[(1, true)]).messages);
    merger.ingest(create_log(&[(1, false)]).messages);

    let (messages, stats) = merger.finish();

    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_edited());
    assert_eq!(stats.edits_promoted, 1);
    assert_eq!(stats.duplicates_removed, 2);
}

#[test]
fn test_unknown_fields_pass_through() {
    let record = MessageRecord::try_from(json!({
        "id": 11,
        "type": "message",
        "from": "Alice",
        "text_entities": [{"type": "bold", "text": "hey"}],
        "reactions": [{"emoji": "👍", "count": 2}]
    }))
    .unwrap();
    let original = serde_json::to_string(&record).unwrap();

    let log = MessageLog {
        messages: vec![record],
        ..create_log(&[])
    };
    let outcome = merge_logs(&identity(), vec![log]);

    assert_eq!(
        serde_json::to_string(&outcome.log.messages[0]).unwrap(),
        original
    );
}
