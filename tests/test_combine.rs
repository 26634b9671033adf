use std::io::{Cursor, Read};

use chat_export_merge::archive::{ArchiveSource, ZipBuilder};
use chat_export_merge::error::MergeError;
use chat_export_merge::filter::ExportLayout;
use chat_export_merge::identity::{check_compatibility, CompatibilityWarning};
use chat_export_merge::inspect::{inspect_archive, InspectionStatus};
use chat_export_merge::merge::merge_archives;
use chat_export_merge::package::{FirstSeenScorer, RecencyStrategy};
use chat_export_merge::pipeline::{combine_archives, InspectedSet};
use serde_json::{json, Value};

/// Helper to build an archive from (path, contents) pairs
fn archive(name: &str, files: &[(&str, Vec<u8>)]) -> ArchiveSource {
    let mut builder = ZipBuilder::new();
    for (path, contents) in files {
        builder.add_file(path, contents).unwrap();
    }
    ArchiveSource::new(name, builder.finish().unwrap())
}

/// Helper to render a message log
fn log(chat_id: i64, messages: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "name": "Family",
        "type": "private_group",
        "id": chat_id,
        "messages": messages,
    }))
    .unwrap()
}

/// Read every file of a finished container into (path, bytes) pairs
fn unpack(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut files = Vec::new();
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        files.push((file.name().to_string(), buf));
    }
    files
}

fn layout() -> ExportLayout {
    ExportLayout::default()
}

#[test]
fn test_log_at_archive_root() {
    let source = archive("a.zip", &[("result.json", log(42, json!([{"id": 1}])))]);
    let inspection = inspect_archive(&source, &layout()).unwrap();

    assert_eq!(inspection.root_prefix, "");
    assert_eq!(inspection.status, InspectionStatus::Valid);
}

#[test]
fn test_nested_export_root() {
    let source = archive(
        "b.zip",
        &[
            ("export/chat/result.json", log(42, json!([]))),
            ("export/chat/photos/a.jpg", b"jpeg".to_vec()),
        ],
    );
    let inspection = inspect_archive(&source, &layout()).unwrap();

    assert_eq!(inspection.root_prefix, "export/chat/");
    assert!(inspection.entries.contains(&"photos/a.jpg".to_string()));
}

#[test]
fn test_merge_promotes_edited_copy() {
    let a = archive(
        "a.zip",
        &[(
            "result.json",
            log(42, json!([{"id": 1}, {"id": 2, "edited": true}])),
        )],
    );
    let b = archive(
        "b.zip",
        &[("export/result.json", log(42, json!([{"id": 2}, {"id": 3}])))],
    );

    let set = InspectedSet::inspect(vec![a, b], &layout());
    let outcome = merge_archives(&set.valid(), &set.store).unwrap();

    let ids: Vec<_> = outcome.log.messages.iter().map(|m| m.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(outcome.log.messages[1].is_edited());
    assert_eq!(outcome.stats.total_input_messages, 4);
    assert_eq!(outcome.stats.unique_messages, 3);
    assert_eq!(outcome.stats.duplicates_removed, 1);
}

#[test]
fn test_different_chats_are_rejected() {
    let a = archive("a.zip", &[("result.json", log(100, json!([{"id": 1}])))]);
    let b = archive("b.zip", &[("result.json", log(200, json!([{"id": 1}])))]);

    let set = InspectedSet::inspect(vec![a, b], &layout());
    let err = check_compatibility(&set.valid(), &set.store).unwrap_err();

    match &err {
        MergeError::IdentityMismatch {
            expected, found, ..
        } => {
            assert_eq!(*expected, 100);
            assert_eq!(*found, 200);
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("100") && message.contains("200"));

    // The full combine refuses too, before anything is written
    let err = combine_archives(&set, &layout(), &FirstSeenScorer).unwrap_err();
    assert!(matches!(err, MergeError::IdentityMismatch { .. }));
}

#[test]
fn test_overlap_warnings_cover_all_pairs() {
    let jan = json!([{"id": 1, "date": "2024-01-01T00:00:00"}, {"id": 2, "date": "2024-01-31T00:00:00"}]);
    let mar = json!([{"id": 10, "date": "2024-03-01T00:00:00"}]);
    let all = json!([{"id": 1, "date": "2024-01-15T00:00:00"}, {"id": 10, "date": "2024-03-01T00:00:00"}]);

    let set = InspectedSet::inspect(
        vec![
            archive("jan.zip", &[("result.json", log(7, jan))]),
            archive("mar.zip", &[("result.json", log(7, mar))]),
            archive("all.zip", &[("result.json", log(7, all))]),
        ],
        &layout(),
    );
    let report = check_compatibility(&set.valid(), &set.store).unwrap();

    assert_eq!(report.identity.chat_id, 7);
    assert_eq!(
        report.warnings,
        vec![
            CompatibilityWarning::OverlappingTimeRanges {
                first: "jan.zip".to_string(),
                second: "all.zip".to_string(),
            },
            CompatibilityWarning::OverlappingTimeRanges {
                first: "mar.zip".to_string(),
                second: "all.zip".to_string(),
            },
        ]
    );
}

#[test]
fn test_single_archive_needs_no_merge() {
    let set = InspectedSet::inspect(
        vec![archive("a.zip", &[("result.json", log(1, json!([])))])],
        &layout(),
    );
    let err = check_compatibility(&set.valid(), &set.store).unwrap_err();
    assert!(matches!(err, MergeError::NotEnoughArchives { found: 1 }));
}

#[test]
fn test_broken_log_aborts_merge() {
    let a = archive("a.zip", &[("result.json", log(1, json!([{"id": 1}])))]);
    let b = archive("broken.zip", &[("result.json", b"{\"id\": 1, \"messages\": [".to_vec())]);

    let set = InspectedSet::inspect(vec![a, b], &layout());
    let err = combine_archives(&set, &layout(), &FirstSeenScorer).unwrap_err();

    assert!(matches!(err, MergeError::LogParse { ref archive, .. } if archive == "broken.zip"));
}

#[test]
fn test_invalid_and_unreadable_archives_are_left_out() {
    let a = archive("a.zip", &[("result.json", log(5, json!([{"id": 1}])))]);
    let b = archive("b.zip", &[("chat/result.json", log(5, json!([{"id": 2}])))]);
    let media_only = archive("media.zip", &[("photos/x.jpg", b"x".to_vec())]);
    let garbage = ArchiveSource::new("garbage.zip", b"PK but not really".to_vec());

    let set = InspectedSet::inspect(vec![a, media_only, garbage, b], &layout());

    let rejected: Vec<_> = set.rejected().into_iter().map(|(name, _)| name).collect();
    assert_eq!(rejected, vec!["media.zip", "garbage.zip"]);

    let outcome = combine_archives(&set, &layout(), &FirstSeenScorer).unwrap();
    assert_eq!(outcome.merge_stats.unique_messages, 2);
    assert_eq!(outcome.file_name, "combined_Family.zip");
}

#[test]
fn test_combined_container_is_flat_rooted() {
    let a = archive(
        "a.zip",
        &[
            ("result.json", log(9, json!([{"id": 1, "text": "from a"}]))),
            ("photos/1.jpg", b"a-photo-1".to_vec()),
            ("files/doc.pdf", b"a-doc".to_vec()),
            (".DS_Store", b"junk".to_vec()),
        ],
    );
    let b = archive(
        "b.zip",
        &[
            ("Downloads/export/result.json", log(9, json!([{"id": 2, "text": "from b"}]))),
            ("Downloads/export/photos/1.jpg", b"b-photo-1".to_vec()),
            ("Downloads/export/photos/2.jpg", b"b-photo-2".to_vec()),
            ("Downloads/export/voice/v.ogg", b"b-voice".to_vec()),
            ("Downloads/other.txt", b"outside".to_vec()),
            ("__MACOSX/Downloads/export/._result.json", b"junk".to_vec()),
        ],
    );

    let set = InspectedSet::inspect(vec![a, b], &layout());
    let outcome = combine_archives(&set, &layout(), &FirstSeenScorer).unwrap();
    let files = unpack(&outcome.bytes);

    let names: Vec<_> = files.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "result.json",
            "files/doc.pdf",
            "photos/1.jpg",
            "photos/2.jpg",
            "voice/v.ogg"
        ]
    );

    // Same path in both archives: the first supplied archive wins
    let photo = files.iter().find(|(name, _)| name == "photos/1.jpg").unwrap();
    assert_eq!(photo.1, b"a-photo-1");

    let merged: Value = serde_json::from_slice(&files[0].1).unwrap();
    assert_eq!(merged["id"], json!(9));
    assert_eq!(merged["name"], json!("Family"));
    assert_eq!(
        merged["messages"],
        json!([{"id": 1, "text": "from a"}, {"id": 2, "text": "from b"}])
    );

    assert_eq!(outcome.package.total_files, 4);
    assert!(outcome.package.message_log_written);
    let folders: Vec<_> = outcome.package.folders.iter().cloned().collect();
    assert_eq!(folders, vec!["files", "photos", "voice"]);
}

#[test]
fn test_modified_time_strategy_prefers_newer_entry() {
    use zip::write::SimpleFileOptions;
    use zip::{DateTime, ZipWriter};

    fn dated(name: &str, log_bytes: Vec<u8>, photo: &[u8], year: u16) -> ArchiveSource {
        use std::io::Write;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .last_modified_time(DateTime::from_date_and_time(year, 1, 1, 0, 0, 0).unwrap());
        writer.start_file("result.json", options).unwrap();
        writer.write_all(&log_bytes).unwrap();
        writer.start_file("photos/p.jpg", options).unwrap();
        writer.write_all(photo).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        ArchiveSource::new(name, bytes)
    }

    let old = dated("old.zip", log(3, json!([{"id": 1}])), b"old", 2020);
    let new = dated("new.zip", log(3, json!([{"id": 1}])), b"new", 2024);

    let set = InspectedSet::inspect(vec![old, new], &layout());
    let scorer = RecencyStrategy::ModifiedTime.scorer();
    let outcome = combine_archives(&set, &layout(), scorer.as_ref()).unwrap();

    let files = unpack(&outcome.bytes);
    let photo = files.iter().find(|(name, _)| name == "photos/p.jpg").unwrap();
    assert_eq!(photo.1, b"new");
}
