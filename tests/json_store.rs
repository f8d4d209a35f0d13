mod common;

use common::at;
use cynosure::error::PortalError;
use cynosure::messaging::OutgoingMessage;
use cynosure::registrations::RegistrationInput;
use cynosure::registrations::SubcategoryFilter;
use cynosure::store::{DocumentBackend, JsonFileBackend, Store, StoreDocument};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::thread;
use tempfile::tempdir;

fn corrupt_backups(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
        .count()
}

#[test]
fn test_missing_file_is_created_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("participants_store.json");
    let backend = JsonFileBackend::new(&path);

    let doc = backend.load().unwrap();
    assert!(path.exists());
    assert!(doc.participants.is_empty());
    assert!(doc.messages.is_empty());
    assert_eq!(doc.revision, 0);
}

#[test]
fn test_round_trip_preserves_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = Store::new(JsonFileBackend::new(&path));
    store
        .upsert_registration("Quiz", &RegistrationInput {
            name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            grade: "9 A".into(),
            ..Default::default()
        })
        .unwrap();
    store
        .send_message(
            &OutgoingMessage::participant_to_admins("Asha Rao", "Quiz", "hello"),
            at(26, 9, 0),
        )
        .unwrap();

    let reopened = Store::new(JsonFileBackend::new(&path));
    let doc = reopened.read().unwrap();
    assert_eq!(doc.participants.len(), 1);
    assert_eq!(doc.participants[0].email, "asha@example.com");
    assert_eq!(doc.messages.len(), 1);
    assert_eq!(doc.messages[0].timestamp, at(26, 9, 0));
    assert_eq!(doc.revision, 2);
    assert!(doc.updated_at.is_some());

    // no temp file left behind
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_corrupt_file_is_moved_aside() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    fs::write(&path, "{ this is not json").unwrap();

    let doc = JsonFileBackend::new(&path).load().unwrap();
    assert!(doc.participants.is_empty());

    let backups: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("store.json.corrupt-"))
        .collect();
    assert_eq!(backups.len(), 1);
    let saved = fs::read_to_string(dir.path().join(&backups[0])).unwrap();
    assert_eq!(saved, "{ this is not json");
}

#[test]
fn test_legacy_records_get_keys_backfilled() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    fs::write(
        &path,
        r#"{
            "participants": [
                {"event": "Solo  Singing", "name": "Asha Rao", "phone": null, "grade": "10 B"}
            ],
            "messages": [],
            "sessions": [
                {"name": "Asha Rao", "role": "participant", "last_seen": "not a date"}
            ]
        }"#,
    )
    .unwrap();

    let store = Store::new(JsonFileBackend::new(&path));
    let regs = store.find_by_name("asha rao").unwrap();
    assert_eq!(regs.len(), 1);
    assert_eq!(regs[0].event_key, "solo singing");
    assert_eq!(regs[0].phone, "");
    assert_eq!(regs[0].subcat, "");
    let doc = store.read().unwrap();
    assert_eq!(doc.sessions[0].last_seen, None);
}

#[test]
fn test_stale_save_is_a_conflict() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let backend = JsonFileBackend::new(&path);

    let mut first = backend.load().unwrap();
    let mut second = backend.load().unwrap();
    backend.save(&mut first).unwrap();
    assert_eq!(first.revision, 1);

    let err = backend.save(&mut second).unwrap_err();
    assert!(matches!(
        err,
        PortalError::Conflict {
            expected: 0,
            found: 1
        }
    ));
}

#[test]
fn test_interleaved_writers_both_land() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let a = Store::new(JsonFileBackend::new(&path));
    let b = Store::new(JsonFileBackend::new(&path));

    for (i, store) in [&a, &b, &a, &b].into_iter().enumerate() {
        store
            .upsert_registration("Quiz", &RegistrationInput {
                name: format!("Player {}", i),
                ..Default::default()
            })
            .unwrap();
    }
    assert_eq!(a.all_registrations().unwrap().len(), 4);
}

#[test]
fn test_saved_document_loads_back_identical() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    let backend = JsonFileBackend::new(&path);

    let mut doc = StoreDocument::default();
    doc.upsert_registration("Group Dance", &RegistrationInput {
        name: "Asha Rao".into(),
        phone: "98765".into(),
        grade: "10 B".into(),
        subcat: "Girls".into(),
        ..Default::default()
    });
    doc.upsert_registration("Quiz", &RegistrationInput {
        name: "Ravi".into(),
        ..Default::default()
    });
    backend.save(&mut doc).unwrap();

    let store = Store::new(JsonFileBackend::new(&path));
    store
        .send_message(
            &OutgoingMessage::participant_to_admins("Ravi", "Quiz", "Which room?"),
            at(26, 9, 0),
        )
        .unwrap();
    let expected = store.read().unwrap();

    let reloaded = JsonFileBackend::new(&path).load().unwrap();
    assert!(reloaded.same_content(&expected));
    assert_eq!(reloaded.revision, expected.revision);
    assert_eq!(reloaded.participants.len(), 2);
    assert_eq!(reloaded.messages[0].text, "Which room?");
}

#[test]
fn test_legacy_message_ids_are_stable_across_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    fs::write(
        &path,
        r#"{"messages": [{"to": "Admins", "from": "Asha", "event": "Quiz",
                          "to_role": "admin", "text": "hi", "read": true,
                          "timestamp": "2025-09-26T09:00:00"}]}"#,
    )
    .unwrap();

    let first = JsonFileBackend::new(&path).load().unwrap();
    let second = JsonFileBackend::new(&path).load().unwrap();
    assert!(!first.messages[0].id.is_nil());
    assert_eq!(first.messages[0].id, second.messages[0].id);
    assert_eq!(first.revision, 1);
    assert_eq!(second.revision, 1);

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains(&first.messages[0].id.to_string()));
}

#[test]
fn test_concurrent_writers_never_lose_acknowledged_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let path = path.clone();
            thread::spawn(move || {
                let store = Store::new(JsonFileBackend::new(&path));
                let mut landed = Vec::new();
                for i in 0..50 {
                    let name = format!("Worker {} Player {}", worker, i);
                    let result = store.upsert_registration("Quiz", &RegistrationInput {
                        name: name.clone(),
                        ..Default::default()
                    });
                    match result {
                        Ok(_) => landed.push(name.to_lowercase()),
                        Err(PortalError::Conflict { .. }) => {}
                        Err(e) => panic!("unexpected store failure: {}", e),
                    }
                }
                landed
            })
        })
        .collect();

    let mut acknowledged = BTreeSet::new();
    for handle in handles {
        acknowledged.extend(handle.join().unwrap());
    }

    let store = Store::new(JsonFileBackend::new(&path));
    let stored: BTreeSet<String> = store
        .list_by_event("Quiz", &SubcategoryFilter::All)
        .unwrap()
        .into_iter()
        .map(|r| r.name_key)
        .collect();

    assert_eq!(corrupt_backups(dir.path()), 0);
    assert!(!acknowledged.is_empty());
    assert_eq!(stored, acknowledged);
    assert_eq!(
        store.read().unwrap().revision as usize,
        acknowledged.len()
    );
}
