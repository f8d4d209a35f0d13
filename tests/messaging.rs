mod common;

use common::{at, memory_store};
use cynosure::messaging::{ADMINS, FeedFilter, OutgoingMessage, preview};
use cynosure::store::Role;

#[test]
fn test_blank_message_is_dropped_without_write() {
    let store = memory_store();
    let before = store.read().unwrap().revision;
    let sent = store
        .send_message(
            &OutgoingMessage::participant_to_admins("Asha", "Quiz", "  \n\t "),
            at(26, 9, 0),
        )
        .unwrap();
    assert!(sent.is_none());
    let doc = store.read().unwrap();
    assert!(doc.messages.is_empty());
    assert_eq!(doc.revision, before);
}

#[test]
fn test_thread_orders_by_timestamp_not_insertion() {
    let store = memory_store();
    store
        .send_message(
            &OutgoingMessage::admin_reply("Asha", "Ms. Rao", "Quiz", "Room 4"),
            at(26, 10, 5),
        )
        .unwrap();
    store
        .send_message(
            &OutgoingMessage::participant_to_admins("Asha", "Quiz", "Where is it?"),
            at(26, 10, 0),
        )
        .unwrap();
    store
        .send_message(
            &OutgoingMessage::participant_to_admins("Asha", "Solo Singing", "Mic?"),
            at(26, 9, 0),
        )
        .unwrap();

    let thread = store.thread(" quiz ", "ASHA").unwrap();
    let texts: Vec<&str> = thread.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["Where is it?", "Room 4"]);
    assert_eq!(thread[0].to, ADMINS);
    assert_eq!(thread[0].to_role, Role::Admin);
    assert_eq!(thread[1].to_role, Role::Participant);

    let inbox = store.inbox("asha").unwrap();
    assert_eq!(inbox.len(), 3);
    assert_eq!(inbox[0].text, "Mic?");
}

#[test]
fn test_message_text_trimmed_and_ids_unique() {
    let store = memory_store();
    let a = store
        .send_message(
            &OutgoingMessage::participant_to_admins("Ravi", "Quiz", "  hello  "),
            at(26, 9, 0),
        )
        .unwrap()
        .unwrap();
    let b = store
        .send_message(
            &OutgoingMessage::participant_to_admins("Ravi", "Quiz", "again"),
            at(26, 9, 0),
        )
        .unwrap()
        .unwrap();
    assert_eq!(a.text, "hello");
    assert_ne!(a.id, b.id);
}

#[test]
fn test_feed_newest_first_with_filters() {
    let store = memory_store();
    let sends = [
        ("Asha", "Quiz", at(26, 9, 0)),
        ("Ravi", "Quiz", at(26, 9, 30)),
        ("Asha", "Group Dance", at(27, 8, 0)),
    ];
    for (from, event, when) in sends {
        store
            .send_message(
                &OutgoingMessage::participant_to_admins(from, event, "hi"),
                when,
            )
            .unwrap();
    }

    let all = store.message_feed(&FeedFilter::default()).unwrap();
    let order: Vec<&str> = all.iter().map(|m| m.event.as_str()).collect();
    assert_eq!(order, ["Group Dance", "Quiz", "Quiz"]);
    assert_eq!(all[1].from, "Ravi");

    let asha = store
        .message_feed(&FeedFilter {
            participant: Some("asha".into()),
            event: None,
        })
        .unwrap();
    assert_eq!(asha.len(), 2);

    let asha_quiz = store
        .message_feed(&FeedFilter {
            participant: Some("Asha".into()),
            event: Some("QUI".into()),
        })
        .unwrap();
    assert_eq!(asha_quiz.len(), 1);
    assert_eq!(asha_quiz[0].timestamp, at(26, 9, 0));
}

#[test]
fn test_preview_truncates_long_text() {
    let store = memory_store();
    let long = "a".repeat(80);
    let msg = store
        .send_message(
            &OutgoingMessage::participant_to_admins("Asha", "Quiz", &long),
            at(26, 9, 0),
        )
        .unwrap()
        .unwrap();
    let shown = preview(&msg);
    assert_eq!(shown, format!("Asha: {}...", "a".repeat(60)));

    let short = store
        .send_message(
            &OutgoingMessage::participant_to_admins("Asha", "Quiz", "ok"),
            at(26, 9, 1),
        )
        .unwrap()
        .unwrap();
    assert_eq!(preview(&short), "Asha: ok");
}
