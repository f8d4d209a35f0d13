use crate::deserializers::{de_option_datetime_forgiving, de_string_or_null};
use crate::keys::{event_key, name_key};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Participant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Participant => write!(f, "participant"),
        }
    }
}

/// One person registered for one event under one sub-category.
/// Identity is (event_key, name_key, subcat).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub event: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub event_key: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub name: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub name_key: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub phone: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub email: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub grade: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub subcat: String,
}

impl Registration {
    pub fn matches(&self, event_key: &str, name_key: &str, subcat: &str) -> bool {
        self.event_key == event_key && self.name_key == name_key && self.subcat == subcat
    }
}

/// Immutable once written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Nil on legacy rows until `backfill_keys` assigns one
    #[serde(default)]
    pub id: Uuid,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub to: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub to_key: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub from: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub from_key: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub event: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub event_key: String,
    pub to_role: Role,
    pub text: String,
    pub timestamp: NaiveDateTime,
}

impl Message {
    pub fn involves(&self, person_key: &str) -> bool {
        self.to_key == person_key || self.from_key == person_key
    }
}

/// Presence record, one per person
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub name: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub name_key: String,
    pub role: Role,
    #[serde(default, deserialize_with = "de_option_datetime_forgiving")]
    pub last_seen: Option<NaiveDateTime>,
}

/// A participant's own report that their event is done
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Completion {
    pub event: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub event_key: String,
    pub name: String,
    #[serde(default, deserialize_with = "de_string_or_null")]
    pub name_key: String,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub at_venue: bool,
}

/// The single aggregate holding all mutable portal state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreDocument {
    #[serde(default)]
    pub participants: Vec<Registration>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub completions: Vec<Completion>,
    /// Bumped on every successful save; used for optimistic concurrency
    #[serde(default)]
    pub revision: u64,
    #[serde(default, deserialize_with = "de_option_datetime_forgiving")]
    pub updated_at: Option<NaiveDateTime>,
}

impl StoreDocument {
    /// Derive lookup keys and message ids missing from older records.
    /// Returns whether anything changed; callers persist the result so the
    /// assigned ids stay stable across loads.
    pub fn backfill_keys(&mut self) -> bool {
        let mut changed = false;
        for p in &mut self.participants {
            changed |= fill(&mut p.event_key, event_key(&p.event));
            changed |= fill(&mut p.name_key, name_key(&p.name));
        }
        for m in &mut self.messages {
            if m.id.is_nil() {
                m.id = Uuid::new_v4();
                changed = true;
            }
            changed |= fill(&mut m.to_key, name_key(&m.to));
            changed |= fill(&mut m.from_key, name_key(&m.from));
            changed |= fill(&mut m.event_key, event_key(&m.event));
        }
        for s in &mut self.sessions {
            changed |= fill(&mut s.name_key, name_key(&s.name));
        }
        for c in &mut self.completions {
            changed |= fill(&mut c.event_key, event_key(&c.event));
            changed |= fill(&mut c.name_key, name_key(&c.name));
        }
        changed
    }

    /// Content equality ignoring save bookkeeping
    pub fn same_content(&self, other: &StoreDocument) -> bool {
        self.participants == other.participants
            && self.messages == other.messages
            && self.sessions == other.sessions
            && self.completions == other.completions
    }
}

fn fill(slot: &mut String, derived: String) -> bool {
    if slot.is_empty() && !derived.is_empty() {
        *slot = derived;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_document_gets_keys() {
        let mut doc: StoreDocument = serde_json::from_str(
            r#"{
                "participants": [{"event": "Solo  Singing", "name": "Aarav Shah", "subcat": null}],
                "messages": [{"to": "Admins", "from": "Aarav Shah", "event": "Solo Singing",
                              "to_role": "admin", "text": "hi", "read": false,
                              "timestamp": "2025-09-20T10:00:00.5"}],
                "sessions": [{"name": "Aarav Shah", "role": "participant", "last_seen": "garbage"}],
                "updated_at": ""
            }"#,
        )
        .unwrap();

        assert!(doc.backfill_keys());
        assert_eq!(doc.participants[0].event_key, "solo singing");
        assert_eq!(doc.participants[0].name_key, "aarav shah");
        assert_eq!(doc.participants[0].subcat, "");
        assert_eq!(doc.messages[0].to_key, "admins");
        assert_eq!(doc.messages[0].event_key, "solo singing");
        let id = doc.messages[0].id;
        assert!(!id.is_nil());
        assert_eq!(doc.sessions[0].last_seen, None);
        assert_eq!(doc.revision, 0);
        assert!(doc.updated_at.is_none());

        assert!(!doc.backfill_keys());
        assert_eq!(doc.messages[0].id, id);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(Role::Participant.to_string(), "participant");
    }
}
