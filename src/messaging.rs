//! Append-only message threads between participants and admins.
//!
//! A thread is every message on one event where the participant is either
//! the sender or the recipient, oldest first.

use crate::error::Result;
use crate::keys::{event_key, name_key, normalize};
use crate::store::{Change, DocumentBackend, Message, Role, Store, StoreDocument};
use chrono::NaiveDateTime;
use tracing::info;
use uuid::Uuid;

/// Display name used when a participant writes to the admin team
pub const ADMINS: &str = "Admins";

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to: String,
    pub from: String,
    pub event: String,
    pub text: String,
    pub to_role: Role,
}

impl OutgoingMessage {
    /// Participant writing to the admin team about an event
    pub fn participant_to_admins(from: &str, event: &str, text: &str) -> Self {
        Self {
            to: ADMINS.to_string(),
            from: from.to_string(),
            event: event.to_string(),
            text: text.to_string(),
            to_role: Role::Admin,
        }
    }

    /// Admin replying to a participant
    pub fn admin_reply(to: &str, admin: &str, event: &str, text: &str) -> Self {
        Self {
            to: to.to_string(),
            from: admin.to_string(),
            event: event.to_string(),
            text: text.to_string(),
            to_role: Role::Participant,
        }
    }
}

/// Admin-side feed filters; substring matches on display names
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    pub participant: Option<String>,
    pub event: Option<String>,
}

impl StoreDocument {
    pub fn thread(&self, event: &str, participant: &str) -> Vec<Message> {
        let ek = event_key(event);
        let pk = name_key(participant);
        let mut msgs: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.event_key == ek && m.involves(&pk))
            .cloned()
            .collect();
        msgs.sort_by_key(|m| m.timestamp);
        msgs
    }

    pub fn inbox(&self, participant: &str) -> Vec<Message> {
        let pk = name_key(participant);
        let mut msgs: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.involves(&pk))
            .cloned()
            .collect();
        msgs.sort_by_key(|m| m.timestamp);
        msgs
    }
}

impl<B: DocumentBackend> Store<B> {
    /// Append a message. Blank text is dropped and `Ok(None)` returned.
    pub fn send_message(
        &self,
        outgoing: &OutgoingMessage,
        now: NaiveDateTime,
    ) -> Result<Option<Message>> {
        let text = outgoing.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let message = self.mutate(|doc| {
            let message = Message {
                id: Uuid::new_v4(),
                to: outgoing.to.clone(),
                to_key: name_key(&outgoing.to),
                from: outgoing.from.clone(),
                from_key: name_key(&outgoing.from),
                event: outgoing.event.clone(),
                event_key: event_key(&outgoing.event),
                to_role: outgoing.to_role,
                text: text.to_string(),
                timestamp: now,
            };
            doc.messages.push(message.clone());
            Ok(Change::Save(message))
        })?;
        info!(
            "Message {} from {} to {} on {}",
            message.id, message.from, message.to, message.event
        );
        Ok(Some(message))
    }

    pub fn thread(&self, event: &str, participant: &str) -> Result<Vec<Message>> {
        Ok(self.read()?.thread(event, participant))
    }

    pub fn inbox(&self, participant: &str) -> Result<Vec<Message>> {
        Ok(self.read()?.inbox(participant))
    }

    /// Everything, newest first, for the admin view
    pub fn message_feed(&self, filter: &FeedFilter) -> Result<Vec<Message>> {
        let who = filter.participant.as_deref().map(normalize);
        let what = filter.event.as_deref().map(normalize);
        let mut msgs: Vec<Message> = self
            .read()?
            .messages
            .into_iter()
            .filter(|m| {
                who.as_deref().is_none_or(|w| {
                    normalize(&format!("{} {}", m.to, m.from)).contains(w)
                })
            })
            .filter(|m| what.as_deref().is_none_or(|e| m.event_key.contains(e)))
            .collect();
        msgs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(msgs)
    }
}

/// Short one-line preview of the latest message in a thread
pub fn preview(message: &Message) -> String {
    let mut text: String = message.text.chars().take(PREVIEW_CHARS).collect();
    if message.text.chars().count() > PREVIEW_CHARS {
        text.push_str("...");
    }
    format!("{}: {}", message.from, text)
}
