//! Lookup keys for names and events.
//!
//! Every cross reference between events, registrations, messages and
//! sessions goes through [`normalize`], so display casing and stray spaces
//! never break a join.

/// Trims, lowercases and collapses internal whitespace runs to one space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Key for an event display name.
pub fn event_key(name: &str) -> String {
    normalize(name)
}

/// Key for a person's display name.
pub fn name_key(name: &str) -> String {
    normalize(name)
}
