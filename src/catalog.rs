//! Immutable event catalog loaded once from the festival brochure export.

use crate::error::{PortalError, Result};
use crate::keys::{event_key, normalize};
use crate::schedule::{FestivalCalendar, FestivalDay};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use strsim::jaro_winkler;

/// One festival event as described in the brochure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub age_category: String,
    #[serde(default)]
    pub date: String,
    /// Older exports carry the day under this field instead of `date`
    #[serde(default)]
    pub date_info_duty: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub teacher_in_charge: String,
    #[serde(default)]
    pub brochure_block: String,
}

impl Event {
    pub fn key(&self) -> String {
        event_key(&self.name)
    }

    /// Free-text day field, whichever of the two source fields is filled
    pub fn date_text(&self) -> &str {
        if self.date.trim().is_empty() {
            &self.date_info_duty
        } else {
            &self.date
        }
    }

    fn haystack(&self) -> String {
        [
            self.name.as_str(),
            &self.category,
            &self.age_category,
            &self.teacher_in_charge,
            &self.brochure_block,
        ]
        .join(" ")
        .to_lowercase()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    events: Vec<Event>,
}

/// Filters for catalog search
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Whitespace separated keywords; every one must match
    pub text: String,
    pub category: Option<String>,
    pub day: Option<FestivalDay>,
}

/// Source-ordered events plus a key index (last write wins on duplicates)
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: Vec<Event>,
    by_key: HashMap<String, usize>,
}

impl Catalog {
    /// Load the catalog document. Any failure here is fatal for the portal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PortalError::Catalog {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let catalog = Self::from_json(&content).map_err(|e| PortalError::Catalog {
            message: format!("{}: {}", path.display(), e),
        })?;
        tracing::debug!(
            "Loaded {} events from {}",
            catalog.events.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(content)?;
        Ok(Self::from_events(doc.events))
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        let mut by_key = HashMap::with_capacity(events.len());
        for (idx, event) in events.iter().enumerate() {
            if let Some(previous) = by_key.insert(event.key(), idx) {
                tracing::warn!(
                    "Duplicate event name '{}' in catalog (entries {} and {}); the later entry wins",
                    event.name,
                    previous,
                    idx
                );
            }
        }
        Self { events, by_key }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Lookup by display name or key
    pub fn get(&self, name: &str) -> Option<&Event> {
        self.by_key.get(&event_key(name)).map(|&idx| &self.events[idx])
    }

    /// Distinct category labels, sorted
    pub fn categories(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| e.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn search(&self, query: &EventQuery, calendar: &FestivalCalendar) -> Vec<&Event> {
        let needle = normalize(&query.text);
        let tokens: Vec<&str> = needle.split(' ').filter(|t| !t.is_empty()).collect();

        self.events
            .iter()
            .filter(|ev| {
                let hay = ev.haystack();
                tokens.iter().all(|tok| hay.contains(tok))
            })
            .filter(|ev| {
                query
                    .category
                    .as_deref()
                    .is_none_or(|cat| ev.category == cat)
            })
            .filter(|ev| {
                query
                    .day
                    .is_none_or(|day| calendar.falls_on(ev.date_text(), day))
            })
            .collect()
    }

    /// Resolves a typed event name using exact match, substring match, or fuzzy matching.
    /// Returns the event or an error with suggestions.
    pub fn resolve(&self, input: &str) -> Result<&Event> {
        if let Some(ev) = self.get(input) {
            return Ok(ev);
        }

        let wanted = event_key(input);
        if wanted.is_empty() {
            return Err(PortalError::InvalidParams {
                message: "event name cannot be empty".into(),
            });
        }

        let substring: Vec<&Event> = self
            .events
            .iter()
            .filter(|ev| ev.key().contains(&wanted))
            .collect();
        match substring.len() {
            1 => return Ok(substring[0]),
            n if n > 1 => {
                return Err(PortalError::UnknownEvent {
                    message: format!(
                        "ambiguous input '{}'. Multiple matches: {}",
                        input,
                        join_names(&substring)
                    ),
                });
            }
            _ => {}
        }

        let mut best_score = 0.0;
        for ev in &self.events {
            let score = jaro_winkler(&ev.key(), &wanted);
            if score > best_score {
                best_score = score;
            }
        }

        if best_score > 0.8 {
            let high: Vec<&Event> = self
                .events
                .iter()
                .filter(|ev| (jaro_winkler(&ev.key(), &wanted) - best_score).abs() < 0.000001)
                .collect();
            if high.len() == 1 {
                return Ok(high[0]);
            }
            return Err(PortalError::UnknownEvent {
                message: format!(
                    "ambiguous fuzzy matches for '{}'. Suggestions: {}",
                    input,
                    join_names(&high)
                ),
            });
        }

        Err(PortalError::UnknownEvent {
            message: format!("no event found matching '{}'", input),
        })
    }
}

fn join_names(events: &[&Event]) -> String {
    events
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
