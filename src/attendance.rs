use crate::error::{PortalError, Result};
use crate::keys::{event_key, name_key};
use crate::store::{Change, Completion, DocumentBackend, Store};
use chrono::NaiveDateTime;
use tracing::info;

impl<B: DocumentBackend> Store<B> {
    /// A registered participant reports their event as done
    pub fn mark_completed(
        &self,
        event_name: &str,
        participant: &str,
        at_venue: bool,
        now: NaiveDateTime,
    ) -> Result<Completion> {
        let ek = event_key(event_name);
        let nk = name_key(participant);
        let completion = self.mutate(|doc| {
            let registered = doc
                .participants
                .iter()
                .any(|p| p.event_key == ek && p.name_key == nk);
            if !registered {
                return Err(PortalError::Validation {
                    message: format!(
                        "{} is not registered for {}",
                        participant.trim(),
                        event_name.trim()
                    ),
                });
            }
            let completion = Completion {
                event: event_name.trim().to_string(),
                event_key: ek.clone(),
                name: participant.trim().to_string(),
                name_key: nk.clone(),
                timestamp: now,
                at_venue,
            };
            doc.completions.push(completion.clone());
            Ok(Change::Save(completion))
        })?;
        info!(
            "{} marked {} completed (at venue: {})",
            completion.name, completion.event, completion.at_venue
        );
        Ok(completion)
    }

    pub fn completions_for(&self, event_name: &str) -> Result<Vec<Completion>> {
        let ek = event_key(event_name);
        let mut rows: Vec<Completion> = self
            .read()?
            .completions
            .into_iter()
            .filter(|c| c.event_key == ek)
            .collect();
        rows.sort_by_key(|c| c.timestamp);
        Ok(rows)
    }
}
