//! Event rosters: who is registered for what, under which sub-category.

use crate::catalog::Catalog;
use crate::error::{PortalError, Result};
use crate::keys::{event_key, name_key, normalize};
use crate::store::{Change, DocumentBackend, Registration, Store, StoreDocument};
use tracing::info;

/// Fields an admin fills in for one registration
#[derive(Debug, Clone, Default)]
pub struct RegistrationInput {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub grade: String,
    /// Sub-category label, stored verbatim; empty when the event has none
    pub subcat: String,
}

/// Roster filter. `All` never matches a sub-category literally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubcategoryFilter {
    #[default]
    All,
    Only(String),
}

impl SubcategoryFilter {
    pub fn matches(&self, subcat: &str) -> bool {
        match self {
            SubcategoryFilter::All => true,
            SubcategoryFilter::Only(wanted) => wanted == subcat,
        }
    }
}

impl StoreDocument {
    /// Insert or overwrite by (event, name, subcat). Returns the stored record and
    /// whether it was newly added.
    pub fn upsert_registration(
        &mut self,
        event_name: &str,
        input: &RegistrationInput,
    ) -> (Registration, bool) {
        let ek = event_key(event_name);
        let nk = name_key(&input.name);
        let subcat = input.subcat.clone();

        if let Some(existing) = self
            .participants
            .iter_mut()
            .find(|p| p.matches(&ek, &nk, &subcat))
        {
            existing.name = input.name.trim().to_string();
            existing.phone = input.phone.trim().to_string();
            existing.email = input.email.trim().to_string();
            existing.grade = input.grade.trim().to_string();
            return (existing.clone(), false);
        }

        let record = Registration {
            event: event_name.trim().to_string(),
            event_key: ek,
            name: input.name.trim().to_string(),
            name_key: nk,
            phone: input.phone.trim().to_string(),
            email: input.email.trim().to_string(),
            grade: input.grade.trim().to_string(),
            subcat,
        };
        self.participants.push(record.clone());
        (record, true)
    }

    /// Remove exact matches; returns how many were removed
    pub fn remove_registration(&mut self, event_name: &str, name: &str, subcat: &str) -> usize {
        let ek = event_key(event_name);
        let nk = name_key(name);
        let before = self.participants.len();
        self.participants.retain(|p| !p.matches(&ek, &nk, subcat));
        before - self.participants.len()
    }

    /// Roster for one event sorted by (sub-category, case-folded name)
    pub fn roster(&self, event_name: &str, filter: &SubcategoryFilter) -> Vec<Registration> {
        let ek = event_key(event_name);
        let mut rows: Vec<Registration> = self
            .participants
            .iter()
            .filter(|p| p.event_key == ek && filter.matches(&p.subcat))
            .cloned()
            .collect();
        rows.sort_by_cached_key(|p| (p.subcat.clone(), p.name.to_lowercase()));
        rows
    }

    pub fn registrations_for(&self, name: &str) -> Vec<Registration> {
        let nk = name_key(name);
        self.participants
            .iter()
            .filter(|p| p.name_key == nk)
            .cloned()
            .collect()
    }
}

impl<B: DocumentBackend> Store<B> {
    pub fn upsert_registration(
        &self,
        event_name: &str,
        input: &RegistrationInput,
    ) -> Result<Registration> {
        if name_key(&input.name).is_empty() {
            return Err(PortalError::Validation {
                message: "participant name cannot be empty".into(),
            });
        }
        if event_key(event_name).is_empty() {
            return Err(PortalError::Validation {
                message: "event name cannot be empty".into(),
            });
        }
        let (record, added) =
            self.mutate(|doc| Ok(Change::Save(doc.upsert_registration(event_name, input))))?;
        info!(
            "{} registration: {} for {} [{}]",
            if added { "Added" } else { "Updated" },
            record.name,
            record.event,
            record.subcat
        );
        Ok(record)
    }

    /// No-op (and no write) when nothing matches
    pub fn remove_registration(&self, event_name: &str, name: &str, subcat: &str) -> Result<usize> {
        let removed = self.mutate(|doc| {
            let n = doc.remove_registration(event_name, name, subcat);
            Ok(if n > 0 { Change::Save(n) } else { Change::Skip(0) })
        })?;
        if removed > 0 {
            info!("Removed {} from {} [{}]", name.trim(), event_name.trim(), subcat);
        }
        Ok(removed)
    }

    pub fn list_by_event(
        &self,
        event_name: &str,
        filter: &SubcategoryFilter,
    ) -> Result<Vec<Registration>> {
        Ok(self.read()?.roster(event_name, filter))
    }

    /// Every registration for this person, used for their dashboard
    pub fn find_by_name(&self, name: &str) -> Result<Vec<Registration>> {
        Ok(self.read()?.registrations_for(name))
    }

    /// Registrations whose name contains the fragment
    pub fn search_by_name(&self, fragment: &str) -> Result<Vec<Registration>> {
        let needle = normalize(fragment);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .read()?
            .participants
            .into_iter()
            .filter(|p| p.name_key.contains(&needle))
            .collect())
    }

    pub fn is_registered(&self, name: &str) -> Result<bool> {
        let nk = name_key(name);
        Ok(!nk.is_empty() && self.read()?.participants.iter().any(|p| p.name_key == nk))
    }

    pub fn all_registrations(&self) -> Result<Vec<Registration>> {
        Ok(self.read()?.participants)
    }

    /// Put a demo participant on the first event of an empty store.
    /// Returns whether anything was added.
    pub fn seed_demo(&self, catalog: &Catalog) -> Result<bool> {
        let Some(first) = catalog.events().first() else {
            return Ok(false);
        };
        let input = RegistrationInput {
            name: "Demo User".into(),
            ..Default::default()
        };
        self.mutate(|doc| {
            if !doc.participants.is_empty() {
                return Ok(Change::Skip(false));
            }
            doc.upsert_registration(&first.name, &input);
            Ok(Change::Save(true))
        })
    }
}
