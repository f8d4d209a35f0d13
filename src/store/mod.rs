//! Participant store: one JSON document behind an injectable backend.
//!
//! Every operation is a full load → mutate in memory → full save. Saves are
//! revision checked, and [`Store::mutate`] re-applies the mutation to a fresh
//! copy when another writer got there first.

pub mod backend;
pub mod document;

pub use backend::{DocumentBackend, JsonFileBackend, MemoryBackend};
pub use document::{Completion, Message, Registration, Role, Session, StoreDocument};

use crate::error::{PortalError, Result};
use tracing::warn;

const MAX_CONFLICT_RETRIES: usize = 3;

/// What a mutation did to the document
#[derive(Debug)]
pub enum Change<T> {
    /// Document modified; persist it
    Save(T),
    /// Nothing to write
    Skip(T),
}

pub struct Store<B: DocumentBackend> {
    backend: B,
}

impl<B: DocumentBackend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Snapshot of the current document
    pub fn read(&self) -> Result<StoreDocument> {
        self.backend.load()
    }

    /// Load, apply `f`, and save when `f` reports a change.
    /// `f` may run more than once if a concurrent save is detected.
    pub fn mutate<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&mut StoreDocument) -> Result<Change<T>>,
    {
        let mut attempt = 0;
        loop {
            let mut doc = self.backend.load()?;
            let value = match f(&mut doc)? {
                Change::Skip(value) => return Ok(value),
                Change::Save(value) => value,
            };
            match self.backend.save(&mut doc) {
                Ok(()) => return Ok(value),
                Err(PortalError::Conflict { expected, found }) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    warn!(
                        "Store changed underneath us (revision {} → {}); retrying ({}/{})",
                        expected, found, attempt, MAX_CONFLICT_RETRIES
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
