use super::document::StoreDocument;
use crate::error::{PortalError, Result};
use chrono::Local;
use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info};

/// Whole-document persistence. Callers never see partial writes.
pub trait DocumentBackend {
    /// Load the current document, materializing defaults when none exists yet
    fn load(&self) -> Result<StoreDocument>;

    /// Persist `doc`. Fails with [`PortalError::Conflict`] when someone else
    /// saved since `doc` was loaded; on success `doc.revision` and
    /// `doc.updated_at` reflect what was written.
    fn save(&self, doc: &mut StoreDocument) -> Result<()>;
}

fn stamp(doc: &mut StoreDocument) {
    doc.revision += 1;
    doc.updated_at = Some(Local::now().naive_local());
}

/// JSON file on disk.
///
/// Every write goes to a uniquely named temp file in the same directory and is
/// renamed over the store. Writes, and the revision check before them, happen
/// under an exclusive lock on a sibling `.<file>.lock`, so concurrent writers
/// in other threads or processes either land or get a conflict.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

#[derive(Deserialize)]
struct RevisionProbe {
    #[serde(default)]
    revision: u64,
}

/// Held for the duration of a write; the OS lock is released on drop
struct WriteLock {
    _file: File,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store.json".to_string())
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock(&self) -> Result<WriteLock> {
        std::fs::create_dir_all(self.dir())?;
        let lock_path = self.dir().join(format!(".{}.lock", self.file_name()));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.lock()?;
        Ok(WriteLock { _file: file })
    }

    /// Caller must hold the write lock
    fn write_atomic(&self, doc: &StoreDocument) -> Result<()> {
        let body = serde_json::to_vec_pretty(doc)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.file_name()))
            .suffix(".tmp")
            .tempfile_in(self.dir())?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn disk_revision(&self) -> Result<u64> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str::<RevisionProbe>(&content)
                .map(|p| p.revision)
                .unwrap_or(0)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Move an unreadable store aside so its contents can be recovered by hand
    fn quarantine(&self, reason: &str) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d%H%M%S");
        let backup = self
            .path
            .with_file_name(format!("{}.corrupt-{}", self.file_name(), stamp));
        std::fs::rename(&self.path, &backup)?;
        error!(
            "Store document {} is unreadable ({}); moved to {} and starting empty",
            self.path.display(),
            reason,
            backup.display()
        );
        Ok(backup)
    }

    /// Load path for anything that may need a write: a missing or corrupt
    /// file, or legacy records that need keys and ids. Runs under the lock
    /// and re-reads, since another writer may have fixed things meanwhile.
    fn load_locked(&self) -> Result<StoreDocument> {
        let _guard = self.lock()?;
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Creating empty store document at {}", self.path.display());
                let doc = StoreDocument::default();
                self.write_atomic(&doc)?;
                return Ok(doc);
            }
            Err(e) => return Err(e.into()),
        };

        let mut doc = match serde_json::from_str::<StoreDocument>(&content) {
            Ok(doc) => doc,
            Err(e) => {
                self.quarantine(&e.to_string())?;
                let doc = StoreDocument::default();
                self.write_atomic(&doc)?;
                return Ok(doc);
            }
        };

        if doc.backfill_keys() {
            stamp(&mut doc);
            self.write_atomic(&doc)?;
            info!(
                "Backfilled keys on legacy store records (now revision {})",
                doc.revision
            );
        }
        Ok(doc)
    }
}

impl DocumentBackend for JsonFileBackend {
    fn load(&self) -> Result<StoreDocument> {
        let parsed = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<StoreDocument>(&content).ok());

        let doc = match parsed {
            Some(mut doc) => {
                if doc.backfill_keys() {
                    self.load_locked()?
                } else {
                    doc
                }
            }
            None => self.load_locked()?,
        };
        debug!(
            "Loaded store revision {} ({} participants, {} messages)",
            doc.revision,
            doc.participants.len(),
            doc.messages.len()
        );
        Ok(doc)
    }

    fn save(&self, doc: &mut StoreDocument) -> Result<()> {
        let _guard = self.lock()?;
        let found = self.disk_revision()?;
        if found != doc.revision {
            return Err(PortalError::Conflict {
                expected: doc.revision,
                found,
            });
        }
        stamp(doc);
        self.write_atomic(doc)?;
        debug!(
            "Saved store revision {} to {}",
            doc.revision,
            self.path.display()
        );
        Ok(())
    }
}

/// In-process backend for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryBackend {
    doc: Mutex<StoreDocument>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: StoreDocument) -> Self {
        Self {
            doc: Mutex::new(doc),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreDocument>> {
        self.doc.lock().map_err(|_| PortalError::Internal {
            message: "memory store lock poisoned".into(),
        })
    }
}

impl DocumentBackend for MemoryBackend {
    fn load(&self) -> Result<StoreDocument> {
        let mut current = self.lock()?;
        if current.backfill_keys() {
            stamp(&mut current);
        }
        Ok(current.clone())
    }

    fn save(&self, doc: &mut StoreDocument) -> Result<()> {
        let mut current = self.lock()?;
        if current.revision != doc.revision {
            return Err(PortalError::Conflict {
                expected: doc.revision,
                found: current.revision,
            });
        }
        stamp(doc);
        *current = doc.clone();
        Ok(())
    }
}
