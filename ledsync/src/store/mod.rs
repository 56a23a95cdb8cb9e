//! Durable storage of the shared LED state.
//!
//! The state lives in a single JSON file. Every write goes through an atomic
//! replace (temp file in the same directory, fsync, rename), so readers see
//! either the old record or the new one and never a truncated file.
//!
//! Loading never fails. A missing file is initialized with the default
//! record, and a file that cannot be read or parsed is regenerated the same
//! way. The [`LoadOutcome`] returned alongside the record tells callers which
//! of these paths was taken.
//!
//! A mutex inside [`StateStore`] serializes every operation that may write
//! the file, so concurrent read-modify-write sequences cannot interleave.

mod record;

pub use record::{StateRecord, DEFAULT_COLOR, DEFAULT_COUNT, INITIAL_REV};

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    error::{Error, Result},
    tracing::prelude::*,
    validate,
};
use record::StoredRecord;

/// How [`StateStore::load`] obtained the record it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file held a complete, valid record.
    Clean,
    /// The file parsed but lacked fields, which were filled with defaults.
    /// The repaired record is not written back.
    Repaired,
    /// No file existed; a default record was created.
    Created,
    /// The file was unreadable or corrupt; a default record replaced it.
    Regenerated,
}

/// Result of a load: the record plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub record: StateRecord,
    pub outcome: LoadOutcome,
}

/// Handle to the state file.
///
/// Create one per process and share it (e.g. behind an `Arc`) with whatever
/// serves requests.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StateStore {
    /// Create a store backed by the file at `path`.
    ///
    /// Nothing is touched on disk until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current record, initializing or repairing storage as needed.
    pub fn load(&self) -> Loaded {
        let _guard = self.write_lock.lock();
        self.load_locked(OffsetDateTime::now_utc())
    }

    /// Atomically replace the stored record.
    ///
    /// On error the previous file is left in place.
    pub fn save(&self, record: &StateRecord) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.save_locked(record)
    }

    /// Validate a candidate color and count and, if they pass, store them as
    /// the next revision.
    ///
    /// This is the only way the record changes: `rev` and `updatedAt` move
    /// only together with a validated color and count.
    pub fn apply_write(
        &self,
        color: Option<&Value>,
        count: Option<&Value>,
    ) -> Result<StateRecord> {
        let valid = validate::validate(color, count)?;

        let _guard = self.write_lock.lock();
        let now = OffsetDateTime::now_utc();
        let Loaded { mut record, .. } = self.load_locked(now);

        // Refuse the write rather than wrap: rev never goes backwards.
        let rev = record
            .rev
            .checked_add(1)
            .ok_or(Error::RevisionExhausted(record.rev))?;

        record.color = valid.color;
        record.count = valid.count;
        record.rev = rev;
        record.updated_at = now;

        self.save_locked(&record)?;
        info!(
            color = %record.color,
            count = record.count,
            rev = record.rev,
            "State updated."
        );
        Ok(record)
    }

    fn load_locked(&self, now: OffsetDateTime) -> Loaded {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file, creating one.");
                return self.reinitialize(now, LoadOutcome::Created);
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read state file, regenerating."
                );
                return self.reinitialize(now, LoadOutcome::Regenerated);
            }
        };

        let completed = StoredRecord::parse(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|stored| stored.complete(now).map_err(str::to_string));

        match completed {
            Ok((record, false)) => Loaded {
                record,
                outcome: LoadOutcome::Clean,
            },
            Ok((record, true)) => {
                debug!(path = %self.path.display(), "Backfilled missing state fields.");
                Loaded {
                    record,
                    outcome: LoadOutcome::Repaired,
                }
            }
            Err(reason) => {
                warn!(
                    path = %self.path.display(),
                    reason = %reason,
                    "Corrupt state file, regenerating."
                );
                self.reinitialize(now, LoadOutcome::Regenerated)
            }
        }
    }

    fn reinitialize(&self, now: OffsetDateTime, outcome: LoadOutcome) -> Loaded {
        let record = StateRecord::initial(now);
        if let Err(e) = self.save_locked(&record) {
            // The caller still gets a usable record; the next write retries
            // the save and reports the failure.
            error!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist default state."
            );
        }
        Loaded { record, outcome }
    }

    fn save_locked(&self, record: &StateRecord) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let text = serde_json::to_vec(record)?;

        let mut tmp = tempfile::Builder::new()
            .prefix("state_")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(&text)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        trace!(path = %self.path.display(), rev = record.rev, "State saved.");
        Ok(())
    }
}
