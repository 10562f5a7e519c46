use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Version of the on-disk record envelope.  Bump on breaking layout changes;
/// records with a different version are ignored on load.
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize state slice '{slice}'")]
    Serialize {
        slice: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write state slice '{slice}'")]
    Write {
        slice: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Envelope written around every stored slice.  `version` and `slice` are
/// checked on load so unrelated or stale files can never masquerade as a
/// valid snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct StateRecord<T> {
    version: u32,
    slice: String,
    /// Unix seconds at save time.
    saved_at: i64,
    data: T,
}

/// A repository over one named state slice, stored as a single JSON file.
/// Writes are last-write-wins; concurrent writers from sibling processes may
/// interleave and the newest record simply sticks.
pub struct StateStore<T> {
    slice: &'static str,
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> StateStore<T> {
    pub fn open(dir: &Path, slice: &'static str) -> Self {
        Self {
            slice,
            path: dir.join(format!("{slice}.json")),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, data: &T) -> Result<(), StoreError> {
        let record = StateRecord {
            version: STORE_VERSION,
            slice: self.slice.to_string(),
            saved_at: chrono::Utc::now().timestamp(),
            data,
        };
        let json = serde_json::to_string_pretty(&record).map_err(|source| {
            StoreError::Serialize {
                slice: self.slice,
                source,
            }
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                slice: self.slice,
                source,
            })?;
        }
        std::fs::write(&self.path, json).map_err(|source| StoreError::Write {
            slice: self.slice,
            source,
        })
    }

    /// Load the stored slice.  Missing file, unreadable JSON, or a
    /// version/slice mismatch all yield `None` — a broken snapshot must
    /// never take the caller down.
    pub fn load(&self) -> Option<T> {
        self.load_record().map(|r| r.data)
    }

    /// Like [`load`](Self::load), but also ignores records saved longer than
    /// `max_age` ago.
    pub fn load_fresh(&self, max_age: Duration) -> Option<T> {
        let record = self.load_record()?;
        let age = chrono::Utc::now().timestamp() - record.saved_at;
        if age < 0 || age as u64 > max_age.as_secs() {
            warn!(slice = self.slice, age, "stored record expired, ignoring");
            return None;
        }
        Some(record.data)
    }

    /// Remove the stored slice, if any.
    pub fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(slice = self.slice, "failed to clear state slice: {e}");
            }
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load_record(&self) -> Option<StateRecord<T>> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let record: StateRecord<T> = match serde_json::from_str(&content) {
            Ok(r) => r,
            Err(e) => {
                warn!(slice = self.slice, "unreadable state record, ignoring: {e}");
                return None;
            }
        };
        if record.version != STORE_VERSION || record.slice != self.slice {
            warn!(
                slice = self.slice,
                found_version = record.version,
                found_slice = %record.slice,
                "state record does not match this slice, ignoring"
            );
            return None;
        }
        Some(record)
    }
}
