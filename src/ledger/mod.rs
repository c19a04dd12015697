//! Dedup ledger: the durable record of already-acquired items.
//!
//! The store is a line-oriented text file, one key per line, append-only. It
//! is loaded fully into memory at startup; every successful acquisition
//! appends one line and syncs it to disk before the acquisition is reported.
//!
//! Concurrent workers share one [`DedupLedger`] behind an `Arc`. Appends are
//! serialized through a single mutex that guards both the in-memory set and
//! the file, so a key is never written twice and the set never disagrees with
//! what this process has attempted to persist.

use crate::config::LedgerKey;
use crate::error::Error;
use crate::types::CandidateItem;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of [`DedupLedger::record`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Key added and durably persisted
    Recorded,
    /// Key was already present; nothing written
    AlreadyPresent,
    /// Key added in memory but the write failed; it will not survive a restart
    MemoryOnly,
    /// Key was empty after normalization; nothing recorded
    EmptyKey,
}

/// Append-only set of processed item keys
pub struct DedupLedger {
    path: PathBuf,
    keys: Mutex<HashSet<String>>,
}

impl LedgerKey {
    /// The ledger key for an item under this policy
    pub fn key_of<'a>(&self, item: &'a CandidateItem) -> &'a str {
        match self {
            LedgerKey::Id => &item.id,
            LedgerKey::Title => &item.title,
        }
    }
}

/// Keys are stored one per line, so line breaks inside a key are folded
fn normalize(key: &str) -> String {
    key.trim().replace(['\r', '\n'], " ")
}

impl DedupLedger {
    /// Load the ledger from `path`
    ///
    /// Never fails: a missing store starts empty, and an unreadable or corrupt
    /// store (e.g., not valid UTF-8) starts empty with a warning. Blank lines
    /// are ignored.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let keys = match tokio::fs::read(&path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "ledger store is corrupt, starting with an empty ledger"
                    );
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger store yet, starting empty");
                HashSet::new()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read ledger store, starting with an empty ledger"
                );
                HashSet::new()
            }
        };

        info!(path = %path.display(), entries = keys.len(), "loaded dedup ledger");

        Self {
            path,
            keys: Mutex::new(keys),
        }
    }

    /// Store file backing this ledger
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `key` has been recorded
    pub async fn contains(&self, key: &str) -> bool {
        self.keys.lock().await.contains(&normalize(key))
    }

    /// Record `key`, persisting it before returning
    ///
    /// Idempotent: recording a present key is a no-op. When the write fails
    /// the key is still added in memory so the current process does not
    /// re-acquire the item, and [`RecordOutcome::MemoryOnly`] is returned.
    pub async fn record(&self, key: &str) -> RecordOutcome {
        let key = normalize(key);
        if key.is_empty() {
            warn!("refusing to record an empty ledger key");
            return RecordOutcome::EmptyKey;
        }

        let mut keys = self.keys.lock().await;
        if keys.contains(&key) {
            debug!(key = %key, "ledger key already present");
            return RecordOutcome::AlreadyPresent;
        }

        let outcome = match self.append_line(&key).await {
            Ok(()) => {
                debug!(key = %key, "recorded ledger key");
                RecordOutcome::Recorded
            }
            Err(e) => {
                warn!(
                    key = %key,
                    error = %e,
                    "failed to persist ledger key, keeping it in memory only"
                );
                RecordOutcome::MemoryOnly
            }
        };
        keys.insert(key);
        outcome
    }

    /// Number of recorded keys
    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    /// Whether the ledger has no keys
    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }

    /// Forget every key and truncate the store
    pub async fn clear(&self) -> crate::Result<()> {
        let mut keys = self.keys.lock().await;
        keys.clear();
        let file = tokio::fs::File::create(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_all().await.map_err(|e| self.io_error(e))?;
        info!(path = %self.path.display(), "cleared dedup ledger");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::LedgerIo {
            path: self.path.clone(),
            source,
        }
    }

    async fn append_line(&self, key: &str) -> crate::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(format!("{key}\n").as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_data().await.map_err(|e| self.io_error(e))?;
        Ok(())
    }
}
