//! Subscription store: the subscriber to keyword-set mapping and its
//! durable snapshot.
//!
//! The snapshot is a pretty-printed JSON object mapping the subscriber id
//! (as a decimal string) to the sorted array of lowercase keywords. It is
//! rewritten in full on every mutation, through a temporary file renamed
//! over the snapshot so a crash mid-write never leaves a partial file.

use crate::error::{RelayError, Result};
use crate::types::SubscriberId;
use fs2::FileExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Normalized form of a raw keyword: surrounding whitespace trimmed, case
/// folded to lower.
fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Owns the subscriber to keyword-set mapping.
///
/// The in-memory mapping is authoritative for the lifetime of the process;
/// the snapshot file is the sole source of truth across restarts. An
/// exclusive lock file guards against a second process opening the same
/// snapshot.
pub struct SubscriptionStore {
    /// Snapshot file path.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Subscriber to keyword-set mapping.
    subscribers: BTreeMap<SubscriberId, BTreeSet<String>>,
}

impl SubscriptionStore {
    /// Open the store at `path`, loading the snapshot if one exists.
    ///
    /// A missing snapshot initializes an empty mapping. A malformed snapshot
    /// is logged and also initializes empty: losing the data is accepted,
    /// refusing to start is not. A snapshot held by another process is an
    /// error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_file = Self::acquire_lock(&path)?;
        let subscribers = Self::load_snapshot(&path);

        Ok(Self {
            path,
            _lock_file: lock_file,
            subscribers,
        })
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.with_extension("lock");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| RelayError::Locked)?;

        Ok(lock_file)
    }

    fn load_snapshot(path: &Path) -> BTreeMap<SubscriberId, BTreeSet<String>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no snapshot at {}, starting empty", path.display());
                return BTreeMap::new();
            }
            Err(e) => {
                warn!("cannot read snapshot {}: {}, starting empty", path.display(), e);
                return BTreeMap::new();
            }
        };

        match Self::decode(&contents) {
            Ok(subscribers) => {
                info!(
                    "loaded {} subscriber(s) from {}",
                    subscribers.len(),
                    path.display()
                );
                subscribers
            }
            Err(e) => {
                warn!("malformed snapshot {}: {}, starting empty", path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn decode(contents: &str) -> Result<BTreeMap<SubscriberId, BTreeSet<String>>> {
        let raw: BTreeMap<String, BTreeSet<String>> = serde_json::from_str(contents)?;
        raw.into_iter()
            .map(|(id, keywords)| {
                let id = id.parse::<i64>().map_err(|_| {
                    RelayError::Serialization(format!("invalid subscriber id: {:?}", id))
                })?;
                Ok((SubscriberId(id), keywords))
            })
            .collect()
    }

    fn encode(&self) -> Result<String> {
        let raw: BTreeMap<String, &BTreeSet<String>> = self
            .subscribers
            .iter()
            .map(|(id, keywords)| (id.to_string(), keywords))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Serialize the entire mapping to the snapshot file.
    ///
    /// Writes to a sibling temporary file and renames it over the snapshot,
    /// so readers never observe a partial write.
    pub fn persist(&self) -> Result<()> {
        let encoded = self.encode()?;
        let tmp_path = self.path.with_extension("tmp");

        let mut file = File::create(&tmp_path)?;
        file.write_all(encoded.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("snapshot saved to {}", self.path.display());
        Ok(())
    }

    /// Persist, logging a failure instead of propagating it. The in-memory
    /// mapping stays authoritative for the rest of the run.
    fn persist_or_log(&self) {
        if let Err(e) = self.persist() {
            error!("failed to persist snapshot: {}", e);
        }
    }

    /// Create an entry for a subscriber if none exists. Does not persist by
    /// itself; the entry reaches disk with the next mutation.
    pub fn ensure_subscriber(&mut self, id: SubscriberId) {
        self.subscribers.entry(id).or_default();
    }

    /// Add a keyword for a subscriber. Returns whether it was newly
    /// inserted. An empty keyword (after normalization) is a no-op.
    pub fn add(&mut self, id: SubscriberId, raw_keyword: &str) -> bool {
        let keyword = normalize(raw_keyword);
        if keyword.is_empty() {
            return false;
        }

        let inserted = self.subscribers.entry(id).or_default().insert(keyword);
        if inserted {
            self.persist_or_log();
        }
        inserted
    }

    /// Remove a keyword from a subscriber. Returns whether it was present.
    pub fn remove(&mut self, id: SubscriberId, raw_keyword: &str) -> bool {
        let keyword = normalize(raw_keyword);
        let removed = self
            .subscribers
            .get_mut(&id)
            .map(|keywords| keywords.remove(&keyword))
            .unwrap_or(false);
        if removed {
            self.persist_or_log();
        }
        removed
    }

    /// Empty a subscriber's keyword set. Persists unconditionally, even when
    /// the set was already empty: clearing is an acknowledged action.
    pub fn clear_all(&mut self, id: SubscriberId) {
        self.subscribers.entry(id).or_default().clear();
        self.persist_or_log();
    }

    /// A subscriber's keywords in lexicographic order. Empty for an unknown
    /// subscriber.
    pub fn keywords(&self, id: SubscriberId) -> Vec<String> {
        self.subscribers
            .get(&id)
            .map(|keywords| keywords.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Read view over every subscriber and their keyword set.
    pub fn iter(&self) -> impl Iterator<Item = (SubscriberId, &BTreeSet<String>)> + '_ {
        self.subscribers.iter().map(|(id, keywords)| (*id, keywords))
    }

    /// Number of subscribers, including those with an empty keyword set.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
