//! Persisted cache of classifier-rejected URLs.
//!
//! Feeds repeat entries across runs, and every re-submission of a known-bad
//! post costs a classification call. Rejections are therefore remembered in a
//! small JSON file keyed by URL. Entries age out after 48 hours, the file is
//! bounded by batch-evicting the oldest half when full, and the parsed form is
//! cached in memory keyed by the file's modification time so repeated lookups
//! within a run stay cheap while external writes are still picked up.
//!
//! Persistence here is an optimization, not a ledger: a missing or corrupt
//! file degrades to an empty cache and a save failure never aborts the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_TTL_HOURS: i64 = 48;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// On-disk shape: a top-level save timestamp plus the URL map. The file is
/// rewritten in full on every save.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    urls: HashMap<String, RejectedEntry>,
}

pub struct RejectedUrlCache {
    path: PathBuf,
    max_entries: usize,
    ttl: Duration,
    entries: HashMap<String, RejectedEntry>,
    loaded: bool,
    loaded_mtime: Option<SystemTime>,
}

impl RejectedUrlCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_limits(path, DEFAULT_MAX_ENTRIES, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_limits(path: impl Into<PathBuf>, max_entries: usize, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            max_entries: max_entries.max(2),
            ttl,
            entries: HashMap::new(),
            loaded: false,
            loaded_mtime: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this URL was rejected recently enough to still be cached.
    pub fn is_rejected(&mut self, url: &str) -> bool {
        self.refresh();
        self.entries.contains_key(url)
    }

    /// The cached rejection reason, if any.
    pub fn rejection_reason(&mut self, url: &str) -> Option<String> {
        self.refresh();
        self.entries.get(url).map(|e| e.reason.clone())
    }

    /// Record a rejection and persist the cache. Evicts the oldest half first
    /// when the map is full.
    pub fn add_rejected(&mut self, url: &str, reason: &str) {
        self.refresh();
        if self.entries.len() >= self.max_entries {
            self.evict_oldest_half();
        }
        self.entries.insert(
            url.to_string(),
            RejectedEntry {
                reason: reason.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.save();
    }

    /// Entry count after a refresh.
    pub fn len(&mut self) -> usize {
        self.refresh();
        self.entries.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Reload from disk when the file changed since the last load (or on
    /// first use), dropping expired entries. A purge that removed anything is
    /// written back so other readers see it too.
    fn refresh(&mut self) {
        let mtime = self.file_mtime();
        if self.loaded && mtime == self.loaded_mtime {
            return;
        }

        let mut urls = match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<CacheFile>(&raw) {
                Ok(file) => file.urls,
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err,
                          "rejected-url cache unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err,
                      "rejected-url cache unreadable, starting empty");
                HashMap::new()
            }
        };

        let cutoff = Utc::now() - self.ttl;
        let before = urls.len();
        urls.retain(|_, entry| entry.timestamp > cutoff);
        let purged = before - urls.len();

        self.entries = urls;
        self.loaded = true;
        self.loaded_mtime = mtime;

        if purged > 0 {
            debug!(purged, path = %self.path.display(), "purged expired rejected URLs");
            self.save();
        }
    }

    /// Rewrite the whole file. Failures are logged and swallowed: losing the
    /// cache only costs redundant reclassification later.
    fn save(&mut self) {
        let file = CacheFile {
            timestamp: Some(Utc::now()),
            urls: self.entries.clone(),
        };
        match serde_json::to_string_pretty(&file) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %err,
                          "rejected-url cache not persisted");
                } else {
                    self.loaded_mtime = self.file_mtime();
                }
            }
            Err(err) => {
                warn!(error = %err, "rejected-url cache serialization failed");
            }
        }
    }

    /// Batch eviction: drop the oldest 50% by timestamp in one go, trading
    /// eviction frequency for simplicity.
    fn evict_oldest_half(&mut self) {
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(url, entry)| (url.clone(), entry.timestamp))
            .collect();
        by_age.sort_by_key(|(_, ts)| *ts);

        let evict = by_age.len() / 2;
        for (url, _) in by_age.into_iter().take(evict) {
            self.entries.remove(&url);
        }
        debug!(evicted = evict, path = %self.path.display(),
               "evicted oldest rejected URLs");
    }

    fn file_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
    }
}
