//! Disk-backed, TTL-expiring cache for raw fetched pages.
//!
//! The cache is what makes multi-hour runs resumable: every successfully
//! fetched page is written immediately, so an interrupted run restarted with
//! unchanged parameters re-issues no network traffic for pages it already
//! holds. Keys are canonical request signatures; the on-disk filename is the
//! SHA-256 hex digest of the key. Entries older than the TTL are treated as
//! misses even though physically present, and corrupt or unreadable entries
//! degrade to a miss, never an error.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Default cache TTL: 31 days.
pub const DEFAULT_TTL_DAYS: u64 = 31;

/// On-disk envelope for one cached page.
///
/// The original key is stored alongside the body so a cache directory can be
/// audited by hand; lookups only ever go through the hashed filename.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    /// Unix seconds at which the page was fetched.
    fetched_at: u64,
    body: String,
}

/// Disk-backed key/value store for raw pages with TTL expiry.
#[derive(Debug)]
pub struct PageCache {
    root: PathBuf,
    ttl: Duration,
}

impl PageCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the root directory cannot be created.
    pub fn open(root: &Path, ttl: Duration) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        debug!(root = %root.display(), ttl_secs = ttl.as_secs(), "page cache open");
        Ok(Self {
            root: root.to_path_buf(),
            ttl,
        })
    }

    /// Looks up a page by its canonical request key.
    ///
    /// Returns `None` on a genuine miss, an expired entry, or any read or
    /// decode failure (corruption degrades to a miss).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(key, error = %e, "cache entry unreadable, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "cache entry corrupt, treating as miss");
                return None;
            }
        };

        if self.is_expired(entry.fetched_at) {
            debug!(key, fetched_at = entry.fetched_at, "cache entry expired");
            return None;
        }

        debug!(key, bytes = entry.body.len(), "cache hit");
        Some(entry.body)
    }

    /// Stores a page under its canonical request key.
    ///
    /// The entry is written to a temporary file and renamed into place so a
    /// crash mid-write leaves no half-entry behind.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the entry cannot be written. Callers treat
    /// this as non-fatal (the fetch itself succeeded).
    pub fn put(&self, key: &str, body: &str) -> std::io::Result<()> {
        let entry = CacheEntry {
            key: key.to_string(),
            fetched_at: unix_now(),
            body: body.to_string(),
        };
        let serialized = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, &path)?;
        debug!(key, bytes = body.len(), "cache write");
        Ok(())
    }

    /// Stores a page, downgrading write failures to a warning.
    pub fn put_best_effort(&self, key: &str, body: &str) {
        if let Err(e) = self.put(key, body) {
            warn!(key, error = %e, "failed to write cache entry, continuing");
        }
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_expired(&self, fetched_at: u64) -> bool {
        // A timestamp from the future (clock skew) counts as fresh.
        unix_now().saturating_sub(fetched_at) > self.ttl.as_secs()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let mut name = String::with_capacity(69);
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push_str(".json");
        self.root.join(name)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_cache(dir: &TempDir, ttl: Duration) -> PageCache {
        PageCache::open(dir.path(), ttl).unwrap()
    }

    /// Writes an entry with a back-dated fetch time, bypassing `put`.
    fn write_entry_aged(cache: &PageCache, key: &str, body: &str, age: Duration) {
        let entry = CacheEntry {
            key: key.to_string(),
            fetched_at: unix_now() - age.as_secs(),
            body: body.to_string(),
        };
        let path = cache.path_for(key);
        std::fs::write(path, serde_json::to_string(&entry).unwrap()).unwrap();
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, Duration::from_secs(60));

        cache.put("/user/show/9", "<html>profile</html>").unwrap();
        assert_eq!(
            cache.get("/user/show/9").as_deref(),
            Some("<html>profile</html>")
        );
    }

    #[test]
    fn test_missing_key_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, Duration::from_secs(60));
        assert!(cache.get("/never/fetched").is_none());
    }

    #[test]
    fn test_entry_older_than_ttl_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let ttl = Duration::from_secs(DEFAULT_TTL_DAYS * 24 * 60 * 60);
        let cache = open_cache(&dir, ttl);

        // 32 days old: physically present but expired.
        write_entry_aged(&cache, "/book/reviews/42", "old", Duration::from_secs(32 * 24 * 60 * 60));
        assert!(cache.get("/book/reviews/42").is_none());

        // 30 days old: still served.
        write_entry_aged(&cache, "/book/reviews/43", "young", Duration::from_secs(30 * 24 * 60 * 60));
        assert_eq!(cache.get("/book/reviews/43").as_deref(), Some("young"));
    }

    #[test]
    fn test_corrupt_entry_degrades_to_miss() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, Duration::from_secs(60));

        std::fs::write(cache.path_for("/author/list/7"), "not json {{{").unwrap();
        assert!(cache.get("/author/list/7").is_none());
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, Duration::from_secs(60));

        cache.put("/book/reviews/42?page=1&rating=1", "one").unwrap();
        cache.put("/book/reviews/42?page=1&rating=2", "two").unwrap();

        assert_eq!(cache.get("/book/reviews/42?page=1&rating=1").as_deref(), Some("one"));
        assert_eq!(cache.get("/book/reviews/42?page=1&rating=2").as_deref(), Some("two"));
    }

    #[test]
    fn test_put_overwrites_previous_entry() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir, Duration::from_secs(60));

        cache.put("/user/show/9", "first").unwrap();
        cache.put("/user/show/9", "second").unwrap();
        assert_eq!(cache.get("/user/show/9").as_deref(), Some("second"));
    }
}
