//! File-based caching for registry responses.
//!
//! Release lists fetched from PyPI are kept as one JSON file per key so that
//! repeated package reports against the same index do not refetch them.
//! Entries expire after a TTL measured from the file's modification time; a
//! TTL of zero disables the cache.
//!
//! # Cache Location
//!
//! - Linux: `~/.cache/reqstats/`
//! - macOS: `~/Library/Caches/reqstats/`
//! - Windows: `%LOCALAPPDATA%\reqstats\`
//!
//! # Example
//!
//! ```no_run
//! use reqstats::Cache;
//!
//! let cache = Cache::new();
//! cache.set("pypi_releases_django", &vec!["2.0".to_string()]).unwrap();
//!
//! let releases: Option<Vec<String>> = cache.get("pypi_releases_django");
//! assert!(releases.is_some());
//! ```

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Default cache TTL in hours.
pub const CACHE_TTL_HOURS: u64 = 24;

/// Returns the platform cache directory for reqstats.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("reqstats")
}

#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Cache in the platform directory with the default 24-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl_hours(CACHE_TTL_HOURS)
    }

    pub fn with_ttl_hours(hours: u64) -> Self {
        Self::in_dir(cache_dir(), hours)
    }

    /// Cache rooted at `dir` instead of the platform directory.
    pub fn in_dir(dir: impl Into<PathBuf>, hours: u64) -> Self {
        Self {
            dir: dir.into(),
            ttl: Duration::from_secs(hours * 3600),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Maps a key onto a file name, replacing anything that is not
    /// alphanumeric, `-` or `_`.
    fn entry_path(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| match c {
                c if c.is_ascii_alphanumeric() => c,
                '-' | '_' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let age = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok());
        match age {
            Some(age) => age <= self.ttl,
            // clock skew or unreadable metadata: trust the entry
            None => true,
        }
    }

    /// Returns the cached value for `key`, or `None` when it is missing,
    /// expired, or unreadable. Expired entries are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }

        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        if !self.is_fresh(&path) {
            debug!(key, "cache entry expired");
            let _ = fs::remove_file(&path);
            return None;
        }

        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Stores `value` under `key`. A disabled cache stores nothing.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;
        let path = self.entry_path(key);
        fs::write(&path, serde_json::to_string(value)?)
            .with_context(|| format!("Failed to write cache entry {}", path.display()))?;
        Ok(())
    }

    /// Removes every cached entry and returns how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path(), 1);

        let releases = vec!["2.0".to_string(), "1.11".to_string()];
        cache.set("pypi_releases_django", &releases).unwrap();

        let cached: Option<Vec<String>> = cache.get("pypi_releases_django");
        assert_eq!(cached, Some(releases));
    }

    #[test]
    fn test_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path(), 1);
        assert_eq!(cache.get::<String>("absent"), None);
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path().join("cache"), 0);
        assert!(!cache.is_enabled());

        cache.set("key", &"value".to_string()).unwrap();
        assert_eq!(cache.get::<String>("key"), None);
        assert!(!cache.dir().exists());
    }

    #[test]
    fn test_keys_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path(), 1);
        let path = cache.entry_path("pypi_releases_zope.interface");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "pypi_releases_zope_interface.json"
        );
    }

    #[test]
    fn test_clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path(), 1);
        cache.set("a", &1u32).unwrap();
        cache.set("b", &2u32).unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.get::<u32>("a"), None);
        assert_eq!(cache.get::<u32>("b"), None);
    }

    #[test]
    fn test_clear_without_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::in_dir(dir.path().join("never-created"), 1);
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
