//! Package-cache store keyed by OS identifier and manifest hash.
//!
//! Snapshots of the pip cache directory live under `<root>/<os>-pip-<hash>`.
//! Each run reads its entry at most once and conditionally writes it once;
//! an existing entry is never overwritten. The cache is a performance
//! optimisation only and has no correctness implications.

use crate::manifest::hash_manifest;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cache key rendered as `{os}-pip-{manifest_hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Operating system identifier (e.g. `ubuntu-latest`).
    pub os: String,
    /// SHA-256 hex digest of the dependency manifest.
    pub manifest_hash: String,
}

impl CacheKey {
    /// Create a key from an already-computed manifest hash.
    pub fn new(os: &str, manifest_hash: &str) -> Self {
        Self {
            os: os.to_string(),
            manifest_hash: manifest_hash.to_string(),
        }
    }

    /// Derive the key for a manifest file on the given OS.
    pub fn from_manifest(os: &str, manifest: &Path) -> Result<Self> {
        Ok(Self::new(os, &hash_manifest(manifest)?))
    }

    /// First 12 characters of the manifest hash.
    pub fn short(&self) -> &str {
        &self.manifest_hash[..12.min(self.manifest_hash.len())]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-pip-{}", self.os, self.manifest_hash)
    }
}

/// Outcome of cache resolution for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheOutcome {
    /// Fully rendered cache key.
    pub key: String,
    /// Whether a prior entry was restored.
    pub hit: bool,
    /// Whether a new entry was written at run end.
    pub saved: bool,
}

/// Local directory store of pip-cache snapshots.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// On-disk location of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.to_string())
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_dir()
    }

    /// Restore the entry for `key` into `dest`. Returns whether it was a hit.
    pub fn restore(&self, key: &CacheKey, dest: &Path) -> Result<bool> {
        let entry = self.entry_path(key);
        if !entry.is_dir() {
            debug!(key = %key, "cache miss");
            return Ok(false);
        }

        copy_dir(&entry, dest)?;
        info!(key = %key, "cache restored");
        Ok(true)
    }

    /// Save `src` under `key` unless the entry already exists.
    ///
    /// Returns whether a new entry was written. An empty or missing `src`
    /// is skipped silently.
    pub fn save(&self, key: &CacheKey, src: &Path) -> Result<bool> {
        let entry = self.entry_path(key);
        if entry.exists() {
            debug!(key = %key, "cache entry already present, not overwriting");
            return Ok(false);
        }
        if !src.is_dir() || std::fs::read_dir(src)?.next().is_none() {
            debug!(key = %key, "nothing to cache");
            return Ok(false);
        }

        std::fs::create_dir_all(&self.root)?;
        copy_dir(src, &entry)?;
        info!(key = %key, "cache saved");
        Ok(true)
    }
}

/// Recursive directory copy.
fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else {
            std::fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_key_rendering() {
        let key = CacheKey::new("ubuntu-latest", "abc123");
        assert_eq!(key.to_string(), "ubuntu-latest-pip-abc123");
    }

    #[test]
    fn test_key_short() {
        let key = CacheKey::new("ubuntu-latest", "abc123def456789");
        assert_eq!(key.short(), "abc123def456");
    }

    #[test]
    fn test_key_is_pure_function_of_manifest() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("setup.py");
        std::fs::write(&manifest, b"setup()").unwrap();

        let key1 = CacheKey::from_manifest("ubuntu-latest", &manifest).unwrap();
        let key2 = CacheKey::from_manifest("ubuntu-latest", &manifest).unwrap();
        assert_eq!(key1, key2);

        let other_os = CacheKey::from_manifest("macos-latest", &manifest).unwrap();
        assert_ne!(key1, other_os);
        assert_eq!(key1.manifest_hash, other_os.manifest_hash);
    }

    #[test]
    fn test_restore_miss_returns_false() {
        let store_dir = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let store = CacheStore::new(store_dir.path());
        let key = CacheKey::new("ubuntu-latest", "deadbeef");

        let hit = store.restore(&key, dest.path()).unwrap();
        assert!(!hit);
    }

    #[test]
    fn test_save_then_restore_roundtrip() {
        let store_dir = tempdir().unwrap();
        let store = CacheStore::new(store_dir.path());
        let key = CacheKey::new("ubuntu-latest", "cafebabe");

        let src = tempdir().unwrap();
        std::fs::create_dir(src.path().join("wheels")).unwrap();
        std::fs::write(src.path().join("wheels/pkg.whl"), b"wheel-bytes").unwrap();

        assert!(store.save(&key, src.path()).unwrap());
        assert!(store.contains(&key));

        let dest = tempdir().unwrap();
        assert!(store.restore(&key, dest.path()).unwrap());
        let restored = std::fs::read(dest.path().join("wheels/pkg.whl")).unwrap();
        assert_eq!(restored, b"wheel-bytes");
    }

    #[test]
    fn test_save_never_overwrites_existing_entry() {
        let store_dir = tempdir().unwrap();
        let store = CacheStore::new(store_dir.path());
        let key = CacheKey::new("ubuntu-latest", "0011223344");

        let src = tempdir().unwrap();
        std::fs::write(src.path().join("a.whl"), b"v1").unwrap();
        assert!(store.save(&key, src.path()).unwrap());

        std::fs::write(src.path().join("a.whl"), b"v2").unwrap();
        assert!(!store.save(&key, src.path()).unwrap());

        let dest = tempdir().unwrap();
        store.restore(&key, dest.path()).unwrap();
        assert_eq!(std::fs::read(dest.path().join("a.whl")).unwrap(), b"v1");
    }

    #[test]
    fn test_save_empty_source_skipped() {
        let store_dir = tempdir().unwrap();
        let store = CacheStore::new(store_dir.path());
        let key = CacheKey::new("ubuntu-latest", "5566");

        let src = tempdir().unwrap();
        assert!(!store.save(&key, src.path()).unwrap());
        assert!(!store.contains(&key));
    }
}
