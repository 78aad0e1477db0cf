//! Dependency manifest hashing.
//!
//! The package cache is keyed by the hash of the dependency manifest
//! (`setup.py` for the guide workflow): identical manifests must map to the
//! same cache entry.

use crate::error::EnvError;
use crate::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;

/// SHA-256 hex digest of the manifest file contents.
///
/// A pure function of the file bytes: formatting-identical manifests hash
/// identically, any byte change produces a new key.
pub fn hash_manifest(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(EnvError::ManifestNotFound(path.to_path_buf()));
    }

    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    let hash = hex::encode(hasher.finalize());

    debug!("manifest hash: {}", &hash[..12]);
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_hash_manifest_deterministic() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("setup.py");
        std::fs::write(&manifest, b"from setuptools import setup\nsetup()\n").unwrap();

        let hash1 = hash_manifest(&manifest).unwrap();
        let hash2 = hash_manifest(&manifest).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA256 hex
    }

    #[test]
    fn test_changing_manifest_changes_hash() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("setup.py");

        std::fs::write(&manifest, b"setup(version='1')").unwrap();
        let hash1 = hash_manifest(&manifest).unwrap();

        std::fs::write(&manifest, b"setup(version='2')").unwrap();
        let hash2 = hash_manifest(&manifest).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_missing_manifest_errors() {
        let dir = tempdir().unwrap();
        let err = hash_manifest(&dir.path().join("setup.py")).unwrap_err();
        match err {
            EnvError::ManifestNotFound(_) => {}
            other => panic!("expected ManifestNotFound, got {other:?}"),
        }
    }
}
