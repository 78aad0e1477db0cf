//! Pinned Python interpreter resolution.
//!
//! The guide workflow runs against one pinned interpreter version; this
//! module locates a matching binary before any environment is created.

use crate::error::EnvError;
use crate::Result;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Resolve the interpreter binary for a pinned version such as `"3.10"`.
///
/// Resolution order:
/// 1. A versioned binary (`python3.10`) on PATH.
/// 2. `python3`, accepted only if `--version` reports the pinned version.
pub fn resolve_interpreter(version: &str) -> Result<PathBuf> {
    let versioned = format!("python{version}");
    if let Some(path) = probe(&versioned, version) {
        debug!("using {versioned}");
        return Ok(path);
    }

    debug!("no {versioned} on PATH, trying python3");
    if let Some(path) = probe("python3", version) {
        return Ok(path);
    }

    warn!("no Python {version} interpreter available");
    Err(EnvError::InterpreterNotFound(version.to_string()))
}

/// Run `<candidate> --version` and accept the binary if it reports `version`.
fn probe(candidate: &str, version: &str) -> Option<PathBuf> {
    let output = Command::new(candidate).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }

    // Older interpreters print the version banner to stderr.
    let banner = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).to_string()
    };

    match reported_version(&banner) {
        Some(reported) if reported == version => Some(PathBuf::from(candidate)),
        _ => None,
    }
}

/// Extract `major.minor` from a `Python X.Y.Z` version banner.
fn reported_version(banner: &str) -> Option<String> {
    let rest = banner.trim().strip_prefix("Python ")?;
    let mut parts = rest.split('.');
    let major = parts.next()?;
    let minor = parts.next()?;
    if major.is_empty() || minor.is_empty() {
        return None;
    }
    Some(format!("{major}.{minor}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_version_full_banner() {
        assert_eq!(
            reported_version("Python 3.10.13"),
            Some("3.10".to_string())
        );
    }

    #[test]
    fn test_reported_version_trailing_newline() {
        assert_eq!(reported_version("Python 3.11.4\n"), Some("3.11".to_string()));
    }

    #[test]
    fn test_reported_version_rejects_garbage() {
        assert_eq!(reported_version("pypy 7.3"), None);
        assert_eq!(reported_version(""), None);
        assert_eq!(reported_version("Python "), None);
    }

    #[test]
    fn test_resolve_unknown_version_fails() {
        // No host has a Python 9.99; both strategies must fall through.
        let err = resolve_interpreter("9.99").unwrap_err();
        match err {
            EnvError::InterpreterNotFound(v) => assert_eq!(v, "9.99"),
            other => panic!("expected InterpreterNotFound, got {other:?}"),
        }
    }
}
