//! Error types for pip-env-manager

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the environment layer
#[derive(Error, Debug)]
pub enum EnvError {
    /// No interpreter matching the pinned version is available
    #[error("no Python {0} interpreter found in PATH")]
    InterpreterNotFound(String),

    /// Dependency manifest missing
    #[error("dependency manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
