//! Pip-Env-Manager: interpreter, virtualenv and package-cache integration
//! for the guide runner.
//!
//! This crate provides the environment layer of the guide workflow:
//! resolving the pinned Python interpreter, laying out the per-run virtual
//! environment, hashing the dependency manifest, and restoring/saving the
//! pip cache keyed by that hash.
//!
//! ## Layer 1 - Environment/Tooling
//!
//! Focus: correct key derivation and a fresh, disposable environment per run.

pub mod cache;
pub mod error;
pub mod interpreter;
pub mod manifest;
pub mod venv;

pub use cache::{CacheKey, CacheOutcome, CacheStore};
pub use error::EnvError;
pub use interpreter::resolve_interpreter;
pub use manifest::hash_manifest;
pub use venv::VirtualEnv;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, EnvError>;
