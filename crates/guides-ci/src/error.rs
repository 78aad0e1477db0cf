//! Error types for the guide pipeline.

use crate::workflow::Trigger;
use thiserror::Error;

/// Errors that can occur while dispatching or executing a workflow
#[derive(Error, Debug)]
pub enum CiError {
    /// The workflow does not declare the triggering event
    #[error("trigger '{0}' is not accepted by this workflow")]
    TriggerRejected(Trigger),

    /// A step was configured without a command
    #[error("step '{0}' has an empty command")]
    EmptyCommand(String),

    /// A step exceeded its wall-clock limit
    #[error("step '{step}' timed out after {timeout_secs} seconds")]
    StepTimeout { step: String, timeout_secs: u64 },

    /// Environment layer failure (interpreter, manifest, cache)
    #[error("environment error: {0}")]
    Env(#[from] pip_env_manager::EnvError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
