//! Workflow identity, triggers and permissions.

use crate::error::CiError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::str::FromStr;

/// Events that can start a workflow run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Explicit manual invocation.
    WorkflowDispatch,
    /// Commit pushed to the repository.
    Push,
    /// Pull request opened or updated.
    PullRequest,
    /// Timed schedule.
    Schedule,
}

impl Trigger {
    /// Canonical event name.
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::WorkflowDispatch => "workflow_dispatch",
            Trigger::Push => "push",
            Trigger::PullRequest => "pull_request",
            Trigger::Schedule => "schedule",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "workflow_dispatch" | "dispatch" => Ok(Trigger::WorkflowDispatch),
            "push" => Ok(Trigger::Push),
            "pull_request" => Ok(Trigger::PullRequest),
            "schedule" => Ok(Trigger::Schedule),
            other => Err(format!("unknown trigger '{other}'")),
        }
    }
}

/// Repository access level granted to a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    Write,
    None,
}

/// Permissions requested by the workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    /// Access to repository contents.
    pub contents: Access,
}

impl Permissions {
    /// Read-only repository contents, nothing else.
    pub fn read_only() -> Self {
        Self {
            contents: Access::Read,
        }
    }
}

/// Workflow definition: identity, trigger surface and job inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowSpec {
    /// Workflow name.
    pub name: String,

    /// Triggers this workflow accepts.
    pub triggers: Vec<Trigger>,

    /// Permissions requested for the run.
    pub permissions: Permissions,

    /// Workspace root the steps run in.
    pub workspace: PathBuf,

    /// Pinned interpreter version, e.g. `3.10`.
    pub interpreter_version: String,

    /// Dependency manifest the cache key is derived from.
    pub manifest: PathBuf,

    /// Guide suite entry point, relative to the workspace.
    pub script: PathBuf,
}

impl WorkflowSpec {
    /// The guide integration workflow: manual dispatch only, read-only
    /// repository contents, Python 3.10, cache keyed by `setup.py`,
    /// guides run via `shell/run_guides.sh`.
    pub fn guide_integration(workspace: impl Into<PathBuf>) -> Self {
        Self {
            name: "guides".to_string(),
            triggers: vec![Trigger::WorkflowDispatch],
            permissions: Permissions::read_only(),
            workspace: workspace.into(),
            interpreter_version: "3.10".to_string(),
            manifest: PathBuf::from("setup.py"),
            script: PathBuf::from("shell/run_guides.sh"),
        }
    }

    /// Whether the workflow declares `trigger`.
    pub fn accepts(&self, trigger: Trigger) -> bool {
        self.triggers.contains(&trigger)
    }

    /// Reject any event the workflow does not declare.
    pub fn dispatch(&self, trigger: Trigger) -> Result<(), CiError> {
        if self.accepts(trigger) {
            Ok(())
        } else {
            Err(CiError::TriggerRejected(trigger))
        }
    }

    /// Manifest path resolved against the workspace.
    pub fn manifest_path(&self) -> PathBuf {
        self.workspace.join(&self.manifest)
    }

    /// Script path resolved against the workspace.
    pub fn script_path(&self) -> PathBuf {
        self.workspace.join(&self.script)
    }
}

/// Compute a deterministic digest of ordered step names.
pub fn steps_digest(steps: &[String]) -> String {
    let mut hasher = Sha256::new();
    for step in steps {
        hasher.update(step.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
