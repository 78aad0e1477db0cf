//! Guide workflow step definitions and planning.

use crate::workflow::WorkflowSpec;
use pip_env_manager::VirtualEnv;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Phase a step belongs to, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    /// Environment provisioning (virtualenv creation, installer upgrade).
    Provision,
    /// Dependency installation.
    Install,
    /// Guide suite execution.
    Guide,
}

/// Builtin steps of the guide integration workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStep {
    /// python -m venv <env>
    CreateVenv,

    /// pip install --upgrade pip setuptools wheel
    UpgradeInstaller,

    /// pip install -e .[tensorflow-cpu,tests]
    InstallProject,

    /// pip install --upgrade "jax[cpu]"
    InstallJax,

    /// pip install tensorflow==2.16.0rc0
    InstallTensorflow,

    /// bash shell/run_guides.sh
    RunGuides,
}

impl BuiltinStep {
    /// All builtin steps in their fixed execution order.
    pub const SEQUENCE: [BuiltinStep; 6] = [
        BuiltinStep::CreateVenv,
        BuiltinStep::UpgradeInstaller,
        BuiltinStep::InstallProject,
        BuiltinStep::InstallJax,
        BuiltinStep::InstallTensorflow,
        BuiltinStep::RunGuides,
    ];

    /// Get the step name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStep::CreateVenv => "setup_python",
            BuiltinStep::UpgradeInstaller => "upgrade_pip",
            BuiltinStep::InstallProject => "install_project",
            BuiltinStep::InstallJax => "install_jax",
            BuiltinStep::InstallTensorflow => "install_tensorflow",
            BuiltinStep::RunGuides => "run_guides",
        }
    }

    /// Phase this step executes in.
    pub fn phase(&self) -> StepPhase {
        match self {
            BuiltinStep::CreateVenv | BuiltinStep::UpgradeInstaller => StepPhase::Provision,
            BuiltinStep::InstallProject
            | BuiltinStep::InstallJax
            | BuiltinStep::InstallTensorflow => StepPhase::Install,
            BuiltinStep::RunGuides => StepPhase::Guide,
        }
    }

    /// Whether the step invokes pip (and so uses the pip cache).
    pub fn uses_pip(&self) -> bool {
        !matches!(self, BuiltinStep::CreateVenv | BuiltinStep::RunGuides)
    }

    /// Render the step's argv against the resolved environment.
    pub fn command(&self, interpreter: &Path, env: &VirtualEnv, spec: &WorkflowSpec) -> Vec<String> {
        let pip = env.pip().display().to_string();
        match self {
            BuiltinStep::CreateVenv => env.create_command(interpreter),
            BuiltinStep::UpgradeInstaller => vec![
                pip,
                "install".to_string(),
                "--upgrade".to_string(),
                "pip".to_string(),
                "setuptools".to_string(),
                "wheel".to_string(),
            ],
            BuiltinStep::InstallProject => vec![
                pip,
                "install".to_string(),
                "--progress-bar".to_string(),
                "off".to_string(),
                "-e".to_string(),
                ".[tensorflow-cpu,tests]".to_string(),
            ],
            BuiltinStep::InstallJax => vec![
                pip,
                "install".to_string(),
                "--progress-bar".to_string(),
                "off".to_string(),
                "--upgrade".to_string(),
                "jax[cpu]".to_string(),
            ],
            BuiltinStep::InstallTensorflow => vec![
                pip,
                "install".to_string(),
                "--progress-bar".to_string(),
                "off".to_string(),
                "tensorflow==2.16.0rc0".to_string(),
            ],
            BuiltinStep::RunGuides => {
                vec!["bash".to_string(), spec.script.display().to_string()]
            }
        }
    }
}

/// Configuration for a pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Human-readable step name.
    pub name: String,

    /// Phase the step belongs to.
    pub phase: StepPhase,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,

    /// Extra environment variables for the subprocess.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,

    /// Whether this step is enabled.
    pub enabled: bool,
}

impl StepConfig {
    /// Create a step configuration from a builtin step.
    pub fn from_builtin(
        step: BuiltinStep,
        interpreter: &Path,
        env: &VirtualEnv,
        spec: &WorkflowSpec,
        timeout_secs: u64,
    ) -> Self {
        Self {
            name: step.name().to_string(),
            phase: step.phase(),
            command: step.command(interpreter, env, spec),
            env: BTreeMap::new(),
            timeout_secs,
            enabled: true,
        }
    }

    /// Create a custom step configuration.
    pub fn custom(name: String, phase: StepPhase, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            phase,
            command,
            env: BTreeMap::new(),
            timeout_secs,
            enabled: true,
        }
    }

    /// Add an environment variable for the subprocess.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Disable this step.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Build the full ordered step plan for a workflow.
///
/// The order is fixed and invariant: virtualenv creation, installer
/// upgrade, the three install groups, guide execution. Every pip step
/// points `PIP_CACHE_DIR` at the runner-managed cache directory.
pub fn plan(
    spec: &WorkflowSpec,
    interpreter: &Path,
    env: &VirtualEnv,
    pip_cache_dir: &Path,
    timeout_secs: u64,
) -> Vec<StepConfig> {
    BuiltinStep::SEQUENCE
        .iter()
        .map(|step| {
            let mut config = StepConfig::from_builtin(*step, interpreter, env, spec, timeout_secs);
            if step.uses_pip() {
                config = config.with_env("PIP_CACHE_DIR", &pip_cache_dir.display().to_string());
            }
            config
        })
        .collect()
}
