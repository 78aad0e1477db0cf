//! Step execution with output capture.

use crate::error::CiError;
use crate::step::{StepConfig, StepPhase};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Result of a step execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name.
    pub step_name: String,

    /// Phase the step ran in.
    pub phase: StepPhase,

    /// Exit code (0 = success, -1 = the process could not run).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StepResult {
    /// Whether this step passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Synthesize a result for a step whose process could not run
    /// (spawn failure or timeout).
    pub fn execution_error(config: &StepConfig, error: &str) -> Self {
        Self {
            step_name: config.name.clone(),
            phase: config.phase,
            exit_code: -1,
            stdout: String::new(),
            stderr: error.to_string(),
            duration_ms: 0,
            success: false,
        }
    }
}

/// Step runner: one subprocess per step, sequential by construction.
pub struct StepRunner;

impl StepRunner {
    /// Execute a single step in `workdir` and return the captured result.
    ///
    /// The process inherits the parent environment plus the step's own
    /// variables, runs with piped stdout/stderr, and is bounded by the
    /// step's timeout when one is set.
    pub async fn execute(config: &StepConfig, workdir: &Path) -> Result<StepResult, CiError> {
        let start = Instant::now();

        if config.command.is_empty() {
            return Err(CiError::EmptyCommand(config.name.clone()));
        }

        let exe = &config.command[0];
        let args = &config.command[1..];

        let child = Command::new(exe)
            .args(args)
            .current_dir(workdir)
            .envs(&config.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = if config.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| CiError::StepTimeout {
                step: config.name.clone(),
                timeout_secs: config.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();

        Ok(StepResult {
            step_name: config.name.clone(),
            phase: config.phase,
            exit_code,
            stdout,
            stderr,
            duration_ms,
            success,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepPhase;

    #[test]
    fn test_step_result_passed() {
        let result = StepResult {
            step_name: "run_guides".to_string(),
            phase: StepPhase::Guide,
            exit_code: 0,
            stdout: "".to_string(),
            stderr: "".to_string(),
            duration_ms: 100,
            success: true,
        };
        assert!(result.passed());
    }

    #[test]
    fn test_step_result_failed() {
        let result = StepResult {
            step_name: "install_project".to_string(),
            phase: StepPhase::Install,
            exit_code: 1,
            stdout: "".to_string(),
            stderr: "error".to_string(),
            duration_ms: 100,
            success: false,
        };
        assert!(!result.passed());
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let config = StepConfig::custom(
            "echo_test".to_string(),
            StepPhase::Install,
            vec!["echo".to_string(), "hello".to_string()],
            60,
        );

        let result = StepRunner::execute(&config, Path::new("."))
            .await
            .expect("execute failed");
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let config = StepConfig::custom(
            "false_test".to_string(),
            StepPhase::Install,
            vec!["false".to_string()],
            60,
        );

        let result = StepRunner::execute(&config, Path::new("."))
            .await
            .expect("execute failed");
        assert!(!result.success);
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_execute_passes_step_env() {
        let config = StepConfig::custom(
            "env_test".to_string(),
            StepPhase::Install,
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "printf %s \"$PIP_CACHE_DIR\"".to_string(),
            ],
            60,
        )
        .with_env("PIP_CACHE_DIR", "/scratch/pip-cache");

        let result = StepRunner::execute(&config, Path::new("."))
            .await
            .expect("execute failed");
        assert_eq!(result.stdout, "/scratch/pip-cache");
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let config = StepConfig::custom(
            "sleep_test".to_string(),
            StepPhase::Install,
            vec!["sleep".to_string(), "5".to_string()],
            1,
        );

        let err = StepRunner::execute(&config, Path::new("."))
            .await
            .unwrap_err();
        match err {
            CiError::StepTimeout { step, timeout_secs } => {
                assert_eq!(step, "sleep_test");
                assert_eq!(timeout_secs, 1);
            }
            other => panic!("expected StepTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_empty_command_rejected() {
        let config = StepConfig::custom("empty".to_string(), StepPhase::Install, vec![], 60);
        let err = StepRunner::execute(&config, Path::new(".")).await.unwrap_err();
        assert!(matches!(err, CiError::EmptyCommand(_)));
    }
}
