//! Fail-fast pipeline orchestration and run reporting.

use crate::error::CiError;
use crate::events::{kind, RunEvent, RunLog};
use crate::runner::{StepResult, StepRunner};
use crate::step::{plan, StepConfig, StepPhase};
use crate::workflow::{steps_digest, Trigger, WorkflowSpec};
use pip_env_manager::{resolve_interpreter, CacheKey, CacheOutcome, CacheStore, VirtualEnv};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Options controlling a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// OS identifier used in the cache key (e.g. `ubuntu-latest`).
    pub os_id: String,

    /// Root of the package-cache store; `None` disables caching.
    pub cache_root: Option<PathBuf>,

    /// Directory holding the pip cache during the run.
    pub pip_cache_dir: PathBuf,

    /// Per-step timeout in seconds (0 = none).
    pub timeout_secs: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            os_id: std::env::consts::OS.to_string(),
            cache_root: None,
            pip_cache_dir: std::env::temp_dir().join("guides-pip-cache"),
            timeout_secs: 0,
        }
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier from the event log.
    pub run_id: String,

    /// Whether every executed step passed.
    pub success: bool,

    /// Results of the executed steps, in order. On failure the list ends
    /// at the failing step; later steps were never started.
    pub steps: Vec<StepResult>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the ordered step names.
    pub steps_digest: String,

    /// Cache resolution outcome, if caching was enabled.
    pub cache: Option<CacheOutcome>,
}

impl RunReport {
    /// Number of steps that passed.
    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.passed()).count()
    }

    /// Number of steps that failed.
    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.passed()).count()
    }
}

/// Persisted run document: report plus the full event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub report: RunReport,
    pub events: Vec<RunEvent>,
}

impl RunArtifact {
    /// Write the artifact as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<(), CiError> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load an artifact previously written with [`RunArtifact::write`].
    pub fn read(path: &Path) -> Result<Self, CiError> {
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }
}

/// Guide pipeline orchestrator.
pub struct GuidePipeline;

impl GuidePipeline {
    /// Execute a prepared step sequence, fail-fast.
    ///
    /// Steps run strictly in order. The first failing step halts the run:
    /// later steps are never started, so the guide step cannot run after a
    /// failed install. The package cache is restored once, between the
    /// provisioning and install phases, and conditionally saved after the
    /// sequence ends.
    pub async fn run(
        log: &mut RunLog,
        spec: &WorkflowSpec,
        trigger: Trigger,
        steps: Vec<StepConfig>,
        opts: &PipelineOptions,
    ) -> Result<RunReport, CiError> {
        spec.dispatch(trigger)?;

        let start = Instant::now();
        let names: Vec<String> = steps.iter().map(|s| s.name.clone()).collect();
        let digest = steps_digest(&names);

        info!(run_id = %log.run_id, trigger = %trigger, workflow = %spec.name, "starting workflow run");

        let store = opts.cache_root.as_ref().map(CacheStore::new);
        let mut cache_key: Option<CacheKey> = None;
        let mut cache_outcome: Option<CacheOutcome> = None;
        let mut cache_resolved = false;

        let mut results = Vec::new();
        let mut failed = false;

        for config in steps {
            if !config.enabled {
                info!(step = %config.name, "skipping disabled step");
                continue;
            }

            // Cache resolution sits between the provisioning and install
            // phases of the fixed sequence.
            if !cache_resolved && config.phase != StepPhase::Provision {
                cache_resolved = true;
                if let Some(store) = &store {
                    match Self::restore_cache(log, spec, store, opts) {
                        Ok((key, outcome)) => {
                            cache_key = Some(key);
                            cache_outcome = Some(outcome);
                        }
                        Err(e) => warn!("cache restore skipped: {e}"),
                    }
                }
            }

            log.record(
                kind::STEP_STARTED,
                json!({
                    "step": &config.name,
                    "phase": config.phase,
                    "command": &config.command,
                    "timeout_secs": config.timeout_secs,
                }),
            );

            info!(step = %config.name, "executing step");

            let result = match StepRunner::execute(&config, &spec.workspace).await {
                Ok(r) => r,
                // Spawn failure or timeout: the step never produced an
                // exit status, recorded as exit code -1.
                Err(e) => StepResult::execution_error(&config, &e.to_string()),
            };

            if result.passed() {
                log.record(
                    kind::STEP_PASSED,
                    json!({
                        "step": &result.step_name,
                        "exit_code": result.exit_code,
                        "duration_ms": result.duration_ms,
                    }),
                );
                results.push(result);
            } else {
                log.record(
                    kind::STEP_FAILED,
                    json!({
                        "step": &result.step_name,
                        "exit_code": result.exit_code,
                        "stderr": &result.stderr,
                        "duration_ms": result.duration_ms,
                        "error": format!(
                            "step '{}' exited with code {}",
                            result.step_name, result.exit_code
                        ),
                    }),
                );
                warn!(step = %result.step_name, exit_code = result.exit_code, "step failed, aborting run");
                results.push(result);
                failed = true;
                // Fail-fast: nothing after a failed step runs.
                break;
            }
        }

        // The cache is written at most once per run, only on a miss.
        if let (Some(store), Some(key)) = (&store, &cache_key) {
            if let Some(outcome) = cache_outcome.as_mut() {
                if !outcome.hit {
                    match store.save(key, &opts.pip_cache_dir) {
                        Ok(saved) => {
                            outcome.saved = saved;
                            if saved {
                                log.record(kind::CACHE_SAVED, json!({ "key": key.to_string() }));
                            }
                        }
                        Err(e) => warn!("cache save failed: {e}"),
                    }
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = !failed;

        if success {
            info!(run_id = %log.run_id, "workflow run completed successfully");
        } else {
            info!(run_id = %log.run_id, "workflow run failed");
        }

        Ok(RunReport {
            run_id: log.run_id.clone(),
            success,
            steps: results,
            duration_ms,
            steps_digest: digest,
            cache: cache_outcome,
        })
    }

    fn restore_cache(
        log: &mut RunLog,
        spec: &WorkflowSpec,
        store: &CacheStore,
        opts: &PipelineOptions,
    ) -> Result<(CacheKey, CacheOutcome), CiError> {
        let key = CacheKey::from_manifest(&opts.os_id, &spec.manifest_path())?;
        let hit = store.restore(&key, &opts.pip_cache_dir)?;

        log.record(
            kind::CACHE_RESTORED,
            json!({ "key": key.to_string(), "hit": hit }),
        );

        let outcome = CacheOutcome {
            key: key.to_string(),
            hit,
            saved: false,
        };
        Ok((key, outcome))
    }
}

/// Resolve the environment and run the full guide workflow.
///
/// Provisions a fresh virtual environment on the pinned interpreter
/// (discarded at run end unless `env_root` pins it to a path), plans the
/// builtin step sequence and executes it fail-fast.
pub async fn run_guide_job(
    log: &mut RunLog,
    spec: &WorkflowSpec,
    trigger: Trigger,
    opts: &PipelineOptions,
    env_root: Option<PathBuf>,
) -> Result<RunReport, CiError> {
    // Reject non-dispatch events before provisioning anything.
    spec.dispatch(trigger)?;

    let interpreter = resolve_interpreter(&spec.interpreter_version)?;

    let (venv, _scratch) = match env_root {
        Some(root) => (VirtualEnv::new(root), None),
        None => {
            let dir = tempfile::tempdir()?;
            (VirtualEnv::new(dir.path().join("venv")), Some(dir))
        }
    };

    let steps = plan(spec, &interpreter, &venv, &opts.pip_cache_dir, opts.timeout_secs);
    GuidePipeline::run(log, spec, trigger, steps, opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepPhase;

    fn step_result(name: &str, exit_code: i32) -> StepResult {
        StepResult {
            step_name: name.to_string(),
            phase: StepPhase::Install,
            exit_code,
            stdout: "".to_string(),
            stderr: "".to_string(),
            duration_ms: 100,
            success: exit_code == 0,
        }
    }

    #[test]
    fn test_run_report_counts() {
        let report = RunReport {
            run_id: "run123".to_string(),
            success: true,
            steps: vec![step_result("upgrade_pip", 0), step_result("install_jax", 0)],
            duration_ms: 300,
            steps_digest: "abc123".to_string(),
            cache: None,
        };

        assert_eq!(report.passed_count(), 2);
        assert_eq!(report.failed_count(), 0);
        assert!(report.success);
    }

    #[test]
    fn test_run_report_with_failure() {
        let report = RunReport {
            run_id: "run123".to_string(),
            success: false,
            steps: vec![step_result("upgrade_pip", 0), step_result("install_jax", 1)],
            duration_ms: 300,
            steps_digest: "abc123".to_string(),
            cache: None,
        };

        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.success);
    }

    #[test]
    fn test_artifact_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut log = RunLog::new();
        log.record(kind::STEP_STARTED, json!({ "step": "run_guides" }));

        let artifact = RunArtifact {
            report: RunReport {
                run_id: log.run_id.clone(),
                success: true,
                steps: vec![step_result("run_guides", 0)],
                duration_ms: 42,
                steps_digest: "digest".to_string(),
                cache: None,
            },
            events: log.events().to_vec(),
        };

        artifact.write(&path).unwrap();
        let back = RunArtifact::read(&path).unwrap();

        assert_eq!(back.report.run_id, artifact.report.run_id);
        assert_eq!(back.events.len(), 1);
        assert_eq!(back.events[0].kind, "step_started");
    }
}
