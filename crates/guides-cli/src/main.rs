//! Guide integration runner CLI
//!
//! The `guides` command dispatches and executes the documentation-guide
//! integration workflow locally.
//!
//! ## Commands
//!
//! - `run`: dispatch the workflow and execute the full step sequence
//! - `plan`: print the resolved step sequence without executing it
//! - `hash`: show the manifest hash and the derived cache key
//! - `gate`: evaluate the gate over a saved run artifact

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use guides_ci::{
    plan, run_guide_job, Gate, PipelineOptions, RunArtifact, RunLog, Trigger, WorkflowSpec,
};
use pip_env_manager::{hash_manifest, resolve_interpreter, CacheKey, VirtualEnv};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "guides")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Documentation guide integration runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch the guide workflow and execute it
    Run {
        /// Workspace root (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Triggering event (the workflow only accepts workflow-dispatch)
        #[arg(long, default_value = "workflow-dispatch")]
        event: String,

        /// Pinned interpreter version
        #[arg(long, default_value = "3.10")]
        python: String,

        /// Dependency manifest the cache key is derived from
        #[arg(long, default_value = "setup.py")]
        manifest: PathBuf,

        /// Guide suite entry point
        #[arg(long, default_value = "shell/run_guides.sh")]
        script: PathBuf,

        /// Package-cache store root (default: .guides/cache in the workspace)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Skip cache restore/save
        #[arg(long)]
        no_cache: bool,

        /// OS identifier used in the cache key
        #[arg(long)]
        os_id: Option<String>,

        /// Per-step timeout in seconds (0 = none)
        #[arg(long, default_value = "0")]
        timeout_secs: u64,

        /// Keep the virtual environment at this path instead of a temp dir
        #[arg(long)]
        keep_env: Option<PathBuf>,

        /// Write the run artifact (report + events) to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the resolved step sequence without executing it
    Plan {
        /// Workspace root
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Pinned interpreter version
        #[arg(long, default_value = "3.10")]
        python: String,

        /// Dependency manifest
        #[arg(long, default_value = "setup.py")]
        manifest: PathBuf,

        /// Guide suite entry point
        #[arg(long, default_value = "shell/run_guides.sh")]
        script: PathBuf,
    },

    /// Show the manifest hash and the derived cache key
    Hash {
        /// Dependency manifest file
        #[arg(default_value = "setup.py")]
        manifest: PathBuf,

        /// OS identifier used in the cache key
        #[arg(long)]
        os_id: Option<String>,
    },

    /// Evaluate the gate over a saved run artifact
    Gate {
        /// Run artifact JSON written by `guides run --report`
        artifact: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    guides_ci::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            workspace,
            event,
            python,
            manifest,
            script,
            cache_dir,
            no_cache,
            os_id,
            timeout_secs,
            keep_env,
            report,
        } => {
            cmd_run(
                workspace,
                &event,
                python,
                manifest,
                script,
                cache_dir,
                no_cache,
                os_id,
                timeout_secs,
                keep_env,
                report.as_deref(),
            )
            .await
        }
        Commands::Plan {
            workspace,
            python,
            manifest,
            script,
        } => cmd_plan(workspace, python, manifest, script),
        Commands::Hash { manifest, os_id } => cmd_hash(&manifest, os_id.as_deref()),
        Commands::Gate { artifact } => cmd_gate(&artifact),
    }
}

fn build_spec(
    workspace: PathBuf,
    python: String,
    manifest: PathBuf,
    script: PathBuf,
) -> WorkflowSpec {
    let mut spec = WorkflowSpec::guide_integration(workspace);
    spec.interpreter_version = python;
    spec.manifest = manifest;
    spec.script = script;
    spec
}

/// Dispatch the workflow and execute the full step sequence
#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    workspace: PathBuf,
    event: &str,
    python: String,
    manifest: PathBuf,
    script: PathBuf,
    cache_dir: Option<PathBuf>,
    no_cache: bool,
    os_id: Option<String>,
    timeout_secs: u64,
    keep_env: Option<PathBuf>,
    report_path: Option<&std::path::Path>,
) -> Result<()> {
    let trigger: Trigger = event
        .parse()
        .map_err(|e: String| anyhow::anyhow!("invalid --event: {e}"))?;

    let spec = build_spec(workspace, python, manifest, script);

    // The pip cache lives in a per-run scratch directory; cached snapshots
    // persist under the store root between runs.
    let scratch = tempfile::tempdir().context("failed to create scratch directory")?;
    let opts = PipelineOptions {
        os_id: os_id.unwrap_or_else(|| std::env::consts::OS.to_string()),
        cache_root: if no_cache {
            None
        } else {
            Some(cache_dir.unwrap_or_else(|| spec.workspace.join(".guides/cache")))
        },
        pip_cache_dir: scratch.path().join("pip-cache"),
        timeout_secs,
    };

    let mut log = RunLog::new();
    let run_report = run_guide_job(&mut log, &spec, trigger, &opts, keep_env).await?;

    if let Some(path) = report_path {
        let artifact = RunArtifact {
            report: run_report.clone(),
            events: log.events().to_vec(),
        };
        artifact
            .write(path)
            .with_context(|| format!("failed to write run artifact to {}", path.display()))?;
        info!("run artifact written to {}", path.display());
    }

    println!(
        "run {}: {} ({} passed, {} failed, {} ms)",
        run_report.run_id,
        if run_report.success { "success" } else { "failure" },
        run_report.passed_count(),
        run_report.failed_count(),
        run_report.duration_ms
    );
    for step in &run_report.steps {
        println!(
            "  {} {} ({} ms)",
            if step.passed() { "ok  " } else { "FAIL" },
            step.step_name,
            step.duration_ms
        );
    }
    if let Some(cache) = &run_report.cache {
        println!(
            "cache {}: {}",
            cache.key,
            if cache.hit {
                "hit"
            } else if cache.saved {
                "miss (saved)"
            } else {
                "miss"
            }
        );
    }

    if !run_report.success {
        anyhow::bail!("guide workflow failed");
    }
    Ok(())
}

/// Print the resolved step sequence without executing it
fn cmd_plan(workspace: PathBuf, python: String, manifest: PathBuf, script: PathBuf) -> Result<()> {
    let spec = build_spec(workspace, python, manifest, script);

    // Planning must work on hosts without the pinned interpreter; fall
    // back to the versioned binary name for display.
    let interpreter = resolve_interpreter(&spec.interpreter_version)
        .unwrap_or_else(|_| PathBuf::from(format!("python{}", spec.interpreter_version)));
    let venv = VirtualEnv::new(spec.workspace.join(".venv"));
    let pip_cache_dir = spec.workspace.join(".guides/pip-cache");

    let steps = plan(&spec, &interpreter, &venv, &pip_cache_dir, 0);

    println!("workflow: {} (triggers: workflow_dispatch)", spec.name);
    for (index, step) in steps.iter().enumerate() {
        println!(
            "  {}. [{}] {}: {}",
            index + 1,
            match step.phase {
                guides_ci::StepPhase::Provision => "provision",
                guides_ci::StepPhase::Install => "install",
                guides_ci::StepPhase::Guide => "guide",
            },
            step.name,
            step.command.join(" ")
        );
    }
    Ok(())
}

/// Show the manifest hash and the derived cache key
fn cmd_hash(manifest: &std::path::Path, os_id: Option<&str>) -> Result<()> {
    let hash = hash_manifest(manifest)
        .with_context(|| format!("failed to hash manifest {}", manifest.display()))?;
    let os = os_id
        .map(str::to_string)
        .unwrap_or_else(|| std::env::consts::OS.to_string());
    let key = CacheKey::new(&os, &hash);

    println!("manifest: {}", manifest.display());
    println!("hash:     {hash}");
    println!("key:      {key}");
    Ok(())
}

/// Evaluate the gate over a saved run artifact
fn cmd_gate(artifact_path: &std::path::Path) -> Result<()> {
    let artifact = RunArtifact::read(artifact_path)
        .with_context(|| format!("failed to read run artifact {}", artifact_path.display()))?;

    let verdict = Gate::evaluate(&artifact.events);

    println!("run {}: {}", artifact.report.run_id, verdict.message);
    for violation in &verdict.violations {
        println!("  - {violation}");
    }

    if !verdict.passed {
        anyhow::bail!("gate failed");
    }
    Ok(())
}
