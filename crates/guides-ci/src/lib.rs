//! Guides CI - documentation-guide integration workflow execution
//!
//! Provides a workflow runner that:
//! - Provisions a fresh virtual environment on a pinned interpreter
//! - Installs the framework with its alternate numerical backends
//! - Executes the guide suite and gates on its exit status
//!
//! Every run is recorded as an ordered event stream for gate evaluation
//! and offline inspection.

pub mod error;
pub mod events;
pub mod gate;
pub mod pipeline;
pub mod runner;
pub mod step;
pub mod telemetry;
pub mod workflow;

// Re-export key types
pub use error::CiError;
pub use events::{RunEvent, RunLog};
pub use gate::{Gate, GateVerdict};
pub use pipeline::{run_guide_job, GuidePipeline, PipelineOptions, RunArtifact, RunReport};
pub use runner::{StepResult, StepRunner};
pub use step::{plan, BuiltinStep, StepConfig, StepPhase};
pub use workflow::{steps_digest, Access, Permissions, Trigger, WorkflowSpec};
