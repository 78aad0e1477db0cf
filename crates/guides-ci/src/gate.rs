//! Gate evaluation for pass/fail criteria.

use crate::events::{kind, RunEvent};
use serde::{Deserialize, Serialize};

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

/// Gate evaluation rules over a recorded event stream.
pub struct Gate;

impl Gate {
    /// Evaluate whether every started step completed successfully.
    ///
    /// Gate rule:
    /// - each `step_started` must be followed by a `step_passed` with
    ///   exit code 0 for the same step
    /// - any `step_failed`, or a started step with no terminal event,
    ///   fails the gate
    pub fn evaluate(events: &[RunEvent]) -> GateVerdict {
        let mut violations = Vec::new();

        let mut started = std::collections::HashSet::new();
        let mut completed = std::collections::HashSet::new();

        for event in events {
            match event.kind.as_str() {
                kind::STEP_STARTED => {
                    started.insert(step_name(event));
                }
                kind::STEP_PASSED => {
                    let exit_code = event.payload["exit_code"].as_i64().unwrap_or(-1);
                    if exit_code == 0 {
                        completed.insert(step_name(event));
                    } else {
                        violations.push(format!(
                            "step '{}' returned non-zero exit code: {}",
                            step_name(event),
                            exit_code
                        ));
                    }
                }
                kind::STEP_FAILED => {
                    let error = event.payload["error"].as_str().unwrap_or("unknown error");
                    violations.push(format!("step '{}' failed: {}", step_name(event), error));
                }
                _ => {}
            }
        }

        for step in &started {
            if !completed.contains(step) && !violations.iter().any(|v| v.contains(step.as_str())) {
                violations.push(format!("step '{step}' was started but never completed"));
            }
        }

        let passed = violations.is_empty();
        let message = if passed {
            "all steps passed".to_string()
        } else {
            format!("gate failed with {} violation(s)", violations.len())
        };

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}

fn step_name(event: &RunEvent) -> String {
    event.payload["step"].as_str().unwrap_or("unknown").to_string()
}
