//! Run event log.
//!
//! Every pipeline run appends an ordered event stream; the gate evaluates
//! the stream and the run artifact persists it for offline inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Event kinds recorded by the pipeline.
pub mod kind {
    pub const STEP_STARTED: &str = "step_started";
    pub const STEP_PASSED: &str = "step_passed";
    pub const STEP_FAILED: &str = "step_failed";
    pub const CACHE_RESTORED: &str = "cache_restored";
    pub const CACHE_SAVED: &str = "cache_saved";
}

/// One recorded event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunEvent {
    /// Monotonically increasing sequence number, starting at 1.
    pub seq: u64,

    /// Event kind (see [`kind`]).
    pub kind: String,

    /// Structured payload.
    pub payload: Value,

    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Append-only in-memory event log for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    /// Unique run identifier.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    events: Vec<RunEvent>,
}

impl RunLog {
    /// Start a new log with a fresh run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    /// Append an event, returning its sequence number.
    pub fn record(&mut self, kind: &str, payload: Value) -> u64 {
        let seq = self.events.len() as u64 + 1;
        self.events.push(RunEvent {
            seq,
            kind: kind.to_string(),
            payload,
            timestamp: Utc::now(),
        });
        seq
    }

    /// Recorded events, in order.
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_assigns_sequential_seq() {
        let mut log = RunLog::new();
        assert_eq!(log.record(kind::STEP_STARTED, json!({"step": "a"})), 1);
        assert_eq!(log.record(kind::STEP_PASSED, json!({"step": "a"})), 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].kind, "step_started");
        assert_eq!(log.events()[1].seq, 2);
    }

    #[test]
    fn test_fresh_log_has_unique_run_id() {
        let a = RunLog::new();
        let b = RunLog::new();
        assert!(!a.run_id.is_empty());
        assert_ne!(a.run_id, b.run_id);
        assert!(a.is_empty());
    }

    #[test]
    fn test_log_serde_roundtrip() {
        let mut log = RunLog::new();
        log.record(kind::CACHE_RESTORED, json!({"key": "ubuntu-latest-pip-abc", "hit": false}));

        let json = serde_json::to_string(&log).unwrap();
        let back: RunLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, log.run_id);
        assert_eq!(back.events(), log.events());
    }
}
