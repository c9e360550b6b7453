//! Structured JSONL logger for debugging and run reconstruction.
//!
//! This module provides machine-parseable logging with:
//! - Monotonic sequence numbers for ordering
//! - ISO 8601 timestamps with microsecond precision
//! - Run IDs and attempt numbers for correlation across retries
//! - Structured event data in JSON format

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::{DraftSlot, StepKind};
use crate::generation::OutputSchema;
use crate::state_machine::{Route, StateEvent};

/// Structured JSONL logger for debugging and run reconstruction.
pub struct StructuredLogger {
    run_id: String,
    attempt: AtomicU64,
    seq: AtomicU64,
    log_file: Mutex<File>,
    log_path: PathBuf,
}

/// A single log entry in JSONL format.
#[derive(Serialize, serde::Deserialize)]
pub struct LogEntry {
    /// Monotonic sequence number (unique across the run)
    pub seq: u64,
    /// ISO 8601 timestamp with microseconds
    pub ts: String,
    /// Run ID
    pub run_id: String,
    /// Traversal attempt (increments when a failed traversal is retried)
    pub attempt: u64,
    /// Component that emitted the log
    pub component: String,
    /// Structured event data
    pub event: Value,
}

impl StructuredLogger {
    /// Creates a new structured logger for the given run.
    ///
    /// Logs are written to `<logs_dir>/events.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The logs directory cannot be created
    /// - The log file cannot be opened
    pub fn new(run_id: &str, logs_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let log_path = logs_dir.join("events.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            run_id: run_id.to_string(),
            attempt: AtomicU64::new(1),
            seq: AtomicU64::new(0),
            log_file: Mutex::new(file),
            log_path,
        })
    }

    /// Increments the attempt number (called when a traversal is retried).
    pub fn increment_attempt(&self) {
        self.attempt.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the next sequence number.
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Logs a structured event.
    ///
    /// The event is serialized to JSON and written as a single line.
    /// This method is thread-safe.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = LogEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            run_id: self.run_id.clone(),
            attempt: self.attempt.load(Ordering::SeqCst),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut file) = self.log_file.lock() {
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(file, "{}", line);
                let _ = file.flush();
            }
        }
    }

    /// Logs a state event emitted by the state machine.
    pub fn log_state_event(&self, event: &StateEvent) {
        self.log(
            "StateMachine",
            serde_json::json!({
                "type": "StateEvent",
                "event": event
            }),
        );
    }

    /// Logs a delta the state machine applied.
    pub fn log_delta_applied(&self, step: StepKind, token_cost: u64, total_tokens: u64) {
        self.log(
            "StateMachine",
            serde_json::json!({
                "type": "DeltaApplied",
                "step": step,
                "token_cost": token_cost,
                "total_llm_tokens": total_tokens
            }),
        );
    }

    /// Logs a delta the state machine rejected.
    pub fn log_delta_rejected(&self, step: StepKind, reason: &str) {
        self.log(
            "StateMachine",
            serde_json::json!({
                "type": "DeltaRejected",
                "step": step,
                "reason": reason
            }),
        );
    }

    /// Logs a generation call about to be made.
    pub fn log_step_invocation(&self, step: StepKind, schema: OutputSchema) {
        self.log(
            "Step",
            serde_json::json!({
                "type": "Invocation",
                "step": step,
                "schema": schema
            }),
        );
    }

    /// Logs the end of a generation call.
    pub fn log_step_complete(&self, step: StepKind, success: bool, token_cost: u64) {
        self.log(
            "Step",
            serde_json::json!({
                "type": "Complete",
                "step": step,
                "success": success,
                "token_cost": token_cost
            }),
        );
    }

    /// Logs a router decision.
    pub fn log_route_decision(&self, slot: DraftSlot, iteration_count: u32, route: &Route) {
        self.log(
            "Router",
            serde_json::json!({
                "type": "RouteDecision",
                "slot": slot,
                "iteration_count": iteration_count,
                "route": route
            }),
        );
    }

    /// Logs the start of a graph traversal.
    pub fn log_traversal_start(&self, graph: &str) {
        self.log(
            "Graph",
            serde_json::json!({
                "type": "TraversalStart",
                "graph": graph
            }),
        );
    }

    /// Logs the end of a graph traversal.
    pub fn log_traversal_complete(&self, graph: &str, result: &str) {
        self.log(
            "Graph",
            serde_json::json!({
                "type": "TraversalComplete",
                "graph": graph,
                "result": result
            }),
        );
    }

    /// Returns the path to the log file.
    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }

    /// Returns the run ID.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

#[cfg(test)]
#[path = "tests/structured_logger_tests.rs"]
mod tests;
