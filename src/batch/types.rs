//! Core types for staged batch execution.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::{CommandDescriptor, CommandResult};

/// Ordered stages submitted as one unit of work.
pub type Plan = Vec<Stage>;

/// Commands issued concurrently between two barriers.
pub type Stage = Vec<CommandDescriptor>;

/// Lifecycle of a batch coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Constructed, first stage not yet dispatched
    Created,
    /// The active stage has commands in flight
    StageActive,
    /// Barrier crossed, next stage being dispatched
    Advancing,
    /// All stages consumed and nothing running; terminal
    Finished,
}

/// Overall status reported to callers; derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Success,
    Failed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Success => "success",
            BatchStatus::Failed => "failed",
        };
        f.write_str(status)
    }
}

/// Per-command view exposed in snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandReport {
    pub command: String,
    pub stdout: String,
    pub output: String,
}

impl From<&CommandResult> for CommandReport {
    fn from(result: &CommandResult) -> Self {
        let (stdout, output) = match &result.outcome {
            Some(outcome) => (outcome.stdout.clone(), outcome.output.clone()),
            None => (String::new(), String::new()),
        };
        Self {
            command: result.command.clone(),
            stdout,
            output,
        }
    }
}

/// Point-in-time serializable view of one coordinator.
///
/// Intended for direct serialization to a status response; exposes no
/// locks or dispatcher handles.
#[derive(Clone, Debug, Serialize)]
pub struct BatchSnapshot {
    pub id: String,
    pub state: BatchState,
    pub running: Vec<CommandReport>,
    pub finished: Vec<CommandReport>,
    pub waiting: Vec<Vec<String>>,
    pub failed: Vec<CommandReport>,
    pub is_waiting: bool,
    pub is_finished: bool,
    pub has_failed: bool,
    pub status: BatchStatus,
}
