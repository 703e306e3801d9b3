//! Per-command results written by the completion path.

use serde::{Deserialize, Serialize};

use super::tag::Tag;
use super::CommandDescriptor;

/// Exit code and captured output reported when a command completes.
///
/// Code 0 signals success; anything else is a command failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub code: i32,
    pub stdout: String,
    pub output: String,
}

impl CommandOutcome {
    /// Successful outcome with the given captured output
    pub fn success(stdout: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            output: output.into(),
        }
    }

    /// Failed outcome carrying a nonzero exit code
    pub fn failure(code: i32, output: impl Into<String>) -> Self {
        debug_assert!(code != 0, "failure outcome requires a nonzero code");
        Self {
            code,
            stdout: String::new(),
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// One in-flight asynchronous command.
///
/// Created when the command is dispatched; its outcome is written exactly
/// once by the completion path and the result is never reused afterwards.
#[derive(Clone, Debug, Serialize)]
pub struct CommandResult {
    pub tag: Tag,
    /// Human-readable command, captured at dispatch time for reporting
    pub command: String,
    pub descriptor: CommandDescriptor,
    pub outcome: Option<CommandOutcome>,
}

impl CommandResult {
    pub fn new(tag: Tag, descriptor: CommandDescriptor) -> Self {
        Self {
            tag,
            command: descriptor.human_readable(),
            descriptor,
            outcome: None,
        }
    }

    pub(crate) fn complete(&mut self, outcome: CommandOutcome) {
        debug_assert!(self.outcome.is_none(), "command completed twice");
        self.outcome = Some(outcome);
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.outcome.as_ref().map(|outcome| outcome.code)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.exit_code(), Some(0))
    }
}
