//! Seams between the coordinator and whatever actually executes commands.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::command::{CommandDescriptor, CommandOutcome, Tag};
use crate::core::errors::{ConvoyError, Result};

/// In-process implementation of one command prefix.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Command prefix served by this handler
    fn prefix(&self) -> &str;

    /// JSON schema describing the command arguments.
    ///
    /// Handlers returning a schema get their arguments validated before
    /// `execute` runs; `None` skips validation.
    fn args_schema(&self) -> Option<Value> {
        None
    }

    /// Run the command.
    ///
    /// A nonzero outcome is a command failure; an `Err` is converted into
    /// one by the dispatcher.
    async fn execute(&self, command: &CommandDescriptor) -> anyhow::Result<CommandOutcome>;

    fn validate_args(&self, command: &CommandDescriptor) -> Result<()> {
        let Some(schema) = self.args_schema() else {
            return Ok(());
        };
        let compiled = jsonschema::validator_for(&schema).map_err(|e| {
            ConvoyError::validation(self.prefix(), format!("Failed to compile args schema: {}", e))
        })?;
        let args = Value::Object(command.args.clone());
        if let Err(errors) = compiled.validate(&args) {
            warn!(
                "Argument validation failed for '{}': {}",
                self.prefix(),
                errors
            );
            return Err(ConvoyError::validation(self.prefix(), errors.to_string()));
        }
        Ok(())
    }
}

/// Asynchronous command transport consumed by the batch coordinator.
///
/// Implementations must deliver exactly one completion per submitted tag,
/// and never from inside the submitting call stack: the coordinator
/// dispatches while holding its own lock.
#[async_trait]
pub trait CommandDispatcher: Send + Sync + 'static {
    /// Fire-and-forget submission of one tagged command
    fn submit(&self, tag: Tag, command: CommandDescriptor);

    /// Run a single untagged command to completion, bypassing batching
    async fn submit_blocking(&self, command: CommandDescriptor) -> Result<CommandOutcome>;
}
