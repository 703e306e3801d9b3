//! In-process reference dispatcher executing handlers on spawned tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use crate::command::{CommandDescriptor, CommandOutcome, Tag};
use crate::core::config::DispatcherConfig;
use crate::core::errors::Result;

use super::registry::HandlerRegistry;
use super::traits::{CommandDispatcher, CommandHandler};

/// Exit code for a command with no registered handler
const EINVAL: i32 = 22;
/// Exit code for a command that exceeded the configured timeout
const ETIMEDOUT: i32 = 110;

/// Receiving half of the dispatcher's completion channel.
pub type Completions = mpsc::UnboundedReceiver<(Tag, CommandOutcome)>;

/// Dispatcher running handlers on the local runtime.
///
/// Submissions execute on spawned tasks bounded by a semaphore; completions
/// are emitted on a channel, always from a spawned task and never from
/// inside `submit` itself.
pub struct LocalDispatcher {
    registry: HandlerRegistry,
    completion_tx: mpsc::UnboundedSender<(Tag, CommandOutcome)>,
    semaphore: Arc<Semaphore>,
    config: DispatcherConfig,
}

impl LocalDispatcher {
    /// Returns the dispatcher and the completion stream to feed into a
    /// notification router.
    pub fn new(registry: HandlerRegistry, config: DispatcherConfig) -> (Arc<Self>, Completions) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_commands.max(1)));
        (
            Arc::new(Self {
                registry,
                completion_tx,
                semaphore,
                config,
            }),
            completion_rx,
        )
    }

    async fn run_handler(
        handler: Option<Arc<dyn CommandHandler>>,
        command: &CommandDescriptor,
        timeout: Option<Duration>,
    ) -> CommandOutcome {
        let Some(handler) = handler else {
            return CommandOutcome::failure(
                -EINVAL,
                format!("Command not found '{}'", command.prefix),
            );
        };

        if let Err(e) = handler.validate_args(command) {
            return CommandOutcome::failure(-EINVAL, e.to_string());
        }

        let execution = handler.execute(command);
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, execution).await {
                Ok(result) => result,
                Err(_) => {
                    return CommandOutcome::failure(
                        -ETIMEDOUT,
                        format!("Command '{}' timed out", command.prefix),
                    );
                }
            },
            None => execution.await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => CommandOutcome::failure(1, e.to_string()),
        }
    }
}

#[async_trait]
impl CommandDispatcher for LocalDispatcher {
    fn submit(&self, tag: Tag, command: CommandDescriptor) {
        let handler = self.registry.get(&command.prefix);
        let completion_tx = self.completion_tx.clone();
        let semaphore = self.semaphore.clone();
        let timeout = self.config.command_timeout;

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            debug!("Executing '{}' as {}", command, tag);
            let outcome = Self::run_handler(handler, &command, timeout).await;
            if completion_tx.send((tag.clone(), outcome)).is_err() {
                warn!("Completion channel closed, dropping result for {}", tag);
            }
        });
    }

    async fn submit_blocking(&self, command: CommandDescriptor) -> Result<CommandOutcome> {
        let handler = self.registry.get(&command.prefix);
        Ok(Self::run_handler(handler, &command, self.config.command_timeout).await)
    }
}
