use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::errors::{ConvoyError, Result};

/// Dispatcher tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum number of commands executing concurrently
    pub max_parallel_commands: usize,
    /// Per-command execution timeout (None = unlimited)
    pub command_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_parallel_commands: 16,
            command_timeout: None,
        }
    }
}

impl DispatcherConfig {
    /// Set the concurrency limit
    pub fn with_max_parallel(mut self, max_parallel_commands: usize) -> Self {
        self.max_parallel_commands = max_parallel_commands;
        self
    }

    /// Set the per-command timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_commands == 0 {
            return Err(ConvoyError::configuration(
                "max_parallel_commands must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Retention rule for finished coordinators held by the router.
///
/// The router keeps every coordinator for later status queries; nothing is
/// evicted except through this policy or a caller-driven release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionPolicy {
    /// Never evict
    KeepAll,
    /// Keep at most this many finished coordinators, oldest evicted first
    Bounded(usize),
}

/// Router tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// What happens to coordinators once they finish
    pub retention: RetentionPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::KeepAll,
        }
    }
}

impl RouterConfig {
    /// Set the retention policy
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}
