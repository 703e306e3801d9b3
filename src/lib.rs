// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
}

// Command batching pipeline, in dependency order
pub mod command; // descriptors, tags, per-command results
pub mod dispatch; // transport seam + in-process reference dispatcher
pub mod batch; // staged coordinator with a stage barrier
pub mod router; // process-wide completion routing

// Re-exports for convenience
pub use self::core::config::{DispatcherConfig, RetentionPolicy, RouterConfig};
pub use self::core::errors::{ConvoyError, Result};

pub use batch::{BatchCoordinator, BatchSnapshot, BatchState, BatchStatus, Plan, Stage};
pub use command::{CommandDescriptor, CommandOutcome, CommandResult, Tag, SENTINEL_TAG};
pub use dispatch::{CommandDispatcher, CommandHandler, Completions, HandlerRegistry, LocalDispatcher};
pub use router::{ClusterNotification, NotificationRouter};
