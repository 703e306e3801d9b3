//! Staged batch execution with a strict stage-to-stage barrier.

pub mod coordinator;
pub mod types;

pub use coordinator::BatchCoordinator;
pub use types::{BatchSnapshot, BatchState, BatchStatus, CommandReport, Plan, Stage};
