//! Routes asynchronous command completions to live coordinators.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::batch::{BatchCoordinator, BatchSnapshot, Plan};
use crate::command::{CommandDescriptor, CommandOutcome, Tag};
use crate::core::config::{RetentionPolicy, RouterConfig};
use crate::core::errors::Result;
use crate::dispatch::{CommandDispatcher, Completions};

/// Notification delivered by the hosting process.
///
/// Only command completions are routed; anything else is logged at debug
/// level and dropped.
#[derive(Clone, Debug)]
pub enum ClusterNotification {
    /// A dispatched command finished with the given outcome
    Command { tag: Tag, outcome: CommandOutcome },
    /// Any other notification type
    Other(String),
}

/// Process-wide registry of live batch coordinators plus the completion
/// routing logic.
///
/// The registry lock is always taken before any coordinator's own lock,
/// and no coordinator lock is held while taking another's.
pub struct NotificationRouter {
    dispatcher: Arc<dyn CommandDispatcher>,
    coordinators: DashMap<String, Arc<BatchCoordinator>>,
    config: RouterConfig,
}

impl NotificationRouter {
    pub fn new(dispatcher: Arc<dyn CommandDispatcher>) -> Arc<Self> {
        Self::with_config(dispatcher, RouterConfig::default())
    }

    pub fn with_config(dispatcher: Arc<dyn CommandDispatcher>, config: RouterConfig) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            coordinators: DashMap::new(),
            config,
        })
    }

    /// Drain a dispatcher's completion stream into this router on a
    /// background task.
    pub fn spawn_listener(router: Arc<Self>, mut completions: Completions) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some((tag, outcome)) = completions.recv().await {
                router.on_command_completed(&tag, outcome);
            }
            debug!("Completion channel closed, listener exiting");
        })
    }

    /// Create and register a coordinator for the plan.
    ///
    /// The first stage is dispatched before this returns.
    pub fn submit_plan(&self, plan: Plan) -> Arc<BatchCoordinator> {
        let coordinator = BatchCoordinator::create(plan, self.dispatcher.clone());
        info!("Submitted batch request {}", coordinator.id());
        self.coordinators
            .insert(coordinator.id().to_string(), coordinator.clone());
        if coordinator.is_finished() {
            self.apply_retention();
        }
        coordinator
    }

    /// `submit_plan`, then block until the coordinator reaches its
    /// terminal state. No timeout: a lost completion blocks forever.
    pub async fn submit_plan_wait(&self, plan: Plan) -> Arc<BatchCoordinator> {
        let coordinator = self.submit_plan(plan);
        coordinator.wait_finished().await;
        coordinator
    }

    /// Typed notification entry point for the hosting process.
    pub fn handle(&self, notification: ClusterNotification) {
        match notification {
            ClusterNotification::Command { tag, outcome } => {
                self.on_command_completed(&tag, outcome);
            }
            ClusterNotification::Other(kind) => {
                debug!("Unhandled notification type '{}'", kind);
            }
        }
    }

    /// Route one command completion to the coordinator running `tag`.
    ///
    /// A tag matching no live coordinator is logged and dropped: stale and
    /// duplicate deliveries are expected, never fatal.
    pub fn on_command_completed(&self, tag: &Tag, outcome: CommandOutcome) {
        // Sentinel commands bypass batching; the blocking caller already
        // holds the outcome.
        if tag.is_sentinel() {
            return;
        }

        let matches: Vec<Arc<BatchCoordinator>> = self
            .coordinators
            .iter()
            .filter(|entry| entry.value().is_running(tag))
            .map(|entry| entry.value().clone())
            .collect();

        if matches.len() != 1 {
            warn!("Unknown request '{}'", tag);
            return;
        }

        let coordinator = &matches[0];
        coordinator.finish(tag, outcome);
        if coordinator.is_ready() {
            coordinator.advance();
        }
        if coordinator.is_finished() {
            self.apply_retention();
        }
    }

    /// Run a single command to completion, bypassing batching entirely.
    pub async fn run_command(&self, command: CommandDescriptor) -> Result<CommandOutcome> {
        self.dispatcher.submit_blocking(command).await
    }

    pub fn get(&self, id: &str) -> Option<Arc<BatchCoordinator>> {
        self.coordinators.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshots of every live coordinator, oldest first.
    pub fn snapshot_all(&self) -> Vec<BatchSnapshot> {
        let mut coordinators: Vec<Arc<BatchCoordinator>> = self
            .coordinators
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        coordinators.sort_by_key(|coordinator| coordinator.created_at());
        coordinators
            .iter()
            .map(|coordinator| coordinator.snapshot())
            .collect()
    }

    /// Drop one coordinator regardless of state.
    pub fn release(&self, id: &str) -> bool {
        self.coordinators.remove(id).is_some()
    }

    /// Drop every finished coordinator, returning how many were removed.
    pub fn evict_finished(&self) -> usize {
        let before = self.coordinators.len();
        self.coordinators
            .retain(|_, coordinator| !coordinator.is_finished());
        before - self.coordinators.len()
    }

    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }

    fn apply_retention(&self) {
        let RetentionPolicy::Bounded(keep) = self.config.retention else {
            return;
        };
        let mut finished: Vec<Arc<BatchCoordinator>> = self
            .coordinators
            .iter()
            .filter(|entry| entry.value().is_finished())
            .map(|entry| entry.value().clone())
            .collect();
        if finished.len() <= keep {
            return;
        }
        finished.sort_by_key(|coordinator| coordinator.created_at());
        let excess = finished.len() - keep;
        for coordinator in finished.into_iter().take(excess) {
            debug!("Evicting finished request {}", coordinator.id());
            self.coordinators.remove(coordinator.id());
        }
    }
}
