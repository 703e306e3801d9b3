//! The batch coordinator: staged parallel execution of administrative
//! commands with a strict stage-to-stage barrier.
//!
//! A plan `[[c1, c2], [c3, c4]]` runs c1 and c2 in parallel, waits for
//! both to resolve, then runs c3 and c4 in parallel.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::command::{CommandOutcome, CommandResult, Tag};
use crate::dispatch::CommandDispatcher;

use super::types::{BatchSnapshot, BatchState, BatchStatus, CommandReport, Plan, Stage};

/// Tracks one plan's execution end-to-end.
///
/// A failed command never aborts its stage or the plan: it is recorded and
/// the plan proceeds to completion, with the failure surfaced through
/// [`has_failed`](Self::has_failed) and [`status`](Self::status).
pub struct BatchCoordinator {
    id: String,
    created_at: DateTime<Utc>,
    dispatcher: Arc<dyn CommandDispatcher>,
    inner: Mutex<BatchInner>,
    done: Notify,
}

struct BatchInner {
    state: BatchState,
    stages_remaining: VecDeque<Stage>,
    running: Vec<CommandResult>,
    finished: Vec<CommandResult>,
    failed: Vec<CommandResult>,
}

impl BatchCoordinator {
    /// Create a coordinator and dispatch the plan's first stage.
    ///
    /// Empty stages are dropped. A plan with nothing left to run yields a
    /// coordinator that is finished from birth, with no commands ever
    /// dispatched.
    pub fn create(plan: Plan, dispatcher: Arc<dyn CommandDispatcher>) -> Arc<Self> {
        let mut stages: VecDeque<Stage> =
            plan.into_iter().filter(|stage| !stage.is_empty()).collect();
        let first = stages.pop_front();

        let coordinator = Arc::new(Self {
            id: cuid2::create_id(),
            created_at: Utc::now(),
            dispatcher,
            inner: Mutex::new(BatchInner {
                state: BatchState::Created,
                stages_remaining: stages,
                running: Vec::new(),
                finished: Vec::new(),
                failed: Vec::new(),
            }),
            done: Notify::new(),
        });

        let mut inner = coordinator.inner.lock();
        match first {
            Some(stage) => {
                inner.running = coordinator.dispatch_stage(stage);
                inner.state = BatchState::StageActive;
            }
            None => {
                debug!("Batch {} has nothing to run", coordinator.id);
                inner.state = BatchState::Finished;
            }
        }
        drop(inner);

        coordinator
    }

    /// Dispatch every command of a stage in parallel, tagging each
    /// `{id}:{index}` with the index relative to this stage.
    fn dispatch_stage(&self, stage: Stage) -> Vec<CommandResult> {
        let mut results = Vec::with_capacity(stage.len());
        for (index, descriptor) in stage.into_iter().enumerate() {
            let tag = Tag::batch(self.id.clone(), index);
            let result = CommandResult::new(tag.clone(), descriptor.clone());
            debug!("Dispatching '{}' as {}", result.command, tag);
            self.dispatcher.submit(tag, descriptor);
            results.push(result);
        }
        results
    }

    /// Record one completion.
    ///
    /// Returns false for a tag that is not part of the active stage (stale
    /// or foreign); nothing is mutated in that case.
    pub fn finish(&self, tag: &Tag, outcome: CommandOutcome) -> bool {
        let mut inner = self.inner.lock();
        let Some(position) = inner.running.iter().position(|result| &result.tag == tag) else {
            return false;
        };

        let mut result = inner.running.remove(position);
        let succeeded = outcome.is_success();
        if !succeeded {
            warn!(
                "Command '{}' ({}) failed with code {}",
                result.command, tag, outcome.code
            );
        }
        result.complete(outcome);
        if succeeded {
            inner.finished.push(result);
        } else {
            inner.failed.push(result);
        }

        if inner.running.is_empty() && inner.stages_remaining.is_empty() {
            inner.state = BatchState::Finished;
            info!("Batch {} finished", self.id);
            drop(inner);
            self.done.notify_waiters();
        }
        true
    }

    /// Dispatch the next stage once the active one has fully resolved.
    ///
    /// Spurious calls (commands still running, or nothing left) are
    /// no-ops.
    pub fn advance(&self) {
        let mut inner = self.inner.lock();
        if !inner.running.is_empty() {
            return;
        }
        let Some(stage) = inner.stages_remaining.pop_front() else {
            return;
        };
        inner.state = BatchState::Advancing;
        inner.running = self.dispatch_stage(stage);
        inner.state = BatchState::StageActive;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True iff `tag` is part of the active stage and unresolved
    pub fn is_running(&self, tag: &Tag) -> bool {
        self.inner
            .lock()
            .running
            .iter()
            .any(|result| &result.tag == tag)
    }

    /// True iff the active stage has resolved and another stage waits:
    /// the coordinator should advance now.
    pub fn is_ready(&self) -> bool {
        let inner = self.inner.lock();
        inner.running.is_empty() && !inner.stages_remaining.is_empty()
    }

    /// True iff at least one stage has not been dispatched yet
    pub fn is_waiting(&self) -> bool {
        !self.inner.lock().stages_remaining.is_empty()
    }

    /// Terminal check: nothing running and nothing left to dispatch
    pub fn is_finished(&self) -> bool {
        let inner = self.inner.lock();
        inner.running.is_empty() && inner.stages_remaining.is_empty()
    }

    /// True once any command has failed; never resets
    pub fn has_failed(&self) -> bool {
        !self.inner.lock().failed.is_empty()
    }

    pub fn state(&self) -> BatchState {
        self.inner.lock().state
    }

    /// Derived overall status: pending until finished, then failed iff
    /// any command failed.
    pub fn status(&self) -> BatchStatus {
        let inner = self.inner.lock();
        if !(inner.running.is_empty() && inner.stages_remaining.is_empty()) {
            BatchStatus::Pending
        } else if !inner.failed.is_empty() {
            BatchStatus::Failed
        } else {
            BatchStatus::Success
        }
    }

    /// Serializable view for status reporting.
    pub fn snapshot(&self) -> BatchSnapshot {
        let inner = self.inner.lock();
        let is_waiting = !inner.stages_remaining.is_empty();
        let is_finished = inner.running.is_empty() && inner.stages_remaining.is_empty();
        let has_failed = !inner.failed.is_empty();
        let status = if !is_finished {
            BatchStatus::Pending
        } else if has_failed {
            BatchStatus::Failed
        } else {
            BatchStatus::Success
        };

        BatchSnapshot {
            id: self.id.clone(),
            state: inner.state,
            running: inner.running.iter().map(CommandReport::from).collect(),
            finished: inner.finished.iter().map(CommandReport::from).collect(),
            waiting: inner
                .stages_remaining
                .iter()
                .map(|stage| stage.iter().map(|command| command.human_readable()).collect())
                .collect(),
            failed: inner.failed.iter().map(CommandReport::from).collect(),
            is_waiting,
            is_finished,
            has_failed,
            status,
        }
    }

    /// Resolve once the coordinator reaches its terminal state.
    ///
    /// Signaled by the completion path; no polling and no timeout, so a
    /// lost completion blocks the caller indefinitely.
    pub async fn wait_finished(&self) {
        loop {
            let notified = self.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_finished() {
                return;
            }
            notified.await;
        }
    }
}
