//! Coordinator tests driven by a recording stub dispatcher.
//!
//! The stub records every submission and completes nothing on its own, so
//! each test controls exactly when and in what order completions arrive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use convoy::{
    BatchCoordinator, BatchState, BatchStatus, CommandDescriptor, CommandDispatcher,
    CommandOutcome, Tag,
};

#[derive(Default)]
struct RecordingDispatcher {
    submitted: Mutex<Vec<(Tag, CommandDescriptor)>>,
}

impl RecordingDispatcher {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn submitted(&self) -> Vec<(Tag, CommandDescriptor)> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl CommandDispatcher for RecordingDispatcher {
    fn submit(&self, tag: Tag, command: CommandDescriptor) {
        self.submitted.lock().push((tag, command));
    }

    async fn submit_blocking(&self, command: CommandDescriptor) -> convoy::Result<CommandOutcome> {
        Ok(CommandOutcome::success(format!("ran {}", command.prefix), ""))
    }
}

fn cmd(prefix: &str) -> CommandDescriptor {
    CommandDescriptor::new(prefix)
}

#[tokio::test]
async fn test_first_stage_dispatched_from_constructor() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(
        vec![vec![cmd("osd out"), cmd("osd in")], vec![cmd("osd up")]],
        dispatcher.clone(),
    );

    let submitted = dispatcher.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].0, Tag::batch(coordinator.id(), 0));
    assert_eq!(submitted[1].0, Tag::batch(coordinator.id(), 1));
    assert_eq!(submitted[0].1.prefix, "osd out");
    assert_eq!(submitted[1].1.prefix, "osd in");

    assert!(coordinator.is_waiting());
    assert!(!coordinator.is_ready());
    assert!(!coordinator.is_finished());
    assert_eq!(coordinator.state(), BatchState::StageActive);
    assert_eq!(coordinator.status(), BatchStatus::Pending);
}

#[tokio::test]
async fn test_stages_run_in_order_with_barrier() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(
        vec![vec![cmd("a"), cmd("b")], vec![cmd("c")]],
        dispatcher.clone(),
    );
    let id = coordinator.id().to_string();

    // Complete B before A; the barrier holds until both resolve.
    assert!(coordinator.finish(&Tag::batch(&id, 1), CommandOutcome::success("", "")));
    assert!(!coordinator.is_ready());
    assert!(!coordinator.is_finished());
    assert_eq!(dispatcher.submitted().len(), 2);

    assert!(coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("", "")));
    assert!(coordinator.is_ready());
    coordinator.advance();

    // The second stage restarts per-stage indices at zero.
    let submitted = dispatcher.submitted();
    assert_eq!(submitted.len(), 3);
    assert_eq!(submitted[2].0, Tag::batch(&id, 0));
    assert_eq!(submitted[2].1.prefix, "c");
    assert!(!coordinator.is_waiting());
    assert!(!coordinator.is_finished());

    assert!(coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("done", "")));
    assert!(coordinator.is_finished());
    assert_eq!(coordinator.state(), BatchState::Finished);
    assert_eq!(coordinator.status(), BatchStatus::Success);
}

#[tokio::test]
async fn test_failed_command_recorded_but_plan_proceeds() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(
        vec![vec![cmd("a"), cmd("b")], vec![cmd("c")]],
        dispatcher.clone(),
    );
    let id = coordinator.id().to_string();

    coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("", ""));
    coordinator.finish(&Tag::batch(&id, 1), CommandOutcome::failure(1, "boom"));
    assert!(coordinator.has_failed());
    assert!(coordinator.is_ready());

    // Failure never blocks the barrier.
    coordinator.advance();
    assert_eq!(dispatcher.submitted().len(), 3);

    coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("", ""));
    assert!(coordinator.is_finished());
    assert!(coordinator.has_failed());
    assert_eq!(coordinator.status(), BatchStatus::Failed);

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.finished.len(), 2);
    assert_eq!(snapshot.failed.len(), 1);
    assert_eq!(snapshot.failed[0].command, "b");
    assert_eq!(snapshot.failed[0].output, "boom");
}

#[tokio::test]
async fn test_empty_leading_stage_dropped_at_construction() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator =
        BatchCoordinator::create(vec![vec![], vec![cmd("x")]], dispatcher.clone());

    // The empty stage vanished: x went out immediately as the first real
    // stage and nothing is left waiting.
    let submitted = dispatcher.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].0, Tag::batch(coordinator.id(), 0));
    assert!(!coordinator.is_waiting());
    assert!(!coordinator.is_finished());

    coordinator.finish(
        &Tag::batch(coordinator.id(), 0),
        CommandOutcome::success("", ""),
    );
    assert!(coordinator.is_finished());
}

#[tokio::test]
async fn test_plan_of_empty_stages_is_finished_from_birth() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(vec![vec![], vec![]], dispatcher.clone());

    assert!(dispatcher.submitted().is_empty());
    assert!(coordinator.is_finished());
    assert!(!coordinator.is_waiting());
    assert!(!coordinator.has_failed());
    assert_eq!(coordinator.state(), BatchState::Finished);
    assert_eq!(coordinator.status(), BatchStatus::Success);

    let snapshot = coordinator.snapshot();
    assert!(snapshot.running.is_empty());
    assert!(snapshot.finished.is_empty());
    assert!(snapshot.failed.is_empty());
    assert!(snapshot.waiting.is_empty());

    // Must resolve immediately, no completion will ever arrive.
    coordinator.wait_finished().await;
}

#[tokio::test]
async fn test_foreign_tags_rejected_without_mutation() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(vec![vec![cmd("a")]], dispatcher.clone());

    assert!(!coordinator.finish(
        &Tag::batch("someone-else", 0),
        CommandOutcome::success("", "")
    ));
    assert!(!coordinator.finish(&Tag::Sentinel, CommandOutcome::success("", "")));
    assert!(!coordinator.finish(
        &Tag::batch(coordinator.id(), 7),
        CommandOutcome::success("", "")
    ));

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.running.len(), 1);
    assert!(snapshot.finished.is_empty());
    assert!(snapshot.failed.is_empty());
    assert!(!coordinator.is_finished());
}

#[tokio::test]
async fn test_completing_a_tag_twice_fails_the_second_time() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(vec![vec![cmd("a")]], dispatcher.clone());
    let tag = Tag::batch(coordinator.id(), 0);

    assert!(coordinator.finish(&tag, CommandOutcome::success("first", "")));
    assert!(!coordinator.finish(&tag, CommandOutcome::success("second", "")));

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.finished.len(), 1);
    assert_eq!(snapshot.finished[0].stdout, "first");
}

#[tokio::test]
async fn test_has_failed_is_monotonic() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator =
        BatchCoordinator::create(vec![vec![cmd("a")], vec![cmd("b")]], dispatcher.clone());
    let id = coordinator.id().to_string();

    coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::failure(-5, "io error"));
    assert!(coordinator.has_failed());

    coordinator.advance();
    coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("", ""));

    // A later successful stage never clears the flag.
    assert!(coordinator.is_finished());
    assert!(coordinator.has_failed());
    assert_eq!(coordinator.status(), BatchStatus::Failed);
}

#[tokio::test]
async fn test_advance_is_idempotent_to_spurious_calls() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator =
        BatchCoordinator::create(vec![vec![cmd("a")], vec![cmd("b")]], dispatcher.clone());
    let id = coordinator.id().to_string();

    // Still running: nothing happens.
    coordinator.advance();
    assert_eq!(dispatcher.submitted().len(), 1);

    coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("", ""));
    coordinator.advance();
    assert_eq!(dispatcher.submitted().len(), 2);

    // Second stage now running, nothing left to pop.
    coordinator.advance();
    assert_eq!(dispatcher.submitted().len(), 2);

    coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("", ""));
    coordinator.advance();
    assert_eq!(dispatcher.submitted().len(), 2);
    assert!(coordinator.is_finished());
}

#[tokio::test]
async fn test_snapshot_reports_outputs_per_bucket() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(
        vec![
            vec![
                cmd("a").with_arg("id", "osd.1"),
                cmd("b"),
            ],
            vec![cmd("c")],
        ],
        dispatcher.clone(),
    );
    let id = coordinator.id().to_string();

    coordinator.finish(&Tag::batch(&id, 0), CommandOutcome::success("ok", ""));
    coordinator.finish(&Tag::batch(&id, 1), CommandOutcome::failure(2, "boom"));

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.id, id);
    assert!(snapshot.running.is_empty());
    assert_eq!(snapshot.finished.len(), 1);
    assert_eq!(snapshot.finished[0].command, "a id=osd.1");
    assert_eq!(snapshot.finished[0].stdout, "ok");
    assert_eq!(snapshot.failed.len(), 1);
    assert_eq!(snapshot.failed[0].output, "boom");
    assert_eq!(snapshot.waiting, vec![vec!["c".to_string()]]);
    assert!(snapshot.is_waiting);
    assert!(!snapshot.is_finished);
    assert!(snapshot.has_failed);
    assert_eq!(snapshot.status, BatchStatus::Pending);
}

#[tokio::test]
async fn test_wait_finished_wakes_on_completion() {
    let dispatcher = RecordingDispatcher::new();
    let coordinator = BatchCoordinator::create(vec![vec![cmd("a")]], dispatcher.clone());
    let tag = Tag::batch(coordinator.id(), 0);

    let waiter = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator.wait_finished().await;
        })
    };

    tokio::task::yield_now().await;
    coordinator.finish(&tag, CommandOutcome::success("", ""));

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter never woke")
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_completions_resolve_each_tag_once() {
    let dispatcher = RecordingDispatcher::new();
    let commands: Vec<CommandDescriptor> = (0..8).map(|_| cmd("noop")).collect();
    let coordinator = BatchCoordinator::create(vec![commands], dispatcher.clone());
    let id = coordinator.id().to_string();

    // Two competing completions per tag; exactly one of each pair may win.
    let attempts = (0..8).flat_map(|index| {
        let first = coordinator.clone();
        let second = coordinator.clone();
        let id_a = id.clone();
        let id_b = id.clone();
        [
            tokio::spawn(async move {
                first.finish(&Tag::batch(id_a, index), CommandOutcome::success("", ""))
            }),
            tokio::spawn(async move {
                second.finish(&Tag::batch(id_b, index), CommandOutcome::success("", ""))
            }),
        ]
    });

    let results = futures::future::join_all(attempts).await;
    let wins = results
        .into_iter()
        .filter(|result| *result.as_ref().unwrap())
        .count();

    assert_eq!(wins, 8);
    assert!(coordinator.is_finished());
    assert_eq!(coordinator.snapshot().finished.len(), 8);
}
