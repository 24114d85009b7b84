// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_adapters::{FakeExecutor, FakePlanner, FakeRepo, PlannedDependency, PlannedStory};
use fm_core::{FakeClock, LogEvent, StoryType, ValidationError};
use fm_storage::Store;
use std::sync::Arc;

type TestOrchestrator =
    Orchestrator<Arc<FakePlanner>, Arc<FakeExecutor>, Arc<FakeRepo>, FakeClock>;

struct Harness {
    orchestrator: TestOrchestrator,
    planner: Arc<FakePlanner>,
    executor: Arc<FakeExecutor>,
    repo: Arc<FakeRepo>,
    clock: FakeClock,
    store: Store,
    worktree_base: tempfile::TempDir,
}

fn harness() -> Harness {
    let planner = Arc::new(FakePlanner::default());
    let executor = Arc::new(FakeExecutor::new());
    let repo = Arc::new(FakeRepo::new());
    let clock = FakeClock::new();
    let store = Store::in_memory();
    let worktree_base = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        store.clone(),
        planner.clone(),
        executor.clone(),
        repo.clone(),
        clock.clone(),
        worktree_base.path(),
    );
    Harness { orchestrator, planner, executor, repo, clock, store, worktree_base }
}

fn planned_story(title: &str, story_type: StoryType) -> PlannedStory {
    PlannedStory {
        story_type,
        title: title.to_string(),
        description: format!("{} description", title),
        instructions: format!("do: {}", title),
        priority: None,
    }
}

fn edge(dependent: usize, required: usize) -> PlannedDependency {
    PlannedDependency { dependent_index: dependent, required_index: required, description: None }
}

fn new_item(title: &str) -> NewWorkItem {
    NewWorkItem::new(WorkItemKind::UserStory, title, "as a user I want this").priority(3)
}

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

/// Create + refine a work item whose plan has the given stories/edges.
async fn refined(
    h: &Harness,
    title: &str,
    stories: Vec<PlannedStory>,
    dependencies: Vec<PlannedDependency>,
) -> RefinementResult {
    h.planner.push_plan(RefinementPlan { analysis: "plan".to_string(), stories, dependencies });
    let item = h.orchestrator.create_work_item(new_item(title)).unwrap();
    h.orchestrator.refine(item.id, &cancel()).await.unwrap()
}

// ── create ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_persists_valid_work_item() {
    let h = harness();

    let item = h.orchestrator.create_work_item(new_item("Login")).unwrap();

    assert_eq!(item.id.raw(), 1);
    assert_eq!(item.status, WorkItemStatus::Pending);
    assert_eq!(h.orchestrator.work_item(item.id).unwrap().title, "Login");
}

#[yare::parameterized(
    zero = { 0 },
    ten  = { 10 },
)]
fn create_rejects_out_of_range_priority(priority: u8) {
    let h = harness();

    let err = h
        .orchestrator
        .create_work_item(new_item("Login").priority(priority))
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Validation(ValidationError::PriorityOutOfRange(_))
    ));
    assert!(h.orchestrator.list_work_items(None).is_empty());
}

// ── refine ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn refine_persists_stories_and_promotes_leaves() {
    let h = harness();

    let result = refined(
        &h,
        "Login",
        vec![
            planned_story("Implement", StoryType::Implementation),
            planned_story("Test", StoryType::UnitTests),
        ],
        vec![edge(1, 0)],
    )
    .await;

    assert_eq!(result.work_item.status, WorkItemStatus::Refined);
    assert_eq!(result.stories.len(), 2);
    assert_eq!(result.dependencies.len(), 1);
    assert_eq!(result.analysis, "plan");
    assert_eq!(result.stories[0].status, StoryStatus::Ready);
    assert_eq!(result.stories[1].status, StoryStatus::Blocked);
    assert_eq!(h.planner.calls.lock().len(), 1);
}

#[tokio::test]
async fn refine_missing_work_item_fails() {
    let h = harness();

    let err = h.orchestrator.refine(WorkItemId::new(404), &cancel()).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::WorkItemNotFound(_)));
}

#[tokio::test]
async fn refine_planner_failure_marks_item_error() {
    let h = harness();
    h.planner.push_failure("model overloaded");
    let item = h.orchestrator.create_work_item(new_item("Login")).unwrap();

    let err = h.orchestrator.refine(item.id, &cancel()).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Planner(_)));
    let item = h.orchestrator.work_item(item.id).unwrap();
    assert_eq!(item.status, WorkItemStatus::Error);
    assert!(item.error_message.as_deref().unwrap_or_default().contains("model overloaded"));
}

#[tokio::test]
async fn refine_without_credential_is_config_error() {
    let h = harness();
    h.planner.push_missing_credential();
    let item = h.orchestrator.create_work_item(new_item("Login")).unwrap();

    let err = h.orchestrator.refine(item.id, &cancel()).await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Config(fm_core::ConfigError::MissingPlannerCredential)
    ));
    let item = h.orchestrator.work_item(item.id).unwrap();
    assert_eq!(item.status, WorkItemStatus::Error);
    assert!(item.error_message.as_deref().unwrap_or_default().contains("credential"));
}

#[tokio::test]
async fn refine_with_zero_stories_still_refines() {
    let h = harness();

    let result = refined(&h, "Trivial", vec![], vec![]).await;

    assert_eq!(result.work_item.status, WorkItemStatus::Refined);
    assert!(result.stories.is_empty());
}

#[tokio::test]
async fn refine_cycle_rejected_and_nothing_persisted() {
    let h = harness();
    h.planner.push_plan(RefinementPlan {
        analysis: String::new(),
        stories: vec![
            planned_story("X", StoryType::Implementation),
            planned_story("Y", StoryType::UnitTests),
        ],
        dependencies: vec![edge(0, 1), edge(1, 0)],
    });
    let item = h.orchestrator.create_work_item(new_item("Cyclic")).unwrap();

    let err = h.orchestrator.refine(item.id, &cancel()).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Cycle(_)));
    assert_eq!(h.orchestrator.work_item(item.id).unwrap().status, WorkItemStatus::Error);
    assert!(h.orchestrator.list_stories(None).is_empty());
    assert!(h.store.read(|t| t.story_dependencies.is_empty()));
}

#[tokio::test]
async fn refine_twice_is_illegal() {
    let h = harness();
    let result = refined(&h, "Login", vec![], vec![]).await;
    h.planner.push_plan(RefinementPlan::default());

    let err = h.orchestrator.refine(result.work_item.id, &cancel()).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::IllegalTransition(_)));
}

// ── select_next ─────────────────────────────────────────────────────────

#[tokio::test]
async fn select_next_returns_the_ready_story() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![
            planned_story("Implement", StoryType::Implementation),
            planned_story("Test", StoryType::UnitTests),
        ],
        vec![edge(1, 0)],
    )
    .await;

    let next = h.orchestrator.select_next().unwrap().unwrap();

    assert_eq!(next.id, result.stories[0].id);
}

#[tokio::test]
async fn select_next_none_when_store_empty() {
    let h = harness();
    assert!(h.orchestrator.select_next().unwrap().is_none());
}

// ── implement ───────────────────────────────────────────────────────────

#[tokio::test]
async fn implement_happy_path() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement login", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.executor.push_success(Some("s1"), Duration::from_secs(42));

    let outcome = h
        .orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.duration, Duration::from_secs(42));
    assert!(outcome.error.is_none());

    let story = h.orchestrator.story(story_id).unwrap();
    assert_eq!(story.status, StoryStatus::Completed);
    assert_eq!(story.session_id.as_deref(), Some("s1"));
    assert!(story.completed_at.unwrap() >= story.started_at.unwrap());

    let events: Vec<LogEvent> =
        h.orchestrator.logs_for_story(story_id).iter().map(|log| log.event).collect();
    assert_eq!(
        events,
        [
            LogEvent::Started,
            LogEvent::BranchCreated,
            LogEvent::WorktreeCreated,
            LogEvent::Completed,
            LogEvent::WorktreeRemoved,
        ]
    );

    // Branch named from ids, worktree released
    assert_eq!(h.repo.branches(), vec![format!("story/{}/{}", result.work_item.id, story_id)]);
    assert_eq!(h.repo.removed_worktrees().len(), 1);
    assert!(h.repo.worktrees().is_empty());

    // Executor ran the story's instructions in the story worktree
    let calls = h.executor.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].instruction, "do: Implement login");
    assert!(calls[0].work_dir.starts_with(h.worktree_base.path()));
    assert_eq!(calls[0].resumed_session, None);

    // Single-story item: completing the story completes the item
    assert_eq!(
        h.orchestrator.work_item(result.work_item.id).unwrap().status,
        WorkItemStatus::Completed
    );
}

#[tokio::test]
async fn implement_respects_dependency_order() {
    let h = harness();
    let result = refined(
        &h,
        "Bug fix",
        vec![
            planned_story("A", StoryType::Implementation),
            planned_story("B", StoryType::UnitTests),
        ],
        vec![edge(1, 0)],
    )
    .await;
    let (a, b) = (result.stories[0].id, result.stories[1].id);

    // B is blocked until A completes
    assert_eq!(h.orchestrator.select_next().unwrap().unwrap().id, a);
    h.executor.push_success(None, Duration::from_secs(1));
    h.orchestrator
        .implement(a, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();

    let next = h.orchestrator.select_next().unwrap().unwrap();
    assert_eq!(next.id, b);
    assert_eq!(next.status, StoryStatus::Ready);
}

#[tokio::test]
async fn implement_terminal_story_fails_without_spawning() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.executor.push_success(None, Duration::from_secs(1));
    h.orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();
    let calls_before = h.executor.calls.lock().len();

    let err = h
        .orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::IllegalTransition(_)));
    assert_eq!(h.executor.calls.lock().len(), calls_before);
}

#[tokio::test]
async fn implement_blocked_story_is_rejected() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![
            planned_story("A", StoryType::Implementation),
            planned_story("B", StoryType::UnitTests),
        ],
        vec![edge(1, 0)],
    )
    .await;

    let err = h
        .orchestrator
        .implement(result.stories[1].id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::IllegalTransition(_)));
    assert!(h.executor.calls.lock().is_empty());
}

#[tokio::test]
async fn implement_failure_marks_error_and_retry_recovers() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.executor.push_failure(2, "build failed");

    let outcome = h
        .orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("build failed"));
    let story = h.orchestrator.story(story_id).unwrap();
    assert_eq!(story.status, StoryStatus::Error);
    assert_eq!(story.error_message.as_deref(), Some("build failed"));

    // Worktree released despite the failure
    assert_eq!(h.repo.removed_worktrees().len(), 1);

    // Explicit retry goes back through pending and is promoted to ready
    let retried = h.orchestrator.retry_story(story_id).unwrap();
    assert_eq!(retried.status, StoryStatus::Ready);
    assert!(retried.error_message.is_none());

    h.executor.push_success(None, Duration::from_secs(3));
    let second = h
        .orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();
    assert!(second.success);
    assert_eq!(h.orchestrator.story(story_id).unwrap().status, StoryStatus::Completed);
}

#[tokio::test]
async fn implement_timeout_surfaces_and_cleans_up() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.executor.push_timeout();

    let err = h
        .orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Executor(fm_adapters::ExecutorError::Timeout { .. })
    ));
    let story = h.orchestrator.story(story_id).unwrap();
    assert_eq!(story.status, StoryStatus::Error);
    assert!(story.error_message.as_deref().unwrap_or_default().contains("timed out"));

    let events: Vec<LogEvent> =
        h.orchestrator.logs_for_story(story_id).iter().map(|log| log.event).collect();
    let failed_at = events.iter().position(|e| *e == LogEvent::Failed).unwrap();
    let removed_at = events.iter().position(|e| *e == LogEvent::WorktreeRemoved).unwrap();
    assert!(failed_at < removed_at);
    assert!(h.repo.worktrees().is_empty());
}

#[tokio::test]
async fn implement_repo_failure_marks_story_error() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.repo.fail_worktree_create();

    let err = h
        .orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Repo(_)));
    assert_eq!(h.orchestrator.story(story_id).unwrap().status, StoryStatus::Error);
    assert!(h.executor.calls.lock().is_empty());
}

#[tokio::test]
async fn failed_run_with_session_resumes_on_retry() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.executor.push_outcome(fm_adapters::ExecOutcome {
        exit_code: 2,
        stdout: r#"{"session_id": "s9"}"#.to_string(),
        stderr: "tests failed".to_string(),
        duration: Duration::from_secs(5),
        session_id: Some("s9".to_string()),
    });

    h.orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();
    h.orchestrator.retry_story(story_id).unwrap();
    h.executor.push_success(Some("s9"), Duration::from_secs(2));
    h.orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();

    let calls = h.executor.calls.lock();
    assert_eq!(calls[0].resumed_session, None);
    assert_eq!(calls[1].resumed_session.as_deref(), Some("s9"));
}

#[tokio::test]
async fn run_without_session_starts_fresh_next_time() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.executor.push_failure(1, "flaky");

    h.orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();
    h.orchestrator.retry_story(story_id).unwrap();
    h.executor.push_success(None, Duration::from_secs(2));
    h.orchestrator
        .implement(story_id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();

    let calls = h.executor.calls.lock();
    assert_eq!(calls[1].resumed_session, None);
}

#[tokio::test]
async fn only_one_user_story_in_progress() {
    let h = harness();
    let first = refined(
        &h,
        "First",
        vec![
            planned_story("A", StoryType::Implementation),
            planned_story("B", StoryType::UnitTests),
        ],
        vec![],
    )
    .await;
    let second = refined(
        &h,
        "Second",
        vec![planned_story("C", StoryType::Implementation)],
        vec![],
    )
    .await;

    // First item enters InProgress (one of two stories completes)
    h.executor.push_success(None, Duration::from_secs(1));
    h.orchestrator
        .implement(first.stories[0].id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap();
    assert_eq!(
        h.orchestrator.work_item(first.work_item.id).unwrap().status,
        WorkItemStatus::InProgress
    );

    let err = h
        .orchestrator
        .implement(second.stories[0].id, "main", Path::new("/repo"), &ExecOptions::default(), &cancel())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::UserStoryInProgress(id) if id == first.work_item.id
    ));
    assert_eq!(h.orchestrator.story(second.stories[0].id).unwrap().status, StoryStatus::Ready);
}

// ── recovery ────────────────────────────────────────────────────────────

#[tokio::test]
async fn recover_resets_orphaned_in_progress_story() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;

    // Simulate a crash mid-execution: claimed but never settled
    h.store
        .with_transaction(|txn| {
            let mut story = txn.story(story_id).cloned().unwrap();
            fm_core::apply_story_transition(&mut story, StoryStatus::InProgress, &h.clock).unwrap();
            txn.update_story(story)
        })
        .unwrap();
    h.clock.advance_secs(3600);

    let recovered = h.orchestrator.recover(chrono::Duration::minutes(5)).unwrap();

    assert_eq!(recovered, vec![story_id]);
    let story = h.orchestrator.story(story_id).unwrap();
    assert_eq!(story.status, StoryStatus::Ready);
    assert!(story.started_at.is_none());
    assert!(story.heartbeat_at.is_none());

    assert_eq!(h.orchestrator.select_next().unwrap().unwrap().id, story_id);
}

#[tokio::test]
async fn recover_spares_fresh_heartbeats() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;
    let story_id = result.stories[0].id;
    h.store
        .with_transaction(|txn| {
            let mut story = txn.story(story_id).cloned().unwrap();
            fm_core::apply_story_transition(&mut story, StoryStatus::InProgress, &h.clock).unwrap();
            txn.update_story(story)
        })
        .unwrap();

    let recovered = h.orchestrator.recover(chrono::Duration::minutes(5)).unwrap();

    assert!(recovered.is_empty());
    assert_eq!(h.orchestrator.story(story_id).unwrap().status, StoryStatus::InProgress);
}

// ── queries & lifecycle ─────────────────────────────────────────────────

#[tokio::test]
async fn blocked_report_names_unmet_prerequisites() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![
            planned_story("A", StoryType::Implementation),
            planned_story("B", StoryType::UnitTests),
        ],
        vec![edge(1, 0)],
    )
    .await;

    let report = h.orchestrator.blocked_report().unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report[0].story.id, result.stories[1].id);
    assert_eq!(report[0].unmet.len(), 1);
    assert_eq!(report[0].unmet[0].id, result.stories[0].id);
}

#[tokio::test]
async fn delete_work_item_cascades() {
    let h = harness();
    let result = refined(
        &h,
        "Login",
        vec![planned_story("Implement", StoryType::Implementation)],
        vec![],
    )
    .await;

    h.orchestrator.delete_work_item(result.work_item.id).unwrap();

    assert!(h.orchestrator.work_item(result.work_item.id).is_none());
    assert!(h.orchestrator.list_stories(None).is_empty());
}

#[tokio::test]
async fn retry_work_item_clears_error() {
    let h = harness();
    h.planner.push_failure("boom");
    let item = h.orchestrator.create_work_item(new_item("Login")).unwrap();
    let _ = h.orchestrator.refine(item.id, &cancel()).await;

    let retried = h.orchestrator.retry_work_item(item.id).unwrap();

    assert_eq!(retried.status, WorkItemStatus::Pending);
    assert!(retried.error_message.is_none());
}

#[tokio::test]
async fn list_filters_by_status() {
    let h = harness();
    let refined_item = refined(&h, "Refined", vec![], vec![]).await;
    h.orchestrator.create_work_item(new_item("Fresh")).unwrap();

    let pending = h.orchestrator.list_work_items(Some(WorkItemStatus::Pending));
    let done = h.orchestrator.list_work_items(Some(WorkItemStatus::Refined));

    assert_eq!(pending.len(), 1);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, refined_item.work_item.id);
    assert_eq!(h.orchestrator.list_work_items(None).len(), 2);
}

#[tokio::test]
async fn executor_probe_passes_through() {
    let h = harness();
    assert!(h.orchestrator.executor_available().await);
}

#[tokio::test]
async fn updated_at_tracks_mutations() {
    let h = harness();
    let item = h.orchestrator.create_work_item(new_item("Login")).unwrap();
    h.clock.advance_secs(60);
    h.planner.push_plan(RefinementPlan::default());

    h.orchestrator.refine(item.id, &cancel()).await.unwrap();

    let item = h.orchestrator.work_item(item.id).unwrap();
    assert!(item.updated_at > item.created_at);
}
