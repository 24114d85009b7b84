// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Use-case orchestration: create, refine, select-next, implement.
//!
//! Claim and settle are two separate transactions around the long-running
//! executor call, which runs outside any transaction. A crash in between
//! leaves the story `InProgress`; [`Orchestrator::recover`] resets such
//! stories on startup.

use crate::error::OrchestratorError;
use crate::scheduler;
use crate::workspace::{self, AcquiredWorkspace};
use fm_adapters::{
    worktree_path_for, ExecOptions, ExecOutcome, Executor, Planner, RefinementPlan, RepoOps,
};
use fm_core::{
    apply_story_transition, apply_work_item_transition, Clock, ConfigError, DeveloperStory,
    ExecutionLog, LogEvent, NewWorkItem, StoryConfig, StoryDependency, StoryId, StoryStatus,
    WorkItem, WorkItemId, WorkItemKind, WorkItemStatus,
};
use fm_storage::Store;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Composed result of a refinement run.
#[derive(Debug, Clone)]
pub struct RefinementResult {
    pub work_item: WorkItem,
    pub stories: Vec<DeveloperStory>,
    pub dependencies: Vec<StoryDependency>,
    pub analysis: String,
}

/// Final state of one story execution.
#[derive(Debug, Clone)]
pub struct ImplementationResult {
    pub story: DeveloperStory,
    pub success: bool,
    pub duration: Duration,
    pub output: String,
    pub error: Option<String>,
}

/// A blocked story with the prerequisites still holding it back.
#[derive(Debug, Clone)]
pub struct BlockedStory {
    pub story: DeveloperStory,
    pub unmet: Vec<DeveloperStory>,
}

/// Wires the store, planner, executor, and repo into the use cases.
/// Plain constructor wiring; one instance per process.
pub struct Orchestrator<P, X, R, C: Clock> {
    store: Store,
    planner: P,
    executor: X,
    repo: R,
    clock: C,
    worktree_base: PathBuf,
}

impl<P, X, R, C> Orchestrator<P, X, R, C>
where
    P: Planner,
    X: Executor,
    R: RepoOps,
    C: Clock,
{
    pub fn new(
        store: Store,
        planner: P,
        executor: X,
        repo: R,
        clock: C,
        worktree_base: impl Into<PathBuf>,
    ) -> Self {
        Self { store, planner, executor, repo, clock, worktree_base: worktree_base.into() }
    }

    // ── Create ──────────────────────────────────────────────────────────

    /// Validate and persist a new work item.
    pub fn create_work_item(&self, input: NewWorkItem) -> Result<WorkItem, OrchestratorError> {
        let item = input.build(&self.clock)?;
        let item = self
            .store
            .with_transaction(|txn| Ok::<_, OrchestratorError>(txn.insert_work_item(item)?))?;
        tracing::info!(work_item_id = %item.id, kind = %item.kind, "work item created");
        Ok(item)
    }

    // ── Refine ──────────────────────────────────────────────────────────

    /// Decompose a work item into stories via the planner and persist the
    /// resulting graph.
    pub async fn refine(
        &self,
        id: WorkItemId,
        cancel: &CancellationToken,
    ) -> Result<RefinementResult, OrchestratorError> {
        let item = self.store.with_transaction(|txn| {
            let mut item =
                txn.work_item(id).cloned().ok_or(OrchestratorError::WorkItemNotFound(id))?;
            apply_work_item_transition(&mut item, WorkItemStatus::Refining, &self.clock)?;
            txn.update_work_item(item.clone())?;
            Ok::<_, OrchestratorError>(item)
        })?;

        let plan = match self.planner.refine(&item, cancel).await {
            Ok(plan) => plan,
            Err(e) => {
                self.fail_work_item(id, &e.to_string())?;
                // Missing credential surfaces as a config error
                return Err(match e {
                    fm_adapters::PlannerError::MissingCredential => {
                        OrchestratorError::Config(ConfigError::MissingPlannerCredential)
                    }
                    other => other.into(),
                });
            }
        };

        match self.persist_plan(id, &plan) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.fail_work_item(id, &e.to_string())?;
                Err(e)
            }
        }
    }

    /// Insert the planned stories and edges, mark the work item refined,
    /// and propagate readiness — one transaction, so a cycle (or any
    /// failure) persists nothing.
    fn persist_plan(
        &self,
        id: WorkItemId,
        plan: &RefinementPlan,
    ) -> Result<RefinementResult, OrchestratorError> {
        self.store.with_transaction(|txn| {
            let mut stories = Vec::with_capacity(plan.stories.len());
            for planned in &plan.stories {
                let mut config = StoryConfig::new(id, planned.story_type)
                    .title(planned.title.clone())
                    .description(planned.description.clone())
                    .instructions(planned.instructions.clone());
                if let Some(priority) = planned.priority {
                    config = config.priority(priority);
                }
                stories.push(txn.insert_story(DeveloperStory::new(config, &self.clock))?);
            }

            let mut dependencies = Vec::with_capacity(plan.dependencies.len());
            for dep in &plan.dependencies {
                let story_at = |index: usize| {
                    stories.get(index).map(|s: &DeveloperStory| s.id).ok_or_else(|| {
                        OrchestratorError::InvariantViolation(format!(
                            "plan dependency references story index {} of {}",
                            index,
                            stories.len()
                        ))
                    })
                };
                let edge = StoryDependency::new(
                    story_at(dep.dependent_index)?,
                    story_at(dep.required_index)?,
                    dep.description.clone(),
                    &self.clock,
                )
                .map_err(|e| OrchestratorError::InvariantViolation(e.to_string()))?;
                txn.insert_dependency(edge.clone())?;
                dependencies.push(edge);
            }

            let mut item =
                txn.work_item(id).cloned().ok_or(OrchestratorError::WorkItemNotFound(id))?;
            apply_work_item_transition(&mut item, WorkItemStatus::Refined, &self.clock)?;
            txn.update_work_item(item.clone())?;

            // Rejects cycles and promotes prerequisite-free stories
            scheduler::update_readiness(txn, &self.clock)?;

            let stories: Vec<DeveloperStory> =
                stories.iter().filter_map(|s| txn.story(s.id).cloned()).collect();
            tracing::info!(
                work_item_id = %id,
                stories = stories.len(),
                dependencies = dependencies.len(),
                "work item refined"
            );
            Ok(RefinementResult { work_item: item, stories, dependencies, analysis: plan.analysis.clone() })
        })
    }

    // ── Schedule ────────────────────────────────────────────────────────

    /// Update readiness, then return the next runnable story, if any.
    pub fn select_next(&self) -> Result<Option<DeveloperStory>, OrchestratorError> {
        self.store.with_transaction(|txn| {
            scheduler::update_readiness(txn, &self.clock)?;
            scheduler::select_next(txn)
        })
    }

    /// Blocked stories with their unmet prerequisites.
    pub fn blocked_report(&self) -> Result<Vec<BlockedStory>, OrchestratorError> {
        let entries = self.store.read(|tables| scheduler::blocked_stories(tables))?;
        Ok(entries.into_iter().map(|(story, unmet)| BlockedStory { story, unmet }).collect())
    }

    // ── Implement ───────────────────────────────────────────────────────

    /// Execute one story end-to-end: claim, isolate, run the coding
    /// agent, record the result. The workspace is released on every exit
    /// path.
    pub async fn implement(
        &self,
        story_id: StoryId,
        main_branch: &str,
        repo_path: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ImplementationResult, OrchestratorError> {
        let story = self.claim(story_id)?;

        let ws = match workspace::acquire(
            &self.repo,
            repo_path,
            main_branch,
            &story,
            &self.worktree_base,
        )
        .await
        {
            Ok(ws) => ws,
            Err(e) => {
                self.settle_failure(story_id, &e.to_string(), None)?;
                let leftover = worktree_path_for(story_id, &self.worktree_base);
                self.release_and_log(story_id, repo_path, &leftover).await?;
                return Err(e.into());
            }
        };
        self.log_acquisition(story_id, &ws)?;

        let exec_result = match story.session_id.as_deref() {
            Some(session_id) => {
                self.executor
                    .continue_session(session_id, &story.instructions, &ws.path, opts, cancel)
                    .await
            }
            None => self.executor.start(&story.instructions, &ws.path, opts, cancel).await,
        };

        let result = match exec_result {
            Ok(outcome) => {
                // The session id is idempotent, so persisting it outside
                // the settle transaction is safe.
                if let Some(session_id) = &outcome.session_id {
                    self.persist_session(story_id, session_id)?;
                }
                if outcome.success() {
                    let story = self.settle_success(story_id, &outcome)?;
                    Ok(ImplementationResult {
                        story,
                        success: true,
                        duration: outcome.duration,
                        output: outcome.stdout,
                        error: None,
                    })
                } else {
                    let message = if outcome.stderr.trim().is_empty() {
                        format!("coding agent exited with code {}", outcome.exit_code)
                    } else {
                        outcome.stderr.trim().to_string()
                    };
                    let story = self.settle_failure(story_id, &message, Some(&outcome))?;
                    Ok(ImplementationResult {
                        story,
                        success: false,
                        duration: outcome.duration,
                        output: outcome.stdout,
                        error: Some(message),
                    })
                }
            }
            Err(e) => {
                self.settle_failure(story_id, &e.to_string(), None)?;
                Err(OrchestratorError::Executor(e))
            }
        };

        self.release_and_log(story_id, repo_path, &ws.path).await?;
        result
    }

    /// Claim transaction: story `Ready → InProgress`, work item promoted
    /// to `InProgress` when needed, single-user-story rule enforced.
    fn claim(&self, story_id: StoryId) -> Result<DeveloperStory, OrchestratorError> {
        self.store.with_transaction(|txn| {
            let mut story =
                txn.story(story_id).cloned().ok_or(OrchestratorError::StoryNotFound(story_id))?;
            let mut item = txn.work_item(story.work_item_id).cloned().ok_or_else(|| {
                OrchestratorError::InvariantViolation(format!(
                    "story {} references missing work item {}",
                    story_id, story.work_item_id
                ))
            })?;

            // Rejects everything but Ready, before any subprocess runs
            apply_story_transition(&mut story, StoryStatus::InProgress, &self.clock)?;

            if item.status == WorkItemStatus::Refined {
                if item.kind == WorkItemKind::UserStory {
                    if let Some(active) = txn.in_progress_user_story() {
                        if active.id != item.id {
                            return Err(OrchestratorError::UserStoryInProgress(active.id));
                        }
                    }
                }
                apply_work_item_transition(&mut item, WorkItemStatus::InProgress, &self.clock)?;
                txn.update_work_item(item)?;
            }

            txn.update_story(story.clone())?;
            txn.append_log(ExecutionLog::new(story_id, LogEvent::Started, &self.clock))?;
            tracing::info!(story_id = %story_id, "story claimed");
            Ok(story)
        })
    }

    fn log_acquisition(
        &self,
        story_id: StoryId,
        ws: &AcquiredWorkspace,
    ) -> Result<(), OrchestratorError> {
        self.store.with_transaction(|txn| {
            if ws.branch_created {
                txn.append_log(
                    ExecutionLog::new(story_id, LogEvent::BranchCreated, &self.clock)
                        .details(ws.branch.clone()),
                )?;
            }
            if ws.worktree_created {
                txn.append_log(
                    ExecutionLog::new(story_id, LogEvent::WorktreeCreated, &self.clock)
                        .details(ws.path.display().to_string()),
                )?;
            }
            Ok::<_, OrchestratorError>(())
        })
    }

    fn persist_session(&self, story_id: StoryId, session_id: &str) -> Result<(), OrchestratorError> {
        self.store.with_transaction(|txn| {
            if let Some(mut story) = txn.story(story_id).cloned() {
                if story.session_id.as_deref() != Some(session_id) {
                    story.session_id = Some(session_id.to_string());
                    story.touch(&self.clock);
                    txn.update_story(story)?;
                }
            }
            Ok::<_, OrchestratorError>(())
        })
    }

    /// Settle transaction for a successful run. Completes the owning work
    /// item when its last story lands.
    fn settle_success(
        &self,
        story_id: StoryId,
        outcome: &ExecOutcome,
    ) -> Result<DeveloperStory, OrchestratorError> {
        self.store.with_transaction(|txn| {
            let mut story =
                txn.story(story_id).cloned().ok_or(OrchestratorError::StoryNotFound(story_id))?;
            apply_story_transition(&mut story, StoryStatus::Completed, &self.clock)?;
            txn.update_story(story.clone())?;

            let mut metadata = serde_json::json!({
                "duration_ms": outcome.duration.as_millis() as u64,
                "exit_code": outcome.exit_code,
            });
            if let Some(session_id) = &outcome.session_id {
                metadata["session_id"] = serde_json::Value::String(session_id.clone());
            }
            txn.append_log(
                ExecutionLog::new(story_id, LogEvent::Completed, &self.clock)
                    .details("coding agent succeeded")
                    .metadata(metadata),
            )?;

            let all_done = txn
                .stories_by_work_item(story.work_item_id)
                .iter()
                .all(|s| s.status == StoryStatus::Completed);
            if all_done {
                if let Some(mut item) = txn.work_item(story.work_item_id).cloned() {
                    if item.status == WorkItemStatus::InProgress {
                        apply_work_item_transition(
                            &mut item,
                            WorkItemStatus::Completed,
                            &self.clock,
                        )?;
                        txn.update_work_item(item)?;
                        tracing::info!(work_item_id = %story.work_item_id, "work item completed");
                    }
                }
            }
            Ok(story)
        })
    }

    /// Settle transaction for a failed run: story to `Error` with the
    /// failure retained, `Failed` log appended.
    fn settle_failure(
        &self,
        story_id: StoryId,
        message: &str,
        outcome: Option<&ExecOutcome>,
    ) -> Result<DeveloperStory, OrchestratorError> {
        self.store.with_transaction(|txn| {
            let mut story =
                txn.story(story_id).cloned().ok_or(OrchestratorError::StoryNotFound(story_id))?;
            story.error_message = Some(message.to_string());
            apply_story_transition(&mut story, StoryStatus::Error, &self.clock)?;
            txn.update_story(story.clone())?;

            let mut log = ExecutionLog::new(story_id, LogEvent::Failed, &self.clock)
                .error_message(message.to_string());
            if let Some(outcome) = outcome {
                log = log.metadata(serde_json::json!({
                    "duration_ms": outcome.duration.as_millis() as u64,
                    "exit_code": outcome.exit_code,
                }));
            }
            txn.append_log(log)?;
            tracing::warn!(story_id = %story_id, error = message, "story failed");
            Ok(story)
        })
    }

    async fn release_and_log(
        &self,
        story_id: StoryId,
        repo_path: &Path,
        worktree: &Path,
    ) -> Result<(), OrchestratorError> {
        let removed = workspace::release(&self.repo, repo_path, worktree).await;
        self.store.with_transaction(|txn| {
            let mut log = ExecutionLog::new(story_id, LogEvent::WorktreeRemoved, &self.clock)
                .details(worktree.display().to_string());
            if !removed {
                log = log.error_message("worktree removal failed; left on disk");
            }
            txn.append_log(log)?;
            Ok::<_, OrchestratorError>(())
        })
    }

    // ── Retry & recovery ────────────────────────────────────────────────

    /// Explicit operator retry of a failed story.
    pub fn retry_story(&self, story_id: StoryId) -> Result<DeveloperStory, OrchestratorError> {
        self.store.with_transaction(|txn| {
            let mut story =
                txn.story(story_id).cloned().ok_or(OrchestratorError::StoryNotFound(story_id))?;
            apply_story_transition(&mut story, StoryStatus::Pending, &self.clock)?;
            txn.update_story(story.clone())?;
            txn.append_log(ExecutionLog::new(story_id, LogEvent::Retried, &self.clock))?;
            scheduler::update_readiness(txn, &self.clock)?;
            Ok(txn.story(story_id).cloned().unwrap_or(story))
        })
    }

    /// Explicit operator retry of a failed work item.
    pub fn retry_work_item(&self, id: WorkItemId) -> Result<WorkItem, OrchestratorError> {
        self.store.with_transaction(|txn| {
            let mut item =
                txn.work_item(id).cloned().ok_or(OrchestratorError::WorkItemNotFound(id))?;
            apply_work_item_transition(&mut item, WorkItemStatus::Pending, &self.clock)?;
            txn.update_work_item(item.clone())?;
            Ok(item)
        })
    }

    /// Startup recovery: stories left `InProgress` with a heartbeat older
    /// than `stale_after` (or none) go back to `Ready` with their run
    /// state cleared.
    pub fn recover(&self, stale_after: chrono::Duration) -> Result<Vec<StoryId>, OrchestratorError> {
        self.store.with_transaction(|txn| {
            let now = self.clock.now();
            let mut recovered = Vec::new();
            for story in txn.stories_by_status(StoryStatus::InProgress) {
                let stale = story.heartbeat_at.map_or(true, |hb| now - hb >= stale_after);
                if !stale {
                    continue;
                }
                let mut updated = story;
                apply_story_transition(&mut updated, StoryStatus::Blocked, &self.clock)?;
                apply_story_transition(&mut updated, StoryStatus::Ready, &self.clock)?;
                updated.started_at = None;
                updated.heartbeat_at = None;
                txn.update_story(updated.clone())?;
                txn.append_log(
                    ExecutionLog::new(updated.id, LogEvent::Retried, &self.clock)
                        .details("recovered from interrupted run"),
                )?;
                tracing::warn!(story_id = %updated.id, "recovered orphaned in-progress story");
                recovered.push(updated.id);
            }
            Ok(recovered)
        })
    }

    // ── Queries & lifecycle ─────────────────────────────────────────────

    pub fn work_item(&self, id: WorkItemId) -> Option<WorkItem> {
        self.store.read(|t| t.work_item(id).cloned())
    }

    pub fn story(&self, id: StoryId) -> Option<DeveloperStory> {
        self.store.read(|t| t.story(id).cloned())
    }

    pub fn logs_for_story(&self, id: StoryId) -> Vec<ExecutionLog> {
        self.store.read(|t| t.logs_for_story(id))
    }

    pub fn list_work_items(&self, status: Option<WorkItemStatus>) -> Vec<WorkItem> {
        self.store.read(|t| {
            t.work_items
                .values()
                .filter(|w| status.map_or(true, |s| w.status == s))
                .cloned()
                .collect()
        })
    }

    pub fn list_stories(&self, status: Option<StoryStatus>) -> Vec<DeveloperStory> {
        self.store.read(|t| {
            t.developer_stories
                .values()
                .filter(|s| status.map_or(true, |wanted| s.status == wanted))
                .cloned()
                .collect()
        })
    }

    /// Explicit operator delete; cascades to stories, edges, and logs.
    pub fn delete_work_item(&self, id: WorkItemId) -> Result<(), OrchestratorError> {
        self.store
            .with_transaction(|txn| Ok::<_, OrchestratorError>(txn.delete_work_item(id)?))?;
        tracing::info!(work_item_id = %id, "work item deleted");
        Ok(())
    }

    /// Probe the coding agent binary.
    pub async fn executor_available(&self) -> bool {
        self.executor.is_available().await
    }

    fn fail_work_item(&self, id: WorkItemId, message: &str) -> Result<(), OrchestratorError> {
        self.store.with_transaction(|txn| {
            let mut item =
                txn.work_item(id).cloned().ok_or(OrchestratorError::WorkItemNotFound(id))?;
            item.error_message = Some(message.to_string());
            apply_work_item_transition(&mut item, WorkItemStatus::Error, &self.clock)?;
            txn.update_work_item(item)?;
            Ok::<_, OrchestratorError>(())
        })?;
        tracing::warn!(work_item_id = %id, error = message, "work item failed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
