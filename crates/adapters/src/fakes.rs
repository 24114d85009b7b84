// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake planner, executor, and repo for other crates' tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::executor::{ExecOptions, ExecOutcome, Executor, ExecutorError};
use crate::planner::{Planner, PlannerError, RefinementPlan};
use crate::repo::{RepoError, RepoOps};
use async_trait::async_trait;
use fm_core::WorkItem;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ── Planner ─────────────────────────────────────────────────────────────

/// Scripted planner: replays queued plans (or errors) in order, falling
/// back to an empty plan when the queue runs dry.
#[derive(Default)]
pub struct FakePlanner {
    scripted: Mutex<VecDeque<Result<RefinementPlan, PlannerError>>>,
    pub calls: Mutex<Vec<fm_core::WorkItemId>>,
}

impl FakePlanner {
    pub fn returning(plan: RefinementPlan) -> Self {
        let fake = Self::default();
        fake.push_plan(plan);
        fake
    }

    pub fn failing(message: &str) -> Self {
        let fake = Self::default();
        fake.push_failure(message);
        fake
    }

    pub fn push_plan(&self, plan: RefinementPlan) {
        self.scripted.lock().push_back(Ok(plan));
    }

    pub fn push_failure(&self, message: &str) {
        self.scripted.lock().push_back(Err(PlannerError::External(message.to_string())));
    }

    pub fn push_missing_credential(&self) {
        self.scripted.lock().push_back(Err(PlannerError::MissingCredential));
    }
}

#[async_trait]
impl Planner for FakePlanner {
    async fn refine(
        &self,
        work_item: &WorkItem,
        _cancel: &CancellationToken,
    ) -> Result<RefinementPlan, PlannerError> {
        self.calls.lock().push(work_item.id);
        match self.scripted.lock().pop_front() {
            Some(scripted) => scripted,
            None => Ok(RefinementPlan::default()),
        }
    }
}

// ── Executor ────────────────────────────────────────────────────────────

/// One recorded executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub instruction: String,
    pub work_dir: PathBuf,
    pub resumed_session: Option<String>,
}

enum ScriptedExec {
    Outcome(ExecOutcome),
    Timeout,
    Cancelled,
}

/// Scripted executor: records calls, replays queued outcomes.
pub struct FakeExecutor {
    scripted: Mutex<VecDeque<ScriptedExec>>,
    pub calls: Mutex<Vec<ExecCall>>,
    pub available: bool,
}

impl Default for FakeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self { scripted: Mutex::default(), calls: Mutex::default(), available: true }
    }

    /// Queue a successful run.
    pub fn push_success(&self, session_id: Option<&str>, duration: Duration) {
        let stdout = match session_id {
            Some(id) => format!(r#"{{"session_id": "{}", "result": "done"}}"#, id),
            None => r#"{"result": "done"}"#.to_string(),
        };
        self.scripted.lock().push_back(ScriptedExec::Outcome(ExecOutcome {
            exit_code: 0,
            stdout,
            stderr: String::new(),
            duration,
            session_id: session_id.map(|s| s.to_string()),
        }));
    }

    /// Queue a failed run with the given exit code and stderr.
    pub fn push_failure(&self, exit_code: i32, stderr: &str) {
        self.scripted.lock().push_back(ScriptedExec::Outcome(ExecOutcome {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            duration: Duration::from_secs(1),
            session_id: None,
        }));
    }

    /// Queue an exact outcome.
    pub fn push_outcome(&self, outcome: ExecOutcome) {
        self.scripted.lock().push_back(ScriptedExec::Outcome(outcome));
    }

    pub fn push_timeout(&self) {
        self.scripted.lock().push_back(ScriptedExec::Timeout);
    }

    pub fn push_cancelled(&self) {
        self.scripted.lock().push_back(ScriptedExec::Cancelled);
    }

    fn next(
        &self,
        instruction: &str,
        work_dir: &Path,
        resumed_session: Option<&str>,
        opts: &ExecOptions,
    ) -> Result<ExecOutcome, ExecutorError> {
        self.calls.lock().push(ExecCall {
            instruction: instruction.to_string(),
            work_dir: work_dir.to_path_buf(),
            resumed_session: resumed_session.map(|s| s.to_string()),
        });
        match self.scripted.lock().pop_front() {
            Some(ScriptedExec::Outcome(outcome)) => Ok(outcome),
            Some(ScriptedExec::Timeout) => Err(ExecutorError::Timeout {
                timeout: opts.timeout,
                stdout: String::new(),
                stderr: String::new(),
            }),
            Some(ScriptedExec::Cancelled) => {
                Err(ExecutorError::Cancelled { stdout: String::new(), stderr: String::new() })
            }
            None => Err(ExecutorError::Spawn("fake executor exhausted".to_string())),
        }
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn start(
        &self,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        _cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError> {
        self.next(instruction, work_dir, None, opts)
    }

    async fn continue_session(
        &self,
        session_id: &str,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        _cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError> {
        self.next(instruction, work_dir, Some(session_id), opts)
    }
}

// ── Repo ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct FakeRepoState {
    branches: BTreeSet<String>,
    worktrees: BTreeSet<PathBuf>,
    removed_worktrees: Vec<PathBuf>,
    fail_worktree_create: bool,
}

/// In-memory repo: records branch and worktree operations.
#[derive(Default)]
pub struct FakeRepo {
    state: Mutex<FakeRepoState>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_worktree` calls fail.
    pub fn fail_worktree_create(&self) {
        self.state.lock().fail_worktree_create = true;
    }

    pub fn branches(&self) -> Vec<String> {
        self.state.lock().branches.iter().cloned().collect()
    }

    pub fn worktrees(&self) -> Vec<PathBuf> {
        self.state.lock().worktrees.iter().cloned().collect()
    }

    pub fn removed_worktrees(&self) -> Vec<PathBuf> {
        self.state.lock().removed_worktrees.clone()
    }
}

#[async_trait]
impl RepoOps for FakeRepo {
    async fn is_repository(&self, _path: &Path) -> bool {
        true
    }

    async fn current_branch(&self, _path: &Path) -> Result<String, RepoError> {
        Ok("main".to_string())
    }

    async fn branch_exists(&self, _path: &Path, name: &str) -> Result<bool, RepoError> {
        Ok(self.state.lock().branches.contains(name))
    }

    async fn create_branch(&self, _path: &Path, name: &str, _from: &str) -> Result<(), RepoError> {
        self.state.lock().branches.insert(name.to_string());
        Ok(())
    }

    async fn worktree_exists(&self, _path: &Path, worktree_path: &Path) -> Result<bool, RepoError> {
        Ok(self.state.lock().worktrees.contains(worktree_path))
    }

    async fn create_worktree(
        &self,
        _path: &Path,
        _branch: &str,
        worktree_path: &Path,
    ) -> Result<(), RepoError> {
        let mut state = self.state.lock();
        if state.fail_worktree_create {
            return Err(RepoError::Command {
                op: "worktree add",
                message: "scripted failure".to_string(),
            });
        }
        state.worktrees.insert(worktree_path.to_path_buf());
        Ok(())
    }

    async fn remove_worktree(&self, _path: &Path, worktree_path: &Path) -> Result<(), RepoError> {
        let mut state = self.state.lock();
        state.worktrees.remove(worktree_path);
        state.removed_worktrees.push(worktree_path.to_path_buf());
        Ok(())
    }
}
