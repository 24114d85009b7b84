// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository operations: branches and worktrees for story isolation.

mod git;

pub use git::GitRepo;

use crate::subprocess::SubprocessError;
use async_trait::async_trait;
use fm_core::{StoryId, WorkItemId};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),
    #[error("git {op} failed: {message}")]
    Command { op: &'static str, message: String },
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),
}

/// Version-control capability used by the workspace isolator.
///
/// Operations are idempotent where noted so a crashed run can re-acquire
/// its workspace without manual cleanup.
#[async_trait]
pub trait RepoOps: Send + Sync {
    /// Probe; never errors.
    async fn is_repository(&self, path: &Path) -> bool;

    async fn current_branch(&self, path: &Path) -> Result<String, RepoError>;

    async fn branch_exists(&self, path: &Path, name: &str) -> Result<bool, RepoError>;

    /// Create `name` at `from`. Idempotent: an existing branch is left as
    /// is. Fails on an invalid start point.
    async fn create_branch(&self, path: &Path, name: &str, from: &str) -> Result<(), RepoError>;

    async fn worktree_exists(&self, path: &Path, worktree_path: &Path) -> Result<bool, RepoError>;

    /// Create a working directory at `worktree_path` checked out to
    /// `branch`. Fails if the path already holds different contents.
    async fn create_worktree(
        &self,
        path: &Path,
        branch: &str,
        worktree_path: &Path,
    ) -> Result<(), RepoError>;

    /// Remove a worktree, discarding uncommitted changes. Removing a
    /// worktree that does not exist is a no-op.
    async fn remove_worktree(&self, path: &Path, worktree_path: &Path) -> Result<(), RepoError>;
}

#[async_trait]
impl<T: RepoOps> RepoOps for std::sync::Arc<T> {
    async fn is_repository(&self, path: &Path) -> bool {
        (**self).is_repository(path).await
    }

    async fn current_branch(&self, path: &Path) -> Result<String, RepoError> {
        (**self).current_branch(path).await
    }

    async fn branch_exists(&self, path: &Path, name: &str) -> Result<bool, RepoError> {
        (**self).branch_exists(path, name).await
    }

    async fn create_branch(&self, path: &Path, name: &str, from: &str) -> Result<(), RepoError> {
        (**self).create_branch(path, name, from).await
    }

    async fn worktree_exists(&self, path: &Path, worktree_path: &Path) -> Result<bool, RepoError> {
        (**self).worktree_exists(path, worktree_path).await
    }

    async fn create_worktree(
        &self,
        path: &Path,
        branch: &str,
        worktree_path: &Path,
    ) -> Result<(), RepoError> {
        (**self).create_worktree(path, branch, worktree_path).await
    }

    async fn remove_worktree(&self, path: &Path, worktree_path: &Path) -> Result<(), RepoError> {
        (**self).remove_worktree(path, worktree_path).await
    }
}

/// Deterministic per-story worktree location: `base/ds-<story id>`.
pub fn worktree_path_for(story_id: StoryId, base: &Path) -> PathBuf {
    base.join(format!("ds-{}", story_id))
}

/// Feature branch name for a story run.
pub fn story_branch(work_item_id: WorkItemId, story_id: StoryId) -> String {
    format!("story/{}/{}", work_item_id, story_id)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
