// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-story workspace lifecycle: feature branch + worktree.

use fm_adapters::{story_branch, worktree_path_for, RepoError, RepoOps};
use fm_core::DeveloperStory;
use std::path::{Path, PathBuf};

/// An acquired story workspace. The `*_created` flags say whether this
/// acquisition created the branch/worktree or found them already present
/// (a crashed earlier run), so the caller only logs what actually happened.
#[derive(Debug, Clone)]
pub struct AcquiredWorkspace {
    pub branch: String,
    pub path: PathBuf,
    pub branch_created: bool,
    pub worktree_created: bool,
}

/// Ensure the story's feature branch and worktree exist.
pub(crate) async fn acquire<R: RepoOps>(
    repo: &R,
    repo_path: &Path,
    main_branch: &str,
    story: &DeveloperStory,
    worktree_base: &Path,
) -> Result<AcquiredWorkspace, RepoError> {
    let branch = story_branch(story.work_item_id, story.id);
    let branch_created = !repo.branch_exists(repo_path, &branch).await?;
    if branch_created {
        repo.create_branch(repo_path, &branch, main_branch).await?;
    }

    let path = worktree_path_for(story.id, worktree_base);
    let worktree_created = !repo.worktree_exists(repo_path, &path).await?;
    if worktree_created {
        repo.create_worktree(repo_path, &branch, &path).await?;
    }

    tracing::info!(
        story_id = %story.id,
        branch = %branch,
        worktree = %path.display(),
        branch_created,
        worktree_created,
        "workspace acquired"
    );
    Ok(AcquiredWorkspace { branch, path, branch_created, worktree_created })
}

/// Remove the story's worktree. Best-effort: a failure is logged, never
/// propagated, so release can run on every exit path.
pub(crate) async fn release<R: RepoOps>(repo: &R, repo_path: &Path, worktree: &Path) -> bool {
    match repo.remove_worktree(repo_path, worktree).await {
        Ok(()) => {
            tracing::info!(worktree = %worktree.display(), "workspace released");
            true
        }
        Err(e) => {
            tracing::warn!(worktree = %worktree.display(), error = %e, "workspace release failed");
            false
        }
    }
}
