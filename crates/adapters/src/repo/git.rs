// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git CLI implementation of [`RepoOps`].

use super::{RepoError, RepoOps};
use crate::subprocess::{run_with_timeout, GIT_COMMAND_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

/// Shells out to the `git` binary. Worktree and branch state lives in the
/// repository itself; this type is stateless.
#[derive(Debug, Clone, Default)]
pub struct GitRepo;

impl GitRepo {
    pub fn new() -> Self {
        Self
    }

    /// Build a `git -C <repo> …` command with a clean environment.
    ///
    /// `GIT_DIR`/`GIT_WORK_TREE` from the embedding process would redirect
    /// every call to the wrong repository.
    fn git(repo: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(repo).args(args);
        cmd.env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
        cmd
    }

    async fn run(repo: &Path, args: &[&str], op: &'static str) -> Result<Output, RepoError> {
        let output = run_with_timeout(Self::git(repo, args), GIT_COMMAND_TIMEOUT, op).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepoError::Command { op, message: stderr.trim().to_string() });
        }
        Ok(output)
    }
}

#[async_trait]
impl RepoOps for GitRepo {
    async fn is_repository(&self, path: &Path) -> bool {
        let cmd = Self::git(path, &["rev-parse", "--is-inside-work-tree"]);
        match run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git rev-parse").await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    async fn current_branch(&self, path: &Path) -> Result<String, RepoError> {
        if !self.is_repository(path).await {
            return Err(RepoError::NotARepository(path.to_path_buf()));
        }
        let output = Self::run(path, &["rev-parse", "--abbrev-ref", "HEAD"], "rev-parse").await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn branch_exists(&self, path: &Path, name: &str) -> Result<bool, RepoError> {
        let refname = format!("refs/heads/{}", name);
        let cmd = Self::git(path, &["show-ref", "--verify", "--quiet", &refname]);
        let output = run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git show-ref").await?;
        Ok(output.status.success())
    }

    async fn create_branch(&self, path: &Path, name: &str, from: &str) -> Result<(), RepoError> {
        if self.branch_exists(path, name).await? {
            return Ok(());
        }
        Self::run(path, &["branch", name, from], "branch").await?;
        tracing::debug!(branch = name, from, "branch created");
        Ok(())
    }

    async fn worktree_exists(&self, path: &Path, worktree_path: &Path) -> Result<bool, RepoError> {
        let output = Self::run(path, &["worktree", "list", "--porcelain"], "worktree list").await?;
        let listing = String::from_utf8_lossy(&output.stdout);
        let needle = worktree_path.display().to_string();
        Ok(listing
            .lines()
            .filter_map(|line| line.strip_prefix("worktree "))
            .any(|p| p == needle))
    }

    async fn create_worktree(
        &self,
        path: &Path,
        branch: &str,
        worktree_path: &Path,
    ) -> Result<(), RepoError> {
        if let Some(parent) = worktree_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Err(RepoError::Command {
                    op: "worktree add",
                    message: format!("failed to create worktree parent dir: {}", e),
                });
            }
        }
        let wt = worktree_path.display().to_string();
        Self::run(path, &["worktree", "add", &wt, branch], "worktree add").await?;
        tracing::debug!(branch, worktree = %worktree_path.display(), "worktree created");
        Ok(())
    }

    async fn remove_worktree(&self, path: &Path, worktree_path: &Path) -> Result<(), RepoError> {
        if !self.worktree_exists(path, worktree_path).await? {
            // Removing a missing worktree is a no-op; clean any leftover
            // directory so the path can be reused.
            if worktree_path.exists() {
                if let Err(e) = tokio::fs::remove_dir_all(worktree_path).await {
                    tracing::warn!(
                        path = %worktree_path.display(),
                        error = %e,
                        "failed to remove leftover worktree directory (best-effort)"
                    );
                }
            }
            return Ok(());
        }

        let wt = worktree_path.display().to_string();
        let result = Self::run(path, &["worktree", "remove", "--force", &wt], "worktree remove").await;
        if let Err(e) = &result {
            // A stale lock or remnants should not fail the release path.
            tracing::warn!(path = %worktree_path.display(), error = %e, "git worktree remove failed");
            let _ = Self::run(path, &["worktree", "prune"], "worktree prune").await;
        }
        if worktree_path.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(worktree_path).await {
                tracing::warn!(
                    path = %worktree_path.display(),
                    error = %e,
                    "failed to remove worktree directory (best-effort)"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
