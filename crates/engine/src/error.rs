// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator error taxonomy.
//!
//! Collaborator errors are wrapped here at the boundary; the orchestrator
//! is the only layer that turns an error into a status transition.

use fm_core::{ConfigError, StoryId, TransitionError, ValidationError, WorkItemId};
use fm_adapters::{ExecutorError, PlannerError, RepoError};
use fm_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("work item not found: {0}")]
    WorkItemNotFound(WorkItemId),
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),
    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),
    #[error("dependency cycle among stories {0:?}")]
    Cycle(Vec<StoryId>),
    #[error("another user story is already in progress: {0}")]
    UserStoryInProgress(WorkItemId),
    #[error("state is inconsistent: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}
