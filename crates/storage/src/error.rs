// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error types.

use fm_core::{StoryId, WorkItemId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("work item not found: {0}")]
    WorkItemNotFound(WorkItemId),
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("duplicate dependency edge: {0} -> {1}")]
    DuplicateDependency(StoryId, StoryId),
    #[error("persisted state is inconsistent: {0}")]
    InvariantViolation(String),
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
