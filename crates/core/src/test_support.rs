// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::story::{DeveloperStory, StoryConfig, StoryStatus, StoryType};
use crate::work_item::{WorkItem, WorkItemKind};
use crate::{Clock, FakeClock, WorkItemId};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::story::{StoryStatus, StoryType};
    use crate::work_item::WorkItemStatus;
    use proptest::prelude::*;

    pub fn arb_work_item_status() -> impl Strategy<Value = WorkItemStatus> {
        prop_oneof![
            Just(WorkItemStatus::Pending),
            Just(WorkItemStatus::Refining),
            Just(WorkItemStatus::Refined),
            Just(WorkItemStatus::InProgress),
            Just(WorkItemStatus::Completed),
            Just(WorkItemStatus::Error),
        ]
    }

    pub fn arb_story_status() -> impl Strategy<Value = StoryStatus> {
        prop_oneof![
            Just(StoryStatus::Pending),
            Just(StoryStatus::Blocked),
            Just(StoryStatus::Ready),
            Just(StoryStatus::InProgress),
            Just(StoryStatus::Completed),
            Just(StoryStatus::Error),
        ]
    }

    pub fn arb_story_type() -> impl Strategy<Value = StoryType> {
        prop_oneof![
            Just(StoryType::Implementation),
            Just(StoryType::UnitTests),
            Just(StoryType::FeatureTests),
            Just(StoryType::Documentation),
        ]
    }
}

// ── Entity factory functions ────────────────────────────────────────────

/// A valid unsaved user story work item.
pub fn user_story(title: &str) -> WorkItem {
    WorkItem::builder()
        .title(title)
        .description("as a user, I want this")
        .kind(WorkItemKind::UserStory)
        .build()
}

/// A pending implementation story for the given work item.
pub fn pending_story(work_item_id: WorkItemId, title: &str) -> DeveloperStory {
    let config = StoryConfig::new(work_item_id, StoryType::Implementation)
        .title(title)
        .description("test story")
        .instructions(format!("implement {}", title));
    DeveloperStory::new(config, &FakeClock::new())
}

/// A story forced into the given status with the timestamp side effects a
/// real transition chain would have produced.
pub fn story_in_status(
    work_item_id: WorkItemId,
    title: &str,
    status: StoryStatus,
    clock: &FakeClock,
) -> DeveloperStory {
    let mut story = pending_story(work_item_id, title);
    story.status = status;
    match status {
        StoryStatus::InProgress => {
            story.started_at = Some(clock.now());
            story.heartbeat_at = Some(clock.now());
        }
        StoryStatus::Completed => {
            story.started_at = Some(clock.now());
            story.completed_at = Some(clock.now());
        }
        StoryStatus::Error => {
            story.error_message = Some("test failure".to_string());
        }
        _ => {}
    }
    story
}
