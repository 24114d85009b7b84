// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flat entity tables with the specialized lookups the scheduler needs.
//!
//! Stories live in a flat table and dependency edges in a separate join
//! table; traversal is by query, never by in-memory back-pointers.

use crate::error::StoreError;
use fm_core::{
    DeveloperStory, ExecutionLog, LogId, StoryDependency, StoryId, StoryStatus, WorkItem,
    WorkItemId, WorkItemKind, WorkItemStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dependency edge with the story on its far end resolved: the required
/// story for [`Tables::dependencies_of`], the dependent story for
/// [`Tables::dependents_of`].
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub edge: StoryDependency,
    pub story: DeveloperStory,
}

/// The four logical tables plus per-table id counters.
///
/// Ids are assigned here, on first insert, and nowhere else.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Tables {
    pub work_items: BTreeMap<i64, WorkItem>,
    pub developer_stories: BTreeMap<i64, DeveloperStory>,
    pub story_dependencies: Vec<StoryDependency>,
    pub execution_logs: BTreeMap<i64, ExecutionLog>,
    #[serde(default)]
    next_work_item_id: i64,
    #[serde(default)]
    next_story_id: i64,
    #[serde(default)]
    next_log_id: i64,
}

impl Tables {
    // ── Entity access ───────────────────────────────────────────────────

    pub fn work_item(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.work_items.get(&id.raw())
    }

    pub fn story(&self, id: StoryId) -> Option<&DeveloperStory> {
        self.developer_stories.get(&id.raw())
    }

    // ── Mutation (used by transactions) ─────────────────────────────────

    /// Insert an unsaved work item, assigning its id.
    pub fn insert_work_item(&mut self, mut item: WorkItem) -> Result<WorkItem, StoreError> {
        if !item.id.is_unsaved() {
            return Err(StoreError::InvalidOperation("work item already persisted"));
        }
        self.next_work_item_id += 1;
        item.id = WorkItemId::new(self.next_work_item_id);
        self.work_items.insert(item.id.raw(), item.clone());
        Ok(item)
    }

    /// Insert an unsaved story, assigning its id. The owning work item
    /// must exist.
    pub fn insert_story(&mut self, mut story: DeveloperStory) -> Result<DeveloperStory, StoreError> {
        if !story.id.is_unsaved() {
            return Err(StoreError::InvalidOperation("story already persisted"));
        }
        if !self.work_items.contains_key(&story.work_item_id.raw()) {
            return Err(StoreError::WorkItemNotFound(story.work_item_id));
        }
        self.next_story_id += 1;
        story.id = StoryId::new(self.next_story_id);
        self.developer_stories.insert(story.id.raw(), story.clone());
        Ok(story)
    }

    /// Insert a dependency edge. Both endpoints must exist and the
    /// `(dependent, required)` pair must be new.
    pub fn insert_dependency(&mut self, edge: StoryDependency) -> Result<(), StoreError> {
        for id in [edge.dependent_story_id, edge.required_story_id] {
            if !self.developer_stories.contains_key(&id.raw()) {
                return Err(StoreError::StoryNotFound(id));
            }
        }
        if self.story_dependencies.iter().any(|e| e.key() == edge.key()) {
            return Err(StoreError::DuplicateDependency(
                edge.dependent_story_id,
                edge.required_story_id,
            ));
        }
        self.story_dependencies.push(edge);
        Ok(())
    }

    /// Append an unsaved execution log entry, assigning its id.
    pub fn append_log(&mut self, mut log: ExecutionLog) -> Result<ExecutionLog, StoreError> {
        if !log.id.is_unsaved() {
            return Err(StoreError::InvalidOperation("log entry already persisted"));
        }
        if !self.developer_stories.contains_key(&log.story_id.raw()) {
            return Err(StoreError::StoryNotFound(log.story_id));
        }
        self.next_log_id += 1;
        log.id = LogId::new(self.next_log_id);
        self.execution_logs.insert(log.id.raw(), log.clone());
        Ok(log)
    }

    pub fn update_work_item(&mut self, item: WorkItem) -> Result<(), StoreError> {
        if !self.work_items.contains_key(&item.id.raw()) {
            return Err(StoreError::WorkItemNotFound(item.id));
        }
        self.work_items.insert(item.id.raw(), item);
        Ok(())
    }

    pub fn update_story(&mut self, story: DeveloperStory) -> Result<(), StoreError> {
        if !self.developer_stories.contains_key(&story.id.raw()) {
            return Err(StoreError::StoryNotFound(story.id));
        }
        self.developer_stories.insert(story.id.raw(), story);
        Ok(())
    }

    /// Delete a work item and cascade to its stories, their edges, and
    /// their logs.
    pub fn delete_work_item(&mut self, id: WorkItemId) -> Result<(), StoreError> {
        if self.work_items.remove(&id.raw()).is_none() {
            return Err(StoreError::WorkItemNotFound(id));
        }
        let story_ids: Vec<i64> = self
            .developer_stories
            .values()
            .filter(|s| s.work_item_id == id)
            .map(|s| s.id.raw())
            .collect();
        for sid in &story_ids {
            self.developer_stories.remove(sid);
        }
        let doomed = |sid: StoryId| story_ids.contains(&sid.raw());
        self.story_dependencies
            .retain(|e| !doomed(e.dependent_story_id) && !doomed(e.required_story_id));
        self.execution_logs.retain(|_, log| !doomed(log.story_id));
        Ok(())
    }

    // ── Specialized lookups ─────────────────────────────────────────────

    /// Stories of a work item, ordered `(story_type, id)`.
    pub fn stories_by_work_item(&self, id: WorkItemId) -> Vec<DeveloperStory> {
        let mut stories: Vec<_> = self
            .developer_stories
            .values()
            .filter(|s| s.work_item_id == id)
            .cloned()
            .collect();
        stories.sort_by_key(|s| (s.story_type, s.id));
        stories
    }

    /// Stories in a status, ordered `(priority, id)`.
    pub fn stories_by_status(&self, status: StoryStatus) -> Vec<DeveloperStory> {
        let mut stories: Vec<_> = self
            .developer_stories
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect();
        stories.sort_by_key(|s| (s.priority, s.id));
        stories
    }

    pub fn blocked_stories(&self) -> Vec<DeveloperStory> {
        self.stories_by_status(StoryStatus::Blocked)
    }

    /// Prerequisite edges of a story with the required story resolved.
    pub fn dependencies_of(&self, id: StoryId) -> Result<Vec<ResolvedDependency>, StoreError> {
        self.story_dependencies
            .iter()
            .filter(|e| e.dependent_story_id == id)
            .map(|e| {
                let required = self.story(e.required_story_id).cloned().ok_or_else(|| {
                    StoreError::InvariantViolation(format!(
                        "dependency of story {} references missing story {}",
                        id, e.required_story_id
                    ))
                })?;
                Ok(ResolvedDependency { edge: e.clone(), story: required })
            })
            .collect()
    }

    /// Edges that require this story, with the dependent story resolved.
    pub fn dependents_of(&self, id: StoryId) -> Result<Vec<ResolvedDependency>, StoreError> {
        self.story_dependencies
            .iter()
            .filter(|e| e.required_story_id == id)
            .map(|e| {
                let dependent = self.story(e.dependent_story_id).cloned().ok_or_else(|| {
                    StoreError::InvariantViolation(format!(
                        "dependent edge of story {} references missing story {}",
                        id, e.dependent_story_id
                    ))
                })?;
                Ok(ResolvedDependency { edge: e.clone(), story: dependent })
            })
            .collect()
    }

    /// The at-most-one user story work item currently in progress.
    pub fn in_progress_user_story(&self) -> Option<&WorkItem> {
        self.work_items
            .values()
            .find(|w| w.kind == WorkItemKind::UserStory && w.status == WorkItemStatus::InProgress)
    }

    /// Log entries for a story, ordered `(timestamp, id)`.
    pub fn logs_for_story(&self, id: StoryId) -> Vec<ExecutionLog> {
        let mut logs: Vec<_> = self
            .execution_logs
            .values()
            .filter(|log| log.story_id == id)
            .cloned()
            .collect();
        logs.sort_by_key(|log| (log.timestamp, log.id));
        logs
    }

    /// True when every prerequisite of the story is completed.
    pub fn dependencies_completed(&self, id: StoryId) -> Result<bool, StoreError> {
        Ok(self
            .dependencies_of(id)?
            .iter()
            .all(|dep| dep.story.status == StoryStatus::Completed))
    }
}

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tests;
