// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-aware scheduling over the story graph.
//!
//! Readiness propagation walks the stories in topological order (required
//! before dependent), so a single linear pass reaches a fixed point.
//! Selection is a pure read; claiming is the orchestrator's transaction.

use crate::error::OrchestratorError;
use fm_core::{
    apply_story_transition, Clock, DeveloperStory, StoryId, StoryStatus,
};
use fm_storage::Tables;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A blocked story with its unmet prerequisites.
pub type BlockedEntry = (DeveloperStory, Vec<DeveloperStory>);

/// Topological order of all story ids (required before dependent).
///
/// Fails with `Cycle` listing the ids left over when the Kahn queue runs
/// dry.
fn topological_order(tables: &Tables) -> Result<Vec<StoryId>, OrchestratorError> {
    let mut indegree: BTreeMap<i64, usize> =
        tables.developer_stories.keys().map(|id| (*id, 0)).collect();
    let mut dependents: BTreeMap<i64, Vec<i64>> = BTreeMap::new();

    for edge in &tables.story_dependencies {
        let (dependent, required) = (edge.dependent_story_id.raw(), edge.required_story_id.raw());
        if let Some(count) = indegree.get_mut(&dependent) {
            *count += 1;
        }
        dependents.entry(required).or_default().push(dependent);
    }

    let mut queue: VecDeque<i64> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(indegree.len());

    while let Some(id) = queue.pop_front() {
        order.push(StoryId::new(id));
        for dependent in dependents.get(&id).into_iter().flatten() {
            if let Some(count) = indegree.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(*dependent);
                }
            }
        }
    }

    if order.len() != indegree.len() {
        let ordered: BTreeSet<i64> = order.iter().map(|id| id.raw()).collect();
        let stuck: Vec<StoryId> = indegree
            .keys()
            .filter(|id| !ordered.contains(id))
            .map(|id| StoryId::new(*id))
            .collect();
        return Err(OrchestratorError::Cycle(stuck));
    }
    Ok(order)
}

/// Bring every `Pending`/`Blocked`/`Ready` story in line with its graph
/// position. Returns the number of transitions applied. Idempotent.
///
/// Runs inside the caller's transaction, so a detected cycle leaves the
/// graph unmodified.
pub fn update_readiness(
    tables: &mut Tables,
    clock: &impl Clock,
) -> Result<usize, OrchestratorError> {
    let order = topological_order(tables)?;

    let mut transitions = 0;
    for id in order {
        let Some(story) = tables.story(id).cloned() else {
            continue;
        };
        let deps_done = tables.dependencies_completed(id)?;
        let target = match (story.status, deps_done) {
            (StoryStatus::Pending, true) | (StoryStatus::Blocked, true) => StoryStatus::Ready,
            (StoryStatus::Pending, false) => StoryStatus::Blocked,
            // A ready story that acquired a new unmet prerequisite
            (StoryStatus::Ready, false) => StoryStatus::Blocked,
            _ => continue,
        };
        if target == story.status {
            continue;
        }
        let mut updated = story;
        apply_story_transition(&mut updated, target, clock)?;
        tables.update_story(updated)?;
        transitions += 1;
    }

    if transitions > 0 {
        tracing::debug!(transitions, "readiness updated");
    }
    Ok(transitions)
}

/// The single next runnable story, if any: `Ready`, prerequisites
/// re-checked complete, minimal by
/// `(work item priority, story type, story priority, story id)`.
///
/// Pure read; does not claim.
pub fn select_next(tables: &Tables) -> Result<Option<DeveloperStory>, OrchestratorError> {
    let mut best: Option<((u8, fm_core::StoryType, u8, StoryId), DeveloperStory)> = None;

    for story in tables.stories_by_status(StoryStatus::Ready) {
        if !tables.dependencies_completed(story.id)? {
            continue;
        }
        let item = tables.work_item(story.work_item_id).ok_or_else(|| {
            OrchestratorError::InvariantViolation(format!(
                "story {} references missing work item {}",
                story.id, story.work_item_id
            ))
        })?;
        let key = (item.priority, story.story_type, story.priority, story.id);
        if best.as_ref().map_or(true, |(current, _)| key < *current) {
            best = Some((key, story));
        }
    }

    Ok(best.map(|(_, story)| story))
}

/// Blocked stories with their unmet prerequisites, for diagnostics.
pub fn blocked_stories(tables: &Tables) -> Result<Vec<BlockedEntry>, OrchestratorError> {
    let mut entries = Vec::new();
    for story in tables.blocked_stories() {
        let unmet: Vec<DeveloperStory> = tables
            .dependencies_of(story.id)?
            .into_iter()
            .filter(|dep| dep.story.status != StoryStatus::Completed)
            .map(|dep| dep.story)
            .collect();
        entries.push((story, unmet));
    }
    Ok(entries)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
