// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::{StoryId, WorkItemId};

#[test]
fn worktree_path_is_deterministic() {
    let base = Path::new("/var/foreman/worktrees");

    let a = worktree_path_for(StoryId::new(7), base);
    let b = worktree_path_for(StoryId::new(7), base);

    assert_eq!(a, b);
    assert_eq!(a, PathBuf::from("/var/foreman/worktrees/ds-7"));
}

#[test]
fn worktree_paths_are_disjoint_per_story() {
    let base = Path::new("wt");

    assert_ne!(
        worktree_path_for(StoryId::new(1), base),
        worktree_path_for(StoryId::new(2), base)
    );
}

#[test]
fn story_branch_embeds_both_ids() {
    assert_eq!(story_branch(WorkItemId::new(3), StoryId::new(14)), "story/3/14");
}
