// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::*;
use crate::test_support::{story_in_status, user_story};
use crate::{FakeClock, StoryStatus as S, WorkItemId, WorkItemStatus as W};
use proptest::prelude::*;

#[yare::parameterized(
    pending_refining      = { W::Pending,    W::Refining,   true },
    pending_error         = { W::Pending,    W::Error,      true },
    pending_completed     = { W::Pending,    W::Completed,  false },
    refining_refined      = { W::Refining,   W::Refined,    true },
    refining_error        = { W::Refining,   W::Error,      true },
    refining_in_progress  = { W::Refining,   W::InProgress, false },
    refined_in_progress   = { W::Refined,    W::InProgress, true },
    refined_error         = { W::Refined,    W::Error,      true },
    refined_completed     = { W::Refined,    W::Completed,  false },
    in_progress_completed = { W::InProgress, W::Completed,  true },
    in_progress_error     = { W::InProgress, W::Error,      true },
    in_progress_pending   = { W::InProgress, W::Pending,    false },
    error_pending         = { W::Error,      W::Pending,    true },
    error_refining        = { W::Error,      W::Refining,   false },
    completed_anything    = { W::Completed,  W::Pending,    false },
)]
fn work_item_matrix(from: W, to: W, legal: bool) {
    assert_eq!(can_transition_work_item(from, to), legal);
}

#[yare::parameterized(
    pending_ready          = { S::Pending,    S::Ready,      true },
    pending_blocked        = { S::Pending,    S::Blocked,    true },
    pending_error          = { S::Pending,    S::Error,      true },
    pending_in_progress    = { S::Pending,    S::InProgress, false },
    blocked_ready          = { S::Blocked,    S::Ready,      true },
    blocked_error          = { S::Blocked,    S::Error,      true },
    blocked_pending        = { S::Blocked,    S::Pending,    false },
    ready_in_progress      = { S::Ready,      S::InProgress, true },
    ready_blocked          = { S::Ready,      S::Blocked,    true },
    ready_error            = { S::Ready,      S::Error,      true },
    ready_completed        = { S::Ready,      S::Completed,  false },
    in_progress_completed  = { S::InProgress, S::Completed,  true },
    in_progress_error      = { S::InProgress, S::Error,      true },
    in_progress_blocked    = { S::InProgress, S::Blocked,    true },
    in_progress_ready      = { S::InProgress, S::Ready,      false },
    error_pending          = { S::Error,      S::Pending,    true },
    error_ready            = { S::Error,      S::Ready,      true },
    error_in_progress      = { S::Error,      S::InProgress, false },
    completed_anything     = { S::Completed,  S::Ready,      false },
)]
fn story_matrix(from: S, to: S, legal: bool) {
    assert_eq!(can_transition_story(from, to), legal);
}

#[test]
fn valid_transitions_match_can_transition() {
    let all = [S::Pending, S::Blocked, S::Ready, S::InProgress, S::Completed, S::Error];
    for from in all {
        for to in all {
            assert_eq!(
                story_transitions(from).contains(&to),
                can_transition_story(from, to),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn completed_states_are_terminal() {
    assert!(work_item_transitions(W::Completed).is_empty());
    assert!(story_transitions(S::Completed).is_empty());
}

#[test]
fn apply_work_item_rejects_illegal() {
    let clock = FakeClock::new();
    let mut item = user_story("login");

    let err = apply_work_item_transition(&mut item, W::Completed, &clock).unwrap_err();

    assert_eq!(err, TransitionError::WorkItem { from: W::Pending, to: W::Completed });
    assert_eq!(item.status, W::Pending);
}

#[test]
fn apply_work_item_refreshes_updated_at() {
    let clock = FakeClock::new();
    let mut item = user_story("login");
    clock.advance_secs(10);

    apply_work_item_transition(&mut item, W::Refining, &clock).unwrap();

    assert_eq!(item.status, W::Refining);
    assert_eq!(item.updated_at, clock.now());
    assert!(item.updated_at >= item.created_at);
}

#[test]
fn work_item_retry_clears_error_message() {
    let clock = FakeClock::new();
    let mut item = user_story("login");
    item.status = W::Error;
    item.error_message = Some("planner exploded".to_string());

    apply_work_item_transition(&mut item, W::Pending, &clock).unwrap();

    assert_eq!(item.status, W::Pending);
    assert!(item.error_message.is_none());
}

#[test]
fn story_claim_stamps_started_at_and_heartbeat() {
    let clock = FakeClock::new();
    let mut story = story_in_status(WorkItemId::new(1), "a", S::Ready, &clock);
    clock.advance_secs(5);

    apply_story_transition(&mut story, S::InProgress, &clock).unwrap();

    assert_eq!(story.started_at, Some(clock.now()));
    assert_eq!(story.heartbeat_at, Some(clock.now()));
    assert!(story.completed_at.is_none());
}

#[test]
fn story_started_at_is_first_entry_only() {
    let clock = FakeClock::new();
    let mut story = story_in_status(WorkItemId::new(1), "a", S::Ready, &clock);

    apply_story_transition(&mut story, S::InProgress, &clock).unwrap();
    let first_start = story.started_at;

    // Blocked mid-flight, then back through ready to in-progress
    apply_story_transition(&mut story, S::Blocked, &clock).unwrap();
    apply_story_transition(&mut story, S::Ready, &clock).unwrap();
    clock.advance_secs(30);
    apply_story_transition(&mut story, S::InProgress, &clock).unwrap();

    assert_eq!(story.started_at, first_start);
    assert_eq!(story.heartbeat_at, Some(clock.now()));
}

#[test]
fn story_completion_stamps_completed_at() {
    let clock = FakeClock::new();
    let mut story = story_in_status(WorkItemId::new(1), "a", S::Ready, &clock);

    apply_story_transition(&mut story, S::InProgress, &clock).unwrap();
    clock.advance_secs(42);
    apply_story_transition(&mut story, S::Completed, &clock).unwrap();

    let (started, completed) = (story.started_at.unwrap(), story.completed_at.unwrap());
    assert!(completed >= started);
}

#[yare::parameterized(
    to_pending = { S::Pending },
    to_ready   = { S::Ready },
)]
fn story_retry_clears_run_state(to: S) {
    let clock = FakeClock::new();
    let mut story = story_in_status(WorkItemId::new(1), "a", S::Ready, &clock);
    apply_story_transition(&mut story, S::InProgress, &clock).unwrap();
    story.error_message = Some("build failed".to_string());
    apply_story_transition(&mut story, S::Error, &clock).unwrap();

    apply_story_transition(&mut story, to, &clock).unwrap();

    assert_eq!(story.status, to);
    assert!(story.started_at.is_none());
    assert!(story.completed_at.is_none());
    assert!(story.heartbeat_at.is_none());
    assert!(story.error_message.is_none());
}

#[test]
fn story_pending_to_blocked_keeps_clean_state() {
    let clock = FakeClock::new();
    let mut story = story_in_status(WorkItemId::new(1), "a", S::Pending, &clock);

    apply_story_transition(&mut story, S::Blocked, &clock).unwrap();

    assert!(story.started_at.is_none());
    assert!(story.heartbeat_at.is_none());
}

proptest! {
    // Applying any legal transition never leaves updated_at behind created_at.
    #[test]
    fn updated_at_stays_monotonic(from in arb_story_status(), to in arb_story_status()) {
        let clock = FakeClock::new();
        let mut story = story_in_status(WorkItemId::new(1), "p", from, &clock);
        let result = apply_story_transition(&mut story, to, &clock);
        prop_assert_eq!(result.is_ok(), can_transition_story(from, to));
        prop_assert!(story.updated_at >= story.created_at);
    }

    // A rejected transition leaves the story untouched.
    #[test]
    fn illegal_transition_is_inert(from in arb_story_status(), to in arb_story_status()) {
        prop_assume!(!can_transition_story(from, to));
        let clock = FakeClock::new();
        let story = story_in_status(WorkItemId::new(1), "p", from, &clock);
        let mut mutated = story.clone();
        prop_assert!(apply_story_transition(&mut mutated, to, &clock).is_err());
        prop_assert_eq!(mutated, story);
    }
}
