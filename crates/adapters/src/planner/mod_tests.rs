// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::test_support::user_story;

const VALID_PLAN: &str = r#"{
    "analysis": "Split into implementation and tests.",
    "developerStories": [
        { "title": "Implement login", "description": "d1", "instructions": "i1", "storyType": 0 },
        { "title": "Test login", "description": "d2", "instructions": "i2", "storyType": 1, "priority": 3 }
    ],
    "dependencies": [
        { "dependentStoryIndex": 1, "requiredStoryIndex": 0, "description": "tests need code" }
    ]
}"#;

#[test]
fn valid_plan_parses() {
    let plan = parse_plan(VALID_PLAN).unwrap();

    assert_eq!(plan.analysis, "Split into implementation and tests.");
    assert_eq!(plan.stories.len(), 2);
    assert_eq!(plan.stories[0].story_type, StoryType::Implementation);
    assert_eq!(plan.stories[0].priority, None);
    assert_eq!(plan.stories[1].story_type, StoryType::UnitTests);
    assert_eq!(plan.stories[1].priority, Some(3));
    assert_eq!(plan.dependencies.len(), 1);
    assert_eq!(plan.dependencies[0].dependent_index, 1);
    assert_eq!(plan.dependencies[0].required_index, 0);
}

#[test]
fn fenced_plan_parses() {
    let fenced = format!("The plan:\n```json\n{}\n```", VALID_PLAN);
    let plan = parse_plan(&fenced).unwrap();
    assert_eq!(plan.stories.len(), 2);
}

#[test]
fn empty_plan_is_valid() {
    let plan = parse_plan(r#"{"analysis": "nothing to do"}"#).unwrap();

    assert!(plan.stories.is_empty());
    assert!(plan.dependencies.is_empty());
}

#[test]
fn unknown_story_type_code_rejected() {
    let text = r#"{
        "developerStories": [{ "title": "x", "storyType": 9 }]
    }"#;

    let err = parse_plan(text).unwrap_err();

    assert!(matches!(err, PlannerError::Invalid(_)), "{err}");
}

#[yare::parameterized(
    dependent_too_big = { 2, 0 },
    required_too_big  = { 0, 2 },
    negative          = { -1, 0 },
)]
fn out_of_range_dependency_rejected(dependent: i64, required: i64) {
    let text = format!(
        r#"{{
            "developerStories": [
                {{ "title": "a", "storyType": 0 }},
                {{ "title": "b", "storyType": 1 }}
            ],
            "dependencies": [
                {{ "dependentStoryIndex": {}, "requiredStoryIndex": {} }}
            ]
        }}"#,
        dependent, required
    );

    let err = parse_plan(&text).unwrap_err();

    assert!(matches!(err, PlannerError::Invalid(_)), "{err}");
}

#[test]
fn self_dependency_rejected() {
    let text = r#"{
        "developerStories": [{ "title": "a", "storyType": 0 }],
        "dependencies": [{ "dependentStoryIndex": 0, "requiredStoryIndex": 0 }]
    }"#;

    assert!(matches!(parse_plan(text).unwrap_err(), PlannerError::Invalid(_)));
}

#[test]
fn non_json_response_is_parse_error() {
    assert!(matches!(
        parse_plan("I could not produce a plan, sorry.").unwrap_err(),
        PlannerError::Parse(_)
    ));
}

#[test]
fn malformed_json_is_parse_error() {
    assert!(matches!(
        parse_plan(r#"{"developerStories": "not an array"}"#).unwrap_err(),
        PlannerError::Parse(_)
    ));
}

#[test]
fn prompt_includes_work_item_fields() {
    let mut item = user_story("Login page");
    item.acceptance_criteria = Some("must support SSO".to_string());
    item.priority = 2;

    let prompt = build_prompt(&item);

    assert!(prompt.contains("user-story"));
    assert!(prompt.contains("Login page"));
    assert!(prompt.contains("Priority: 2"));
    assert!(prompt.contains("must support SSO"));
}

#[test]
fn prompt_omits_absent_acceptance_criteria() {
    let item = user_story("Login page");

    let prompt = build_prompt(&item);

    assert!(!prompt.contains("Acceptance criteria"));
}
