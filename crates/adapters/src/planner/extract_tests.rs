// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn plain_json_passes_through() {
    let text = r#"{"analysis": "simple", "developerStories": []}"#;
    assert_eq!(extract_json(text).as_deref(), Some(text));
}

#[test]
fn leading_and_trailing_whitespace_trimmed() {
    let text = "\n\n  {\"a\": 1}  \n";
    assert_eq!(extract_json(text).as_deref(), Some("{\"a\": 1}"));
}

#[test]
fn json_fence_unwrapped() {
    let text = "Here is the plan:\n```json\n{\"analysis\": \"x\"}\n```\nDone.";
    assert_eq!(extract_json(text).as_deref(), Some("{\"analysis\": \"x\"}"));
}

#[test]
fn bare_fence_unwrapped() {
    let text = "```\n{\"analysis\": \"x\"}\n```";
    assert_eq!(extract_json(text).as_deref(), Some("{\"analysis\": \"x\"}"));
}

#[test]
fn object_embedded_in_prose() {
    let text = "Sure! The decomposition is {\"stories\": [1, 2]} as requested.";
    assert_eq!(extract_json(text).as_deref(), Some("{\"stories\": [1, 2]}"));
}

#[test]
fn nested_braces_balanced() {
    let text = "prefix {\"a\": {\"b\": {\"c\": 1}}} suffix";
    assert_eq!(extract_json(text).as_deref(), Some("{\"a\": {\"b\": {\"c\": 1}}}"));
}

#[test]
fn braces_inside_strings_ignored() {
    let text = r#"note {"text": "uses } and { inside", "n": 1} end"#;
    assert_eq!(
        extract_json(text).as_deref(),
        Some(r#"{"text": "uses } and { inside", "n": 1}"#)
    );
}

#[test]
fn escaped_quotes_inside_strings() {
    let text = r#"{"text": "she said \"hi}\" loudly"}"#;
    assert_eq!(extract_json(text).as_deref(), Some(text));
}

#[test]
fn escaped_backslash_before_closing_quote() {
    let text = r#"{"path": "C:\\dir\\"}"#;
    assert_eq!(extract_json(text).as_deref(), Some(text));
}

#[test]
fn no_object_yields_none() {
    assert_eq!(extract_json("no json here"), None);
    assert_eq!(extract_json(""), None);
}

#[test]
fn unbalanced_object_yields_none() {
    assert_eq!(extract_json(r#"{"a": {"b": 1}"#), None);
}

#[test]
fn fence_without_object_falls_back_to_scan() {
    let text = "```\nplain text\n```\nbut later {\"a\": 1}";
    assert_eq!(extract_json(text).as_deref(), Some("{\"a\": 1}"));
}
