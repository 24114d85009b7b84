// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn env_fills_planner_and_executor_credentials() {
    let mut config = Config::default();
    let env = EnvValues {
        auth_token: Some("tok".to_string()),
        base_url: Some("http://proxy".to_string()),
        timeout_ms: Some("1234".to_string()),
    };

    apply_env(&mut config, &env);

    assert_eq!(config.planner.api_key.as_deref(), Some("tok"));
    assert_eq!(config.executor.api_key.as_deref(), Some("tok"));
    assert_eq!(config.planner.base_url, "http://proxy");
    assert_eq!(config.executor.timeout_ms, 1234);
}

#[test]
fn env_does_not_clobber_explicit_executor_credential() {
    let mut config = Config::default();
    config.executor.api_key = Some("from-file".to_string());

    apply_env(&mut config, &EnvValues { auth_token: Some("tok".to_string()), ..Default::default() });

    assert_eq!(config.executor.api_key.as_deref(), Some("from-file"));
    assert_eq!(config.planner.api_key.as_deref(), Some("tok"));
}

#[test]
fn unparsable_timeout_is_ignored() {
    let mut config = Config::default();

    apply_env(
        &mut config,
        &EnvValues { timeout_ms: Some("soon".to_string()), ..Default::default() },
    );

    assert_eq!(config.executor.timeout_ms, 600_000);
}

#[test]
fn flags_win_over_env() {
    let mut config = Config::default();
    apply_env(&mut config, &EnvValues { auth_token: Some("env-tok".to_string()), ..Default::default() });

    apply_flags(
        &mut config,
        &FlagValues {
            planner_api_key: Some("flag-tok".to_string()),
            planner_model: Some("other-model".to_string()),
            executor_timeout_ms: Some(99),
            ..Default::default()
        },
    );

    assert_eq!(config.planner.api_key.as_deref(), Some("flag-tok"));
    assert_eq!(config.planner.model, "other-model");
    assert_eq!(config.executor.timeout_ms, 99);
}

#[test]
fn absent_values_leave_defaults() {
    let mut config = Config::default();

    apply_env(&mut config, &EnvValues::default());
    apply_flags(&mut config, &FlagValues::default());

    assert!(config.planner.api_key.is_none());
    assert_eq!(config.planner.base_url, "https://api.anthropic.com");
}
