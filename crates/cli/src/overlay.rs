// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config overlay: flag > env > file > default.
//!
//! Environment reads happen in [`EnvValues::from_process`] and nowhere
//! else, so the precedence chain stays testable as pure functions.

use fm_core::Config;

/// Environment variables the CLI honors.
#[derive(Debug, Default, Clone)]
pub struct EnvValues {
    pub auth_token: Option<String>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<String>,
}

impl EnvValues {
    pub fn from_process() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            auth_token: read("ANTHROPIC_AUTH_TOKEN"),
            base_url: read("ANTHROPIC_BASE_URL"),
            timeout_ms: read("API_TIMEOUT_MS"),
        }
    }
}

/// Values supplied via CLI flags.
#[derive(Debug, Default, Clone)]
pub struct FlagValues {
    pub planner_api_key: Option<String>,
    pub planner_base_url: Option<String>,
    pub planner_model: Option<String>,
    pub executor_timeout_ms: Option<u64>,
    pub executor_model: Option<String>,
}

/// Overlay environment values onto the file-loaded config.
pub fn apply_env(config: &mut Config, env: &EnvValues) {
    if let Some(token) = &env.auth_token {
        config.planner.api_key = Some(token.clone());
        if config.executor.api_key.is_none() {
            config.executor.api_key = Some(token.clone());
        }
    }
    if let Some(url) = &env.base_url {
        config.planner.base_url = url.clone();
        if config.executor.base_url.is_none() {
            config.executor.base_url = Some(url.clone());
        }
    }
    if let Some(raw) = &env.timeout_ms {
        match raw.parse::<u64>() {
            Ok(ms) => config.executor.timeout_ms = ms,
            Err(_) => tracing::warn!(value = %raw, "ignoring unparsable API_TIMEOUT_MS"),
        }
    }
}

/// Overlay flag values; flags win over everything.
pub fn apply_flags(config: &mut Config, flags: &FlagValues) {
    if let Some(key) = &flags.planner_api_key {
        config.planner.api_key = Some(key.clone());
    }
    if let Some(url) = &flags.planner_base_url {
        config.planner.base_url = url.clone();
    }
    if let Some(model) = &flags.planner_model {
        config.planner.model = model.clone();
    }
    if let Some(ms) = flags.executor_timeout_ms {
        config.executor.timeout_ms = ms;
    }
    if let Some(model) = &flags.executor_model {
        config.executor.model = Some(model.clone());
    }
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
