// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coding-agent execution: subprocess invocation with session continuation.

mod agent_cli;

pub use agent_cli::AgentCli;

use async_trait::async_trait;
use fm_core::ExecutorConfig;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to start coding agent: {0}")]
    Spawn(String),
    #[error("coding agent timed out after {timeout:?}")]
    Timeout { timeout: Duration, stdout: String, stderr: String },
    #[error("coding agent run cancelled")]
    Cancelled { stdout: String, stderr: String },
    #[error("coding agent io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-invocation executor settings.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Credential propagated via the child environment, never argv.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub model: Option<String>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self { api_key: None, base_url: None, timeout: Duration::from_secs(600), model: None }
    }
}

impl ExecOptions {
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            model: config.model.clone(),
        }
    }
}

/// Result of one agent invocation. A non-zero exit is a result, not an
/// error; the caller decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    /// Conversation token parsed from stdout; absence disables
    /// continuation but is not a failure.
    pub session_id: Option<String>,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a coding agent as a subprocess in a given working directory.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Quick probe; never errors.
    async fn is_available(&self) -> bool;

    /// Begin a new session.
    async fn start(
        &self,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError>;

    /// Continue the session addressed by `session_id`.
    async fn continue_session(
        &self,
        session_id: &str,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError>;
}

#[async_trait]
impl<T: Executor> Executor for std::sync::Arc<T> {
    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }

    async fn start(
        &self,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError> {
        (**self).start(instruction, work_dir, opts, cancel).await
    }

    async fn continue_session(
        &self,
        session_id: &str,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError> {
        (**self).continue_session(session_id, instruction, work_dir, opts, cancel).await
    }
}
