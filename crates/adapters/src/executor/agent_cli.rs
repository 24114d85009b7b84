// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess implementation of [`Executor`] over a coding-agent CLI.
//!
//! The agent is launched in print mode with structured JSON output.
//! Instructions travel as a single argv element, so embedded quotes and
//! backslashes need no shell escaping; credentials travel only through
//! the child environment.

use super::{ExecOptions, ExecOutcome, Executor, ExecutorError};
use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const CREDENTIAL_ENV: &str = "ANTHROPIC_AUTH_TOKEN";
const BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AgentCli {
    binary: PathBuf,
}

impl Default for AgentCli {
    fn default() -> Self {
        Self::new("claude")
    }
}

enum Exit {
    Status(std::io::Result<ExitStatus>),
    Timeout,
    Cancelled,
}

impl AgentCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    async fn run(
        &self,
        resume: Option<&str>,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p").arg(instruction).args(["--output-format", "json"]);
        if let Some(session_id) = resume {
            cmd.args(["--resume", session_id]);
        }
        if let Some(model) = &opts.model {
            cmd.args(["--model", model]);
        }
        cmd.current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(key) = &opts.api_key {
            cmd.env(CREDENTIAL_ENV, key);
        }
        if let Some(url) = &opts.base_url {
            cmd.env(BASE_URL_ENV, url);
        }

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| ExecutorError::Spawn(e.to_string()))?;

        // Drain both pipes concurrently so neither blocks the other.
        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let exit = tokio::select! {
            status = child.wait() => Exit::Status(status),
            _ = tokio::time::sleep(opts.timeout) => Exit::Timeout,
            _ = cancel.cancelled() => Exit::Cancelled,
        };

        if !matches!(exit, Exit::Status(_)) {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }

        let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();

        match exit {
            Exit::Timeout => {
                tracing::warn!(timeout = ?opts.timeout, "coding agent timed out, killed");
                Err(ExecutorError::Timeout { timeout: opts.timeout, stdout, stderr })
            }
            Exit::Cancelled => {
                tracing::info!("coding agent run cancelled, killed");
                Err(ExecutorError::Cancelled { stdout, stderr })
            }
            Exit::Status(status) => {
                let exit_code = status?.code().unwrap_or(-1);
                let session_id = extract_session_id(&stdout);
                let duration = started.elapsed();
                tracing::info!(
                    exit_code,
                    elapsed_ms = duration.as_millis() as u64,
                    session = session_id.as_deref().unwrap_or("-"),
                    resumed = resume.is_some(),
                    "coding agent exited"
                );
                Ok(ExecOutcome { exit_code, stdout, stderr, duration, session_id })
            }
        }
    }
}

/// Read a pipe to the end on a background task, so stdout and stderr are
/// consumed concurrently while waiting for exit.
fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

/// Pull `session_id` (or `uuid`) out of the agent's JSON stdout.
/// Extra fields are ignored; a missing token just disables continuation.
fn extract_session_id(stdout: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).ok()?;
    value
        .get("session_id")
        .or_else(|| value.get("uuid"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[async_trait]
impl Executor for AgentCli {
    async fn is_available(&self) -> bool {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--version");
        match run_with_timeout(cmd, PROBE_TIMEOUT, "agent version probe").await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    async fn start(
        &self,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError> {
        self.run(None, instruction, work_dir, opts, cancel).await
    }

    async fn continue_session(
        &self,
        session_id: &str,
        instruction: &str,
        work_dir: &Path,
        opts: &ExecOptions,
        cancel: &CancellationToken,
    ) -> Result<ExecOutcome, ExecutorError> {
        self.run(Some(session_id), instruction, work_dir, opts, cancel).await
    }
}

#[cfg(test)]
#[path = "agent_cli_tests.rs"]
mod tests;
