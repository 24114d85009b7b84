// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman: CLI for the developer-story orchestrator.
//!
//! The binary is the only layer that reads the process environment;
//! everything below receives explicit configuration.

mod commands;
mod overlay;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fm_adapters::{AgentCli, AnthropicPlanner, ExecOptions, GitRepo};
use fm_core::{Config, SystemClock};
use fm_engine::Orchestrator;
use fm_storage::Store;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "foreman", version, about = "Autonomous developer-story orchestrator")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "foreman.toml")]
    config: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Flag-level config overrides (flag > env > file > default).
#[derive(Args, Debug, Default, Clone)]
struct Overrides {
    /// Credential for the LLM planner
    #[arg(long, global = true)]
    planner_api_key: Option<String>,

    /// Override the planner endpoint
    #[arg(long, global = true)]
    planner_base_url: Option<String>,

    /// Planner model identifier
    #[arg(long, global = true)]
    planner_model: Option<String>,

    /// Wall-clock bound for each coding-agent run, in milliseconds
    #[arg(long, global = true)]
    executor_timeout_ms: Option<u64>,

    /// Model for the coding agent
    #[arg(long, global = true)]
    executor_model: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a work item
    Create {
        /// "user-story" or "bug"
        #[arg(long, default_value = "user-story")]
        kind: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        acceptance: Option<String>,
        /// 1 (most urgent) to 9
        #[arg(long, default_value_t = 5)]
        priority: u8,
    },
    /// Decompose a work item into developer stories via the planner
    Refine {
        /// Work item id
        id: i64,
    },
    /// Show the next runnable story, or the blocked set with unmet prerequisites
    Next,
    /// Execute one story end-to-end in an isolated worktree
    Implement {
        /// Story id
        story_id: i64,
        /// Base branch for the story's feature branch
        main_branch: Option<String>,
        /// Repository to work in
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// List work items (or stories with --stories)
    List {
        #[arg(long)]
        stories: bool,
        /// Filter by status, e.g. "ready" or "in-progress"
        #[arg(long)]
        status: Option<String>,
    },
    /// Retry a failed story, or a failed work item with --work-item
    Retry {
        story_id: Option<i64>,
        #[arg(long)]
        work_item: Option<i64>,
    },
    /// Delete a work item and everything it owns
    Delete {
        /// Work item id
        id: i64,
    },
}

type CliOrchestrator = Orchestrator<AnthropicPlanner, AgentCli, GitRepo, SystemClock>;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run(cli: Cli) -> Result<std::process::ExitCode> {
    let mut config = Config::load(&cli.config)?;
    overlay::apply_env(&mut config, &overlay::EnvValues::from_process());
    overlay::apply_flags(&mut config, &cli.overrides.clone().into());

    let store = Store::open(&config.store.path)?;
    let exec_options = ExecOptions::from_config(&config.executor);
    let orchestrator = Orchestrator::new(
        store,
        AnthropicPlanner::new(config.planner.clone()),
        AgentCli::default(),
        GitRepo::new(),
        SystemClock,
        config.repo.worktree_base_path.clone(),
    );

    // Single-process model: anything still in-progress at startup was
    // orphaned by a crash.
    let recovered = orchestrator.recover(chrono::Duration::zero())?;
    if !recovered.is_empty() {
        eprintln!("recovered {} interrupted stories", recovered.len());
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    commands::dispatch(cli.command, &orchestrator, &config, &exec_options, &cancel).await
}

impl From<Overrides> for overlay::FlagValues {
    fn from(o: Overrides) -> Self {
        Self {
            planner_api_key: o.planner_api_key,
            planner_base_url: o.planner_base_url,
            planner_model: o.planner_model,
            executor_timeout_ms: o.executor_timeout_ms,
            executor_model: o.executor_model,
        }
    }
}
