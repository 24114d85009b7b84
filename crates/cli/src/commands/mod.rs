// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers.

mod display;

use crate::{CliOrchestrator, Command};
use anyhow::Result;
use fm_adapters::ExecOptions;
use fm_core::{Config, NewWorkItem, StoryId, WorkItemId, WorkItemKind};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

pub async fn dispatch(
    command: Command,
    orchestrator: &CliOrchestrator,
    config: &Config,
    exec_options: &ExecOptions,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    match command {
        Command::Create { kind, title, description, acceptance, priority } => {
            create(orchestrator, &kind, title, description, acceptance, priority)
        }
        Command::Refine { id } => refine(orchestrator, id, cancel).await,
        Command::Next => next(orchestrator),
        Command::Implement { story_id, main_branch, repo } => {
            let branch = main_branch.unwrap_or_else(|| config.repo.default_branch.clone());
            implement(orchestrator, story_id, &branch, &repo, exec_options, cancel).await
        }
        Command::List { stories, status } => list(orchestrator, stories, status.as_deref()),
        Command::Retry { story_id, work_item } => retry(orchestrator, story_id, work_item),
        Command::Delete { id } => {
            orchestrator.delete_work_item(WorkItemId::new(id))?;
            println!("deleted work item {}", id);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn create(
    orchestrator: &CliOrchestrator,
    kind: &str,
    title: String,
    description: String,
    acceptance: Option<String>,
    priority: u8,
) -> Result<ExitCode> {
    let kind: WorkItemKind = kind.parse()?;
    let mut input = NewWorkItem::new(kind, title, description).priority(priority);
    if let Some(acceptance) = acceptance {
        input = input.acceptance_criteria(acceptance);
    }
    let item = orchestrator.create_work_item(input)?;
    println!("created {} {} \"{}\" (priority {})", item.kind, item.id, item.title, item.priority);
    Ok(ExitCode::SUCCESS)
}

async fn refine(
    orchestrator: &CliOrchestrator,
    id: i64,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let result = orchestrator.refine(WorkItemId::new(id), cancel).await?;
    println!("refined work item {} into {} stories", id, result.stories.len());
    if !result.analysis.is_empty() {
        println!("\n{}\n", result.analysis);
    }
    for story in &result.stories {
        println!("  {}", display::story_line(story));
    }
    if !result.dependencies.is_empty() {
        println!("dependencies:");
        for dep in &result.dependencies {
            println!("  {} requires {}", dep.dependent_story_id, dep.required_story_id);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints the next runnable story, or the blocked set. Exit 0 either way.
fn next(orchestrator: &CliOrchestrator) -> Result<ExitCode> {
    match orchestrator.select_next()? {
        Some(story) => {
            println!("next: {}", display::story_line(&story));
        }
        None => {
            println!("no runnable story");
            let blocked = orchestrator.blocked_report()?;
            for entry in blocked {
                println!("  blocked: {}", display::story_line(&entry.story));
                for unmet in entry.unmet {
                    println!("    waiting on {}", display::story_line(&unmet));
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs a story end-to-end. Always exits 0; progress and failures are
/// reported on the terminal.
async fn implement(
    orchestrator: &CliOrchestrator,
    story_id: i64,
    main_branch: &str,
    repo: &std::path::Path,
    exec_options: &ExecOptions,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    if !orchestrator.executor_available().await {
        println!("coding agent binary not available; aborting");
        return Ok(ExitCode::SUCCESS);
    }
    match orchestrator
        .implement(StoryId::new(story_id), main_branch, repo, exec_options, cancel)
        .await
    {
        Ok(result) if result.success => {
            println!(
                "story {} completed in {}s",
                story_id,
                result.duration.as_secs()
            );
        }
        Ok(result) => {
            println!(
                "story {} failed: {}",
                story_id,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        Err(e) => {
            println!("story {} did not run: {}", story_id, e);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn list(
    orchestrator: &CliOrchestrator,
    stories: bool,
    status: Option<&str>,
) -> Result<ExitCode> {
    if stories {
        let filter = status.map(display::parse_story_status).transpose()?;
        for story in orchestrator.list_stories(filter) {
            println!("{}", display::story_line(&story));
        }
    } else {
        let filter = status.map(display::parse_work_item_status).transpose()?;
        for item in orchestrator.list_work_items(filter) {
            println!("{}", display::work_item_line(&item));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn retry(
    orchestrator: &CliOrchestrator,
    story_id: Option<i64>,
    work_item: Option<i64>,
) -> Result<ExitCode> {
    match (story_id, work_item) {
        (Some(id), None) => {
            let story = orchestrator.retry_story(StoryId::new(id))?;
            println!("story {} back to {}", id, story.status);
        }
        (None, Some(id)) => {
            let item = orchestrator.retry_work_item(WorkItemId::new(id))?;
            println!("work item {} back to {}", id, item.status);
        }
        _ => anyhow::bail!("pass a story id or --work-item <id>"),
    }
    Ok(ExitCode::SUCCESS)
}

