// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat-completion planner over an Anthropic-style messages endpoint.

use super::{build_prompt, parse_plan, Planner, PlannerError, RefinementPlan, SYSTEM_PROMPT};
use async_trait::async_trait;
use fm_core::{PlannerConfig, WorkItem};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Low temperature keeps decompositions reproducible across retries.
const TEMPERATURE: f32 = 0.2;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicPlanner {
    client: reqwest::Client,
    config: PlannerConfig,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Planner for AnthropicPlanner {
    async fn refine(
        &self,
        work_item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Result<RefinementPlan, PlannerError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(PlannerError::MissingCredential)?;

        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": TEMPERATURE,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": build_prompt(work_item) }],
        });

        tracing::info!(work_item_id = %work_item.id, model = %self.config.model, "refining work item");

        let request = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let response = tokio::select! {
            result = request.send() => {
                result.map_err(|e| PlannerError::External(e.to_string()))?
            }
            _ = cancel.cancelled() => return Err(PlannerError::Cancelled),
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PlannerError::External(e.to_string()))?;
        if !status.is_success() {
            return Err(PlannerError::External(format!("HTTP {}: {}", status, text.trim())));
        }

        let decoded: MessagesResponse =
            serde_json::from_str(&text).map_err(|e| PlannerError::Parse(e.to_string()))?;
        let content: String =
            decoded.content.into_iter().map(|block| block.text).collect::<Vec<_>>().join("");

        parse_plan(&content)
    }
}
