//! Search stage: one hosted web search summarised per planned item.

use super::planner::SearchItem;
use crate::agent::{Agent, AgentConfig};
use crate::capability::{Capability, HostedTool};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use std::sync::Arc;

const INSTRUCTIONS: &str = "You are a research assistant. Given a search term, you search the web for that term and \
produce a concise summary of the results. The summary must be 2-3 paragraphs and less than 300 \
words. Capture only the main points. Write succinctly, no need for complete sentences or perfect grammar. \
This will be consumed by someone synthesizing a report, so it is vital you capture the essence and ignore any fluff. \
Do not include any commentary beyond the summary itself.";

/// Runs a single planned search.
#[derive(Clone)]
pub struct Searcher {
    agent: Agent,
    max_summary_chars: usize,
}

impl Searcher {
    pub fn new(capability: Arc<dyn Capability>, config: &PipelineConfig) -> Self {
        let agent_config = AgentConfig::new(config.model_for(&config.search_model))
            .temperature(config.temperature)
            .max_tokens(config.max_tokens)
            .tool(HostedTool::WebSearch {
                context_size: config.search_context_size,
            })
            .require_tool();

        Self {
            agent: Agent::new("SearchAgent", INSTRUCTIONS, agent_config, capability),
            max_summary_chars: config.max_summary_chars,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Search for `item` and return a bounded summary of what was found.
    pub async fn search(&self, item: &SearchItem) -> Result<String> {
        let input = format!(
            "Search term: {}\nReason for searching: {}",
            item.query, item.reason
        );
        let summary = self.agent.run_text(&input).await?;
        let summary = bound_summary(summary.trim(), self.max_summary_chars);
        if summary.is_empty() {
            return Err(Error::EmptyResponse(self.agent.name().to_string()));
        }
        Ok(summary)
    }
}

/// Truncate `text` to at most `max_chars` characters.
fn bound_summary(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}
