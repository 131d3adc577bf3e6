//! Writer stage: synthesises search summaries into a long-form report.

use crate::agent::{Agent, AgentConfig, StructuredOutput};
use crate::capability::Capability;
use crate::config::PipelineConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

const INSTRUCTIONS: &str = "You are a senior researcher tasked with writing a cohesive report for a research query. \
You will be provided with the original query, and some initial research done by a research assistant.\n\
You should first come up with an outline for the report that describes the structure and \
flow of the report. Then, generate the report and return that as your final output.\n\
The final output should be in markdown format, and it should be lengthy and detailed. Aim \
for 5-10 pages of content, at least 1000 words.";

/// The finished research report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// A short 2-3 sentence summary of the findings
    pub short_summary: String,
    /// The full report in Markdown
    pub markdown_report: String,
    /// Suggested topics to research further
    pub follow_up_questions: Vec<String>,
}

impl StructuredOutput for Report {
    const NAME: &'static str = "ReportData";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "short_summary": {
                    "type": "string",
                    "description": "A short 2-3 sentence summary of the findings."
                },
                "markdown_report": {
                    "type": "string",
                    "description": "The final report"
                },
                "follow_up_questions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Suggested topics to research further"
                }
            },
            "required": ["short_summary", "markdown_report", "follow_up_questions"],
            "additionalProperties": false
        })
    }
}

/// Writes the report from the query and whatever searches succeeded.
#[derive(Clone)]
pub struct Writer {
    agent: Agent,
}

impl Writer {
    pub fn new(capability: Arc<dyn Capability>, config: &PipelineConfig) -> Self {
        let agent_config = AgentConfig::new(config.model_for(&config.writer_model))
            .temperature(config.temperature)
            .max_tokens(config.max_tokens);

        Self {
            agent: Agent::new("WriterAgent", INSTRUCTIONS, agent_config, capability),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Write the report. Length is requested, not verified.
    pub async fn write(&self, query: &str, search_results: &[String]) -> Result<Report> {
        tracing::info!("Thinking about report...");
        let input = format!(
            "Original query: {query}\nSummarized search results: {search_results:?}"
        );
        let report: Report = self.agent.run(&input).await?;
        tracing::info!("Finished writing report");
        Ok(report)
    }
}
