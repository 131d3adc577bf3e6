//! Planner stage: turns a query into a set of web searches.

use crate::agent::{Agent, AgentConfig, StructuredOutput};
use crate::capability::Capability;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

fn instructions(how_many: usize) -> String {
    format!(
        "You are a helpful research assistant. Given a query, come up with a set of web searches \
         to perform to best answer the query. Output {how_many} terms to query for."
    )
}

/// One planned web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    /// Why this search matters for the query
    pub reason: String,
    /// The search term itself
    pub query: String,
}

impl SearchItem {
    pub fn new(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            query: query.into(),
        }
    }
}

/// Ordered list of searches produced by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub searches: Vec<SearchItem>,
}

impl SearchPlan {
    pub fn new(searches: Vec<SearchItem>) -> Self {
        Self { searches }
    }

    pub fn len(&self) -> usize {
        self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchItem> {
        self.searches.iter()
    }
}

impl StructuredOutput for SearchPlan {
    const NAME: &'static str = "WebSearchPlan";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "searches": {
                    "type": "array",
                    "description": "A list of web searches to perform to best answer the query.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "reason": {
                                "type": "string",
                                "description": "Your reasoning for why this search is important to the query."
                            },
                            "query": {
                                "type": "string",
                                "description": "The search term to use for the web search."
                            }
                        },
                        "required": ["reason", "query"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["searches"],
            "additionalProperties": false
        })
    }
}

/// Plans the searches for a query.
#[derive(Clone)]
pub struct Planner {
    agent: Agent,
}

impl Planner {
    pub fn new(capability: Arc<dyn Capability>, config: &PipelineConfig) -> Self {
        let agent_config = AgentConfig::new(config.model_for(&config.planner_model))
            .temperature(config.temperature)
            .max_tokens(config.max_tokens);

        Self {
            agent: Agent::new(
                "PlannerAgent",
                instructions(config.how_many_searches),
                agent_config,
                capability,
            ),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Ask the planner for a search plan. Any failure is fatal for the run.
    pub async fn plan(&self, query: &str) -> Result<SearchPlan> {
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery("query is empty".to_string()));
        }

        tracing::info!("Planning searches...");
        let plan: SearchPlan = self.agent.run(&format!("Query: {query}")).await?;
        tracing::info!("Will perform {} searches", plan.len());
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::scripted::ScriptedCapability;

    fn plan_json(n: usize) -> String {
        let searches: Vec<Value> = (0..n)
            .map(|i| json!({"reason": format!("reason {i}"), "query": format!("term {i}")}))
            .collect();
        json!({ "searches": searches }).to_string()
    }

    #[tokio::test]
    async fn test_plan_parses_items() {
        let capability = Arc::new(ScriptedCapability::new(|_| Ok(plan_json(5))));
        let planner = Planner::new(capability.clone(), &PipelineConfig::default());

        let plan = planner.plan("Impact of AI on Healthcare").await.unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.searches[0], SearchItem::new("term 0", "reason 0"));

        let calls = capability.calls();
        assert_eq!(calls[0].input, "Query: Impact of AI on Healthcare");
        assert!(calls[0].instructions.contains("Output 5 terms"));
    }

    #[tokio::test]
    async fn test_instruction_uses_configured_count() {
        let capability = Arc::new(ScriptedCapability::new(|_| Ok(plan_json(3))));
        let config = PipelineConfig::default().searches(3).unwrap();
        let planner = Planner::new(capability.clone(), &config);

        planner.plan("rust async").await.unwrap();
        assert!(capability.calls()[0].instructions.contains("Output 3 terms"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let capability = Arc::new(ScriptedCapability::new(|_| Ok(plan_json(5))));
        let planner = Planner::new(capability.clone(), &PipelineConfig::default());

        let err = planner.plan("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
        assert!(capability.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_plan_is_fatal() {
        let capability = Arc::new(ScriptedCapability::new(|_| {
            Ok(r#"{"searches": [{"query": "no reason"}]}"#.to_string())
        }));
        let planner = Planner::new(capability, &PipelineConfig::default());

        let err = planner.plan("query").await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref name, .. } if name == "WebSearchPlan"));
    }
}
