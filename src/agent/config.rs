//! Agent configuration.

use crate::capability::{HostedTool, ToolChoice};
use crate::config::DEFAULT_MODEL;

/// Per-agent settings forwarded with every hosted call.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Temperature for LLM sampling
    pub temperature: Option<f32>,
    /// Maximum tokens for LLM response
    pub max_tokens: Option<u32>,
    /// Hosted tools the runtime may call
    pub tools: Vec<HostedTool>,
    pub tool_choice: ToolChoice,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        }
    }
}

impl AgentConfig {
    /// Create a new config with the specified model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the temperature.
    pub fn temperature(mut self, t: Option<f32>) -> Self {
        self.temperature = t;
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, n: Option<u32>) -> Self {
        self.max_tokens = n;
        self
    }

    /// Add a hosted tool.
    pub fn tool(mut self, tool: HostedTool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Force the runtime to use one of the configured tools.
    pub fn require_tool(mut self) -> Self {
        self.tool_choice = ToolChoice::Required;
        self
    }
}
