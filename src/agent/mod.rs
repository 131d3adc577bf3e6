//! Hosted agents.
//!
//! An agent is a named set of instructions bound to a capability. It sends
//! one request per run and either returns the text it gets back or
//! validates it against a declared output schema.

mod config;
mod extract;
mod schema;

pub use config::AgentConfig;
pub use extract::extract_json;
pub use schema::{StructuredOutput, validate};

use crate::capability::{Capability, CapabilityRequest, OutputContract};
use crate::error::{Error, Result};
use std::sync::Arc;

/// A single-shot hosted agent.
#[derive(Clone)]
pub struct Agent {
    name: String,
    instructions: String,
    config: AgentConfig,
    capability: Arc<dyn Capability>,
}

impl Agent {
    /// Create a new agent with the given instructions and configuration.
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        config: AgentConfig,
        capability: Arc<dyn Capability>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            config,
            capability,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn request(&self, input: &str, output: OutputContract) -> CapabilityRequest {
        CapabilityRequest {
            model: self.config.model.clone(),
            instructions: self.instructions.clone(),
            input: input.to_string(),
            tools: self.config.tools.clone(),
            tool_choice: self.config.tool_choice,
            output,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Run the agent and return its free-text answer.
    pub async fn run_text(&self, input: &str) -> Result<String> {
        let request = self.request(input, OutputContract::Text);
        let text = self.capability.invoke(&request).await?;
        if text.trim().is_empty() {
            return Err(Error::EmptyResponse(self.name.clone()));
        }
        Ok(text)
    }

    /// Run the agent and return its answer as `T`.
    ///
    /// The response must contain a JSON document that satisfies
    /// `T::schema()`; anything else is an error.
    pub async fn run<T: StructuredOutput>(&self, input: &str) -> Result<T> {
        let request = self.request(
            input,
            OutputContract::Json {
                name: T::NAME.to_string(),
                schema: T::schema(),
            },
        );

        let text = self.capability.invoke(&request).await?;
        let value =
            extract_json(&text).ok_or_else(|| Error::NoStructuredOutput(self.name.clone()))?;

        tracing::debug!(agent = %self.name, output = T::NAME, "validating structured output");
        schema::parse::<T>(value)
    }
}
