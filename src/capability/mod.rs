//! Hosted model capabilities.
//!
//! A capability is anything that takes an instruction plus an input and
//! answers with text. Every stage of the pipeline talks to the outside
//! world through this trait, so tests can swap in scripted fakes.

mod openai;

#[cfg(test)]
pub(crate) mod scripted;

pub use openai::OpenAiCapability;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// How much web context the hosted search tool should gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchContextSize {
    Low,
    Medium,
    High,
}

/// A tool executed by the hosted runtime on our behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum HostedTool {
    WebSearch { context_size: SearchContextSize },
}

/// Whether the hosted runtime must call one of the supplied tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolChoice {
    #[default]
    Auto,
    Required,
}

/// The shape the caller expects back.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OutputContract {
    /// Free text
    #[default]
    Text,
    /// A JSON document matching `schema`
    Json {
        name: String,
        schema: serde_json::Value,
    },
}

/// One call to a hosted capability.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRequest {
    pub model: String,
    pub instructions: String,
    pub input: String,
    pub tools: Vec<HostedTool>,
    pub tool_choice: ToolChoice,
    pub output: OutputContract,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// An external completion/agent service.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Send `request` and return the raw response text.
    async fn invoke(&self, request: &CapabilityRequest) -> Result<String>;
}
