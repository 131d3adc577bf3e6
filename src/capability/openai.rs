//! OpenAI Responses API capability.

use super::{
    Capability, CapabilityRequest, HostedTool, OutputContract, SearchContextSize, ToolChoice,
};
use crate::config::Credentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextPayload<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolPayload {
    WebSearchPreview {
        search_context_size: SearchContextSize,
    },
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    format: FormatPayload<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FormatPayload<'a> {
    JsonSchema {
        name: &'a str,
        schema: &'a serde_json::Value,
        strict: bool,
    },
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ResponsesBody {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────

/// Capability backed by an OpenAI-compatible `/responses` endpoint.
#[derive(Clone)]
pub struct OpenAiCapability {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCapability {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Self::new(
            credentials.openai_api_key.clone(),
            credentials.openai_base_url.clone(),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

fn build_request(request: &CapabilityRequest) -> ResponsesRequest<'_> {
    let tools = request
        .tools
        .iter()
        .map(|tool| match tool {
            HostedTool::WebSearch { context_size } => ToolPayload::WebSearchPreview {
                search_context_size: *context_size,
            },
        })
        .collect::<Vec<_>>();

    let tool_choice = match (tools.is_empty(), request.tool_choice) {
        (true, _) => None,
        (false, ToolChoice::Auto) => Some("auto"),
        (false, ToolChoice::Required) => Some("required"),
    };

    let text = match &request.output {
        OutputContract::Text => None,
        OutputContract::Json { name, schema } => Some(TextPayload {
            format: FormatPayload::JsonSchema {
                name: name.as_str(),
                schema,
                strict: true,
            },
        }),
    };

    ResponsesRequest {
        model: &request.model,
        instructions: &request.instructions,
        input: &request.input,
        tools,
        tool_choice,
        text,
        temperature: request.temperature,
        max_output_tokens: request.max_tokens,
    }
}

/// Collect the assistant text from a Responses API body.
fn output_text(body: &ResponsesBody) -> Option<String> {
    if let Some(text) = body.output_text.as_ref().filter(|t| !t.is_empty()) {
        return Some(text.clone());
    }

    let text: String = body
        .output
        .iter()
        .filter(|item| item.item_type == "message")
        .flat_map(|item| item.content.iter())
        .filter(|part| part.part_type == "output_text")
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.is_empty() { None } else { Some(text) }
}

#[async_trait]
impl Capability for OpenAiCapability {
    async fn invoke(&self, request: &CapabilityRequest) -> Result<String> {
        let payload = build_request(request);
        tracing::debug!(
            model = %request.model,
            input_chars = request.input.len(),
            tools = request.tools.len(),
            "sending responses request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ErrorBody>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: ResponsesBody = response.json().await?;
        let text = output_text(&body).ok_or_else(|| Error::EmptyResponse(request.model.clone()))?;
        tracing::debug!(output_chars = text.len(), "received responses output");
        Ok(text)
    }
}
