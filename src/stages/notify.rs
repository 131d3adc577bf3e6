//! Notify stage: emails the finished report.
//!
//! The hosted model turns the Markdown report into an HTML email, and the
//! mailer delivers it. Nothing that happens here fails the run: composition
//! errors, an unreachable provider, and non-2xx statuses are logged and the
//! stage still reports success.

use super::writer::Report;
use crate::agent::{Agent, AgentConfig, StructuredOutput};
use crate::capability::Capability;
use crate::config::{EmailSettings, PipelineConfig};
use crate::mailer::{Email, Mailer};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

const INSTRUCTIONS: &str = "You are able to send a nicely formatted HTML email based on a detailed report. \
You will be provided with a detailed report. You should produce one email, providing the report \
converted into clean, well-presented HTML with an appropriate subject line.";

/// The email the hosted model composed from the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub html_body: String,
}

impl StructuredOutput for EmailDraft {
    const NAME: &'static str = "EmailDraft";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "subject": {"type": "string", "description": "The subject line of the email."},
                "html_body": {"type": "string", "description": "The full HTML content to send."}
            },
            "required": ["subject", "html_body"],
            "additionalProperties": false
        })
    }
}

/// Outcome reported to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifyResult {
    /// Always "success"
    pub status: String,
    /// What the provider actually answered, when it was reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<u16>,
}

impl NotifyResult {
    fn success(provider_status: Option<u16>) -> Self {
        Self {
            status: "success".to_string(),
            provider_status,
        }
    }
}

/// Composes and sends the report email.
#[derive(Clone)]
pub struct Notifier {
    agent: Agent,
    mailer: Arc<dyn Mailer>,
    settings: EmailSettings,
}

impl Notifier {
    pub fn new(
        capability: Arc<dyn Capability>,
        mailer: Arc<dyn Mailer>,
        settings: EmailSettings,
        config: &PipelineConfig,
    ) -> Self {
        let agent_config = AgentConfig::new(config.model_for(&config.email_model))
            .temperature(config.temperature)
            .max_tokens(config.max_tokens);

        Self {
            agent: Agent::new("EmailAgent", INSTRUCTIONS, agent_config, capability),
            mailer,
            settings,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Email the report. Always resolves to a success result.
    pub async fn notify(&self, report: &Report) -> NotifyResult {
        tracing::info!("Writing email...");

        let draft: EmailDraft = match self.agent.run(&report.markdown_report).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!("Email composition failed: {}", e);
                return NotifyResult::success(None);
            }
        };

        let email = Email {
            from: self.settings.from.clone(),
            to: self.settings.to.clone(),
            subject: draft.subject,
            html_body: draft.html_body,
        };

        let provider_status = match self.mailer.send(&email).await {
            Ok(status) => {
                tracing::info!("Email response status: {}", status);
                if !(200..300).contains(&status) {
                    tracing::warn!(status, "email provider rejected the message");
                }
                Some(status)
            }
            Err(e) => {
                tracing::warn!("Email delivery failed: {}", e);
                None
            }
        };

        tracing::info!("Email sent");
        NotifyResult::success(provider_status)
    }
}
