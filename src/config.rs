//! Process-wide configuration.
//!
//! Everything here is read once at startup and handed to the pipeline by
//! reference. Core logic never consults the environment itself.

use crate::capability::SearchContextSize;
use crate::error::{Error, Result};

/// Default model for every stage.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default number of searches the planner is asked for.
pub const DEFAULT_SEARCHES: usize = 5;

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default prefix for the trace link shown at the start of a run.
pub const DEFAULT_TRACE_URL_PREFIX: &str = "https://platform.openai.com/traces/trace?trace_id=";

/// API credentials for the hosted collaborators.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub sendgrid_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("sendgrid_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Read credentials through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            openai_api_key: required(&lookup, "OPENAI_API_KEY")?,
            openai_base_url: lookup("OPENAI_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            sendgrid_api_key: required(&lookup, "SENDGRID_API_KEY")?,
        })
    }
}

/// Sender and recipient of the report email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub from: String,
    pub to: String,
}

impl EmailSettings {
    /// Read the addresses from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            from: required(&lookup, "RESEARCH_EMAIL_FROM")?,
            to: required(&lookup, "RESEARCH_EMAIL_TO")?,
        })
    }
}

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model used by every stage without an override
    pub model: String,
    pub planner_model: Option<String>,
    pub search_model: Option<String>,
    pub writer_model: Option<String>,
    pub email_model: Option<String>,
    /// Number of searches the planner is instructed to produce
    pub how_many_searches: usize,
    /// Sampling temperature (hosted default when unset)
    pub temperature: Option<f32>,
    /// Output token cap per hosted call
    pub max_tokens: Option<u32>,
    /// How much web context the hosted search tool pulls in
    pub search_context_size: SearchContextSize,
    /// Upper bound on a single search summary, in characters
    pub max_summary_chars: usize,
    pub trace_url_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            planner_model: None,
            search_model: None,
            writer_model: None,
            email_model: None,
            how_many_searches: DEFAULT_SEARCHES,
            temperature: None,
            max_tokens: None,
            search_context_size: SearchContextSize::Low,
            max_summary_chars: 3000,
            trace_url_prefix: DEFAULT_TRACE_URL_PREFIX.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a config using `model` for every stage.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Apply `RESEARCH_MODEL` and `RESEARCH_SEARCHES` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(model) = lookup("RESEARCH_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = model;
        }
        if let Some(raw) = lookup("RESEARCH_SEARCHES") {
            let n = raw.trim().parse::<usize>().map_err(|e| Error::Config {
                key: "RESEARCH_SEARCHES",
                message: e.to_string(),
            })?;
            config = config.searches(n)?;
        }
        Ok(config)
    }

    /// Set how many searches the planner should produce (at least one).
    pub fn searches(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::Config {
                key: "how_many_searches",
                message: "must be at least 1".to_string(),
            });
        }
        self.how_many_searches = n;
        Ok(self)
    }

    pub fn planner_model(mut self, model: impl Into<String>) -> Self {
        self.planner_model = Some(model.into());
        self
    }

    pub fn search_model(mut self, model: impl Into<String>) -> Self {
        self.search_model = Some(model.into());
        self
    }

    pub fn writer_model(mut self, model: impl Into<String>) -> Self {
        self.writer_model = Some(model.into());
        self
    }

    pub fn email_model(mut self, model: impl Into<String>) -> Self {
        self.email_model = Some(model.into());
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn search_context_size(mut self, size: SearchContextSize) -> Self {
        self.search_context_size = size;
        self
    }

    /// Cap each search summary at `n` characters (at least one).
    pub fn max_summary_chars(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::Config {
                key: "max_summary_chars",
                message: "must be at least 1".to_string(),
            });
        }
        self.max_summary_chars = n;
        Ok(self)
    }

    pub fn trace_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.trace_url_prefix = prefix.into();
        self
    }

    pub(crate) fn model_for(&self, stage_override: &Option<String>) -> String {
        stage_override.clone().unwrap_or_else(|| self.model.clone())
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingCredential(key))
}
