//! Error types for the research pipeline.

use thiserror::Error;

/// Errors that can occur while running the research pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error talking to the hosted model API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Hosted model API answered with a non-success status
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Hosted model API answered without any output text
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// No JSON object could be found in a structured response
    #[error("No structured output found in {0} response")]
    NoStructuredOutput(String),

    /// Response JSON does not match the declared output schema
    #[error("{name} output failed schema validation: {}", .errors.join("; "))]
    Validation { name: String, errors: Vec<String> },

    /// Validated JSON could not be converted into the typed output
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// An output schema could not be compiled
    #[error("Invalid schema for {name}: {message}")]
    Schema { name: String, message: String },

    /// The research query was rejected before planning
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A required credential or setting is absent from the environment
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// A configuration value could not be parsed
    #[error("Invalid configuration value for {key}: {message}")]
    Config { key: &'static str, message: String },

    /// Email provider could not be reached
    #[error("Email transport error: {0}")]
    Email(String),

    /// Terminal or file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned task panicked or was cancelled
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for research pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
