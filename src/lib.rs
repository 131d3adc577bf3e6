//! Deep research pipeline.
//!
//! Takes a research query, asks a hosted planner for a handful of web
//! searches, runs those searches in parallel, has a hosted writer turn the
//! summaries into a long Markdown report, and emails the result. Progress
//! is streamed back as text chunks, with the report as the last one.
//!
//! # Quick Start
//!
//! ```ignore
//! use deep_research::{Credentials, EmailSettings, PipelineConfig, ResearchManager};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> deep_research::Result<()> {
//!     let manager = ResearchManager::from_credentials(
//!         &Credentials::from_env()?,
//!         EmailSettings::from_env()?,
//!         &PipelineConfig::default(),
//!     )?;
//!
//!     let mut stream = manager.run("Impact of AI on Healthcare");
//!     while let Some(chunk) = stream.next().await {
//!         println!("{}", chunk?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod capability;
mod config;
mod dispatch;
mod error;
pub mod events;
mod mailer;
pub mod pipeline;
pub mod stages;

pub use agent::{Agent, AgentConfig, StructuredOutput};
pub use capability::{Capability, CapabilityRequest, OpenAiCapability};
pub use config::{Credentials, EmailSettings, PipelineConfig};
pub use dispatch::SearchDispatcher;
pub use error::{Error, Result};
pub use events::{EventCallbacks, ResearchEvent};
pub use mailer::{Email, Mailer, SendGridMailer};
pub use pipeline::{Chunk, ReportStream, ResearchManager, ResearchOutput, Stage};
pub use stages::{NotifyResult, Report, SearchItem, SearchPlan};
