//! Research orchestration.
//!
//! A run moves through planning, searching, writing and notifying in
//! strict order. Progress is streamed back as short status chunks, and the
//! Markdown report is always the final chunk.

mod stage;
mod stream;

pub use stage::Stage;
pub use stream::{Chunk, ReportStream, ResearchOutput};

use crate::capability::{Capability, OpenAiCapability};
use crate::config::{Credentials, EmailSettings, PipelineConfig};
use crate::dispatch::SearchDispatcher;
use crate::error::{Error, Result};
use crate::events::{EventCallbacks, ResearchEvent};
use crate::mailer::{Mailer, SendGridMailer};
use crate::stages::{Notifier, Planner, Searcher, Writer};
use std::sync::{Arc, Mutex, PoisonError};
use stream::{ChunkSink, Closed};
use tracing::Instrument;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 16;

/// Produces trace ids for new runs.
pub type TraceIdFn = Arc<dyn Fn() -> String + Send + Sync>;

/// A fresh `trace_<32 hex>` id.
pub fn gen_trace_id() -> String {
    format!("trace_{}", Uuid::new_v4().simple())
}

/// Why a run stopped early.
enum Halt {
    Closed,
    Failed(Stage, Error),
}

impl From<Closed> for Halt {
    fn from(_: Closed) -> Self {
        Halt::Closed
    }
}

/// Coordinates the planner, the search fan-out, the writer and the notifier.
///
/// Cloning is cheap; clones share the underlying clients.
#[derive(Clone)]
pub struct ResearchManager {
    planner: Planner,
    searcher: Searcher,
    writer: Writer,
    notifier: Notifier,
    callbacks: EventCallbacks,
    trace_ids: TraceIdFn,
    trace_url_prefix: String,
}

impl ResearchManager {
    pub fn new(
        capability: Arc<dyn Capability>,
        mailer: Arc<dyn Mailer>,
        email: EmailSettings,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            planner: Planner::new(capability.clone(), config),
            searcher: Searcher::new(capability.clone(), config),
            writer: Writer::new(capability.clone(), config),
            notifier: Notifier::new(capability, mailer, email, config),
            callbacks: EventCallbacks::default(),
            trace_ids: Arc::new(gen_trace_id),
            trace_url_prefix: config.trace_url_prefix.clone(),
        }
    }

    /// Build a manager talking to OpenAI and SendGrid.
    pub fn from_credentials(
        credentials: &Credentials,
        email: EmailSettings,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let capability = Arc::new(OpenAiCapability::from_credentials(credentials)?);
        let mailer = Arc::new(SendGridMailer::from_credentials(credentials));
        Ok(Self::new(capability, mailer, email, config))
    }

    /// Observe run events.
    pub fn with_callbacks(mut self, callbacks: EventCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Replace the trace id generator.
    pub fn with_trace_ids<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.trace_ids = Arc::new(f);
        self
    }

    /// Start a run in the background and stream its output.
    ///
    /// Must be called from within a Tokio runtime. If the stream is dropped,
    /// the run stops at the next stage boundary.
    pub fn run(&self, query: impl Into<String>) -> ReportStream {
        let (sink, stream) = stream::channel(CHANNEL_CAPACITY);
        let query = query.into();
        let trace_id = (self.trace_ids)();
        let span = tracing::info_span!("research", trace_id = %trace_id);

        tokio::spawn(self.clone().drive(query, trace_id, sink).instrument(span));

        stream
    }

    /// Run to completion and return the statuses and report.
    pub async fn collect(&self, query: impl Into<String>) -> Result<ResearchOutput> {
        self.run(query).collect_output().await
    }

    /// Supervise one run. The stages execute in their own task so a panic
    /// still ends the stream with an error.
    async fn drive(self, query: String, trace_id: String, sink: ChunkSink) {
        let stage = StageCell::default();
        let task = tokio::spawn(
            {
                let manager = self.clone();
                let stage = stage.clone();
                let sink = sink.clone();
                async move { manager.execute(&query, &trace_id, &sink, &stage).await }
            }
            .in_current_span(),
        );

        let halt = match task.await {
            Ok(Ok(())) => return,
            Ok(Err(halt)) => halt,
            Err(e) => Halt::Failed(stage.get(), Error::Join(e)),
        };

        match halt {
            Halt::Closed => tracing::debug!("report stream dropped, stopping run"),
            Halt::Failed(stage, error) => {
                tracing::error!(%stage, "Research failed: {}", error);
                self.callbacks.emit(&ResearchEvent::RunFailed {
                    stage,
                    message: error.to_string(),
                });
                self.callbacks.emit(&ResearchEvent::StageEntered {
                    stage: Stage::Failed,
                });
                sink.fail(error).await;
            }
        }
    }

    fn enter(&self, stage: &StageCell) -> Stage {
        let current = stage.get();
        match current.next() {
            Some(next) => {
                stage.set(next);
                self.callbacks.emit(&ResearchEvent::StageEntered { stage: next });
                next
            }
            None => current,
        }
    }

    async fn execute(
        &self,
        query: &str,
        trace_id: &str,
        sink: &ChunkSink,
        stage: &StageCell,
    ) -> std::result::Result<(), Halt> {
        self.callbacks.emit(&ResearchEvent::RunStarted {
            trace_id: trace_id.to_string(),
            query: query.to_string(),
        });

        let trace_url = format!("{}{}", self.trace_url_prefix, trace_id);
        tracing::info!("View trace: {}", trace_url);
        sink.status(format!("View trace: {trace_url}")).await?;
        tracing::info!("Starting research...");

        let planning = self.enter(stage);
        let plan = self
            .planner
            .plan(query)
            .await
            .map_err(|e| Halt::Failed(planning, e))?;
        self.callbacks
            .emit(&ResearchEvent::SearchesPlanned { count: plan.len() });
        sink.status("Searches planned, starting to search...").await?;

        self.enter(stage);
        let dispatcher = SearchDispatcher::new(self.searcher.clone(), self.callbacks.clone());
        let results = dispatcher.dispatch_all(&plan).await;
        sink.status("Searches complete, writing report...").await?;

        let writing = self.enter(stage);
        let report = self
            .writer
            .write(query, &results)
            .await
            .map_err(|e| Halt::Failed(writing, e))?;
        self.callbacks.emit(&ResearchEvent::ReportWritten {
            short_summary: report.short_summary.clone(),
            follow_up_questions: report.follow_up_questions.len(),
        });
        sink.status("Report written, sending email...").await?;

        self.enter(stage);
        let notified = self.notifier.notify(&report).await;
        self.callbacks.emit(&ResearchEvent::EmailDispatched {
            provider_status: notified.provider_status,
        });
        sink.status("Email sent, research complete").await?;

        self.enter(stage);
        sink.report(report.markdown_report).await?;
        Ok(())
    }
}

/// The stage a run is in, readable by its supervisor.
#[derive(Clone)]
struct StageCell(Arc<Mutex<Stage>>);

impl Default for StageCell {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Stage::Start)))
    }
}

impl StageCell {
    fn get(&self) -> Stage {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, stage: Stage) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityRequest;
    use crate::capability::scripted::{ScriptedCapability, output_name};
    use crate::mailer::recording::RecordingMailer;
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    const QUERY: &str = "Impact of AI on Healthcare";
    const REPORT_MD: &str = "# AI in Healthcare\n\nA long report.";
    const TRACE_ID: &str = "trace_00000000000000000000000000000001";

    fn plan_response() -> String {
        let searches: Vec<_> = (0..5)
            .map(|i| json!({"reason": format!("reason {i}"), "query": format!("term {i}")}))
            .collect();
        json!({ "searches": searches }).to_string()
    }

    fn report_response() -> String {
        json!({
            "short_summary": "AI helps.",
            "markdown_report": REPORT_MD,
            "follow_up_questions": ["Regulation?", "Cost?"]
        })
        .to_string()
    }

    /// Answers each stage; the search for `term 3` fails.
    fn respond(req: &CapabilityRequest) -> Result<String> {
        match output_name(req) {
            Some("WebSearchPlan") => Ok(plan_response()),
            Some("ReportData") => Ok(report_response()),
            Some("EmailDraft") => {
                Ok(json!({"subject": "AI in Healthcare", "html_body": "<h1>AI</h1>"}).to_string())
            }
            _ if req.input.starts_with("Search term: term 3") => Err(Error::Api {
                status: 500,
                body: "search unavailable".to_string(),
            }),
            _ => Ok(format!("summary of {}", req.input.lines().next().unwrap_or_default())),
        }
    }

    struct Harness {
        capability: Arc<ScriptedCapability>,
        mailer: Arc<RecordingMailer>,
        callbacks: EventCallbacks,
        manager: ResearchManager,
    }

    fn harness_with(capability: ScriptedCapability, mailer: RecordingMailer) -> Harness {
        let capability = Arc::new(capability);
        let mailer = Arc::new(mailer);
        let callbacks = EventCallbacks::default().capture();
        let manager = ResearchManager::new(
            capability.clone(),
            mailer.clone(),
            EmailSettings {
                from: "bot@example.com".to_string(),
                to: "me@example.com".to_string(),
            },
            &PipelineConfig::default(),
        )
        .with_callbacks(callbacks.clone())
        .with_trace_ids(|| TRACE_ID.to_string());

        Harness {
            capability,
            mailer,
            callbacks,
            manager,
        }
    }

    fn harness() -> Harness {
        harness_with(ScriptedCapability::new(respond), RecordingMailer::with_status(202))
    }

    async fn chunks(stream: ReportStream) -> Vec<Result<Chunk>> {
        stream.collect().await
    }

    fn stages(events: &[ResearchEvent]) -> Vec<Stage> {
        events
            .iter()
            .filter_map(|e| match e {
                ResearchEvent::StageEntered { stage } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_with_one_failed_search() {
        let h = harness();

        let chunks: Vec<Chunk> = chunks(h.manager.run(QUERY))
            .await
            .into_iter()
            .map(|c| c.unwrap())
            .collect();

        assert_eq!(
            chunks,
            vec![
                Chunk::Status(format!(
                    "View trace: https://platform.openai.com/traces/trace?trace_id={TRACE_ID}"
                )),
                Chunk::Status("Searches planned, starting to search...".to_string()),
                Chunk::Status("Searches complete, writing report...".to_string()),
                Chunk::Status("Report written, sending email...".to_string()),
                Chunk::Status("Email sent, research complete".to_string()),
                Chunk::Report(REPORT_MD.to_string()),
            ]
        );

        // One email despite the failed search
        assert_eq!(h.mailer.sent().len(), 1);

        // The writer saw the four surviving summaries
        let writer_call = h
            .capability
            .calls()
            .into_iter()
            .find(|c| output_name(c) == Some("ReportData"))
            .unwrap();
        assert_eq!(writer_call.input.matches("summary of Search term").count(), 4);
        assert!(!writer_call.input.contains("term 3"));

        let events = h.callbacks.take_events();
        assert_eq!(
            stages(&events),
            vec![
                Stage::Planning,
                Stage::Searching,
                Stage::Writing,
                Stage::Notifying,
                Stage::Done
            ]
        );
        let ticks = events
            .iter()
            .filter(|e| matches!(e, ResearchEvent::SearchProgress { .. }))
            .count();
        assert_eq!(ticks, 5);
        assert!(events.contains(&ResearchEvent::EmailDispatched {
            provider_status: Some(202)
        }));
    }

    #[tokio::test]
    async fn test_malformed_report_stops_before_notify() {
        let capability = ScriptedCapability::new(|req| match output_name(req) {
            Some("ReportData") => Ok(json!({
                "short_summary": "s",
                "follow_up_questions": []
            })
            .to_string()),
            _ => respond(req),
        });
        let h = harness_with(capability, RecordingMailer::with_status(202));

        let items = chunks(h.manager.run(QUERY)).await;
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|c| matches!(c, Ok(Chunk::Status(_)))));
        assert!(matches!(
            items.last(),
            Some(Err(Error::Validation { name, .. })) if name == "ReportData"
        ));

        assert!(h.mailer.sent().is_empty());
        assert_eq!(h.capability.calls_for("EmailDraft"), 0);

        let events = h.callbacks.take_events();
        assert!(events.contains(&ResearchEvent::RunFailed {
            stage: Stage::Writing,
            message: items
                .last()
                .and_then(|c| c.as_ref().err())
                .map(|e| e.to_string())
                .unwrap(),
        }));
        assert_eq!(stages(&events).last(), Some(&Stage::Failed));
    }

    #[tokio::test]
    async fn test_planning_failure_is_fatal() {
        let capability = ScriptedCapability::new(|req| match output_name(req) {
            Some("WebSearchPlan") => Ok("no plan today".to_string()),
            _ => respond(req),
        });
        let h = harness_with(capability, RecordingMailer::with_status(202));

        let items = chunks(h.manager.run(QUERY)).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Ok(Chunk::Status(_))));
        assert!(matches!(items[1], Err(Error::NoStructuredOutput(_))));

        // Nothing after planning was attempted
        assert_eq!(h.capability.calls().len(), 1);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_writer_panic_ends_stream_with_error() {
        let capability = ScriptedCapability::new(|req| match output_name(req) {
            Some("ReportData") => panic!("writer blew up"),
            _ => respond(req),
        });
        let h = harness_with(capability, RecordingMailer::with_status(202));

        let items = chunks(h.manager.run(QUERY)).await;
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|c| matches!(c, Ok(Chunk::Status(_)))));
        assert!(matches!(items.last(), Some(Err(Error::Join(_)))));
        assert!(h.mailer.sent().is_empty());

        let events = h.callbacks.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            ResearchEvent::RunFailed {
                stage: Stage::Writing,
                ..
            }
        )));
        assert_eq!(stages(&events).last(), Some(&Stage::Failed));

        let err = h.manager.collect(QUERY).await.unwrap_err();
        assert!(matches!(err, Error::Join(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stream_stops_at_stage_boundary() {
        let capability =
            ScriptedCapability::new(respond).with_latency(|_| Duration::from_millis(20));
        let h = harness_with(capability, RecordingMailer::with_status(202));

        let mut stream = h.manager.run(QUERY);
        let first = stream.next_chunk().await.unwrap().unwrap();
        assert!(first.text().starts_with("View trace: "));
        drop(stream);

        // Let the in-flight planning call finish
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(h.capability.calls().len(), 1);
        assert_eq!(h.capability.calls_for("WebSearchPlan"), 1);
        assert!(h.mailer.sent().is_empty());

        let events = h.callbacks.take_events();
        assert_eq!(stages(&events), vec![Stage::Planning]);
        assert!(!events.iter().any(|e| matches!(e, ResearchEvent::RunFailed { .. })));
    }

    #[tokio::test]
    async fn test_empty_query_fails_in_planning() {
        let h = harness();
        let err = h.manager.collect("  ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
        assert!(h.capability.calls().is_empty());

        let events = h.callbacks.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            ResearchEvent::RunFailed {
                stage: Stage::Planning,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_provider_error_still_reaches_done() {
        let h = harness_with(ScriptedCapability::new(respond), RecordingMailer::with_status(500));

        let output = h.manager.collect(QUERY).await.unwrap();
        assert_eq!(output.report, REPORT_MD);
        assert_eq!(output.statuses.last().unwrap(), "Email sent, research complete");
        assert_eq!(h.mailer.sent().len(), 1);

        let events = h.callbacks.take_events();
        assert_eq!(stages(&events).last(), Some(&Stage::Done));
        assert!(events.contains(&ResearchEvent::EmailDispatched {
            provider_status: Some(500)
        }));
    }

    #[tokio::test]
    async fn test_unreachable_provider_still_reaches_done() {
        let h = harness_with(
            ScriptedCapability::new(respond),
            RecordingMailer::unreachable("dns failure"),
        );

        let output = h.manager.collect(QUERY).await.unwrap();
        assert_eq!(output.statuses.len(), 5);
        assert_eq!(output.report, REPORT_MD);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let h = harness();

        let first = h.manager.collect(QUERY).await.unwrap();
        let second = h.manager.collect(QUERY).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(h.mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let h = harness();

        let (a, b) = tokio::join!(h.manager.collect(QUERY), h.manager.collect("Rust in 2025"));
        assert_eq!(a.unwrap().report, REPORT_MD);
        assert_eq!(b.unwrap().report, REPORT_MD);
        assert_eq!(h.capability.calls_for("WebSearchPlan"), 2);
    }

    #[test]
    fn test_gen_trace_id_format() {
        let id = gen_trace_id();
        let hex = id.strip_prefix("trace_").unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(gen_trace_id(), id);
    }
}
