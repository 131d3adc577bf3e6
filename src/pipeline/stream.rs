//! The chunk stream handed back to callers.

use crate::error::{Error, Result};
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// One piece of run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Short progress text
    Status(String),
    /// The final Markdown report; always the last chunk of a successful run
    Report(String),
}

impl Chunk {
    pub fn text(&self) -> &str {
        match self {
            Chunk::Status(text) | Chunk::Report(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Chunk::Status(text) | Chunk::Report(text) => text,
        }
    }

    pub fn is_report(&self) -> bool {
        matches!(self, Chunk::Report(_))
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchOutput {
    pub statuses: Vec<String>,
    pub report: String,
}

/// Receiving end of a run.
///
/// Yields status chunks as stages complete, then the report. A fatal
/// error arrives as a final `Err` item, after which the stream ends.
pub struct ReportStream {
    rx: mpsc::Receiver<Result<Chunk>>,
}

impl ReportStream {
    pub(crate) fn new(rx: mpsc::Receiver<Result<Chunk>>) -> Self {
        Self { rx }
    }

    /// Wait for the next chunk.
    pub async fn next_chunk(&mut self) -> Option<Result<Chunk>> {
        self.rx.recv().await
    }

    /// Drain the stream into its statuses and report.
    pub async fn collect_output(mut self) -> Result<ResearchOutput> {
        let mut statuses = Vec::new();
        while let Some(item) = self.rx.recv().await {
            match item? {
                Chunk::Status(text) => statuses.push(text),
                Chunk::Report(report) => return Ok(ResearchOutput { statuses, report }),
            }
        }
        Err(Error::EmptyResponse("research run".to_string()))
    }
}

impl Stream for ReportStream {
    type Item = Result<Chunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Sending end, owned by the orchestrator task.
#[derive(Clone)]
pub(crate) struct ChunkSink {
    tx: mpsc::Sender<Result<Chunk>>,
}

/// The receiver went away; nobody is listening any more.
#[derive(Debug)]
pub(crate) struct Closed;

impl ChunkSink {
    pub(crate) fn new(tx: mpsc::Sender<Result<Chunk>>) -> Self {
        Self { tx }
    }

    pub(crate) async fn status(&self, text: impl Into<String>) -> std::result::Result<(), Closed> {
        self.tx
            .send(Ok(Chunk::Status(text.into())))
            .await
            .map_err(|_| Closed)
    }

    pub(crate) async fn report(&self, markdown: String) -> std::result::Result<(), Closed> {
        self.tx
            .send(Ok(Chunk::Report(markdown)))
            .await
            .map_err(|_| Closed)
    }

    pub(crate) async fn fail(&self, error: Error) {
        let _ = self.tx.send(Err(error)).await;
    }
}

pub(crate) fn channel(capacity: usize) -> (ChunkSink, ReportStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChunkSink::new(tx), ReportStream::new(rx))
}
