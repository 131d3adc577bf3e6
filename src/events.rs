//! Pipeline events and callbacks for observability.

use crate::pipeline::Stage;
use std::sync::{Arc, Mutex};

/// Events emitted during a research run.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchEvent {
    /// A run began under this trace id
    RunStarted { trace_id: String, query: String },
    /// The orchestrator moved into a new stage
    StageEntered { stage: Stage },
    /// The planner produced its searches
    SearchesPlanned { count: usize },
    /// One search finished, successfully or not
    SearchProgress {
        completed: usize,
        total: usize,
        query: String,
        success: bool,
    },
    /// The writer produced a report
    ReportWritten {
        short_summary: String,
        follow_up_questions: usize,
    },
    /// The email provider was called (status absent when unreachable)
    EmailDispatched { provider_status: Option<u16> },
    /// A fatal error ended the run
    RunFailed { stage: Stage, message: String },
}

/// Type alias for event callbacks
pub type EventCallback = Arc<dyn Fn(&ResearchEvent) + Send + Sync>;

/// Storage for pipeline callbacks
#[derive(Default, Clone)]
pub struct EventCallbacks {
    pub on_stage: Option<EventCallback>,
    pub on_search_progress: Option<EventCallback>,
    pub on_failure: Option<EventCallback>,
    /// Catch-all callback for any event
    pub on_event: Option<EventCallback>,
    captured: Option<Arc<Mutex<Vec<ResearchEvent>>>>,
}

impl EventCallbacks {
    /// Emit an event to the appropriate callback(s)
    pub fn emit(&self, event: &ResearchEvent) {
        if let Some(ref events) = self.captured
            && let Ok(mut events) = events.lock()
        {
            events.push(event.clone());
        }

        let specific = match event {
            ResearchEvent::StageEntered { .. } => self.on_stage.as_ref(),
            ResearchEvent::SearchProgress { .. } => self.on_search_progress.as_ref(),
            ResearchEvent::RunFailed { .. } => self.on_failure.as_ref(),
            _ => None,
        };

        if let Some(cb) = specific {
            cb(event);
        }

        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }

    /// Keep a copy of every emitted event for later inspection.
    pub fn capture(mut self) -> Self {
        self.captured = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    /// Take captured events, leaving the buffer empty.
    pub fn take_events(&self) -> Vec<ResearchEvent> {
        if let Some(ref events) = self.captured
            && let Ok(mut events) = events.lock()
        {
            return std::mem::take(&mut *events);
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_specific_and_catch_all() {
        let progress = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let p = progress.clone();
        let a = all.clone();
        let callbacks = EventCallbacks {
            on_search_progress: Some(Arc::new(move |_: &ResearchEvent| {
                p.fetch_add(1, Ordering::SeqCst);
            })),
            on_event: Some(Arc::new(move |_: &ResearchEvent| {
                a.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };

        callbacks.emit(&ResearchEvent::SearchesPlanned { count: 2 });
        callbacks.emit(&ResearchEvent::SearchProgress {
            completed: 1,
            total: 2,
            query: "q".to_string(),
            success: true,
        });

        assert_eq!(progress.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capture_is_shared_across_clones() {
        let callbacks = EventCallbacks::default().capture();
        let clone = callbacks.clone();

        clone.emit(&ResearchEvent::StageEntered {
            stage: Stage::Planning,
        });

        assert_eq!(
            callbacks.take_events(),
            vec![ResearchEvent::StageEntered {
                stage: Stage::Planning
            }]
        );
        assert!(callbacks.take_events().is_empty());
    }

    #[test]
    fn test_no_capture_by_default() {
        let callbacks = EventCallbacks::default();
        callbacks.emit(&ResearchEvent::SearchesPlanned { count: 1 });
        assert!(callbacks.take_events().is_empty());
    }
}
