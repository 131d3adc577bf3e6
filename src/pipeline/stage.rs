//! Stages of a research run.

use std::fmt;

/// Where a run is. Runs only move forward, one stage at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    Planning,
    Searching,
    Writing,
    Notifying,
    Done,
    Failed,
}

impl Stage {
    /// The stage that follows on success.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Start => Some(Stage::Planning),
            Stage::Planning => Some(Stage::Searching),
            Stage::Searching => Some(Stage::Writing),
            Stage::Writing => Some(Stage::Notifying),
            Stage::Notifying => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Planning => "planning",
            Stage::Searching => "searching",
            Stage::Writing => "writing",
            Stage::Notifying => "notifying",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}
