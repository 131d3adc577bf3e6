//! The sequential stages of a research run.

mod notify;
mod planner;
mod search;
mod writer;

pub use notify::{EmailDraft, NotifyResult, Notifier};
pub use planner::{Planner, SearchItem, SearchPlan};
pub use search::Searcher;
pub use writer::{Report, Writer};
