//! Parallel search fan-out.
//!
//! Every planned item becomes its own task. Results are gathered in the
//! order tasks finish, and a failed search simply contributes nothing.

use crate::events::{EventCallbacks, ResearchEvent};
use crate::stages::{SearchPlan, Searcher};
use futures::stream::{FuturesUnordered, StreamExt};

/// Runs every search in a plan concurrently.
#[derive(Clone)]
pub struct SearchDispatcher {
    searcher: Searcher,
    callbacks: EventCallbacks,
}

impl SearchDispatcher {
    pub fn new(searcher: Searcher, callbacks: EventCallbacks) -> Self {
        Self {
            searcher,
            callbacks,
        }
    }

    /// Run all searches and return the summaries that succeeded.
    ///
    /// Waits for every search to finish. The returned order is completion
    /// order and carries no meaning. One `SearchProgress` event is emitted
    /// per finished search, with a counter that only ever increases.
    pub async fn dispatch_all(&self, plan: &SearchPlan) -> Vec<String> {
        tracing::info!("Searching...");
        let total = plan.len();

        let mut pending: FuturesUnordered<_> = plan
            .iter()
            .cloned()
            .map(|item| {
                let searcher = self.searcher.clone();
                async move {
                    let handle = tokio::spawn({
                        let item = item.clone();
                        async move { searcher.search(&item).await }
                    });
                    (item, handle.await)
                }
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        let mut completed = 0;

        while let Some((item, joined)) = pending.next().await {
            let success = match joined {
                Ok(Ok(summary)) => {
                    results.push(summary);
                    true
                }
                Ok(Err(e)) => {
                    tracing::warn!("Search failed for term '{}': {}", item.query, e);
                    false
                }
                Err(e) => {
                    tracing::warn!("Search task for term '{}' did not finish: {}", item.query, e);
                    false
                }
            };

            completed += 1;
            tracing::info!("Searching... {}/{} completed", completed, total);
            self.callbacks.emit(&ResearchEvent::SearchProgress {
                completed,
                total,
                query: item.query,
                success,
            });
        }

        tracing::info!("Finished searching");
        results
    }
}
