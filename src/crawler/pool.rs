//! Bounded download pool for one batch of documents
//!
//! This module handles:
//! - Skip-if-present checks before any request is made
//! - Fan-out of downloads across at most K concurrent tasks (semaphore)
//! - Fan-in: the batch returns only after every dispatched task finished
//! - Reporting each outcome exactly once to the shared [`CrawlState`]

use crate::crawler::parser::DocumentRef;
use crate::crawler::transport::Transport;
use crate::state::{BatchTally, CrawlState, DownloadOutcome, FailureReason};
use crate::storage::DocumentStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Downloads batches of documents with bounded concurrency
#[derive(Debug, Clone)]
pub struct DownloadPool {
    transport: Arc<Transport>,
    store: Arc<DocumentStore>,
    state: Arc<CrawlState>,
    concurrency: usize,
}

impl DownloadPool {
    pub fn new(
        transport: Arc<Transport>,
        store: Arc<DocumentStore>,
        state: Arc<CrawlState>,
        concurrency: usize,
    ) -> Self {
        Self {
            transport,
            store,
            state,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads every document in `docs` and waits for all of them
    ///
    /// One failing document never affects its siblings; the returned counts
    /// always sum to `docs.len()`.
    pub async fn download_batch(&self, docs: Vec<DocumentRef>) -> BatchTally {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tally = BatchTally::default();
        let mut tasks = JoinSet::new();
        let mut dispatched = Vec::new();

        for doc in docs {
            if self.store.exists(&doc.id).await {
                tracing::debug!("{} already stored, skipping", doc.id);
                self.report(&doc.id, DownloadOutcome::Skipped, &mut tally);
                continue;
            }

            dispatched.push(doc.id.clone());

            let semaphore = semaphore.clone();
            let transport = self.transport.clone();
            let store = self.store.clone();
            let state = self.state.clone();

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => download_one(&transport, &store, &doc).await,
                    Err(_) => DownloadOutcome::Failed(FailureReason::Aborted),
                };
                state.record(&doc.id, &outcome);
                log_outcome(&doc.id, &outcome, &state);
                (doc.id, outcome)
            });
        }

        let mut reported = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    tally.record(&outcome);
                    reported.insert(id);
                }
                Err(e) => tracing::error!("Download task ended abnormally: {}", e),
            }
        }

        // A task that panicked never reported; count it here so nothing is lost
        for id in dispatched.iter().filter(|id| !reported.contains(*id)) {
            self.report(id, DownloadOutcome::Failed(FailureReason::Aborted), &mut tally);
        }

        tally
    }

    fn report(&self, id: &str, outcome: DownloadOutcome, tally: &mut BatchTally) {
        self.state.record(id, &outcome);
        tally.record(&outcome);
    }
}

/// Fetches one document and hands it to the store
async fn download_one(
    transport: &Transport,
    store: &DocumentStore,
    doc: &DocumentRef,
) -> DownloadOutcome {
    match transport.fetch(&doc.url).await {
        Ok(body) => store.store(&doc.id, body).await,
        Err(e) => DownloadOutcome::Failed(FailureReason::Fetch(e.to_string())),
    }
}

fn log_outcome(id: &str, outcome: &DownloadOutcome, state: &CrawlState) {
    match outcome {
        DownloadOutcome::Written => {
            tracing::debug!("Stored {} ({} total)", id, state.total_downloaded())
        }
        DownloadOutcome::Skipped => tracing::debug!("{} appeared while downloading", id),
        DownloadOutcome::Failed(reason) => tracing::warn!("Failed {}: {}", id, reason),
    }
}
