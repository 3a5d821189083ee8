//! Run-wide counters shared by the download workers

use crate::state::outcome::{DownloadOutcome, FailureReason};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A document whose download ultimately failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub id: String,
    pub reason: FailureReason,
}

/// Process-wide mutable counters for one run
///
/// Workers report outcomes concurrently; `total_downloaded` is a single
/// atomic counter and the failure list is append-only behind one mutex.
#[derive(Debug, Default)]
pub struct CrawlState {
    total_downloaded: AtomicU64,
    total_skipped: AtomicU64,
    failed: Mutex<Vec<FailedDocument>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one document outcome into the run totals
    ///
    /// Must be called exactly once per document.
    pub fn record(&self, id: &str, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Written => {
                self.total_downloaded.fetch_add(1, Ordering::Relaxed);
            }
            DownloadOutcome::Skipped => {
                self.total_skipped.fetch_add(1, Ordering::Relaxed);
            }
            DownloadOutcome::Failed(reason) => {
                self.failed_list().push(FailedDocument {
                    id: id.to_string(),
                    reason: reason.clone(),
                });
            }
        }
    }

    pub fn total_downloaded(&self) -> u64 {
        self.total_downloaded.load(Ordering::Relaxed)
    }

    pub fn total_skipped(&self) -> u64 {
        self.total_skipped.load(Ordering::Relaxed)
    }

    pub fn total_failed(&self) -> usize {
        self.failed_list().len()
    }

    /// Identifiers of failed documents, in the order failures were reported
    pub fn failed_ids(&self) -> Vec<String> {
        self.failed_list().iter().map(|f| f.id.clone()).collect()
    }

    pub fn failed_documents(&self) -> Vec<FailedDocument> {
        self.failed_list().clone()
    }

    fn failed_list(&self) -> std::sync::MutexGuard<'_, Vec<FailedDocument>> {
        // push is the only mutation, so a poisoned list is still consistent
        self.failed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
