//! End-of-run summary

use crate::state::{CrawlState, FailedDocument};
use chrono::{DateTime, Utc};

/// Outcome of one harvest run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Listing pages processed (zero for an identifier re-run)
    pub pages_visited: u32,

    /// Last listing page processed, if any
    pub last_page: Option<u32>,

    pub documents_written: u64,
    pub documents_skipped: u64,

    /// Failed documents with their reasons, in the order they failed
    pub failed: Vec<FailedDocument>,

    /// The operator interrupted the run between pages
    pub interrupted: bool,

    /// The run ended early on consecutive empty pages
    pub stopped_on_empty_pages: bool,
}

impl CrawlSummary {
    /// Snapshots the run totals held in `state`
    pub fn from_state(
        state: &CrawlState,
        started_at: DateTime<Utc>,
        pages_visited: u32,
        last_page: Option<u32>,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            pages_visited,
            last_page,
            documents_written: state.total_downloaded(),
            documents_skipped: state.total_skipped(),
            failed: state.failed_documents(),
            interrupted: false,
            stopped_on_empty_pages: false,
        }
    }

    pub fn total_failed(&self) -> usize {
        self.failed.len()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.duration_seconds());
    println!("  Listing pages visited: {}", summary.pages_visited);
    if let Some(page) = summary.last_page {
        println!("  Last page: {}", page);
    }
    if summary.interrupted {
        println!("  Interrupted by operator");
    }
    if summary.stopped_on_empty_pages {
        println!("  Stopped after consecutive empty pages");
    }
    println!();

    println!("Documents:");
    println!("  Newly downloaded: {}", summary.documents_written);
    println!("  Already present: {}", summary.documents_skipped);
    println!("  Failed: {}", summary.total_failed());

    if !summary.failed.is_empty() {
        println!("\nFailed Identifiers ({}):", summary.total_failed());
        for failed in &summary.failed {
            println!("  - {} ({})", failed.id, failed.reason);
        }
    }
}
