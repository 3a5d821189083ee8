//! Output module for run summaries and reports
//!
//! This module handles:
//! - Building the end-of-run summary from the shared crawl state
//! - Printing a human-readable report
//! - Writing and reading the failed-identifier list used for targeted re-runs

mod failed_ids;
mod summary;

pub use failed_ids::{load_failed_ids, write_failed_ids};
pub use summary::{print_summary, CrawlSummary};
