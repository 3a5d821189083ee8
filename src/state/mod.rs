//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `DownloadOutcome`: terminal result of one document (skipped, written, failed)
//! - `PageResult`: per-listing-page counts used for progress reporting
//! - `CrawlState`: run-wide counters shared by concurrent download workers

mod crawl_state;
mod outcome;

// Re-export main types
pub use crawl_state::{CrawlState, FailedDocument};
pub use outcome::{BatchTally, DownloadOutcome, FailureReason, PageResult};
