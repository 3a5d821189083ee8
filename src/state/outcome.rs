//! Download outcome definitions for tracking per-document progress
//!
//! Every document handed to the download pool ends in exactly one of these.

use std::fmt;

/// Why a document could not be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Transport gave up (non-retryable status, or retries exhausted)
    Fetch(String),

    /// Body was shorter than the configured minimum
    TooShort { len: usize, min: usize },

    /// The body could not be written or committed to disk
    Write(String),

    /// The identifier cannot be turned into a safe file name
    InvalidId,

    /// The download task ended without reporting
    Aborted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {}", e),
            Self::TooShort { len, min } => {
                write!(f, "response too short ({} bytes, minimum {})", len, min)
            }
            Self::Write(e) => write!(f, "write failed: {}", e),
            Self::InvalidId => write!(f, "invalid identifier"),
            Self::Aborted => write!(f, "download task aborted"),
        }
    }
}

/// Terminal outcome of one document download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Already stored
    ///
    /// Normally no request was made. The one exception is a concurrent
    /// writer committing the same identifier first, in which case the body
    /// was fetched but discarded.
    Skipped,

    /// Newly fetched and committed
    Written,

    /// Fetch, validation, or write failed
    Failed(FailureReason),
}

impl DownloadOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Written => "written",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Aggregate outcome counts for one batch of documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchTally {
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Written => self.written += 1,
            DownloadOutcome::Skipped => self.skipped += 1,
            DownloadOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.written + self.skipped + self.failed
    }
}

/// Per-listing-page result, used only for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageResult {
    pub page: u32,

    /// False when the listing page itself could not be fetched
    pub listing_fetched: bool,

    pub links_found: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PageResult {
    /// A page whose listing could not be retrieved
    pub fn missing(page: u32) -> Self {
        Self {
            page,
            listing_fetched: false,
            links_found: 0,
            written: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn from_tally(page: u32, links_found: usize, tally: BatchTally) -> Self {
        Self {
            page,
            listing_fetched: true,
            links_found,
            written: tally.written,
            skipped: tally.skipped,
            failed: tally.failed,
        }
    }

    /// True when the page contributed no links, for whatever reason
    pub fn is_empty(&self) -> bool {
        self.links_found == 0
    }
}
