//! Crawler module for listing traversal and document download
//!
//! This module contains the core harvesting logic, including:
//! - HTTP transport with connection pooling and retry/backoff
//! - Listing page retrieval
//! - Document link extraction and deduplication
//! - The bounded download pool
//! - Overall run coordination

mod coordinator;
mod listing;
mod parser;
mod pool;
mod transport;

pub use coordinator::{run_crawl, Coordinator};
pub use listing::ListingFetcher;
pub use parser::{DocumentRef, LinkExtractor};
pub use pool::DownloadPool;
pub use transport::{build_http_client, FetchError, RetryPolicy, Transport};
