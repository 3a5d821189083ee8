//! Harvest coordinator - main orchestration logic
//!
//! This module contains the outer loop that drives a run:
//! - Pre-flight: validating config, preparing the output directory, building the transport
//! - Walking listing pages strictly in sequence
//! - Handing each page's links to the download pool and waiting for the batch
//! - Pacing between listing pages and periodic progress reporting
//! - Producing the final summary

use crate::config::{validate, Config};
use crate::crawler::listing::ListingFetcher;
use crate::crawler::parser::LinkExtractor;
use crate::crawler::pool::DownloadPool;
use crate::crawler::transport::Transport;
use crate::output::CrawlSummary;
use crate::state::{BatchTally, CrawlState, DownloadOutcome, FailureReason, PageResult};
use crate::storage::DocumentStore;
use crate::HarvestError;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Main harvest coordinator structure
///
/// One coordinator drives one run; its [`CrawlState`] is not shared across runs.
pub struct Coordinator {
    config: Arc<Config>,
    transport: Arc<Transport>,
    listing: ListingFetcher,
    extractor: LinkExtractor,
    pool: DownloadPool,
    state: Arc<CrawlState>,
    shutdown: Arc<AtomicBool>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Every error returned here is a pre-flight error: nothing has touched
    /// the network yet.
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;
        let transport = Transport::new(&config.transport, &config.user_agent)?;
        Self::with_transport(config, transport)
    }

    /// Creates a coordinator around an already built transport
    pub fn with_transport(config: Config, transport: Transport) -> Result<Self, HarvestError> {
        validate(&config)?;

        let store = DocumentStore::open(
            &config.output.directory,
            &config.output.file_extension,
            config.output.min_document_bytes,
        )?;
        tracing::info!("Storing documents in {}", store.directory().display());

        let listing = ListingFetcher::new(&config.site)?;
        let extractor = LinkExtractor::new(&config.site)?;
        let transport = Arc::new(transport);
        let state = Arc::new(CrawlState::new());
        let pool = DownloadPool::new(
            transport.clone(),
            Arc::new(store),
            state.clone(),
            config.crawler.max_concurrent_downloads as usize,
        );

        Ok(Self {
            config: Arc::new(config),
            transport,
            listing,
            extractor,
            pool,
            state,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked before each listing page; setting it ends the run cleanly
    ///
    /// A page batch already in flight always completes.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the main harvest loop over the configured page range
    ///
    /// Page-level failures are always recoverable, so the loop always reaches
    /// its end and returns a summary.
    pub async fn run(&self) -> CrawlSummary {
        let crawler = &self.config.crawler;
        let started_at = Utc::now();
        let start_time = std::time::Instant::now();

        tracing::info!(
            "Harvesting pages {}..={} with {} parallel downloads",
            crawler.start_page,
            crawler.end_page,
            self.pool.concurrency()
        );

        let mut pages_visited = 0;
        let mut last_page = None;
        let mut consecutive_empty = 0;
        let mut interrupted = false;
        let mut stopped_on_empty_pages = false;

        for page in crawler.start_page..=crawler.end_page {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!("Interrupt received, stopping before page {}", page);
                interrupted = true;
                break;
            }

            let result = self.process_page(page).await;
            pages_visited += 1;
            last_page = Some(page);

            if result.is_empty() {
                consecutive_empty += 1;
            } else {
                consecutive_empty = 0;
            }

            if progress_due(pages_visited, crawler.progress_interval) {
                let elapsed = start_time.elapsed();
                tracing::info!(
                    "Progress: page {}/{}, {} downloaded, {} failed, {:.2} pages/sec",
                    page,
                    crawler.end_page,
                    self.state.total_downloaded(),
                    self.state.total_failed(),
                    pages_visited as f64 / elapsed.as_secs_f64()
                );
            }

            if let Some(limit) = crawler.stop_after_empty_pages {
                if consecutive_empty >= limit {
                    tracing::info!(
                        "{} consecutive pages without links, treating page {} as past the end of the catalog",
                        consecutive_empty,
                        page
                    );
                    stopped_on_empty_pages = true;
                    break;
                }
            }

            if page < crawler.end_page {
                tokio::time::sleep(crawler.page_delay()).await;
            }
        }

        let mut summary =
            CrawlSummary::from_state(&self.state, started_at, pages_visited, last_page);
        summary.interrupted = interrupted;
        summary.stopped_on_empty_pages = stopped_on_empty_pages;

        tracing::info!(
            "Harvest finished: {} downloaded, {} skipped, {} failed in {:?}",
            summary.documents_written,
            summary.documents_skipped,
            summary.total_failed(),
            start_time.elapsed()
        );

        summary
    }

    /// Processes a single listing page
    ///
    /// Fetches the listing, extracts its links, and downloads them as one
    /// joined batch. A missing listing counts as zero links.
    pub async fn process_page(&self, page: u32) -> PageResult {
        tracing::debug!("Fetching listing page {}", page);

        let Some(body) = self.listing.fetch(&self.transport, page).await else {
            return PageResult::missing(page);
        };

        let docs = self.extractor.extract(&body);
        let links_found = docs.len();

        if docs.is_empty() {
            tracing::info!("Page {}: no documents found", page);
            return PageResult::from_tally(page, 0, BatchTally::default());
        }

        let tally = self.pool.download_batch(docs).await;
        tracing::info!(
            "Page {}: {} links, {} new, {} skipped, {} failed",
            page,
            links_found,
            tally.written,
            tally.skipped,
            tally.failed
        );

        PageResult::from_tally(page, links_found, tally)
    }

    /// Downloads exactly the given identifiers, ignoring the listing pages
    ///
    /// Identifiers already stored are skipped; identifiers that cannot name a
    /// document are reported as failed.
    pub async fn retry_ids(&self, ids: &[String]) -> CrawlSummary {
        let started_at = Utc::now();
        let mut docs = Vec::with_capacity(ids.len());

        for id in ids {
            match self.extractor.document_ref_for_id(id) {
                Some(doc) => docs.push(doc),
                None => {
                    tracing::warn!("Ignoring invalid identifier {:?}", id);
                    self.state
                        .record(id, &DownloadOutcome::Failed(FailureReason::InvalidId));
                }
            }
        }

        tracing::info!("Retrying {} identifiers", docs.len());
        let tally = self.pool.download_batch(docs).await;
        tracing::info!(
            "Retry finished: {} new, {} skipped, {} failed",
            tally.written,
            tally.skipped,
            tally.failed
        );

        CrawlSummary::from_state(&self.state, started_at, 0, None)
    }
}

/// True after every `interval`-th visited page
fn progress_due(pages_visited: u32, interval: u32) -> bool {
    interval > 0 && pages_visited > 0 && pages_visited % interval == 0
}

/// Runs a complete harvest with the given configuration
///
/// # Example
///
/// ```no_run
/// use judgment_harvest::config::load_config;
/// use judgment_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_crawl(config).await?;
/// println!("{} new documents", summary.documents_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlSummary, HarvestError> {
    let coordinator = Coordinator::new(config)?;
    Ok(coordinator.run().await)
}
