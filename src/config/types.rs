use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Judgment-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// The remote catalog being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host every listing and document URL is resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the paginated listing
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Sub-path that marks a document link, without surrounding slashes
    #[serde(rename = "document-path", default = "default_document_path")]
    pub document_path: String,

    /// Query parameter carrying the listing page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,
}

/// Page traversal and download pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First listing page to visit (1-based)
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Last listing page to visit, inclusive
    #[serde(rename = "end-page")]
    pub end_page: u32,

    /// Delay between listing pages (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Maximum number of document downloads in flight
    #[serde(
        rename = "max-concurrent-downloads",
        default = "default_max_concurrent_downloads"
    )]
    pub max_concurrent_downloads: u32,

    /// Emit a progress snapshot every this many pages
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u32,

    /// Stop once this many consecutive pages yield no links
    #[serde(rename = "stop-after-empty-pages", default)]
    pub stop_after_empty_pages: Option<u32>,
}

impl CrawlerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

/// HTTP transport tuning
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt for retryable failures
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Backoff before the first retry; doubled for each further retry (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Idle connections kept per host
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: usize,

    /// HTTP statuses that trigger a retry
    #[serde(rename = "retryable-statuses", default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            pool_size: default_pool_size(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Format: `CrawlerName/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one file per document
    pub directory: PathBuf,

    /// Extension of stored documents
    #[serde(rename = "file-extension", default = "default_file_extension")]
    pub file_extension: String,

    /// Bodies shorter than this are rejected as soft failures
    #[serde(rename = "min-document-bytes", default = "default_min_document_bytes")]
    pub min_document_bytes: usize,

    /// Where to write the failed identifiers at the end of a run
    #[serde(rename = "failed-ids-path", default)]
    pub failed_ids_path: Option<PathBuf>,
}

fn default_listing_path() -> String {
    "/gd/Home/Index".to_string()
}

fn default_document_path() -> String {
    "gd/s".to_string()
}

fn default_page_param() -> String {
    "CurrentPage".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_page_delay_ms() -> u64 {
    400
}

fn default_max_concurrent_downloads() -> u32 {
    15
}

fn default_progress_interval() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_pool_size() -> usize {
    50
}

pub(crate) fn default_retryable_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_file_extension() -> String {
    "html".to_string()
}

fn default_min_document_bytes() -> usize {
    1024
}
