//! HTTP transport
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building one pooled HTTP client with the configured user agent
//! - Retry with exponential backoff for transient failures
//! - Error classification (retryable vs. permanent)
//!
//! Callers only ever see `fetch(url) -> body | error`; retry policy lives
//! here and nowhere else.

use crate::config::{TransportConfig, UserAgentConfig};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// A fetch that did not produce a body
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("Request timeout for {url} after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("Network error for {url} after {attempts} attempt(s): {message}")]
    Network {
        url: String,
        message: String,
        attempts: u32,
    },
}

impl FetchError {
    /// Number of requests issued before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Status { attempts, .. }
            | Self::Timeout { attempts, .. }
            | Self::Network { attempts, .. } => *attempts,
        }
    }
}

/// When and how long to wait before retrying a request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_base: Duration,
    retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration, retryable_statuses: Vec<u16>) -> Self {
        Self {
            max_retries,
            backoff_base,
            retryable_statuses,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            config.retries,
            Duration::from_millis(config.backoff_base_ms),
            config.retryable_statuses.clone(),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry `retry` (0-based): `base * 2^retry`
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2_u32.saturating_pow(retry))
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }
}

/// Classification of a single request attempt
enum Attempt {
    Retryable(FetchError),
    Permanent(FetchError),
}

/// Shared HTTP transport: one connection pool plus the retry policy
///
/// `reqwest::Client` is internally reference counted and safe to use from
/// every worker at once.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    policy: RetryPolicy,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use judgment_harvest::config::{TransportConfig, UserAgentConfig};
/// use judgment_harvest::crawler::build_http_client;
///
/// let ua = UserAgentConfig {
///     crawler_name: "Academic-Research-Bot".to_string(),
///     crawler_version: "2.0".to_string(),
///     contact_url: None,
/// };
///
/// let client = build_http_client(&TransportConfig::default(), &ua).unwrap();
/// ```
pub fn build_http_client(
    config: &TransportConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_size)
        .tcp_keepalive(Duration::from_secs(60))
        .gzip(true)
        .brotli(true)
        .build()
}

impl Transport {
    pub fn new(
        config: &TransportConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config, user_agent)?;
        Ok(Self::with_client(client, RetryPolicy::from_config(config)))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a URL and returns its body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout | Retry with backoff |
    /// | Connection error | Retry with backoff |
    /// | Status in retryable set (429, 5xx) | Retry with backoff |
    /// | Body read interrupted | Retry with backoff |
    /// | Any other non-2xx status | Fail immediately |
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut retry = 0;

        loop {
            let attempts = retry + 1;
            match self.attempt(url, attempts).await {
                Ok(body) => return Ok(body),
                Err(Attempt::Retryable(err)) if retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for(retry);
                    tracing::debug!("{}; retrying in {:?}", err, delay);
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(Attempt::Retryable(err)) | Err(Attempt::Permanent(err)) => return Err(err),
            }
        }
    }

    async fn attempt(&self, url: &str, attempts: u32) -> Result<String, Attempt> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Err(classify_error(url, e, attempts)),
        };

        let status = response.status();
        if !status.is_success() {
            let err = FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                attempts,
            };
            return Err(if self.policy.is_retryable_status(status) {
                Attempt::Retryable(err)
            } else {
                Attempt::Permanent(err)
            });
        }

        response.text().await.map_err(|e| {
            // The status was fine, so a failed body read is a dropped connection
            match classify_error(url, e, attempts) {
                Attempt::Permanent(err) => Attempt::Retryable(err),
                retryable => retryable,
            }
        })
    }
}

fn classify_error(url: &str, err: reqwest::Error, attempts: u32) -> Attempt {
    if err.is_timeout() {
        Attempt::Retryable(FetchError::Timeout {
            url: url.to_string(),
            attempts,
        })
    } else if err.is_connect() || err.is_request() || err.is_body() {
        Attempt::Retryable(FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
            attempts,
        })
    } else {
        Attempt::Permanent(FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
            attempts,
        })
    }
}
