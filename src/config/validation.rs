use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, TransportConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Statuses that must always be retried
const REQUIRED_RETRYABLE: [u16; 5] = [429, 500, 502, 503, 504];

/// Validates the entire configuration
///
/// Everything checked here is fatal and happens before any network activity.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_transport_config(&config.transport)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the remote site description
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    let document_path = config.document_path.trim_matches('/');
    if document_path.is_empty() {
        return Err(ConfigError::Validation(
            "document-path cannot be empty".to_string(),
        ));
    }

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page-param cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates page range and pool configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start-page must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.end_page < config.start_page {
        return Err(ConfigError::Validation(format!(
            "end-page ({}) must not be before start-page ({})",
            config.end_page, config.start_page
        )));
    }

    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and 100, got {}",
            config.max_concurrent_downloads
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress-interval must be >= 1".to_string(),
        ));
    }

    if config.stop_after_empty_pages == Some(0) {
        return Err(ConfigError::Validation(
            "stop-after-empty-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates transport tuning and the retryable status set
fn validate_transport_config(config: &TransportConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.pool_size < 1 {
        return Err(ConfigError::Validation(
            "pool-size must be >= 1".to_string(),
        ));
    }

    for required in REQUIRED_RETRYABLE {
        if !config.retryable_statuses.contains(&required) {
            return Err(ConfigError::Validation(format!(
                "retryable-statuses must include {}",
                required
            )));
        }
    }

    // Other client errors are permanent, retrying them only adds load
    if let Some(status) = config
        .retryable_statuses
        .iter()
        .find(|s| (400..500).contains(*s) && **s != 429)
    {
        return Err(ConfigError::Validation(format!(
            "retryable-statuses must not include client error {}",
            status
        )));
    }

    if let Some(status) = config
        .retryable_statuses
        .iter()
        .find(|s| !(100..600).contains(*s))
    {
        return Err(ConfigError::Validation(format!(
            "retryable-statuses contains invalid status {}",
            status
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.file_extension.is_empty()
        || !config
            .file_extension
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ConfigError::Validation(format!(
            "file-extension must be non-empty and alphanumeric, got '{}'",
            config.file_extension
        )));
    }

    Ok(())
}
