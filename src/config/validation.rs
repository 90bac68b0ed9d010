use crate::config::types::{
    Config, CrawlerConfig, FetcherBackend, FetcherConfig, ParserKind, StorageConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on fetch admission permits
const MAX_CONCURRENCY: usize = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_storage_config(&config.storage)?;

    if config.parser.kind == ParserKind::Markdown && config.fetcher.backend != FetcherBackend::Scrape
    {
        return Err(ConfigError::Validation(
            "markdown parser requires the scrape fetcher backend".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if !config.crawl_delay.is_finite() || config.crawl_delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "crawl_delay must be a finite number >= 0, got {}",
            config.crawl_delay
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.backend == FetcherBackend::Scrape {
        let endpoint = Url::parse(&config.scrape_endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid scrape_endpoint '{}': {}",
                config.scrape_endpoint, e
            ))
        })?;

        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "scrape_endpoint '{}' must use http or https",
                config.scrape_endpoint
            )));
        }
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
