use crate::config::types::{Config, CrawlerConfig, ProxyConfig, SourceConfig, UserAgentConfig};
use crate::source::ListingRules;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_proxy_config(&config.proxy)?;
    validate_user_agent_config(&config.user_agent)?;

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates crawler scheduling configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_thread_count < 1 {
        return Err(ConfigError::Validation(format!(
            "max_thread_count must be >= 1, got {}",
            config.max_thread_count
        )));
    }

    match config.random_run_interval_range.as_slice() {
        [min, max] if min <= max => Ok(()),
        [min, max] => Err(ConfigError::Validation(format!(
            "random_run_interval_range minimum ({}) exceeds maximum ({})",
            min, max
        ))),
        other => Err(ConfigError::Validation(format!(
            "random_run_interval_range must have exactly two values, got {}",
            other.len()
        ))),
    }
}

/// Validates proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if !config.use_proxy {
        return Ok(());
    }

    if config.use_proxy_list && config.proxy_list.is_empty() {
        return Err(ConfigError::Validation(
            "use_proxy_list is enabled but proxy_list is empty".to_string(),
        ));
    }

    for proxy in config.effective_endpoints() {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' must use http, https, socks5 or socks5h",
                proxy
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)
}

/// Validates source entries
fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();

    for source in sources {
        if source.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Source id cannot be empty".to_string(),
            ));
        }

        if !ids.insert(source.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source id '{}'",
                source.id
            )));
        }

        let url = Url::parse(&source.index_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid index URL '{}' for source '{}': {}",
                source.index_url, source.id, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Index URL '{}' for source '{}' must use HTTP or HTTPS",
                source.index_url, source.id
            )));
        }

        ListingRules::new(
            &source.item_selector,
            source.time_selector.as_deref(),
            source.time_attribute.as_deref(),
        )
        .map_err(|e| ConfigError::Validation(format!("Source '{}': {}", source.id, e)))?;
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "Invalid email address: {}",
            email
        ))),
    }
}
