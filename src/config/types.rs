use serde::Deserialize;
use std::time::Duration;

/// Default number of discovery jobs allowed to run at once
pub const DEFAULT_MAX_THREAD_COUNT: usize = 12;

/// Default bounds, in seconds, of the randomized pause between cycles
pub const DEFAULT_RUN_INTERVAL_RANGE: [u64; 2] = [60, 300];

/// Main configuration structure for News-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

/// Crawler scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of discovery jobs running at once
    #[serde(rename = "max-thread-count", default = "default_max_thread_count")]
    pub max_thread_count: usize,

    /// Bounds of the randomized pause between cycles, in seconds: `[min, max]`
    #[serde(
        rename = "random-run-interval-range",
        default = "default_run_interval_range"
    )]
    pub random_run_interval_range: Vec<u64>,
}

impl CrawlerConfig {
    /// Returns the interval bounds
    ///
    /// Only meaningful on a validated config; missing bounds fall back to
    /// the defaults.
    pub fn interval(&self) -> IntervalRange {
        match self.random_run_interval_range.as_slice() {
            [min, max] => IntervalRange::new(*min, *max),
            _ => IntervalRange::new(DEFAULT_RUN_INTERVAL_RANGE[0], DEFAULT_RUN_INTERVAL_RANGE[1]),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_thread_count: default_max_thread_count(),
            random_run_interval_range: default_run_interval_range(),
        }
    }
}

fn default_max_thread_count() -> usize {
    DEFAULT_MAX_THREAD_COUNT
}

fn default_run_interval_range() -> Vec<u64> {
    DEFAULT_RUN_INTERVAL_RANGE.to_vec()
}

/// Inclusive bounds, in seconds, of the pause between crawl cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRange {
    pub min: u64,
    pub max: u64,
}

impl IntervalRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Draws a pause uniformly from `[min, max]` seconds
    pub fn sample(&self) -> Duration {
        let secs = if self.min >= self.max {
            self.min
        } else {
            rand::random_range(self.min..=self.max)
        };
        Duration::from_secs(secs)
    }
}

/// Egress proxy configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    /// Master switch for proxy usage
    #[serde(rename = "use-proxy", default)]
    pub use_proxy: bool,

    /// Whether to rotate through `proxy_list`
    #[serde(rename = "use-proxy-list", default)]
    pub use_proxy_list: bool,

    /// Proxy endpoints (http, https or socks5 URLs)
    #[serde(rename = "proxy-list", default)]
    pub proxy_list: Vec<String>,
}

impl ProxyConfig {
    /// The endpoints to rotate through, empty when proxies are disabled
    pub fn effective_endpoints(&self) -> &[String] {
        if self.use_proxy && self.use_proxy_list {
            self.proxy_list.as_slice()
        } else {
            &[]
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
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One content source to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Identifier recorded on every item discovered from this source
    pub id: String,

    /// Index page listing the latest articles
    #[serde(rename = "index-url")]
    pub index_url: String,

    /// CSS selector matching each listed article
    #[serde(rename = "item-selector")]
    pub item_selector: String,

    /// CSS selector, relative to an item, matching its publication time
    #[serde(rename = "time-selector", default)]
    pub time_selector: Option<String>,

    /// Attribute of the time element holding the timestamp (default `datetime`)
    #[serde(rename = "time-attribute", default)]
    pub time_attribute: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_covers_inclusive_range() {
        let range = IntervalRange::new(1, 3);
        let mut seen_min = false;
        let mut seen_max = false;

        for _ in 0..1000 {
            let pause = range.sample();
            assert!(pause >= Duration::from_secs(1) && pause <= Duration::from_secs(3));
            seen_min |= pause == Duration::from_secs(1);
            seen_max |= pause == Duration::from_secs(3);
        }

        assert!(seen_min, "lower bound never drawn");
        assert!(seen_max, "upper bound never drawn");
    }

    #[test]
    fn test_sample_fixed_range() {
        let range = IntervalRange::new(7, 7);
        for _ in 0..10 {
            assert_eq!(range.sample(), Duration::from_secs(7));
        }
    }

    #[test]
    fn test_interval_falls_back_to_defaults() {
        let config = CrawlerConfig {
            max_thread_count: 1,
            random_run_interval_range: vec![5],
        };
        assert_eq!(
            config.interval(),
            IntervalRange::new(DEFAULT_RUN_INTERVAL_RANGE[0], DEFAULT_RUN_INTERVAL_RANGE[1])
        );
    }
}
