//! Configuration module for News-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use news_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will run up to {} jobs at once", config.crawler.max_thread_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, IntervalRange, ProxyConfig, SourceConfig, StorageConfig,
    UserAgentConfig, DEFAULT_MAX_THREAD_COUNT, DEFAULT_RUN_INTERVAL_RANGE,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
