//! Crawler module for discovering and retrieving articles
//!
//! This module contains the crawl scheduling logic, including:
//! - The time-ordered pending queue of discovered articles
//! - HTTP client construction with timeouts and proxy rotation
//! - The periodic discovery loop across all sources
//! - The retrieval stage that drains the queue into storage

mod fetcher;
mod harvester;
mod orchestrator;
mod queue;

pub use fetcher::{build_http_client, REQUEST_TIMEOUT};
pub use harvester::{HarvestOutcome, Harvester};
pub use orchestrator::CrawlOrchestrator;
pub use queue::PendingQueue;
