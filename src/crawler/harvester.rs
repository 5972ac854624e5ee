//! Retrieval stage for queued articles
//!
//! The harvester takes the newest item off the pending queue, fetches the
//! full article from the source that listed it, and stores it. Failures are
//! logged and the item is dropped; it will be rediscovered on a later cycle
//! since it never reached storage.

use crate::config::UserAgentConfig;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::queue::PendingQueue;
use crate::proxy::ProxyRotator;
use crate::source::Source;
use crate::storage::ArticleStore;
use crate::CrawlError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long to idle when the queue is empty
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one harvesting step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// The article behind this link was fetched and stored
    Stored(String),
    /// The queue was empty
    Idle,
}

/// Drains the pending queue into article storage
pub struct Harvester {
    queue: Arc<PendingQueue>,
    sources: HashMap<String, Arc<dyn Source>>,
    store: Arc<dyn ArticleStore>,
    rotator: Arc<ProxyRotator>,
    user_agent: Arc<UserAgentConfig>,
    poll_interval: Duration,
}

impl Harvester {
    pub fn new(
        queue: Arc<PendingQueue>,
        sources: Vec<Arc<dyn Source>>,
        store: Arc<dyn ArticleStore>,
        rotator: Arc<ProxyRotator>,
        user_agent: Arc<UserAgentConfig>,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.id().to_string(), source))
            .collect();

        Self {
            queue,
            sources,
            store,
            rotator,
            user_agent,
            poll_interval: IDLE_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Retrieves and stores the newest queued article
    ///
    /// The item is removed from the queue before it is fetched, so an error
    /// here means the item is gone from the queue.
    pub async fn harvest_next(&self) -> Result<HarvestOutcome, CrawlError> {
        let Some(item) = self.queue.remove_next() else {
            return Ok(HarvestOutcome::Idle);
        };

        let source = self
            .sources
            .get(&item.source_id)
            .ok_or_else(|| CrawlError::UnknownSource(item.source_id.clone()))?;

        let client = build_http_client(&self.user_agent, &self.rotator)?;
        let article = source.fetch(&client, &item.link).await?;
        self.store.store(&article).await?;

        tracing::debug!(source = %item.source_id, link = %item.link, "Stored article");
        Ok(HarvestOutcome::Stored(item.link))
    }

    /// Harvests until `cancel` fires
    ///
    /// A fetch in progress is abandoned when `cancel` fires; its item has
    /// already left the queue and is picked up again on a later cycle.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("Harvester started");
        let mut stored = 0u64;

        while !cancel.is_cancelled() {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                outcome = self.harvest_next() => outcome,
            };

            match outcome {
                Ok(HarvestOutcome::Stored(_)) => stored += 1,
                Ok(HarvestOutcome::Idle) => {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to harvest article"),
            }
        }

        tracing::info!(stored, pending = self.queue.len(), "Harvester stopped");
    }
}
