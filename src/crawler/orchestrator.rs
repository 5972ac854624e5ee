//! Crawl orchestration - the periodic discovery loop
//!
//! Each cycle the orchestrator:
//! 1. Sleeps a randomized interval (interrupted by pool cancellation)
//! 2. Logs the errors collected from the previous cycle's jobs
//! 3. Waits for admission and submits one discovery job per source
//!
//! A discovery job lists the source's index through a freshly built client,
//! checks every link against the repository, and queues the unknown ones.
//! Any listing or lookup failure aborts that job only.

use crate::config::{Config, IntervalRange, UserAgentConfig, DEFAULT_RUN_INTERVAL_RANGE};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::harvester::Harvester;
use crate::crawler::queue::PendingQueue;
use crate::models::DiscoveredItem;
use crate::proxy::ProxyRotator;
use crate::source::Source;
use crate::storage::{ArticleStore, Repository};
use crate::sync::{PoolError, TaskPool};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs periodic discovery jobs across all configured sources
pub struct CrawlOrchestrator {
    pool: TaskPool<CrawlError>,
    sources: Vec<Arc<dyn Source>>,
    repository: Arc<dyn Repository>,
    rotator: Arc<ProxyRotator>,
    queue: Arc<PendingQueue>,
    interval: IntervalRange,
    user_agent: Arc<UserAgentConfig>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator with an unlimited pool, direct transport and
    /// the default interval
    pub fn new(
        sources: Vec<Arc<dyn Source>>,
        repository: Arc<dyn Repository>,
        user_agent: UserAgentConfig,
    ) -> Self {
        Self {
            pool: TaskPool::new(),
            sources,
            repository,
            rotator: Arc::new(ProxyRotator::direct()),
            queue: Arc::new(PendingQueue::new()),
            interval: IntervalRange::new(DEFAULT_RUN_INTERVAL_RANGE[0], DEFAULT_RUN_INTERVAL_RANGE[1]),
            user_agent: Arc::new(user_agent),
        }
    }

    /// Creates an orchestrator from a validated configuration
    pub fn from_config(
        config: &Config,
        sources: Vec<Arc<dyn Source>>,
        repository: Arc<dyn Repository>,
    ) -> Result<Self, CrawlError> {
        let rotator = ProxyRotator::from_strs(config.proxy.effective_endpoints())?;
        tracing::info!(proxies = rotator.len(), "Proxy rotation configured");

        Ok(Self::new(sources, repository, config.user_agent.clone())
            .with_pool(TaskPool::with_limit(config.crawler.max_thread_count))
            .with_rotator(rotator)
            .with_interval(config.crawler.interval()))
    }

    pub fn with_pool(mut self, pool: TaskPool<CrawlError>) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_rotator(mut self, rotator: ProxyRotator) -> Self {
        self.rotator = Arc::new(rotator);
        self
    }

    pub fn with_interval(mut self, interval: IntervalRange) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_queue(mut self, queue: Arc<PendingQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn pool(&self) -> &TaskPool<CrawlError> {
        &self.pool
    }

    pub fn queue(&self) -> Arc<PendingQueue> {
        Arc::clone(&self.queue)
    }

    /// Builds the retrieval stage for this orchestrator's queue and sources
    pub fn harvester(&self, store: Arc<dyn ArticleStore>) -> Harvester {
        Harvester::new(
            Arc::clone(&self.queue),
            self.sources.clone(),
            store,
            Arc::clone(&self.rotator),
            Arc::clone(&self.user_agent),
        )
    }

    /// Runs the crawl loop until the pool is killed
    ///
    /// Starts the pool if needed. Once the pool dies the loop stops
    /// dispatching, waits for admitted jobs to finish, and returns.
    pub async fn run(&self) -> Result<(), CrawlError> {
        match self.pool.start() {
            Ok(()) | Err(PoolError::AlreadyStarted) | Err(PoolError::Dying) => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            sources = self.sources.len(),
            limit = self.pool.limit(),
            min_secs = self.interval.min,
            max_secs = self.interval.max,
            "Starting crawl loop"
        );

        loop {
            let pause = self.interval.sample();
            tracing::debug!(sleep_secs = pause.as_secs(), "Sleeping until next cycle");

            tokio::select! {
                biased;
                () = self.pool.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }

            self.report_errors();

            match self.dispatch().await {
                Ok(_) => {}
                Err(PoolError::Dying) => break,
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            reason = self.pool.kill_reason().as_deref().unwrap_or("unknown"),
            in_flight = self.pool.in_flight(),
            "Crawl loop stopping, draining jobs"
        );
        self.pool.wait().await;
        self.report_errors();

        tracing::info!(pending = self.queue.len(), "Crawl loop stopped");
        Ok(())
    }

    /// Submits one discovery job per source
    ///
    /// Waits for a free slot before each submission. Returns the number of
    /// jobs submitted, or `PoolError::Dying` if the pool died mid-cycle.
    pub async fn dispatch(&self) -> Result<usize, PoolError> {
        let cycle_started = Utc::now();
        let mut submitted = 0;

        for source in &self.sources {
            self.pool.await_admission().await;

            let job = DiscoveryJob {
                source: Arc::clone(source),
                repository: Arc::clone(&self.repository),
                rotator: Arc::clone(&self.rotator),
                queue: Arc::clone(&self.queue),
                user_agent: Arc::clone(&self.user_agent),
                cancel: self.pool.cancellation_signal(),
                cycle_started,
            };

            self.pool.submit(job.run())?;
            submitted += 1;

            tracing::info!(
                source = source.id(),
                in_flight = self.pool.in_flight(),
                "Dispatched discovery job"
            );
        }

        Ok(submitted)
    }

    /// Logs and clears the errors collected since the last call
    fn report_errors(&self) {
        let errors = self.pool.take_errors();
        if errors.is_empty() {
            return;
        }

        tracing::warn!(failed = errors.len(), "Discovery jobs failed since last cycle");
        for error in &errors {
            tracing::warn!(error = %error, "Collected job error");
        }
    }
}

/// One source's discovery work for one cycle
struct DiscoveryJob {
    source: Arc<dyn Source>,
    repository: Arc<dyn Repository>,
    rotator: Arc<ProxyRotator>,
    queue: Arc<PendingQueue>,
    user_agent: Arc<UserAgentConfig>,
    cancel: CancellationToken,
    /// Substituted for listings without a publication time
    cycle_started: DateTime<Utc>,
}

impl DiscoveryJob {
    async fn run(self) -> Result<(), CrawlError> {
        let source_id = self.source.id().to_string();
        let result = self.discover().await;

        match &result {
            Ok(discovered) => {
                tracing::info!(source = %source_id, discovered, "Discovery job finished");
            }
            Err(e) => {
                tracing::warn!(source = %source_id, error = %e, "Discovery job failed");
            }
        }

        result.map(|_| ())
    }

    async fn discover(&self) -> Result<usize, CrawlError> {
        let client = build_http_client(&self.user_agent, &self.rotator)?;
        let listing = self.source.list_current(&client).await?;

        let mut discovered = 0;
        for item in listing {
            if self.cancel.is_cancelled() {
                tracing::info!(source = self.source.id(), "Stopping discovery early: pool is dying");
                break;
            }

            if self.repository.exists(&item.link).await? {
                tracing::trace!(link = %item.link, "Already known");
                continue;
            }

            let published_at = item.published_at.unwrap_or(self.cycle_started);
            self.queue
                .insert(DiscoveredItem::new(self.source.id(), item.link, published_at));
            discovered += 1;
        }

        Ok(discovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FullArticle;
    use crate::source::ListingItem;
    use crate::storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use reqwest::Client;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct StaticSource {
        id: String,
        listing: Vec<ListingItem>,
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(id: &str, links: &[&str]) -> Self {
            Self {
                id: id.to_string(),
                listing: links.iter().map(|l| ListingItem::new(*l, None)).collect(),
                failures_left: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_first(mut self, failures: usize) -> Self {
            self.failures_left = AtomicUsize::new(failures);
            self
        }
    }

    #[async_trait]
    impl Source for StaticSource {
        fn id(&self) -> &str {
            &self.id
        }

        async fn list_current(&self, _client: &Client) -> Result<Vec<ListingItem>, CrawlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let should_fail = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

            if should_fail {
                return Err(CrawlError::SourceUnavailable {
                    source_id: self.id.clone(),
                    url: "https://unavailable.example.com/".to_string(),
                    status: 503,
                });
            }
            Ok(self.listing.clone())
        }

        async fn fetch(&self, _client: &Client, link: &str) -> Result<FullArticle, CrawlError> {
            Err(CrawlError::UnknownSource(link.to_string()))
        }
    }

    #[derive(Default)]
    struct KnownLinks {
        known: Mutex<HashSet<String>>,
        broken: bool,
    }

    impl KnownLinks {
        fn with(links: &[&str]) -> Self {
            Self {
                known: Mutex::new(links.iter().map(|l| l.to_string()).collect()),
                broken: false,
            }
        }
    }

    #[async_trait]
    impl Repository for KnownLinks {
        async fn exists(&self, link: &str) -> StorageResult<bool> {
            if self.broken {
                return Err(StorageError::InvalidValue {
                    column: "link",
                    value: link.to_string(),
                });
            }
            Ok(self.known.lock().unwrap().contains(link))
        }
    }

    fn user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn orchestrator(
        sources: Vec<Arc<dyn Source>>,
        repository: Arc<dyn Repository>,
    ) -> CrawlOrchestrator {
        let orchestrator = CrawlOrchestrator::new(sources, repository, user_agent())
            .with_pool(TaskPool::with_limit(2))
            .with_interval(IntervalRange::new(0, 0));
        orchestrator.pool().start().unwrap();
        orchestrator
    }

    #[tokio::test]
    async fn test_known_links_are_skipped() {
        let source: Arc<dyn Source> = Arc::new(StaticSource::new("news", &["A", "B"]));
        let orchestrator = orchestrator(vec![source], Arc::new(KnownLinks::with(&["A"])));

        assert_eq!(orchestrator.dispatch().await.unwrap(), 1);
        orchestrator.pool().wait().await;

        let queued = orchestrator.queue().snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].link, "B");
        assert_eq!(queued[0].source_id, "news");
        assert!(orchestrator.pool().take_errors().is_empty());
    }

    #[tokio::test]
    async fn test_missing_publication_time_uses_cycle_start() {
        let published = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let source = StaticSource {
            listing: vec![
                ListingItem::new("old", Some(published)),
                ListingItem::new("undated", None),
            ],
            ..StaticSource::new("news", &[])
        };

        let before = Utc::now();
        let sources: Vec<Arc<dyn Source>> = vec![Arc::new(source)];
        let orchestrator = orchestrator(sources, Arc::new(KnownLinks::default()));
        orchestrator.dispatch().await.unwrap();
        orchestrator.pool().wait().await;

        let queue = orchestrator.queue();
        let head = queue.remove_next().unwrap();
        assert_eq!(head.link, "undated");
        assert!(head.published_at >= before);
        assert_eq!(queue.remove_next().unwrap().published_at, published);
    }

    #[tokio::test]
    async fn test_repository_failure_aborts_job() {
        let source: Arc<dyn Source> = Arc::new(StaticSource::new("news", &["A", "B"]));
        let repository = KnownLinks {
            broken: true,
            ..KnownLinks::default()
        };
        let orchestrator = orchestrator(vec![source], Arc::new(repository));

        orchestrator.dispatch().await.unwrap();
        orchestrator.pool().wait().await;

        assert!(orchestrator.queue().is_empty());
        let errors = orchestrator.pool().take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CrawlError::RepositoryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_failing_source_does_not_block_healthy_source() {
        let flaky = Arc::new(StaticSource::new("flaky", &["F"]).failing_first(1));
        let healthy = Arc::new(StaticSource::new("healthy", &["H"]));
        let sources: Vec<Arc<dyn Source>> = vec![flaky.clone(), healthy.clone()];
        let orchestrator = orchestrator(sources, Arc::new(KnownLinks::default()));

        assert_eq!(orchestrator.dispatch().await.unwrap(), 2);
        orchestrator.pool().wait().await;
        let errors = orchestrator.pool().take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CrawlError::SourceUnavailable { status: 503, .. }));

        assert_eq!(orchestrator.dispatch().await.unwrap(), 2);
        orchestrator.pool().wait().await;
        assert!(orchestrator.pool().take_errors().is_empty());

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 2);

        let mut links: Vec<_> = orchestrator
            .queue()
            .snapshot()
            .into_iter()
            .map(|i| i.link)
            .collect();
        links.sort();
        assert_eq!(links, vec!["F", "H", "H"]);
    }

    #[tokio::test]
    async fn test_dispatch_fails_when_pool_is_dying() {
        let source: Arc<dyn Source> = Arc::new(StaticSource::new("news", &["A"]));
        let orchestrator = orchestrator(vec![source], Arc::new(KnownLinks::default()));

        orchestrator.pool().kill("test").unwrap();
        assert_eq!(orchestrator.dispatch().await, Err(PoolError::Dying));
    }

    #[tokio::test]
    async fn test_run_stops_after_kill() {
        let source = Arc::new(StaticSource::new("news", &["A"]));
        let orchestrator = Arc::new(orchestrator(
            vec![source.clone() as Arc<dyn Source>],
            Arc::new(KnownLinks::default()),
        ));

        let runner = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.run().await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            while source.calls.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop should keep dispatching");

        orchestrator.pool().kill("test shutdown").unwrap();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("run should return after kill")
            .unwrap()
            .unwrap();

        assert_eq!(orchestrator.pool().in_flight(), 0);
        assert!(!orchestrator.queue().is_empty());
    }

    #[tokio::test]
    async fn test_run_interrupts_long_sleep() {
        let source: Arc<dyn Source> = Arc::new(StaticSource::new("news", &["A"]));
        let orchestrator = Arc::new(
            orchestrator(vec![source], Arc::new(KnownLinks::default()))
                .with_interval(IntervalRange::new(3600, 3600)),
        );

        let runner = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.run().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.pool().kill("shutdown").unwrap();

        tokio::time::timeout(Duration::from_secs(1), runner)
            .await
            .expect("sleep must be interruptible")
            .unwrap()
            .unwrap();
        assert!(orchestrator.queue().is_empty());
    }
}
