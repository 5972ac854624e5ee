//! Integration tests for the crawler
//!
//! These tests use wiremock to serve index and article pages and run
//! discovery and retrieval end-to-end against a temporary SQLite database.

use news_ripple::config::{parse_config, UserAgentConfig};
use news_ripple::crawler::{build_http_client, CrawlOrchestrator, HarvestOutcome};
use news_ripple::source::{HttpSource, ListingRules, Source};
use news_ripple::storage::{ArticleStore, SqliteRepository};
use news_ripple::sync::TaskPool;
use news_ripple::{CrawlError, ProxyRotator};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_HTML: &str = r#"
<html><body>
  <ul>
    <li class="story">
      <a href="/news/older">Older story</a>
      <time datetime="2024-05-01T08:00:00Z">8:00</time>
    </li>
    <li class="story">
      <a href="/news/newer#comments">Newer story</a>
      <time datetime="2024-05-01T10:00:00Z">10:00</time>
    </li>
    <li class="story">
      <a href="/news/older">Older story, again</a>
    </li>
  </ul>
</body></html>
"#;

fn article_html(title: &str) -> String {
    format!(
        r#"<html><head>
  <meta property="og:title" content="{title}">
  <meta name="description" content="About {title}">
  <meta property="article:published_time" content="2024-05-01T08:00:00Z">
</head><body><article>
  <h2>Section</h2>
  <p>Body of {title}.</p>
</article></body></html>"#
    )
}

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn http_source(id: &str, server: &MockServer) -> HttpSource {
    let index_url = Url::parse(&format!("{}/index", server.uri())).unwrap();
    let rules = ListingRules::new("li.story", Some("time"), None).unwrap();
    HttpSource::new(id, index_url, rules)
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INDEX_HTML))
        .mount(server)
        .await;

    for (page, title) in [("/news/older", "Older story"), ("/news/newer", "Newer story")] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(ResponseTemplate::new(200).set_body_string(article_html(title)))
            .mount(server)
            .await;
    }
}

fn client() -> reqwest::Client {
    build_http_client(&user_agent(), &ProxyRotator::direct()).unwrap()
}

fn temp_repository() -> (TempDir, Arc<SqliteRepository>) {
    let dir = TempDir::new().unwrap();
    let repository = SqliteRepository::open(&dir.path().join("articles.db")).unwrap();
    (dir, Arc::new(repository))
}

#[tokio::test]
async fn test_http_source_lists_index() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let source = http_source("mock", &server);
    let items = source.list_current(&client()).await.unwrap();

    let links: Vec<_> = items.iter().map(|i| i.link.clone()).collect();
    assert_eq!(
        links,
        vec![
            format!("{}/news/older", server.uri()),
            format!("{}/news/newer", server.uri()),
        ]
    );
    assert!(items.iter().all(|i| i.published_at.is_some()));
}

#[tokio::test]
async fn test_http_source_reports_unavailable_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = http_source("mock", &server);
    let result = source.list_current(&client()).await;

    match result {
        Err(CrawlError::SourceUnavailable {
            source_id, status, ..
        }) => {
            assert_eq!(source_id, "mock");
            assert_eq!(status, 503);
        }
        other => panic!("expected SourceUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_source_fetches_article() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let source = http_source("mock", &server);
    let link = format!("{}/news/newer", server.uri());
    let article = source.fetch(&client(), &link).await.unwrap();

    assert_eq!(article.source, "mock");
    assert_eq!(article.link, link);
    assert_eq!(article.headline, "Newer story");
    assert_eq!(article.description, "About Newer story");
    assert!(article.published_at.is_some());
    assert!(!article.contents.is_empty());
}

#[tokio::test]
async fn test_discovery_and_retrieval_cycle() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let (_dir, repository) = temp_repository();

    let source: Arc<dyn Source> = Arc::new(http_source("mock", &server));
    let orchestrator = CrawlOrchestrator::new(vec![source], repository.clone(), user_agent())
        .with_pool(TaskPool::with_limit(2));
    orchestrator.pool().start().unwrap();

    assert_eq!(orchestrator.dispatch().await.unwrap(), 1);
    orchestrator.pool().wait().await;
    assert!(orchestrator.pool().take_errors().is_empty());

    let queue = orchestrator.queue();
    assert_eq!(queue.len(), 2);
    assert_eq!(
        queue.peek().unwrap().link,
        format!("{}/news/newer", server.uri())
    );

    let harvester = orchestrator.harvester(repository.clone());
    let mut stored = Vec::new();
    while let HarvestOutcome::Stored(link) = harvester.harvest_next().await.unwrap() {
        stored.push(link);
    }

    assert_eq!(
        stored,
        vec![
            format!("{}/news/newer", server.uri()),
            format!("{}/news/older", server.uri()),
        ]
    );
    assert_eq!(repository.count_articles().unwrap(), 2);
    assert_eq!(
        repository.count_by_source().unwrap(),
        vec![("mock".to_string(), 2)]
    );
}

#[tokio::test]
async fn test_known_articles_are_not_requeued() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let (_dir, repository) = temp_repository();

    let source = http_source("mock", &server);
    let known = source
        .fetch(&client(), &format!("{}/news/older", server.uri()))
        .await
        .unwrap();
    repository.store(&known).await.unwrap();

    let sources: Vec<Arc<dyn Source>> = vec![Arc::new(source)];
    let orchestrator = CrawlOrchestrator::new(sources, repository.clone(), user_agent());
    orchestrator.pool().start().unwrap();
    orchestrator.dispatch().await.unwrap();
    orchestrator.pool().wait().await;

    let queued = orchestrator.queue().snapshot();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].link, format!("{}/news/newer", server.uri()));
    assert_eq!(queued[0].source_id, "mock");
}

#[tokio::test]
async fn test_orchestrator_from_config() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("articles.db");

    let config = parse_config(&format!(
        r#"
[crawler]
max-thread-count = 1
random-run-interval-range = [0, 0]

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[storage]
database-path = "{db}"

[[source]]
id = "mock"
index-url = "{base}/index"
item-selector = "li.story"
time-selector = "time"

[[source]]
id = "broken"
index-url = "{base}/missing"
item-selector = "a"
"#,
        db = db_path.display(),
        base = server.uri(),
    ))
    .unwrap();

    let repository = Arc::new(SqliteRepository::open(&db_path).unwrap());
    let sources = config
        .sources
        .iter()
        .map(|entry| Arc::new(HttpSource::from_config(entry).unwrap()) as Arc<dyn Source>)
        .collect();

    let orchestrator = CrawlOrchestrator::from_config(&config, sources, repository).unwrap();
    assert_eq!(orchestrator.pool().limit(), 1);

    orchestrator.pool().start().unwrap();
    assert_eq!(orchestrator.dispatch().await.unwrap(), 2);
    orchestrator.pool().wait().await;

    let errors = orchestrator.pool().take_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        CrawlError::SourceUnavailable { source_id, status: 404, .. } if source_id == "broken"
    ));
    assert_eq!(orchestrator.queue().len(), 2);
}
