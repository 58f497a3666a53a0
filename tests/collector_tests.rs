mod common;

use async_trait::async_trait;
use common::{Route, StubServer};
use std::time::Duration;
use trend_ideas::sources::{GitHubOverrides, TwitterOverrides};
use trend_ideas::{
    CollectorConfig, Fetcher, SourceOverrides, SourceRegistry, TrendCollector, TrendError,
    TrendItem, TrendSource,
};

struct Fixed {
    name: &'static str,
    count: usize,
    delay: Duration,
}

#[async_trait]
impl TrendSource for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    async fn try_fetch(&self) -> Result<Vec<TrendItem>, TrendError> {
        tokio::time::sleep(self.delay).await;
        Ok((0..self.count)
            .map(|i| TrendItem::new(self.name, format!("{} #{i}", self.name), "https://example.com"))
            .collect())
    }
}

struct Exploding;

#[async_trait]
impl TrendSource for Exploding {
    fn name(&self) -> &str {
        "Exploding"
    }

    async fn try_fetch(&self) -> Result<Vec<TrendItem>, TrendError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        panic!("parser blew up");
    }
}

struct Failing;

#[async_trait]
impl TrendSource for Failing {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn try_fetch(&self) -> Result<Vec<TrendItem>, TrendError> {
        Err(TrendError::external("Failing", "connection refused"))
    }
}

fn fixed(name: &'static str, count: usize, delay_ms: u64) -> Box<dyn TrendSource> {
    Box::new(Fixed {
        name,
        count,
        delay: Duration::from_millis(delay_ms),
    })
}

#[tokio::test]
async fn test_collect_keeps_source_order_despite_timing() {
    // The slow source finishes last but its items still come first.
    let collector = TrendCollector::from_sources(
        Fetcher::new(),
        vec![fixed("Slow", 2, 50), fixed("Fast", 3, 0)],
    );

    let items = collector.collect().await;
    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Slow #0", "Slow #1", "Fast #0", "Fast #1", "Fast #2"]
    );
    collector.close();
}

#[tokio::test]
async fn test_collect_isolates_panics_and_failures() {
    let collector = TrendCollector::from_sources(
        Fetcher::new(),
        vec![
            fixed("First", 2, 10),
            Box::new(Exploding),
            Box::new(Failing),
            fixed("Last", 1, 0),
        ],
    );

    assert_eq!(
        collector.enabled_sources(),
        vec!["First", "Exploding", "Failing", "Last"]
    );

    let items = collector.collect().await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].source, "First");
    assert_eq!(items[1].source, "First");
    assert_eq!(items[2].source, "Last");
    collector.close();
}

#[tokio::test(start_paused = true)]
async fn test_collect_runs_sources_concurrently() {
    let collector = TrendCollector::from_sources(
        Fetcher::new(),
        vec![fixed("A", 1, 1_000), fixed("B", 1, 1_000), fixed("C", 1, 1_000)],
    );

    let start = tokio::time::Instant::now();
    let items = collector.collect().await;
    assert_eq!(items.len(), 3);
    assert!(start.elapsed() < Duration::from_millis(1_500));
}

#[tokio::test]
async fn test_collect_with_no_sources() {
    let collector = TrendCollector::new(
        CollectorConfig {
            enabled_sources: vec!["rss".into(), "hackernews".into()],
            ..Default::default()
        },
        &SourceRegistry::with_builtin_sources(),
    );
    assert!(collector.enabled_sources().is_empty());
    assert!(collector.collect().await.is_empty());
}

#[tokio::test]
async fn test_empty_sela_key_drops_twitter() {
    let registry = SourceRegistry::with_builtin_sources();

    for key in [None, Some(String::new())] {
        let collector = TrendCollector::new(
            CollectorConfig {
                enabled_sources: vec!["twitter".into(), "github".into()],
                sela_api_key: key,
                ..Default::default()
            },
            &registry,
        );
        assert_eq!(collector.enabled_sources(), vec!["GitHub"]);
    }
}

#[tokio::test]
async fn test_registered_source_is_resolvable() {
    let mut registry = SourceRegistry::with_builtin_sources();
    registry.register("static", false, |_| fixed("Static", 4, 0));

    let collector = TrendCollector::new(
        CollectorConfig {
            enabled_sources: vec!["static".into(), "unknown".into()],
            ..Default::default()
        },
        &registry,
    );
    assert_eq!(collector.enabled_sources(), vec!["Static"]);
    assert_eq!(collector.collect().await.len(), 4);
}

#[tokio::test]
async fn test_end_to_end_with_stub_upstreams() {
    let server = StubServer::start(vec![
        Route::new(
            "/search/repositories",
            200,
            serde_json::json!({
                "items": [{
                    "full_name": "octo/agent",
                    "language": "Rust",
                    "html_url": "https://github.com/octo/agent",
                    "stargazers_count": 42,
                    "description": null
                }]
            })
            .to_string(),
        ),
        Route::new(
            "scrapeUrl",
            200,
            r#"{"data":{"result":[{"tweetUrl":"/a/status/1","content":"hello","likesCount":3}]}}"#,
        ),
    ])
    .await;

    let overrides = SourceOverrides {
        github: GitHubOverrides {
            endpoint: Some(server.url("/search/repositories")),
            ..Default::default()
        },
        twitter: TwitterOverrides {
            endpoint: Some(server.url("/api/rpc/scrapeUrl")),
            queries: Some(vec!["rust".into()]),
            post_count: Some(1),
        },
    };

    let collector = TrendCollector::new(
        CollectorConfig {
            enabled_sources: vec![],
            sela_api_key: Some("sela-key".into()),
            overrides,
        },
        &SourceRegistry::with_builtin_sources(),
    );
    assert_eq!(collector.enabled_sources(), vec!["Twitter/X", "GitHub"]);

    let items = collector.collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source, "Twitter/X (rust)");
    assert_eq!(items[0].score, Some(3));
    assert_eq!(items[1].source, "GitHub");
    assert_eq!(items[1].title, "octo/agent - Rust");

    let requests = server.requests();
    assert!(requests
        .iter()
        .any(|r| r.contains(r#""postcount":1"#)));
    collector.close();
}
