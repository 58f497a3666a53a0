use crate::fetcher::Fetcher;
use crate::sources::{TrendSource, TwitterOverrides};
use crate::twitter_types::{SelaPost, SelaScrapeRequest, SelaScrapeResponse};
use crate::utils::{absolutize_url, take_chars};
use crate::{TrendError, TrendItem};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const SELA_SCRAPE_URL: &str = "https://api.selanetwork.io/api/rpc/scrapeUrl";
const X_BASE_URL: &str = "https://x.com";
const SCRAPE_TYPE: &str = "TWITTER_PROFILE";
const SCRAPE_TIMEOUT_MS: u64 = 60_000;
const SCROLL_PAUSE_MS: u64 = 2_000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const TITLE_CHARS: usize = 100;

/// Search terms are percent-encoded with spaces as `%20`, never `+`.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

pub const DEFAULT_QUERIES: [&str; 4] = ["AI agent", "developer tools", "tech meme", "viral app"];
pub const DEFAULT_POST_COUNT: usize = 5;

/// Top posts for a list of X searches, scraped through Sela.
pub struct TwitterSource {
    fetcher: Fetcher,
    api_key: Option<String>,
    endpoint: String,
    queries: Vec<String>,
    post_count: usize,
}

impl TwitterSource {
    pub const NAME: &'static str = "Twitter/X";

    pub fn new(fetcher: Fetcher, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            api_key,
            endpoint: SELA_SCRAPE_URL.to_string(),
            queries: DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect(),
            post_count: DEFAULT_POST_COUNT,
        }
    }

    pub fn with_overrides(mut self, overrides: &TwitterOverrides) -> Self {
        if let Some(endpoint) = &overrides.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(queries) = overrides.queries.as_ref().filter(|q| !q.is_empty()) {
            self.queries = queries.clone();
        }
        if let Some(count) = overrides.post_count {
            self.post_count = count;
        }
        self
    }

    pub fn with_queries(mut self, queries: Vec<String>) -> Self {
        self.queries = queries;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    fn search_url(query: &str) -> Result<Url, TrendError> {
        let q = utf8_percent_encode(query, QUERY_ENCODE_SET);
        Ok(Url::parse(&format!("{X_BASE_URL}/search?q={q}&f=top"))?)
    }

    fn scrape_request(&self, query: &str) -> Result<SelaScrapeRequest, TrendError> {
        Ok(SelaScrapeRequest {
            url: Self::search_url(query)?.to_string(),
            scrape_type: SCRAPE_TYPE.to_string(),
            timeout_ms: SCRAPE_TIMEOUT_MS,
            post_count: self.post_count,
            scroll_pause_time: SCROLL_PAUSE_MS,
        })
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<Vec<TrendItem>, TrendError> {
        let request = self.scrape_request(query)?;
        let response: SelaScrapeResponse = self
            .fetcher
            .post_json(
                "Sela",
                &self.endpoint,
                &request,
                Some(api_key),
                Some(REQUEST_TIMEOUT),
            )
            .await?;

        Ok(response
            .data
            .result
            .into_iter()
            .take(self.post_count)
            .map(|post| Self::to_item(query, post))
            .collect())
    }

    fn to_item(query: &str, post: SelaPost) -> TrendItem {
        let score = post.popularity();
        let content = post.content.unwrap_or_default();
        let url = absolutize_url(X_BASE_URL, post.tweet_url.as_deref().unwrap_or_default());

        TrendItem {
            source: format!("{} ({})", Self::NAME, query),
            title: take_chars(&content, TITLE_CHARS),
            url,
            score,
            description: Some(content).filter(|c| !c.is_empty()),
        }
    }
}

#[async_trait]
impl TrendSource for TwitterSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn requires_credential(&self) -> bool {
        true
    }

    async fn try_fetch(&self) -> Result<Vec<TrendItem>, TrendError> {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        // One query failing must not cost the results of the others.
        for query in &self.queries {
            match self.search(api_key, query).await {
                Ok(found) => {
                    debug!(source = %Self::NAME, query = %query, count = found.len(), "Search completed");
                    items.extend(found);
                }
                Err(e) => {
                    warn!(source = %Self::NAME, query = %query, error = %e, "Search failed");
                }
            }
        }

        Ok(items)
    }
}
