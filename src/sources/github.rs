use crate::fetcher::Fetcher;
use crate::github_types::{GitHubRepository, GitHubSearchResponse};
use crate::sources::{GitHubOverrides, TrendSource};
use crate::{TrendError, TrendItem};
use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use tracing::{debug, instrument};

pub const GITHUB_SEARCH_URL: &str = "https://api.github.com/search/repositories";
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const DEFAULT_MAX_RESULTS: usize = 10;

/// Repositories created since yesterday, most starred first.
pub struct GitHubSource {
    fetcher: Fetcher,
    endpoint: String,
    max_results: usize,
}

impl GitHubSource {
    pub const NAME: &'static str = "GitHub";

    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            endpoint: GITHUB_SEARCH_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_overrides(mut self, overrides: &GitHubOverrides) -> Self {
        if let Some(endpoint) = &overrides.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(max) = overrides.max_results {
            self.max_results = max;
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Search parameters for repositories created after `since`.
    fn search_params(&self, since: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("q", format!("created:>{}", since.format("%Y-%m-%d"))),
            ("sort", "stars".to_string()),
            ("order", "desc".to_string()),
            ("per_page", self.max_results.to_string()),
        ]
    }

    fn to_item(repo: GitHubRepository) -> TrendItem {
        TrendItem {
            source: Self::NAME.to_string(),
            title: repo.headline(),
            url: repo.html_url,
            score: Some(repo.stargazers_count),
            description: repo.description,
        }
    }
}

#[async_trait]
impl TrendSource for GitHubSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn try_fetch(&self) -> Result<Vec<TrendItem>, TrendError> {
        let yesterday = Local::now().date_naive() - Days::new(1);
        let params = self.search_params(yesterday);

        let response: GitHubSearchResponse = self
            .fetcher
            .get_json(Self::NAME, &self.endpoint, &params, Some(GITHUB_ACCEPT))
            .await?;

        debug!(
            total_count = response.total_count,
            returned = response.items.len(),
            "GitHub search completed"
        );

        Ok(response
            .items
            .into_iter()
            .take(self.max_results)
            .map(Self::to_item)
            .collect())
    }
}
