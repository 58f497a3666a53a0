//! Trend sources
//!
//! A source turns one upstream (GitHub search, X search via Sela, ...) into a
//! list of [`TrendItem`]s. Sources are independent: a failing source logs and
//! yields nothing, it never takes its siblings down with it.

use crate::{TrendError, TrendItem};
use async_trait::async_trait;
use tracing::{debug, warn};

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "twitter")]
pub mod twitter;

#[cfg(feature = "github")]
pub use github::GitHubSource;
#[cfg(feature = "twitter")]
pub use twitter::TwitterSource;

#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Label used in logs and as the default `TrendItem::source`.
    fn name(&self) -> &str;

    /// Whether this source can only run with an API credential.
    fn requires_credential(&self) -> bool {
        false
    }

    /// Fetch trends, surfacing any upstream failure.
    async fn try_fetch(&self) -> Result<Vec<TrendItem>, TrendError>;

    /// Fetch trends; failures are logged and turn into an empty list.
    async fn fetch(&self) -> Vec<TrendItem> {
        match self.try_fetch().await {
            Ok(items) => {
                debug!(source = %self.name(), count = items.len(), "Source fetched");
                items
            }
            Err(e) => {
                warn!(source = %self.name(), error = %e, "Source fetch failed");
                Vec::new()
            }
        }
    }
}

/// Per-source settings that differ from the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    pub github: GitHubOverrides,
    pub twitter: TwitterOverrides,
}

#[derive(Debug, Clone, Default)]
pub struct GitHubOverrides {
    pub endpoint: Option<String>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct TwitterOverrides {
    pub endpoint: Option<String>,
    pub queries: Option<Vec<String>>,
    pub post_count: Option<usize>,
}
