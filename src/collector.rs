use crate::fetcher::Fetcher;
use crate::registry::SourceRegistry;
use crate::sources::{SourceOverrides, TrendSource};
use crate::TrendItem;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    /// Source ids to enable, in output order. Empty selects the defaults.
    pub enabled_sources: Vec<String>,
    /// Sela credential for the X source.
    pub sela_api_key: Option<String>,
    pub overrides: SourceOverrides,
}

/// Runs every enabled source concurrently and concatenates what they return.
pub struct TrendCollector {
    fetcher: Fetcher,
    sources: Vec<Box<dyn TrendSource>>,
}

impl TrendCollector {
    pub fn new(config: CollectorConfig, registry: &SourceRegistry) -> Self {
        let fetcher = Fetcher::new();
        let sources = registry.resolve(
            &config.enabled_sources,
            config.sela_api_key.as_deref(),
            &fetcher,
            &config.overrides,
        );
        Self::from_sources(fetcher, sources)
    }

    pub fn from_sources(fetcher: Fetcher, sources: Vec<Box<dyn TrendSource>>) -> Self {
        info!(
            sources = ?sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "Trend collector ready"
        );
        Self { fetcher, sources }
    }

    pub fn enabled_sources(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Fetch from every source at once and wait for all of them.
    ///
    /// Items come back grouped by source, in source order. A source that
    /// panics is logged and contributes nothing.
    #[instrument(level = "debug", skip(self), fields(sources = self.sources.len()))]
    pub async fn collect(&self) -> Vec<TrendItem> {
        if self.sources.is_empty() {
            warn!("No sources enabled");
            return Vec::new();
        }

        let tasks = self
            .sources
            .iter()
            .map(|source| AssertUnwindSafe(source.fetch()).catch_unwind());
        let results = join_all(tasks).await;

        let mut items = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(found) => {
                    debug!(source = %source.name(), count = found.len(), "Collected");
                    items.extend(found);
                }
                Err(panic) => {
                    error!("Error in {}: {}", source.name(), panic_message(&*panic));
                }
            }
        }

        info!(total = items.len(), "Collected trends");
        items
    }

    /// Release the sources and the shared HTTP client.
    pub fn close(self) {
        let names = self.enabled_sources().join(", ");
        drop(self.sources);
        drop(self.fetcher);
        debug!(sources = %names, "Trend collector closed");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
