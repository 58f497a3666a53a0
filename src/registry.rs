use crate::fetcher::Fetcher;
use crate::sources::{SourceOverrides, TrendSource};
use tracing::{debug, warn};

/// Everything a source constructor may draw on.
pub struct SourceContext<'a> {
    pub fetcher: &'a Fetcher,
    pub credential: Option<&'a str>,
    pub overrides: &'a SourceOverrides,
}

type SourceConstructor = Box<dyn Fn(SourceContext<'_>) -> Box<dyn TrendSource> + Send + Sync>;

struct Registration {
    id: String,
    requires_credential: bool,
    constructor: SourceConstructor,
}

/// Ids used when the caller enables nothing explicitly.
pub const DEFAULT_SOURCES: [&str; 2] = ["twitter", "github"];

/// Maps short source ids (`github`, `twitter`) to constructors.
///
/// Owned by whoever builds collectors; there is no process-wide registry.
pub struct SourceRegistry {
    entries: Vec<Registration>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_builtin_sources()
    }
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_builtin_sources() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();

        #[cfg(feature = "twitter")]
        registry.register("twitter", true, |ctx| {
            Box::new(
                crate::sources::TwitterSource::new(
                    ctx.fetcher.clone(),
                    ctx.credential.map(String::from),
                )
                .with_overrides(&ctx.overrides.twitter),
            )
        });

        #[cfg(feature = "github")]
        registry.register("github", false, |ctx| {
            Box::new(
                crate::sources::GitHubSource::new(ctx.fetcher.clone())
                    .with_overrides(&ctx.overrides.github),
            )
        });

        registry
    }

    /// Register (or replace) a source constructor under `id`.
    pub fn register<F>(&mut self, id: impl Into<String>, requires_credential: bool, constructor: F)
    where
        F: Fn(SourceContext<'_>) -> Box<dyn TrendSource> + Send + Sync + 'static,
    {
        let id = id.into();
        self.entries.retain(|entry| entry.id != id);
        self.entries.push(Registration {
            id,
            requires_credential,
            constructor: Box::new(constructor),
        });
    }

    pub fn available(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Build live sources for `enabled`, in the given order.
    ///
    /// Unknown ids, and ids that need a credential when none (or an empty one)
    /// was supplied, are logged and skipped. An empty `enabled` list selects
    /// [`DEFAULT_SOURCES`].
    pub fn resolve(
        &self,
        enabled: &[String],
        credential: Option<&str>,
        fetcher: &Fetcher,
        overrides: &SourceOverrides,
    ) -> Vec<Box<dyn TrendSource>> {
        let credential = credential.filter(|c| !c.trim().is_empty());
        let requested: Vec<String> = if enabled.is_empty() {
            DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
        } else {
            enabled.to_vec()
        };

        let mut sources = Vec::with_capacity(requested.len());
        for id in &requested {
            let Some(entry) = self.entries.iter().find(|entry| &entry.id == id) else {
                warn!(source = %id, "Unknown source, skipping");
                continue;
            };

            if entry.requires_credential && credential.is_none() {
                warn!(source = %id, "Source requires an API key, skipping");
                continue;
            }

            let source = (entry.constructor)(SourceContext {
                fetcher,
                credential,
                overrides,
            });
            debug!(source = %id, name = %source.name(), "Source enabled");
            sources.push(source);
        }

        sources
    }
}
