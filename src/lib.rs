//! Daily tech-trend collection and project-idea generation.
//!
//! Sources (GitHub, X via Sela) are fanned out concurrently by a
//! [`TrendCollector`], the merged items are condensed into a digest for an
//! [`IdeaGenerator`], and the resulting [`AnalysisResult`] is handed to a
//! [`Delivery`] target. With Telegram, chats can also ask for a round with
//! `/idea` ([`TelegramCommands`]).

mod analysis;
mod collector;
mod commands;
mod config;
mod delivery;
mod error;
mod fetcher;
#[cfg(feature = "github")]
mod github_types;
mod idea_generator;
mod llm_config;
mod llm_providers;
#[cfg(feature = "logging")]
mod logging;
mod registry;
mod service;
pub mod sources;
mod telegram_types;
#[cfg(feature = "twitter")]
mod twitter_types;
mod utils;

pub use analysis::{AnalysisResult, Difficulty, IdeaSuggestion};
pub use collector::{CollectorConfig, TrendCollector};
pub use commands::{BotCommand, ChatCommand, CommandInbox, TelegramCommands};
pub use config::{AppConfig, ScheduleTime, TelegramSettings};
pub use delivery::{
    format_error_message, format_help_message, format_idea_message, format_startup_message,
    format_status_message, format_welcome_message, Delivery, StdoutDelivery, TelegramDelivery,
    IDEA_ACK_MESSAGE, NOTHING_COLLECTED_MESSAGE, SCHEDULED_FAILURE_PREFIX,
};
pub use error::TrendError;
pub use fetcher::{Fetcher, FetcherConfig};
pub use idea_generator::{
    format_digest, DigestLimits, IdeaGenerator, IdeaGeneratorConfig, LLMProvider,
};
pub use llm_config::{ApiKeyValidator, LLMConfig, LlmBackend, LlmSettings};
pub use llm_providers::{GeminiProvider, MockProvider};
#[cfg(feature = "llm")]
pub use llm_providers::openai::OpenAIProvider;
#[cfg(feature = "logging")]
pub use logging::{log_idea_card, setup_logging, LogConfig};
pub use registry::{SourceContext, SourceRegistry, DEFAULT_SOURCES};
pub use service::{next_run_after, DailyIdeaService, ServiceConfig};
pub use sources::{SourceOverrides, TrendSource};
pub use utils::truncate_str;

/// One trending artifact observed by a source.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrendItem {
    /// Origin label, optionally qualified, e.g. `Twitter/X (AI agent)`.
    pub source: String,
    pub title: String,
    pub url: String,
    /// Stars, likes or views. Not comparable across sources.
    pub score: Option<u64>,
    pub description: Option<String>,
}

impl TrendItem {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            url: url.into(),
            score: None,
            description: None,
        }
    }

    pub fn with_score(mut self, score: u64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
