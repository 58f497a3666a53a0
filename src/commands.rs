//! Chat commands (`/start`, `/help`, `/idea`, `/status`) received through
//! Telegram long polling.

use crate::delivery::TELEGRAM_API_BASE;
use crate::telegram_types::{GetUpdates, TelegramResponse, Update};
use crate::{Fetcher, TrendError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(25);
/// Slack on top of the long-poll window before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);
const ALLOWED_UPDATES: &[&str] = &["message"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Idea,
    Status,
}

impl BotCommand {
    /// Reads the leading `/command` (optionally `/command@bot_name`) of a
    /// message. Anything else, including unknown commands, is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or_default();

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(BotCommand::Start),
            "help" => Some(BotCommand::Help),
            "idea" => Some(BotCommand::Idea),
            "status" => Some(BotCommand::Status),
            _ => None,
        }
    }
}

/// A command together with the chat it must be answered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommand {
    pub chat_id: String,
    pub command: BotCommand,
}

/// Source of chat commands for the daily loop.
#[async_trait]
pub trait CommandInbox: Send + Sync {
    /// Wait for the next batch of commands. May block for a long-poll window
    /// and return an empty batch.
    async fn next_commands(&self) -> Result<Vec<ChatCommand>, TrendError>;

    /// Forget anything queued before the service started.
    async fn skip_pending(&self) -> Result<(), TrendError> {
        Ok(())
    }
}

/// Telegram `getUpdates` poller. Each batch advances the offset, so every
/// update is seen once.
pub struct TelegramCommands {
    fetcher: Fetcher,
    bot_token: String,
    endpoint: String,
    poll_timeout: Duration,
    offset: AtomicI64,
}

impl TelegramCommands {
    pub fn new(fetcher: Fetcher, bot_token: impl Into<String>) -> Self {
        Self {
            fetcher,
            bot_token: bot_token.into(),
            endpoint: TELEGRAM_API_BASE.to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            offset: AtomicI64::new(0),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    fn get_updates_url(&self) -> String {
        format!(
            "{}/bot{}/getUpdates",
            self.endpoint.trim_end_matches('/'),
            self.bot_token
        )
    }

    async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TrendError> {
        let body = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        let request = self
            .fetcher
            .client()
            .post(self.get_updates_url())
            .timeout(timeout + POLL_GRACE)
            .json(&body);

        let response: TelegramResponse<Vec<Update>> = self
            .fetcher
            .send_json("Telegram", request)
            .await
            .map_err(|e| match e {
                TrendError::Http(e) => TrendError::Http(e.without_url()),
                other => other,
            })?;

        if !response.ok {
            return Err(TrendError::external(
                "Telegram",
                response.description.unwrap_or_else(|| "getUpdates failed".into()),
            ));
        }
        Ok(response.result.unwrap_or_default())
    }

    fn advance_past(&self, updates: &[Update]) {
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.fetch_max(last + 1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl CommandInbox for TelegramCommands {
    #[instrument(level = "debug", skip(self))]
    async fn next_commands(&self) -> Result<Vec<ChatCommand>, TrendError> {
        let updates = self
            .get_updates(self.offset.load(Ordering::SeqCst), self.poll_timeout)
            .await?;
        self.advance_past(&updates);

        let commands: Vec<ChatCommand> = updates
            .into_iter()
            .filter_map(|update| {
                let message = update.message?;
                let command = BotCommand::parse(message.text.as_deref()?)?;
                Some(ChatCommand {
                    chat_id: message.chat.id.to_string(),
                    command,
                })
            })
            .collect();

        if !commands.is_empty() {
            debug!(count = commands.len(), "Received chat commands");
        }
        Ok(commands)
    }

    async fn skip_pending(&self) -> Result<(), TrendError> {
        // Offset -1 returns only the newest update; confirming past it drops the rest.
        let latest = self.get_updates(-1, Duration::ZERO).await?;
        self.advance_past(&latest);
        debug!(offset = self.offset.load(Ordering::SeqCst), "Dropped pending updates");
        Ok(())
    }
}
