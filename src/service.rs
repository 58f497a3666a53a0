use crate::collector::TrendCollector;
use crate::commands::{BotCommand, ChatCommand, CommandInbox, TelegramCommands};
use crate::config::{AppConfig, ScheduleTime};
use crate::delivery::{
    format_help_message, format_startup_message, format_status_message, format_welcome_message,
    Delivery, StdoutDelivery, TelegramDelivery, IDEA_ACK_MESSAGE, NOTHING_COLLECTED_MESSAGE,
    SCHEDULED_FAILURE_PREFIX,
};
use crate::idea_generator::IdeaGenerator;
use crate::llm_config::LLMConfig;
use crate::registry::SourceRegistry;
use crate::{AnalysisResult, TrendError};
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Pause after a failed command poll before asking again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    pub schedule: ScheduleTime,
    /// Upper bound on one generation call.
    pub generation_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleTime::default(),
            generation_timeout: Duration::from_secs(120),
        }
    }
}

/// Collect, generate and deliver, once, every day, or when a chat asks.
pub struct DailyIdeaService {
    registry: SourceRegistry,
    collector: TrendCollector,
    generator: IdeaGenerator,
    delivery: Box<dyn Delivery>,
    commands: Option<Box<dyn CommandInbox>>,
    config: ServiceConfig,
}

/// What woke the daily loop.
enum Wake {
    Scheduled,
    Commands(Result<Vec<ChatCommand>, TrendError>),
}

impl DailyIdeaService {
    pub fn new(
        registry: SourceRegistry,
        collector: TrendCollector,
        generator: IdeaGenerator,
        delivery: Box<dyn Delivery>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            registry,
            collector,
            generator,
            delivery,
            commands: None,
            config,
        }
    }

    /// Answer chat commands while [`run_daily`](Self::run_daily) runs.
    pub fn with_commands(mut self, inbox: impl CommandInbox + 'static) -> Self {
        self.commands = Some(Box::new(inbox));
        self
    }

    /// Wire every component from loaded configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, TrendError> {
        let registry = SourceRegistry::with_builtin_sources();
        let collector = TrendCollector::new(config.collector, &registry);
        let provider = LLMConfig::provider_from_settings(&config.llm)?;
        let topic = config.generator.topic.clone();
        let generator = IdeaGenerator::with_config(provider, config.generator);

        let fetcher = collector.fetcher().clone();
        let (delivery, commands) = match config.telegram {
            Some(telegram) => {
                let delivery = TelegramDelivery::new(
                    fetcher.clone(),
                    telegram.bot_token.clone(),
                    telegram.chat_id,
                    topic,
                );
                (
                    Box::new(delivery) as Box<dyn Delivery>,
                    Some(TelegramCommands::new(fetcher, telegram.bot_token)),
                )
            }
            None => (Box::new(StdoutDelivery::new(topic)) as Box<dyn Delivery>, None),
        };

        let service = Self::new(
            registry,
            collector,
            generator,
            delivery,
            ServiceConfig {
                schedule: config.schedule,
                ..ServiceConfig::default()
            },
        );
        Ok(match commands {
            Some(inbox) => service.with_commands(inbox),
            None => service,
        })
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn collector(&self) -> &TrendCollector {
        &self.collector
    }

    pub fn generator(&self) -> &IdeaGenerator {
        &self.generator
    }

    /// One full round for the default chat. Failures are also delivered as
    /// error notices.
    pub async fn run_round(&self) -> Result<AnalysisResult, TrendError> {
        self.round(None, "").await
    }

    /// Same as [`run_round`](Self::run_round), answering `chat` instead.
    pub async fn run_round_for(&self, chat: &str) -> Result<AnalysisResult, TrendError> {
        self.round(Some(chat), "").await
    }

    #[instrument(level = "info", skip(self, failure_prefix))]
    async fn round(
        &self,
        chat: Option<&str>,
        failure_prefix: &str,
    ) -> Result<AnalysisResult, TrendError> {
        info!("Starting trend collection");
        let trends = self.collector.collect().await;

        if trends.is_empty() {
            let err = TrendError::NothingCollected;
            err.log();
            self.notify_error(chat, NOTHING_COLLECTED_MESSAGE).await;
            return Err(err);
        }

        info!(trends = trends.len(), "Generating ideas");
        let generated = tokio::time::timeout(
            self.config.generation_timeout,
            self.generator.generate(&trends),
        )
        .await
        .unwrap_or_else(|_| {
            Err(TrendError::Timeout(format!(
                "idea generation exceeded {}s",
                self.config.generation_timeout.as_secs()
            )))
        });

        let result = match generated {
            Ok(result) => result,
            Err(err) => {
                err.log();
                self.notify_error(chat, &format!("{failure_prefix}{}", err.notice()))
                    .await;
                return Err(err);
            }
        };

        self.delivery.send_ideas(chat, &result).await?;
        info!(ideas = result.ideas.len(), "Ideas delivered");
        Ok(result)
    }

    pub async fn send_startup_notice(&self) -> Result<(), TrendError> {
        let message = format_startup_message(
            self.delivery.topic(),
            self.config.schedule,
            self.commands.is_some(),
        );
        self.delivery.send_text(&message).await
    }

    /// Reply to one chat command in the chat it came from.
    #[instrument(level = "info", skip(self, command), fields(chat_id = %command.chat_id, kind = ?command.command))]
    pub async fn handle_command(&self, command: &ChatCommand) -> Result<(), TrendError> {
        let chat = Some(command.chat_id.as_str());
        let topic = self.delivery.topic();

        match command.command {
            BotCommand::Start => {
                self.delivery
                    .send_text_to(chat, &format_welcome_message(topic))
                    .await
            }
            BotCommand::Help => {
                let count = self.generator.config().idea_count;
                self.delivery
                    .send_text_to(chat, &format_help_message(topic, count))
                    .await
            }
            BotCommand::Status => {
                let next = next_run_after(&Local::now(), self.config.schedule);
                let message = format_status_message(
                    self.config.schedule,
                    &next.format("%Y-%m-%d %H:%M").to_string(),
                );
                self.delivery.send_text_to(chat, &message).await
            }
            BotCommand::Idea => {
                self.delivery.send_text_to(chat, IDEA_ACK_MESSAGE).await?;
                // Failures were already reported to the chat.
                if let Err(e) = self.round(chat, "").await {
                    warn!(error = %e, "Requested round failed");
                }
                Ok(())
            }
        }
    }

    /// Run a round at the configured time every day, answering chat commands
    /// in between, until `shutdown` resolves. A round in progress is dropped
    /// on shutdown.
    pub async fn run_daily<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            schedule = %self.config.schedule,
            commands = self.commands.is_some(),
            "Daily schedule started"
        );

        if let Some(inbox) = &self.commands {
            if let Err(e) = inbox.skip_pending().await {
                warn!(error = %e, "Could not drop pending chat commands");
            }
        }

        let mut next = next_run_after(&Local::now(), self.config.schedule);
        info!(next_run = %next, "Waiting for next scheduled run");

        loop {
            // A run that comes due while a command is handled starts late, not never.
            let wait = (next - Local::now()).to_std().unwrap_or_default();

            let wake = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving daily schedule");
                    break;
                }
                _ = tokio::time::sleep(wait) => Wake::Scheduled,
                polled = self.poll_commands() => Wake::Commands(polled),
            };
            let scheduled = matches!(wake, Wake::Scheduled);

            let work = async {
                match wake {
                    Wake::Scheduled => {
                        if let Err(e) = self.round(None, SCHEDULED_FAILURE_PREFIX).await {
                            warn!(error = %e, "Scheduled round failed");
                        }
                    }
                    Wake::Commands(Ok(commands)) => {
                        for command in &commands {
                            if let Err(e) = self.handle_command(command).await {
                                warn!(error = %e, "Could not answer chat command");
                            }
                        }
                    }
                    Wake::Commands(Err(e)) => {
                        warn!(error = %e, "Polling chat commands failed");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            };

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, abandoning work in progress");
                    break;
                }
                _ = work => {}
            }

            if scheduled {
                next = next_run_after(&Local::now(), self.config.schedule);
                info!(next_run = %next, "Waiting for next scheduled run");
            }
        }
    }

    /// Close the collector and drop everything else.
    pub fn shutdown(self) {
        self.collector.close();
        info!("Service stopped");
    }

    async fn poll_commands(&self) -> Result<Vec<ChatCommand>, TrendError> {
        match &self.commands {
            Some(inbox) => inbox.next_commands().await,
            None => std::future::pending().await,
        }
    }

    async fn notify_error(&self, chat: Option<&str>, message: &str) {
        if let Err(e) = self.delivery.send_error(chat, message).await {
            warn!(error = %e, "Could not deliver error notice");
        } else {
            debug!("Error notice delivered");
        }
    }
}

/// Next moment the wall clock in `now`'s zone reads `schedule`, strictly
/// after `now`. Times skipped by a DST jump move forward to the first valid
/// hour.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, schedule: ScheduleTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut candidate = schedule.next_occurrence(now.naive_local());

    for _ in 0..24 {
        if let Some(at) = tz.from_local_datetime(&candidate).earliest() {
            if at > *now {
                return at;
            }
        }
        candidate += ChronoDuration::hours(1);
    }

    now.clone() + ChronoDuration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fetcher, MockProvider, TrendItem, TrendSource};
    use async_trait::async_trait;
    use chrono::{FixedOffset, Utc};
    use std::sync::{Arc, Mutex};

    struct OneTrend;

    #[async_trait]
    impl TrendSource for OneTrend {
        fn name(&self) -> &str {
            "One"
        }

        async fn try_fetch(&self) -> Result<Vec<TrendItem>, TrendError> {
            Ok(vec![TrendItem::new("One", "trend", "https://example.com")])
        }
    }

    #[derive(Clone, Default)]
    struct Outbox(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Delivery for Outbox {
        fn topic(&self) -> &str {
            "AI agent"
        }

        async fn send_text_to(&self, _chat: Option<&str>, text: &str) -> Result<(), TrendError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn scheduled_failures_are_prefixed() {
        let outbox = Outbox::default();
        let service = DailyIdeaService::new(
            SourceRegistry::empty(),
            TrendCollector::from_sources(Fetcher::new(), vec![Box::new(OneTrend)]),
            IdeaGenerator::new(Arc::new(MockProvider::new().with_failure("quota exceeded"))),
            Box::new(outbox.clone()),
            ServiceConfig::default(),
        );

        assert!(service.round(None, SCHEDULED_FAILURE_PREFIX).await.is_err());
        assert!(service.run_round().await.is_err());

        let sent = outbox.0.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("스케줄 작업 실패: External service error"));
        assert!(!sent[1].contains("스케줄 작업 실패"));
    }

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        let schedule: ScheduleTime = "09:00".parse().unwrap();

        let morning = Utc.with_ymd_and_hms(2026, 10, 19, 6, 30, 0).unwrap();
        assert_eq!(
            next_run_after(&morning, schedule),
            Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
        );

        let evening = Utc.with_ymd_and_hms(2026, 10, 19, 21, 0, 0).unwrap();
        assert_eq!(
            next_run_after(&evening, schedule),
            Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_run_uses_local_wall_clock() {
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
        let schedule: ScheduleTime = "09:00".parse().unwrap();
        let now = seoul.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();

        let next = next_run_after(&now, schedule);
        assert_eq!(next, seoul.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap());
        assert_eq!((next - now).num_minutes(), 60);
    }
}
