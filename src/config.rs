use crate::collector::CollectorConfig;
use crate::idea_generator::IdeaGeneratorConfig;
use crate::llm_config::{ApiKeyValidator, LlmBackend, LlmSettings};
use crate::sources::SourceOverrides;
use crate::utils::split_list;
use crate::TrendError;
use chrono::{Days, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Local wall-clock time of the daily run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    time: NaiveTime,
}

impl ScheduleTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, TrendError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| Self { time })
            .ok_or_else(|| {
                TrendError::InvalidConfiguration(format!("Invalid schedule time {hour}:{minute}"))
            })
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// First `HH:MM` strictly after `after`.
    pub fn next_occurrence(&self, after: NaiveDateTime) -> NaiveDateTime {
        let today = after.date().and_time(self.time);
        if today > after {
            today
        } else {
            today + Days::new(1)
        }
    }
}

impl Default for ScheduleTime {
    fn default() -> Self {
        Self {
            time: NaiveTime::MIN + chrono::Duration::hours(9),
        }
    }
}

impl FromStr for ScheduleTime {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            TrendError::InvalidConfiguration(format!(
                "DAILY_SCHEDULE_TIME must be HH:MM, got {s:?}"
            ))
        };
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%H:%M"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

/// Everything the service needs, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub collector: CollectorConfig,
    pub generator: IdeaGeneratorConfig,
    pub schedule: ScheduleTime,
    /// `None` delivers to stdout.
    pub telegram: Option<TelegramSettings>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, TrendError> {
        Self::from_lookup(env_lookup)
    }

    /// Source settings only; needs no LLM credentials.
    pub fn collector_from_env() -> Result<CollectorConfig, TrendError> {
        Self::collector_from_lookup(&env_lookup)
    }

    pub fn collector_from_lookup<F>(lookup: &F) -> Result<CollectorConfig, TrendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let post_count = get("TWITTER_POST_COUNT")
            .map(|raw| {
                raw.trim().parse::<usize>().map_err(|_| {
                    TrendError::InvalidConfiguration(format!(
                        "TWITTER_POST_COUNT must be a number, got {raw:?}"
                    ))
                })
            })
            .transpose()?;

        let mut overrides = SourceOverrides::default();
        overrides.twitter.queries = get("TWITTER_QUERIES").map(|raw| split_list(&raw));
        overrides.twitter.post_count = post_count;

        Ok(CollectorConfig {
            enabled_sources: get("ENABLED_SCRAPERS")
                .map(|raw| split_list(&raw.to_ascii_lowercase()))
                .unwrap_or_default(),
            sela_api_key: get("SELA_API_KEY"),
            overrides,
        })
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => LlmBackend::default(),
        };
        let key_var = match backend {
            LlmBackend::Gemini => "GEMINI_API_KEY",
            LlmBackend::OpenAI => "OPENAI_API_KEY",
        };
        let llm = LlmSettings {
            backend,
            api_key: ApiKeyValidator::validate_present(key_var, get(key_var).as_deref())?,
            model: get("LLM_MODEL"),
            base_url: get("OPENAI_BASE_URL"),
        };

        let collector = Self::collector_from_lookup(&lookup)?;

        let mut generator = IdeaGeneratorConfig::default();
        if let Some(topic) = get("IDEA_TOPIC") {
            generator.topic = topic;
        }
        if let Some(language) = get("IDEA_LANGUAGE") {
            generator.language = language;
        }

        let schedule = match get("DAILY_SCHEDULE_TIME") {
            Some(raw) => raw.parse()?,
            None => ScheduleTime::default(),
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings { bot_token, chat_id }),
            (None, None) => None,
            _ => {
                return Err(TrendError::InvalidConfiguration(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            llm,
            collector,
            generator,
            schedule,
            telegram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_with_only_a_key() {
        let config = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "g-key")])).unwrap();
        assert_eq!(config.llm.backend, LlmBackend::Gemini);
        assert_eq!(config.llm.api_key, "g-key");
        assert!(config.collector.enabled_sources.is_empty());
        assert_eq!(config.collector.sela_api_key, None);
        assert_eq!(config.generator.topic, "AI agent");
        assert_eq!(config.generator.language, "Korean");
        assert_eq!(config.schedule.to_string(), "09:00");
        assert_eq!(config.telegram, None);
    }

    #[test]
    fn missing_gemini_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn openai_backend_wants_its_own_key() {
        let err = AppConfig::from_lookup(lookup(&[
            ("LLM_PROVIDER", "openai"),
            ("GEMINI_API_KEY", "g-key"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("ENABLED_SCRAPERS", "GitHub, twitter"),
            ("SELA_API_KEY", "sela"),
            ("TWITTER_QUERIES", "rust, wasm ,"),
            ("TWITTER_POST_COUNT", "8"),
            ("IDEA_TOPIC", "devtools"),
            ("DAILY_SCHEDULE_TIME", "7:30"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]))
        .unwrap();

        assert_eq!(config.collector.enabled_sources, vec!["github", "twitter"]);
        assert_eq!(config.collector.sela_api_key.as_deref(), Some("sela"));
        assert_eq!(
            config.collector.overrides.twitter.queries,
            Some(vec!["rust".to_string(), "wasm".to_string()])
        );
        assert_eq!(config.collector.overrides.twitter.post_count, Some(8));
        assert_eq!(config.generator.topic, "devtools");
        assert_eq!(config.schedule.to_string(), "07:30");
        assert_eq!(
            config.telegram,
            Some(TelegramSettings {
                bot_token: "123:abc".into(),
                chat_id: "42".into()
            })
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        for pairs in [
            vec![("GEMINI_API_KEY", "k"), ("TWITTER_POST_COUNT", "five")],
            vec![("GEMINI_API_KEY", "k"), ("DAILY_SCHEDULE_TIME", "25:00")],
            vec![("GEMINI_API_KEY", "k"), ("DAILY_SCHEDULE_TIME", "nine")],
            vec![("GEMINI_API_KEY", "k"), ("TELEGRAM_BOT_TOKEN", "t")],
            vec![("GEMINI_API_KEY", "k"), ("LLM_PROVIDER", "claude")],
        ] {
            let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(err.is_fatal(), "{pairs:?} should be rejected");
        }
    }

    #[test]
    fn next_occurrence_rolls_over_midnight() {
        let schedule: ScheduleTime = "09:00".parse().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let before = day.and_hms_opt(8, 59, 0).unwrap();
        assert_eq!(
            schedule.next_occurrence(before),
            day.and_hms_opt(9, 0, 0).unwrap()
        );

        let exactly = day.and_hms_opt(9, 0, 0).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2026, 10, 20)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(schedule.next_occurrence(exactly), tomorrow);
    }
}
