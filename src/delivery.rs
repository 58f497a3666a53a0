//! Chat rendering and delivery of generated ideas.

use crate::analysis::{AnalysisResult, IdeaSuggestion};
use crate::telegram_types::{SendMessage, TelegramResponse};
use crate::utils::{escape_markdown, truncate_str};
use crate::{Fetcher, ScheduleTime, TrendError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const NOTHING_COLLECTED_MESSAGE: &str = "트렌드를 수집하지 못했습니다.";
pub const IDEA_ACK_MESSAGE: &str = "🔍 트렌드 수집 중... 잠시만 기다려주세요.";
pub const SCHEDULED_FAILURE_PREFIX: &str = "스케줄 작업 실패: ";

const SEPARATOR_WIDTH: usize = 30;
/// Keeps error notices well under Telegram's 4096 character limit.
const ERROR_NOTICE_WIDTH: usize = 1000;

fn separator() -> String {
    "─".repeat(SEPARATOR_WIDTH)
}

/// Markdown chat message for one generation result.
pub fn format_idea_message(result: &AnalysisResult, topic: &str) -> String {
    let mut lines = vec![
        format!("🎯 *오늘의 {topic} 아이디어*"),
        String::new(),
        "📊 *트렌드 요약*".to_string(),
        result.trend_summary.clone(),
        String::new(),
        separator(),
    ];

    for (i, idea) in result.ideas.iter().enumerate() {
        lines.extend(format_single_idea(i + 1, idea));
    }

    lines.extend([
        String::new(),
        separator(),
        "💡 _하나 골라서 오늘 만들어보세요!_".to_string(),
    ]);

    lines.join("\n")
}

fn format_single_idea(index: usize, idea: &IdeaSuggestion) -> [String; 10] {
    [
        String::new(),
        format!("*{index}. {}* {}", idea.title, idea.difficulty.marker()),
        String::new(),
        format!("📝 {}", idea.description),
        String::new(),
        format!("⏰ *왜 지금?* {}", idea.why_now),
        String::new(),
        format!("🛠 *스택:* {}", idea.tech_stack.join(", ")),
        String::new(),
        format!("👉 *첫 단계:* {}", idea.first_step),
    ]
}

/// Error notice. The detail is shortened and Markdown-escaped so arbitrary
/// model output cannot break the message.
pub fn format_error_message(error: &str) -> String {
    let detail = escape_markdown(&truncate_str(error, ERROR_NOTICE_WIDTH));
    format!("❌ *오류 발생*\n\n{detail}")
}

pub fn format_startup_message(topic: &str, schedule: ScheduleTime, commands: bool) -> String {
    let mut message = format!(
        "🚀 *Daily Idea Bot 시작됨*\n\n\
         주제: *{topic}*\n\
         매일 {schedule}에 아이디어를 보내드립니다."
    );
    if commands {
        message.push_str("\n/idea 명령어로 지금 바로 받을 수도 있어요!");
    }
    message
}

pub fn format_welcome_message(topic: &str) -> String {
    format!(
        "👋 *Daily Idea Bot*에 오신 걸 환영합니다!\n\n\
         매일 아침 *{topic}* 아이디어를 보내드립니다.\n\n\
         *명령어:*\n\
         /idea - 지금 바로 아이디어 받기\n\
         /status - 봇 상태 확인\n\
         /help - 도움말"
    )
}

pub fn format_help_message(topic: &str, idea_count: usize) -> String {
    format!(
        "🤖 *Daily Idea Bot 사용법*\n\n\
         이 봇은 트렌드를 분석해서 *{topic}* 아이디어를 제안합니다.\n\n\
         *명령어:*\n\
         • /idea - 즉시 오늘의 아이디어 {idea_count}개 받기\n\
         • /status - 봇 상태 및 다음 전송 시간\n\
         • /help - 이 도움말\n\n\
         매일 정해진 시간에 자동으로 아이디어가 전송됩니다."
    )
}

pub fn format_status_message(schedule: ScheduleTime, next_run: &str) -> String {
    format!(
        "✅ *봇 상태: 정상*\n\n\
         매일 {schedule}에 전송합니다.\n\
         다음 자동 전송: {next_run}"
    )
}

/// Where finished messages go.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Topic shown in the idea message header.
    fn topic(&self) -> &str;

    /// Send to `chat`, or to the configured default target when `None`.
    async fn send_text_to(&self, chat: Option<&str>, text: &str) -> Result<(), TrendError>;

    async fn send_text(&self, text: &str) -> Result<(), TrendError> {
        self.send_text_to(None, text).await
    }

    async fn send_ideas(&self, chat: Option<&str>, result: &AnalysisResult) -> Result<(), TrendError> {
        let message = format_idea_message(result, self.topic());
        self.send_text_to(chat, &message).await
    }

    async fn send_error(&self, chat: Option<&str>, error: &str) -> Result<(), TrendError> {
        self.send_text_to(chat, &format_error_message(error)).await
    }
}

/// Telegram Bot API `sendMessage` to a single chat.
pub struct TelegramDelivery {
    fetcher: Fetcher,
    bot_token: String,
    chat_id: String,
    topic: String,
    endpoint: String,
}

impl TelegramDelivery {
    pub fn new(
        fetcher: Fetcher,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            topic: topic.into(),
            endpoint: TELEGRAM_API_BASE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.endpoint.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    fn topic(&self) -> &str {
        &self.topic
    }

    #[instrument(level = "debug", skip(self, text), fields(length = text.len()))]
    async fn send_text_to(&self, chat: Option<&str>, text: &str) -> Result<(), TrendError> {
        let chat_id = chat.unwrap_or(&self.chat_id);
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "Markdown",
        };
        // URL carries the bot token; keep it out of request spans.
        let request = self
            .fetcher
            .client()
            .post(self.send_message_url())
            .json(&body);
        let response: TelegramResponse<Value> = self
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
                response.description.unwrap_or_else(|| "sendMessage failed".into()),
            ));
        }
        debug!(chat_id = %chat_id, "Telegram message sent");
        Ok(())
    }
}

/// Prints messages to stdout, for runs without a chat target.
pub struct StdoutDelivery {
    topic: String,
}

impl StdoutDelivery {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl Delivery for StdoutDelivery {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn send_text_to(&self, _chat: Option<&str>, text: &str) -> Result<(), TrendError> {
        info!(length = text.len(), "Printing message to stdout");
        println!("{text}\n");
        Ok(())
    }
}
