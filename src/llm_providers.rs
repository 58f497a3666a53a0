//! LLM provider implementations
//!
//! Gemini is the default backend and talks to the REST API through the shared
//! [`Fetcher`]. OpenAI-compatible endpoints are available with the `llm`
//! feature.

use crate::idea_generator::{IdeaGeneratorConfig, LLMProvider};
use crate::{Fetcher, TrendError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

/// Replays queued replies in order, recording every prompt it receives.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, raw: impl Into<String>) -> Self {
        self.push(Ok(raw.into()));
        self
    }

    /// Queue a provider-side failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    /// Hold every reply back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(&self, reply: Result<String, String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(reply);
        }
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: String,
        _schema: Value,
        _config: &IdeaGeneratorConfig,
    ) -> Result<String, TrendError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        match next {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(message)) => Err(TrendError::external("mock", message)),
            None => Err(TrendError::external("mock", "no queued response")),
        }
    }
}

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
const GEMINI_TIMEOUT: Duration = Duration::from_secs(120);

/// Google Gemini `generateContent` in JSON response mode.
pub struct GeminiProvider {
    fetcher: Fetcher,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            fetcher: Fetcher::new(),
            api_key: api_key.into(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            endpoint: GEMINI_API_BASE.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at another API base, e.g. a local test server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(prompt: &str, config: &IdeaGeneratorConfig) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": config.temperature,
                "responseMimeType": "application/json"
            }
        })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(level = "debug", skip(self, prompt, _schema, config), fields(model = %self.model))]
    async fn generate(
        &self,
        prompt: String,
        _schema: Value,
        config: &IdeaGeneratorConfig,
    ) -> Result<String, TrendError> {
        let request = self
            .fetcher
            .client()
            .post(self.request_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(GEMINI_TIMEOUT)
            .json(&Self::request_body(&prompt, config));

        let body: Value = self.fetcher.send_json("Gemini", request).await?;
        let text = Self::candidate_text(body)?;

        debug!(length = text.len(), "Gemini responded");
        Ok(text)
    }
}

impl GeminiProvider {
    /// Joined text parts of the first candidate. A blocked or empty reply
    /// fails as a generation error carrying the whole body.
    fn candidate_text(body: Value) -> Result<String, TrendError> {
        let raw = body.to_string();
        let response: GenerateContentResponse = serde_json::from_value(body)
            .map_err(|e| TrendError::generation(format!("unexpected Gemini reply: {e}"), &raw))?;

        let candidate = response.candidates.into_iter().next();
        let finish_reason = candidate
            .as_ref()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "none".to_string());

        let text: String = candidate
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TrendError::generation(
                format!("no text in Gemini candidates (finish reason: {finish_reason})"),
                raw,
            ));
        }
        Ok(text)
    }
}

#[cfg(feature = "llm")]
pub mod openai {
    use super::*;
    use async_openai::types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    };
    use async_openai::{config::OpenAIConfig, Client};

    pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

    /// Any OpenAI-compatible chat completion endpoint, JSON-schema mode.
    pub struct OpenAIProvider {
        client: Client<OpenAIConfig>,
        model: String,
    }

    impl OpenAIProvider {
        pub fn new(api_key: String) -> Self {
            let config = OpenAIConfig::new().with_api_key(api_key);
            Self::from_config(config, OPENAI_DEFAULT_MODEL.to_string())
        }

        pub fn with_model(mut self, model: String) -> Self {
            self.model = model;
            self
        }

        /// Create from custom client configuration
        pub fn from_config(config: OpenAIConfig, model: String) -> Self {
            Self {
                client: Client::with_config(config),
                model,
            }
        }
    }

    fn openai_error(e: impl ToString) -> TrendError {
        TrendError::external("OpenAI", e)
    }

    #[async_trait]
    impl LLMProvider for OpenAIProvider {
        fn name(&self) -> &str {
            "openai"
        }

        async fn generate(
            &self,
            prompt: String,
            schema: Value,
            config: &IdeaGeneratorConfig,
        ) -> Result<String, TrendError> {
            let system_message = ChatCompletionRequestSystemMessageArgs::default()
                .content("You generate project ideas and answer with a single JSON object.")
                .build()
                .map_err(openai_error)?;

            let user_message = ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(openai_error)?;

            let request = CreateChatCompletionRequestArgs::default()
                .model(&self.model)
                .messages(vec![system_message.into(), user_message.into()])
                .temperature(config.temperature)
                .response_format(ResponseFormat::JsonSchema {
                    json_schema: ResponseFormatJsonSchema {
                        description: Some("Trend summary and project ideas".to_string()),
                        name: "analysis_result".to_string(),
                        schema: Some(schema),
                        strict: Some(false),
                    },
                })
                .build()
                .map_err(openai_error)?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(openai_error)?;

            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| openai_error("No content in response"))
        }
    }
}
