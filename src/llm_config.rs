//! LLM configuration and validation utilities

use crate::idea_generator::LLMProvider;
use crate::llm_providers::GeminiProvider;
use crate::TrendError;
use std::str::FromStr;
use std::sync::Arc;

/// API key validation utilities
pub struct ApiKeyValidator;

impl ApiKeyValidator {
    /// Reject missing or blank keys, naming the variable they come from.
    pub fn validate_present(name: &str, api_key: Option<&str>) -> Result<String, TrendError> {
        match api_key.map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(TrendError::InvalidConfiguration(format!(
                "{name} is required"
            ))),
        }
    }

    /// Validate Gemini API key format
    pub fn validate_gemini_key(api_key: &str) -> Result<(), TrendError> {
        if api_key.trim().is_empty() {
            return Err(TrendError::InvalidConfiguration(
                "Gemini API key cannot be empty".to_string(),
            ));
        }

        if api_key.chars().any(char::is_whitespace) {
            return Err(TrendError::InvalidConfiguration(
                "Gemini API key must not contain whitespace".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate OpenAI API key format
    pub fn validate_openai_key(api_key: &str) -> Result<(), TrendError> {
        if api_key.is_empty() {
            return Err(TrendError::InvalidConfiguration(
                "OpenAI API key cannot be empty".to_string(),
            ));
        }

        if !api_key.starts_with("sk-") {
            return Err(TrendError::InvalidConfiguration(
                "OpenAI API key must start with 'sk-'".to_string(),
            ));
        }

        if api_key.len() < 20 {
            return Err(TrendError::InvalidConfiguration(
                "OpenAI API key appears to be too short".to_string(),
            ));
        }

        Ok(())
    }
}

/// Which model API generates the ideas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    #[default]
    Gemini,
    OpenAI,
}

impl FromStr for LlmBackend {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmBackend::Gemini),
            "openai" => Ok(LlmBackend::OpenAI),
            other => Err(TrendError::InvalidConfiguration(format!(
                "Unknown LLM provider: {other}. Valid providers: gemini, openai"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub api_key: String,
    /// Provider default when unset.
    pub model: Option<String>,
    /// OpenAI-compatible base URL; ignored by Gemini.
    pub base_url: Option<String>,
}

/// Configuration helper for LLM providers
pub struct LLMConfig;

impl LLMConfig {
    pub fn provider_from_settings(
        settings: &LlmSettings,
    ) -> Result<Arc<dyn LLMProvider>, TrendError> {
        match settings.backend {
            LlmBackend::Gemini => Ok(Arc::new(Self::gemini(settings)?)),
            LlmBackend::OpenAI => Self::openai(settings),
        }
    }

    pub fn gemini(settings: &LlmSettings) -> Result<GeminiProvider, TrendError> {
        ApiKeyValidator::validate_gemini_key(&settings.api_key)?;
        let mut provider = GeminiProvider::new(settings.api_key.clone());
        if let Some(model) = &settings.model {
            provider = provider.with_model(model.clone());
        }
        Ok(provider)
    }

    #[cfg(feature = "llm")]
    fn openai(settings: &LlmSettings) -> Result<Arc<dyn LLMProvider>, TrendError> {
        use crate::llm_providers::openai::{OpenAIProvider, OPENAI_DEFAULT_MODEL};
        use async_openai::config::OpenAIConfig;

        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string());

        let provider = match &settings.base_url {
            // Compatible servers use their own key formats.
            Some(base_url) => {
                let config = OpenAIConfig::new()
                    .with_api_base(base_url.clone())
                    .with_api_key(settings.api_key.clone());
                OpenAIProvider::from_config(config, model)
            }
            None => {
                ApiKeyValidator::validate_openai_key(&settings.api_key)?;
                OpenAIProvider::new(settings.api_key.clone()).with_model(model)
            }
        };

        Ok(Arc::new(provider))
    }

    #[cfg(not(feature = "llm"))]
    fn openai(_settings: &LlmSettings) -> Result<Arc<dyn LLMProvider>, TrendError> {
        Err(TrendError::InvalidConfiguration(
            "LLM_PROVIDER=openai requires the `llm` feature".to_string(),
        ))
    }
}
