use crate::utils::truncate_str;
use thiserror::Error;
use tracing::{error, warn};

const NOTICE_EXCERPT_WIDTH: usize = 200;

#[derive(Debug, Error)]
pub enum TrendError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    UpstreamStatus {
        service: String,
        status: u16,
        body: String,
    },

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to parse model response: {reason}\nResponse: {raw}")]
    Generation { reason: String, raw: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("No trends were collected from any source")]
    NothingCollected,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl TrendError {
    pub fn generation(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        TrendError::Generation {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl ToString) -> Self {
        TrendError::ExternalServiceError {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// The untouched model output, for generation failures only.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            TrendError::Generation { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Text for a chat notice. Raw model output and upstream bodies are cut
    /// to an excerpt; [`TrendError::log`] keeps the full text.
    pub fn notice(&self) -> String {
        match self {
            TrendError::Generation { reason, raw } => format!(
                "Failed to parse model response: {reason}\nResponse: {}",
                truncate_str(raw.trim(), NOTICE_EXCERPT_WIDTH)
            ),
            TrendError::UpstreamStatus {
                service,
                status,
                body,
            } => format!(
                "{service} returned status {status}: {}",
                truncate_str(body.trim(), NOTICE_EXCERPT_WIDTH)
            ),
            other => other.to_string(),
        }
    }

    /// Configuration problems abort startup; everything else fails a single round.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrendError::InvalidConfiguration(_))
    }

    pub fn log(&self) {
        match self {
            TrendError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            TrendError::Http(e) => {
                warn!(error = %e, "HTTP request failed");
            }
            TrendError::UpstreamStatus {
                service,
                status,
                body,
            } => {
                warn!(service = %service, status = *status, body = %body, "Upstream returned an error status");
            }
            TrendError::ExternalServiceError { service, message } => {
                error!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
            TrendError::Serialization(e) => {
                warn!(error = %e, "Response decoding failed");
            }
            TrendError::Generation { reason, raw } => {
                error!(error = %reason, raw = %raw, "Model response could not be parsed");
            }
            TrendError::Timeout(e) => {
                warn!(error = %e, "Request timed out");
            }
            TrendError::NothingCollected => {
                warn!("No trends collected, skipping generation");
            }
            TrendError::InvalidConfiguration(e) => {
                error!(error = %e, "Invalid configuration");
            }
        }
    }
}
