//! LLM-backed idea generation
//!
//! Collected trends are condensed into a markdown digest, wrapped in a single
//! prompt and sent to an [`LLMProvider`] in structured-output mode. The raw
//! reply must decode into an [`AnalysisResult`] with exactly the requested
//! number of ideas; anything else is a [`TrendError::Generation`].

use crate::analysis::AnalysisResult;
use crate::utils::take_chars;
use crate::{TrendError, TrendItem};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Caps applied while building the digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestLimits {
    pub max_items_per_source: usize,
    /// Characters of description kept per item.
    pub description_chars: usize,
}

impl Default for DigestLimits {
    fn default() -> Self {
        Self {
            max_items_per_source: 10,
            description_chars: 100,
        }
    }
}

#[derive(Clone, Debug)]
pub struct IdeaGeneratorConfig {
    /// Every idea must relate to this topic.
    pub topic: String,
    /// Language the model answers in.
    pub language: String,
    pub idea_count: usize,
    pub temperature: f32,
    pub limits: DigestLimits,
}

impl Default for IdeaGeneratorConfig {
    fn default() -> Self {
        Self {
            topic: "AI agent".to_string(),
            language: "Korean".to_string(),
            idea_count: 3,
            temperature: 0.8,
            limits: DigestLimits::default(),
        }
    }
}

/// Markdown digest of `trends`, grouped by source in first-seen order.
pub fn format_digest(trends: &[TrendItem], limits: &DigestLimits) -> String {
    let mut groups: Vec<(&str, Vec<&TrendItem>)> = Vec::new();
    for item in trends {
        match groups.iter().position(|(source, _)| *source == item.source) {
            Some(idx) => groups[idx].1.push(item),
            None => groups.push((item.source.as_str(), vec![item])),
        }
    }

    let mut lines = Vec::new();
    for (source, items) in groups {
        lines.push(format!("### {source}"));
        for item in items.into_iter().take(limits.max_items_per_source) {
            let mut line = format!("- {}", item.title);
            if let Some(score) = item.score.filter(|s| *s > 0) {
                line.push_str(&format!(" (score: {score})"));
            }
            if let Some(desc) = item.description.as_deref().filter(|d| !d.is_empty()) {
                line.push_str("\n   ");
                line.push_str(&take_chars(desc, limits.description_chars));
                line.push_str("...");
            }
            lines.push(line);
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// A model backend that answers a prompt with raw JSON text.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Send `prompt` in structured-output mode and return the untouched reply.
    ///
    /// `schema` describes the expected JSON; providers that support schema
    /// constrained output should pass it on.
    async fn generate(
        &self,
        prompt: String,
        schema: Value,
        config: &IdeaGeneratorConfig,
    ) -> Result<String, TrendError>;
}

pub struct IdeaGenerator {
    provider: Arc<dyn LLMProvider>,
    config: IdeaGeneratorConfig,
}

impl IdeaGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self::with_config(provider, IdeaGeneratorConfig::default())
    }

    pub fn with_config(provider: Arc<dyn LLMProvider>, config: IdeaGeneratorConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &IdeaGeneratorConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Turn collected trends into project ideas with one model call.
    #[instrument(level = "debug", skip(self, trends), fields(provider = %self.provider.name(), trends = trends.len()))]
    pub async fn generate(&self, trends: &[TrendItem]) -> Result<AnalysisResult, TrendError> {
        let digest = self.format_trends(trends);
        let prompt = self.build_prompt(&digest);

        let schema = serde_json::to_value(schemars::schema_for!(AnalysisResult))?;

        let raw = self
            .provider
            .generate(prompt, schema, &self.config)
            .await?;
        debug!(length = raw.len(), "Model responded");

        let result = self.parse_response(&raw)?;
        info!(ideas = result.ideas.len(), "Ideas generated");
        Ok(result)
    }

    pub fn format_trends(&self, trends: &[TrendItem]) -> String {
        format_digest(trends, &self.config.limits)
    }

    pub fn build_prompt(&self, digest: &str) -> String {
        let IdeaGeneratorConfig {
            topic,
            language,
            idea_count,
            ..
        } = &self.config;

        let system = format!(
            "You are a creative idea generator for developers.\n\
             Your job is to analyze current tech trends and suggest creative, practical project ideas\n\
             related to the topic: \"{topic}\".\n\n\
             Guidelines:\n\
             - All ideas MUST be related to \"{topic}\"\n\
             - Ideas should be buildable in 1 day (MVP)\n\
             - Be specific and actionable\n\
             - Consider what's trending NOW and why it matters\n\
             - Avoid generic or overdone ideas\n\
             - Each idea should leverage current trends in a unique way\n\n\
             Write every text field in {language}.\n\n\
             You MUST respond with valid JSON in this exact format:\n\
             {{\n  \"trend_summary\": \"2-3 sentence summary of the trends\",\n  \"ideas\": [\n    {{\n      \
             \"title\": \"idea title\",\n      \"description\": \"what it does\",\n      \
             \"why_now\": \"which trend makes it timely\",\n      \"difficulty\": \"easy|medium|hard\",\n      \
             \"tech_stack\": [\"tech1\", \"tech2\"],\n      \"first_step\": \"first concrete step\"\n    }}\n  ]\n}}"
        );

        let user = format!(
            "Based on today's tech trends, suggest {idea_count} project ideas\n\
             related to \"{topic}\".\n\n\
             ## Today's Trends\n\n\
             {digest}\n\n\
             ---\n\n\
             Analyze these trends and suggest exactly {idea_count} creative \"{topic}\" ideas that:\n\
             1. Are inspired by or leverage these trends\n\
             2. Can be built as an MVP in one day\n\
             3. Solve a real problem\n\
             4. Are NOT just clones of existing tools\n\n\
             Respond with valid JSON only. No markdown, no explanation outside the JSON."
        );

        format!("{system}\n\n{user}")
    }

    /// Decode a raw model reply. No repair is attempted: fenced or truncated
    /// JSON fails with the raw text attached.
    pub fn parse_response(&self, raw: &str) -> Result<AnalysisResult, TrendError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| TrendError::generation(e.to_string(), raw))?;
        let result: AnalysisResult =
            serde_json::from_value(value).map_err(|e| TrendError::generation(e.to_string(), raw))?;

        if result.ideas.len() != self.config.idea_count {
            return Err(TrendError::generation(
                format!(
                    "expected {} ideas, got {}",
                    self.config.idea_count,
                    result.ideas.len()
                ),
                raw,
            ));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;

    fn generator() -> IdeaGenerator {
        IdeaGenerator::new(Arc::new(MockProvider::new()))
    }

    #[test]
    fn test_default_config() {
        let config = IdeaGeneratorConfig::default();
        assert_eq!(config.topic, "AI agent");
        assert_eq!(config.language, "Korean");
        assert_eq!(config.idea_count, 3);
        assert_eq!(config.limits.max_items_per_source, 10);
        assert_eq!(config.limits.description_chars, 100);
    }

    #[test]
    fn digest_skips_zero_score_and_empty_description() {
        let trends = vec![
            TrendItem::new("GitHub", "a/b - Rust", "u").with_score(0),
            TrendItem::new("GitHub", "c/d - Go", "u").with_description(""),
            TrendItem::new("GitHub", "e/f - Zig", "u")
                .with_score(9)
                .with_description("fast"),
        ];
        let digest = generator().format_trends(&trends);
        assert_eq!(
            digest,
            "### GitHub\n- a/b - Rust\n- c/d - Go\n- e/f - Zig (score: 9)\n   fast...\n"
        );
    }

    #[test]
    fn digest_of_nothing_is_empty() {
        assert_eq!(generator().format_trends(&[]), "");
    }

    #[test]
    fn prompt_carries_topic_language_and_count() {
        let generator = IdeaGenerator::with_config(
            Arc::new(MockProvider::new()),
            IdeaGeneratorConfig {
                topic: "devtools".into(),
                language: "English".into(),
                idea_count: 5,
                ..Default::default()
            },
        );
        let prompt = generator.build_prompt("### GitHub\n- x\n");
        assert!(prompt.contains("related to the topic: \"devtools\""));
        assert!(prompt.contains("Write every text field in English."));
        assert!(prompt.contains("suggest exactly 5 creative \"devtools\" ideas"));
        assert!(prompt.contains("## Today's Trends\n\n### GitHub\n- x\n"));
        assert!(prompt.contains("NOT just clones of existing tools"));
        assert!(prompt.ends_with("No markdown, no explanation outside the JSON."));
    }
}
