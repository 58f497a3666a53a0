use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One generation result: the model's read of today's trends plus its ideas,
/// in the model's own ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// Two or three sentence summary of the collected trends.
    pub trend_summary: String,
    pub ideas: Vec<IdeaSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IdeaSuggestion {
    pub title: String,
    pub description: String,
    /// Which trend makes this idea timely.
    pub why_now: String,
    /// One of `easy`, `medium` or `hard`.
    #[schemars(with = "String")]
    pub difficulty: Difficulty,
    pub tech_stack: Vec<String>,
    /// Concrete thing to do first.
    pub first_step: String,
}

/// Estimated effort of an idea.
///
/// Labels outside the known set are kept verbatim in `Unrated`, so a model
/// that answers "moderate" still produces a usable result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Unrated(String),
}

impl Difficulty {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Unrated(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unrated(raw) => raw,
        }
    }

    /// Colored marker used in chat messages.
    pub fn marker(&self) -> &'static str {
        match self {
            Difficulty::Easy => "🟢",
            Difficulty::Medium => "🟡",
            Difficulty::Hard => "🔴",
            Difficulty::Unrated(_) => "⚪",
        }
    }
}

impl From<String> for Difficulty {
    fn from(raw: String) -> Self {
        Difficulty::parse(&raw)
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Unrated(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_is_case_and_space_insensitive() {
        assert_eq!(Difficulty::parse("Easy"), Difficulty::Easy);
        assert_eq!(Difficulty::parse(" MEDIUM "), Difficulty::Medium);
        assert_eq!(Difficulty::parse("hard"), Difficulty::Hard);
        assert_eq!(
            Difficulty::parse("moderate"),
            Difficulty::Unrated("moderate".into())
        );
    }

    #[test]
    fn difficulty_serializes_canonically() {
        let json = serde_json::to_string(&Difficulty::parse("  Hard")).unwrap();
        assert_eq!(json, "\"hard\"");

        let unrated: Difficulty = serde_json::from_str("\"trivial\"").unwrap();
        assert_eq!(serde_json::to_string(&unrated).unwrap(), "\"trivial\"");
        assert_eq!(unrated.marker(), "⚪");
    }

    #[test]
    fn schema_names_every_field() {
        let schema = serde_json::to_value(schemars::schema_for!(AnalysisResult)).unwrap();
        let text = schema.to_string();
        for field in [
            "trend_summary",
            "ideas",
            "why_now",
            "difficulty",
            "tech_stack",
            "first_step",
        ] {
            assert!(text.contains(field), "schema is missing {field}");
        }
    }
}
