#![cfg(feature = "github")]

use serde::Deserialize;

/// Body of `GET /search/repositories`.
#[derive(Debug, Deserialize)]
pub struct GitHubSearchResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<GitHubRepository>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubRepository {
    pub full_name: String,
    pub description: Option<String>,
    pub stargazers_count: u64,
    pub language: Option<String>,
    pub html_url: String,
}

impl GitHubRepository {
    /// `owner/name - Language`, with `Unknown` when GitHub could not detect one.
    pub fn headline(&self) -> String {
        format!(
            "{} - {}",
            self.full_name,
            self.language.as_deref().unwrap_or("Unknown")
        )
    }
}
