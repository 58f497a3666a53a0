#![cfg(feature = "twitter")]

use serde::{Deserialize, Serialize};

/// Request body for the Sela `scrapeUrl` RPC.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelaScrapeRequest {
    pub url: String,
    pub scrape_type: String,
    pub timeout_ms: u64,
    pub post_count: usize,
    pub scroll_pause_time: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelaScrapeResponse {
    #[serde(default)]
    pub data: SelaScrapeData,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelaScrapeData {
    #[serde(default)]
    pub result: Vec<SelaPost>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelaPost {
    #[serde(default)]
    pub tweet_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub likes_count: Option<u64>,
    #[serde(default)]
    pub views_count: Option<u64>,
}

impl SelaPost {
    /// Likes when there are any, otherwise views.
    pub fn popularity(&self) -> Option<u64> {
        self.likes_count
            .filter(|&likes| likes > 0)
            .or(self.views_count)
    }
}
