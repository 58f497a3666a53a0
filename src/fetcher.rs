use crate::TrendError;
use reqwest::{header::HeaderMap, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Shared HTTP client handed to every source of a collector.
///
/// Cloning is cheap: all clones share one connection pool, which is released
/// once the last clone is dropped.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build configured HTTP client, using defaults");
            Self::with_client(Client::new())
        })
    }

    /// Creates a Fetcher with custom configuration
    pub fn new_with_config(config: FetcherConfig) -> Result<Self, TrendError> {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(10);

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        let client = client_builder.build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    #[instrument(level = "debug", skip(self, query), err)]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
        accept: Option<&str>,
    ) -> Result<T, TrendError> {
        let mut request = self.client.get(url).query(query);
        if let Some(accept) = accept {
            request = request.header("Accept", accept);
        }
        self.send_json(service, request).await
    }

    #[instrument(level = "debug", skip(self, body, bearer), err)]
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        body: &B,
        bearer: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<T, TrendError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        self.send_json(service, request).await
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        service: &str,
        request: RequestBuilder,
    ) -> Result<T, TrendError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TrendError::Timeout(format!("{service}: {e}"))
            } else {
                TrendError::Http(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TrendError::UpstreamStatus {
                service: service.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(service = %service, content_length = body.len(), "Received response");
        Ok(serde_json::from_str(&body)?)
    }
}

pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            // GitHub rejects requests without a user agent.
            user_agent: concat!("trend-ideas/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            headers: None,
        }
    }
}
