pub mod error;
pub mod retry;

pub use error::{FetchError, Result};
pub use retry::RetryPolicy;

use std::time::Duration;

use async_trait::async_trait;

/// Browser-like identity the archive site expects.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Connection settings for [`SiteClient`]. Passed in explicitly; nothing is read
/// from process-wide state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Forward proxy for both http and https, e.g. `http://127.0.0.1:7890`.
    pub proxy: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// GET-only view of the remote site. Stages depend on this rather than on
/// `SiteClient` so they can run against scripted responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct SiteClient {
    client: reqwest::Client,
}

impl SiteClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout);

        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| FetchError::Client(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        tracing::debug!(proxy = ?config.proxy, "SiteClient initialized");
        Ok(Self { client })
    }

    async fn get_ok(&self, url: &str) -> Result<reqwest::Response> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Fetcher for SiteClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.get_ok(url).await?;
        resp.text().await.map_err(|e| FetchError::Body(e.to_string()))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.get_ok(url).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
