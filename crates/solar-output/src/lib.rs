use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use types::GetOverviewResponse;

pub const DEFAULT_BASE_URL: &str = "https://monitoringapi.solaredge.com";

/// Connection settings for the monitoring REST endpoint.
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme, host and optional path prefix; `/site/...` is appended.
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("invalid endpoint url {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint answered {status}")]
    Status { status: StatusCode },
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// The network capability the application fetches output through.
#[async_trait]
pub trait SolarOutputProvider: Send + Sync {
    async fn get_overview(&self, customer_id: &str) -> Result<GetOverviewResponse, OutputError>;

    fn api_key(&self) -> &str;

    /// Per-request timeout in milliseconds.
    fn timeout_ms(&self) -> u64;
}

#[derive(Debug, Clone)]
pub struct SolarOutputClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl SolarOutputClient {
    pub fn new(config: ClientConfig) -> Result<Self, OutputError> {
        // Malformed endpoints fail here, not on first refresh.
        let endpoint = overview_url(&config.base_url, "0", &config.api_key)?;
        let mut builder = reqwest::Client::builder();
        if is_loopback(&endpoint) {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl SolarOutputProvider for SolarOutputClient {
    async fn get_overview(&self, customer_id: &str) -> Result<GetOverviewResponse, OutputError> {
        let url = overview_url(&self.config.base_url, customer_id, &self.config.api_key)?;
        debug!(customer_id, url = %url.path(), "requesting overview");

        let timeout_ms = self.config.timeout_ms;
        let request = async {
            let response = self.http.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(OutputError::Status { status });
            }
            Ok(response.json::<GetOverviewResponse>().await?)
        };

        match timeout(Duration::from_millis(timeout_ms), request).await {
            Ok(Ok(overview)) => {
                debug!(customer_id, power = overview.power(), "overview received");
                Ok(overview)
            }
            Ok(Err(err)) => {
                warn!(customer_id, error = %err, "overview request failed");
                Err(err)
            }
            Err(_) => {
                warn!(customer_id, timeout_ms, "overview request timed out");
                Err(OutputError::Timeout { timeout_ms })
            }
        }
    }

    fn api_key(&self) -> &str {
        &self.config.api_key
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout_ms
    }
}

/// `{base}/site/{customer_id}/overview.json?api_key={api_key}`
pub fn overview_url(base_url: &str, customer_id: &str, api_key: &str) -> Result<Url, OutputError> {
    let mut url =
        Url::parse(base_url).map_err(|err| OutputError::InvalidUrl(format!("{base_url}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(OutputError::InvalidUrl(base_url.to_string()));
    }
    url.path_segments_mut()
        .map_err(|_| OutputError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(["site", customer_id, "overview.json"]);
    url.query_pairs_mut().append_pair("api_key", api_key);
    Ok(url)
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}
