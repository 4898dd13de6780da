//! HTTP client utilities.

use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client honouring the configured timeout and contact address
    pub fn from_config(config: &HttpConfig) -> Result<Self, SourceError> {
        let user_agent = match &config.mailto {
            Some(mailto) => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                mailto
            ),
            None => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };
        Self::with_user_agent(&user_agent, Duration::from_secs(config.timeout_secs))
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        tracing::debug!("GET {}", url);
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        tracing::debug!("POST {}", url);
        self.client.post(url)
    }
}
