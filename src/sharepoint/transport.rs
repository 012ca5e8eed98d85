//! HTTP transport for SharePoint REST calls

use crate::config::Credentials;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// Default network timeout when the configuration does not provide one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes an authenticated GET and returns the response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, url: &str, credentials: &Credentials) -> Result<String>;
}

/// `Basic` authorization header value for the given credentials
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let encoded = STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded)
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
}

impl HttpTransport {
    /// Create a transport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            tracing::error!("Failed to build HTTP client: {}", e);
            BridgeError::Connection
        })?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, url: &str, credentials: &Credentials) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .header(
                AUTHORIZATION,
                basic_auth_header(credentials.username(), credentials.password()),
            )
            // SharePoint has always been sent this header on a bodiless GET
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Request to SharePoint failed: {}", e);
                BridgeError::Connection
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("SharePoint responded with status {}", status);
        }

        response.text().await.map_err(|e| {
            tracing::error!("Failed to read SharePoint response body: {}", e);
            BridgeError::Connection
        })
    }
}
