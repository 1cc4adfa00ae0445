//! HTTP transport used for catalog requests

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::config::Config;
use crate::error::{Error, FetchError, Result};

/// Status and body of a completed HTTP exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, if it is valid UTF-8 and not empty
    pub fn text(&self) -> Option<String> {
        std::str::from_utf8(&self.body)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    }

    /// Turn a non-2xx response into a [`FetchError`]
    ///
    /// 401 means the credential was rejected, which no later request can fix, so it is
    /// reported as [`FetchError::Unauthenticated`].
    pub fn error_for_status(self) -> std::result::Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else if self.status == 401 {
            Err(FetchError::Unauthenticated)
        } else {
            Err(FetchError::Transport {
                status: self.status,
                body: self.text(),
            })
        }
    }
}

/// Sends authenticated GET requests
///
/// Only connection-level problems are errors here; any HTTP status is a successful
/// exchange and is interpreted by the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` with the given `Authorization` header value
    async fn get(
        &self,
        url: &str,
        authorization: &str,
    ) -> std::result::Result<HttpResponse, FetchError>;
}

/// Production [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the configured user agent and timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        authorization: &str,
    ) -> std::result::Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
