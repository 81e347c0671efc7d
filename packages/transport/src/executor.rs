//! HTTP execution abstraction for testing.
//!
//! The fetch adapter talks to the network through [`FetchExecutor`], so tests
//! can substitute canned responses without a server.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;

use crate::config::TransportConfig;
use crate::error::Result;

/// A binary POST to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Response head plus a deferred body.
///
/// The body is only read if the caller decides the response is acceptable.
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: BoxFuture<'static, std::result::Result<Bytes, String>>,
}

impl FetchResponse {
    /// Build a response whose body is already in memory.
    pub fn ready(status: u16, content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: futures::future::ready(Ok(body)).boxed(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Trait for executing binary HTTP exchanges.
///
/// Returns `Err` with a message if no response head could be obtained.
#[async_trait]
pub trait FetchExecutor: Send + Sync {
    async fn post(&self, request: FetchRequest) -> std::result::Result<FetchResponse, String>;
}

/// Production executor using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    /// Create an executor honoring the configured timeouts and user agent.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl FetchExecutor for ReqwestExecutor {
    async fn post(&self, request: FetchRequest) -> std::result::Result<FetchResponse, String> {
        let content_type = HeaderValue::from_str(&request.content_type).map_err(|e| e.to_string())?;

        let response = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, content_type)
            .body(request.body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = async move { response.bytes().await.map_err(|e| e.to_string()) }.boxed();

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}
