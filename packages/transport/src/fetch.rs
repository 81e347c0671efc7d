//! HTTP fetch adapter.
//!
//! Performs one binary POST on behalf of an engine-owned [`FetchHandler`] and
//! delivers exactly one outcome: `resolve` with the response body, or
//! `reject` with a description of what went wrong. The handler is released
//! after the outcome regardless of which one it was.

use std::sync::Arc;

use bytes::Bytes;
use semantic_host_handle::Owned;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::executor::{FetchExecutor, FetchRequest, ReqwestExecutor};
use crate::handler::FetchHandler;

/// Content type of request bodies posted by the adapter.
pub const REQUEST_CONTENT_TYPE: &str = "application/x-semantic-editor-request";

/// The only content type accepted for response bodies.
pub const RESPONSE_CONTENT_TYPE: &str = "application/x-semantic-editor-response";

/// The outcome delivered to a fetch handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `resolve` was called with a body of this many bytes.
    Resolved(usize),
    /// `reject` was called with this message.
    Rejected(String),
}

/// Issues binary POST requests for engine fetch handlers.
///
/// Spawned fetches run on the runtime captured at construction (or set with
/// [`FetchAdapter::with_runtime`]), so they can be issued from any thread.
pub struct FetchAdapter<E: FetchExecutor = ReqwestExecutor> {
    executor: Arc<E>,
    runtime: Option<Handle>,
}

impl<E: FetchExecutor> Clone for FetchAdapter<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl FetchAdapter<ReqwestExecutor> {
    /// Create an adapter backed by reqwest.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        Ok(Self::with_executor(ReqwestExecutor::new(config)?))
    }
}

impl<E: FetchExecutor + 'static> FetchAdapter<E> {
    /// Create an adapter backed by a custom executor.
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Spawn fetches on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// POST `payload` to `url` and deliver the outcome to `handler`.
    ///
    /// A response counts as successful only if its status is 2xx and its
    /// content type is exactly [`RESPONSE_CONTENT_TYPE`].
    pub async fn perform_fetch<H: FetchHandler>(
        &self,
        url: &str,
        payload: impl Into<Bytes>,
        handler: H,
    ) -> FetchOutcome {
        let mut handle = Owned::new(handler);
        let id = handle.id();
        tracing::debug!(handler = %id, %url, "performing fetch");

        let outcome = match self.exchange(url, payload.into()).await {
            Ok(body) => {
                handle.get_mut().resolve(&body);
                FetchOutcome::Resolved(body.len())
            }
            Err(message) => {
                tracing::debug!(handler = %id, %message, "fetch rejected");
                handle.get_mut().reject(&message);
                FetchOutcome::Rejected(message)
            }
        };

        handle.release();
        outcome
    }

    /// Run [`FetchAdapter::perform_fetch`] in the background.
    ///
    /// Without a runtime to spawn on, the handler is rejected and released
    /// immediately and [`TransportError::NoRuntime`] is returned.
    pub fn spawn_fetch<H>(
        &self,
        url: impl Into<String>,
        payload: impl Into<Bytes>,
        handler: H,
    ) -> Result<JoinHandle<FetchOutcome>>
    where
        H: FetchHandler + Send + 'static,
    {
        let url = url.into();
        let runtime = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => runtime,
            None => {
                let mut handle = Owned::new(handler);
                tracing::error!(handler = %handle.id(), %url, "no runtime to run fetch on");
                handle.get_mut().reject("fetch failed: no runtime available");
                handle.release();
                return Err(TransportError::NoRuntime);
            }
        };

        let adapter = self.clone();
        let payload = payload.into();
        Ok(runtime.spawn(async move { adapter.perform_fetch(&url, payload, handler).await }))
    }

    async fn exchange(&self, url: &str, payload: Bytes) -> std::result::Result<Bytes, String> {
        let request = FetchRequest {
            url: url.to_string(),
            content_type: REQUEST_CONTENT_TYPE.to_string(),
            body: payload,
        };

        let response = self
            .executor
            .post(request)
            .await
            .map_err(|e| format!("fetch failed: {}", e))?;

        let content_type = response.content_type.as_deref();
        if !response.is_success() || content_type != Some(RESPONSE_CONTENT_TYPE) {
            return Err(format!(
                "got bad response: status {} content-type {}",
                response.status,
                content_type.unwrap_or("<none>")
            ));
        }

        response
            .body
            .await
            .map_err(|e| format!("failed to read response body: {}", e))
    }
}
