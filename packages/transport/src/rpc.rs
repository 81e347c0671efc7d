//! Request/response RPC over the fetch adapter.

use bytes::Bytes;

use crate::channel::{ChannelFetchHandler, FetchCall};
use crate::executor::{FetchExecutor, ReqwestExecutor};
use crate::fetch::FetchAdapter;

/// Sends each RPC as one binary POST to `{base_url}/{service}/{method}`.
pub struct HttpRpcClient<E: FetchExecutor = ReqwestExecutor> {
    base_url: String,
    adapter: FetchAdapter<E>,
}

impl<E: FetchExecutor> Clone for HttpRpcClient<E> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            adapter: self.adapter.clone(),
        }
    }
}

impl<E: FetchExecutor + 'static> HttpRpcClient<E> {
    pub fn new(base_url: impl Into<String>, adapter: FetchAdapter<E>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, adapter }
    }

    /// The URL a call to `service`/`method` is posted to.
    pub fn method_url(&self, service: &str, method: &str) -> String {
        format!("{}/{}/{}", self.base_url, service, method)
    }

    /// Issue a call. The returned future resolves to the response body.
    ///
    /// The call runs on the adapter's runtime. Without one, the future
    /// resolves to a rejection.
    pub fn call(&self, service: &str, method: &str, payload: impl Into<Bytes>) -> FetchCall {
        let url = self.method_url(service, method);
        tracing::debug!(%url, "sending RPC request");
        let (handler, call) = ChannelFetchHandler::channel();
        // The outcome travels through the channel; the join handle is not needed.
        if let Err(e) = self.adapter.spawn_fetch(url, payload, handler) {
            tracing::warn!(error = %e, "RPC request not sent");
        }
        call
    }
}
