//! The assembled host bridge.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use semantic_host_file_tree::{FileMetadata, FileTreeStore, MetadataSource};
use semantic_host_scheduler::{MicrotaskExecutor, ScheduledUnit, Scheduler, WorkUnit};
use semantic_host_transport::{
    FetchAdapter, FetchCall, FetchHandler, FetchOutcome, HttpRpcClient, WebSocketConnection,
    WebSocketConnector, WebSocketHandler,
};
use tokio::task::JoinHandle;

use crate::config::HostConfig;
use crate::engine::EngineHandle;
use crate::error::{HostError, Result};

/// Everything the engine needs from its host, wired from one [`HostConfig`].
///
/// # Example
///
/// ```ignore
/// let host = Host::new(HostConfig::load("host.json")?, async { Engine::boot().await })?;
///
/// host.schedule(unit);
/// host.fetch_file_metadata("/docs").await?;
/// let tree = host.file_tree().snapshot();
/// ```
pub struct Host<E> {
    config: HostConfig,
    scheduler: Scheduler,
    executor: MicrotaskExecutor,
    fetch: FetchAdapter,
    websockets: WebSocketConnector,
    rpc: Option<HttpRpcClient>,
    file_tree: FileTreeStore,
    engine: EngineHandle<E>,
}

impl<E: Send + Sync + 'static> Host<E> {
    /// Build a host on the current tokio runtime.
    ///
    /// `init` constructs the engine; it runs once, the first time the engine
    /// is needed. Scheduling, fetches and sockets all run on the runtime
    /// captured here, so the host may be used from other threads afterwards.
    pub fn new<F>(config: HostConfig, init: F) -> Result<Self>
    where
        F: Future<Output = Result<E>> + Send + 'static,
    {
        let scheduler = Scheduler::new(config.scheduler.clone())?;
        let executor = MicrotaskExecutor::new(scheduler.clone());
        let runtime = scheduler.runtime().clone();
        let fetch = FetchAdapter::new(&config.transport)?.with_runtime(runtime.clone());
        let websockets = WebSocketConnector::new(config.transport.clone()).with_runtime(runtime);
        let rpc = config
            .rpc_base_url
            .as_ref()
            .map(|base| HttpRpcClient::new(base.clone(), fetch.clone()));

        tracing::debug!(rpc = ?config.rpc_base_url, "host initialized");
        Ok(Self {
            config,
            scheduler,
            executor,
            fetch,
            websockets,
            rpc,
            file_tree: FileTreeStore::new(),
            engine: EngineHandle::new(init),
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn executor(&self) -> &MicrotaskExecutor {
        &self.executor
    }

    pub fn file_tree(&self) -> &FileTreeStore {
        &self.file_tree
    }

    pub fn engine(&self) -> &EngineHandle<E> {
        &self.engine
    }

    /// Queue an engine work unit.
    pub fn schedule<U>(&self, unit: U) -> ScheduledUnit
    where
        U: WorkUnit + Send + 'static,
    {
        self.scheduler.schedule(unit)
    }

    /// Drive an engine future from microtasks.
    pub fn spawn<F>(&self, future: F) -> ScheduledUnit
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.executor.spawn(future)
    }

    /// POST `payload` to `url` on behalf of `handler`.
    pub fn perform_fetch<H>(
        &self,
        url: impl Into<String>,
        payload: impl Into<Bytes>,
        handler: H,
    ) -> Result<JoinHandle<FetchOutcome>>
    where
        H: FetchHandler + Send + 'static,
    {
        Ok(self.fetch.spawn_fetch(url, payload, handler)?)
    }

    /// Open a WebSocket for `handler`.
    pub async fn connect_websocket<H>(&self, url: &str, handler: H) -> Result<WebSocketConnection>
    where
        H: WebSocketHandler + Send + 'static,
    {
        Ok(self.websockets.connect(url, handler).await?)
    }

    /// Issue an RPC against the configured base URL.
    pub fn call(&self, service: &str, method: &str, payload: impl Into<Bytes>) -> Result<FetchCall> {
        let rpc = self.rpc.as_ref().ok_or(HostError::NoRpcBaseUrl)?;
        Ok(rpc.call(service, method, payload))
    }

    /// Start a fresh session: the file tree goes back to an unfetched root.
    pub fn reset_session(&self) {
        tracing::info!("resetting host session");
        self.file_tree.reset();
    }
}

impl<E: MetadataSource + Send + Sync + 'static> Host<E> {
    /// Ask the engine for the metadata at `path` and merge it into the file tree.
    pub async fn fetch_file_metadata(&self, path: &str) -> Result<FileMetadata> {
        let engine: Arc<E> = self.engine.get().await?;
        Ok(self.file_tree.fetch(engine.as_ref(), path).await?)
    }
}
