//! The engine instance slot.
//!
//! The engine is constructed asynchronously and exactly once. Every clone of
//! an [`EngineHandle`] awaits the same construction and receives the same
//! `Arc`, or the same error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::{HostError, Result};

type Construction<E> = Shared<BoxFuture<'static, std::result::Result<Arc<E>, Arc<HostError>>>>;

/// A shareable future resolving to the constructed engine.
pub struct EngineHandle<E> {
    construction: Construction<E>,
}

impl<E> Clone for EngineHandle<E> {
    fn clone(&self) -> Self {
        Self {
            construction: self.construction.clone(),
        }
    }
}

impl<E: Send + Sync + 'static> EngineHandle<E> {
    /// Wrap an engine constructor. It runs the first time any clone is awaited.
    pub fn new<F>(init: F) -> Self
    where
        F: Future<Output = Result<E>> + Send + 'static,
    {
        let construction = async move {
            match init.await {
                Ok(engine) => {
                    tracing::debug!("engine constructed");
                    Ok(Arc::new(engine))
                }
                Err(e) => {
                    tracing::error!(error = %e, "engine construction failed");
                    Err(Arc::new(e))
                }
            }
        }
        .boxed()
        .shared();
        Self { construction }
    }

    /// A handle to an engine that already exists.
    pub fn ready(engine: E) -> Self {
        Self::new(futures::future::ready(Ok(engine)))
    }

    /// Wait for the engine.
    pub async fn get(&self) -> Result<Arc<E>> {
        self.construction
            .clone()
            .await
            .map_err(HostError::EngineInit)
    }

    /// The engine, if construction already finished successfully.
    pub fn try_get(&self) -> Option<Arc<E>> {
        match self.construction.peek() {
            Some(Ok(engine)) => Some(engine.clone()),
            _ => None,
        }
    }
}

impl<E> fmt::Debug for EngineHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("constructed", &self.construction.peek().is_some())
            .finish()
    }
}
