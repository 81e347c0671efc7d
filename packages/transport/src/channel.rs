//! Handlers that forward outcomes into channels.
//!
//! These bridge the callback-style handler traits back into async Rust: a
//! [`ChannelFetchHandler`] completes a [`FetchCall`] future, and a
//! [`ChannelSocketHandler`] feeds a [`SocketEvents`] stream.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use semantic_host_handle::Release;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, TransportError};
use crate::handler::{CloseEvent, FetchHandler, SocketEvent, WebSocketHandler};

type Delivery = std::result::Result<Bytes, String>;

/// A fetch handler that completes a paired [`FetchCall`].
#[derive(Debug)]
pub struct ChannelFetchHandler {
    tx: Option<oneshot::Sender<Delivery>>,
}

impl ChannelFetchHandler {
    /// Create a handler and the future that observes its outcome.
    pub fn channel() -> (Self, FetchCall) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, FetchCall { rx })
    }

    fn deliver(&mut self, delivery: Delivery) {
        match self.tx.take() {
            Some(tx) => {
                // The caller may have stopped waiting.
                let _ = tx.send(delivery);
            }
            None => tracing::error!("fetch handler called twice"),
        }
    }
}

impl FetchHandler for ChannelFetchHandler {
    fn resolve(&mut self, data: &[u8]) {
        self.deliver(Ok(Bytes::copy_from_slice(data)));
    }

    fn reject(&mut self, error: &str) {
        self.deliver(Err(error.to_string()));
    }
}

impl Release for ChannelFetchHandler {
    fn release(self) {
        if self.tx.is_some() {
            tracing::warn!("fetch handler released without an outcome");
        }
    }
}

/// Resolves to the outcome delivered to the paired [`ChannelFetchHandler`].
#[derive(Debug)]
pub struct FetchCall {
    rx: oneshot::Receiver<Delivery>,
}

impl Future for FetchCall {
    type Output = Result<Bytes>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|delivery| match delivery {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(message)) => Err(TransportError::Rejected(message)),
            Err(_) => Err(TransportError::Canceled),
        })
    }
}

/// A WebSocket handler that forwards every event into a [`SocketEvents`] stream.
///
/// The stream ends once the handler is released.
#[derive(Debug)]
pub struct ChannelSocketHandler {
    tx: mpsc::UnboundedSender<SocketEvent>,
}

impl ChannelSocketHandler {
    /// Create a handler and the stream its events are forwarded to.
    pub fn new() -> (Self, SocketEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, SocketEvents { rx })
    }

    fn forward(&self, event: SocketEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("socket event receiver dropped");
        }
    }
}

impl WebSocketHandler for ChannelSocketHandler {
    fn on_open(&mut self) {
        self.forward(SocketEvent::Open);
    }

    fn on_message(&mut self, data: &[u8], _origin: &str) {
        self.forward(SocketEvent::Message(Bytes::copy_from_slice(data)));
    }

    fn on_error(&mut self) {
        self.forward(SocketEvent::Error);
    }

    fn on_close(&mut self, code: u16, reason: &str, was_clean: bool) {
        self.forward(SocketEvent::Close(CloseEvent {
            code,
            reason: reason.to_string(),
            was_clean,
        }));
    }
}

impl Release for ChannelSocketHandler {
    fn release(self) {
        // Dropping the sender ends the event stream.
        drop(self.tx);
        tracing::trace!("socket handler released");
    }
}

/// Stream of events delivered to a [`ChannelSocketHandler`].
#[derive(Debug)]
pub struct SocketEvents {
    rx: mpsc::UnboundedReceiver<SocketEvent>,
}

impl SocketEvents {
    /// The next event, or `None` once the handler has been released.
    pub async fn recv(&mut self) -> Option<SocketEvent> {
        self.rx.recv().await
    }

    /// Drain events until the handler is released.
    pub async fn collect_all(mut self) -> Vec<SocketEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for SocketEvents {
    type Item = SocketEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
