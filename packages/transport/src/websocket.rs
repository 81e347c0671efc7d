//! WebSocket adapter.
//!
//! Binds one host WebSocket connection to one engine-owned
//! [`WebSocketHandler`] for the connection's entire lifetime.
//!
//! # Lifecycle
//!
//! ```text
//! attach ─► Open ─► Message* ─► [Error] ─► Close ─► unbind + release
//!   │
//!   └─► detach (any time before Close) ─► unbind + release, no Close delivered
//! ```
//!
//! The close event is the single release point on the natural path. Once the
//! handler is released, further host events are dropped. Only binary frames
//! are bridged; text frames are logged and discarded.

use std::fmt;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use http::header::{HeaderValue, USER_AGENT};
use semantic_host_handle::{HandleError, HandleId, Owned, Slot};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::handler::{CloseEvent, SocketEvent, WebSocketHandler, CLOSE_NO_STATUS};

/// Result of dispatching one event to a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler received the event.
    Delivered,
    /// The handler received the close event and was released.
    Closed,
    /// The handler was already released; the event was dropped.
    Ignored,
}

/// The event bindings between one socket and one handler.
///
/// This is the transport-independent core of the adapter: it turns
/// [`SocketEvent`]s into handler calls and owns the handler until teardown.
pub struct WebSocketBinding<H: WebSocketHandler> {
    slot: Slot<H>,
    origin: String,
}

impl<H: WebSocketHandler> WebSocketBinding<H> {
    /// Take ownership of `handler` and bind it to a socket at `origin`.
    pub fn new(handler: H, origin: impl Into<String>) -> Self {
        Self {
            slot: Slot::new(Owned::new(handler)),
            origin: origin.into(),
        }
    }

    /// The handle identity of the bound handler.
    pub fn id(&self) -> HandleId {
        self.slot.id()
    }

    /// Whether the handler is still bound.
    pub fn is_attached(&self) -> bool {
        self.slot.is_attached()
    }

    /// Deliver one host event to the handler.
    pub fn dispatch(&mut self, event: SocketEvent) -> Dispatch {
        let origin = &self.origin;
        let delivered = match event {
            SocketEvent::Open => self.slot.with(|h| h.on_open()),
            SocketEvent::Message(data) => self.slot.with(|h| h.on_message(&data, origin)),
            SocketEvent::Error => self.slot.with(|h| h.on_error()),
            SocketEvent::Close(close) => {
                let delivered =
                    self.slot
                        .with(|h| h.on_close(close.code, &close.reason, close.was_clean));
                if delivered.is_ok() {
                    // Unbind and release regardless of what on_close did.
                    self.unbind("close");
                    return Dispatch::Closed;
                }
                delivered
            }
        };

        match delivered {
            Ok(()) => Dispatch::Delivered,
            Err(_) => {
                tracing::trace!(handler = %self.slot.id(), "dropping event for released handler");
                Dispatch::Ignored
            }
        }
    }

    /// Unbind and release the handler without delivering a close event.
    ///
    /// Fails if the handler was already released by a close or an earlier detach.
    pub fn detach(&mut self) -> std::result::Result<(), HandleError> {
        if !self.slot.is_attached() {
            return Err(HandleError::Released(self.slot.id()));
        }
        self.unbind("detach");
        Ok(())
    }

    fn unbind(&mut self, reason: &'static str) {
        tracing::debug!(handler = %self.slot.id(), reason, "releasing WebSocket handler");
        if self.slot.release().is_err() {
            tracing::warn!(handler = %self.slot.id(), "WebSocket handler already released");
        }
    }
}

impl<H: WebSocketHandler> fmt::Debug for WebSocketBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketBinding")
            .field("slot", &self.slot)
            .field("origin", &self.origin)
            .finish()
    }
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The handler saw the close event and was released.
    Closed,
    /// The host detached the handler before the connection closed.
    Detached,
}

enum Command {
    Send(Vec<u8>),
    Close { code: u16, reason: String },
    Detach,
}

/// Host-side handle to an attached WebSocket.
///
/// Dropping this does not close the socket; events keep flowing to the
/// handler until the peer closes the connection.
pub struct WebSocketConnection {
    id: HandleId,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<Teardown>,
}

impl WebSocketConnection {
    /// The handle identity of the bound handler.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Whether the connection has been torn down.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Queue a binary message for the peer.
    pub fn send(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.commands
            .send(Command::Send(data.into()))
            .map_err(|_| TransportError::Closed)
    }

    /// Start a closing handshake. The handler sees the close once the peer answers.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        self.commands
            .send(Command::Close {
                code,
                reason: reason.into(),
            })
            .map_err(|_| TransportError::Closed)
    }

    /// Abandon the connection: unbind and release the handler without a close event.
    ///
    /// If the connection already closed naturally, nothing is released twice
    /// and `Teardown::Closed` is returned.
    pub async fn detach(self) -> Result<Teardown> {
        // A send error means the pump already finished.
        let _ = self.commands.send(Command::Detach);
        join(self.task).await
    }

    /// Wait until the connection is torn down.
    pub async fn closed(self) -> Result<Teardown> {
        join(self.task).await
    }
}

impl fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

async fn join(task: JoinHandle<Teardown>) -> Result<Teardown> {
    task.await
        .map_err(|e| TransportError::Interrupted(e.to_string()))
}

/// Attach an already-open socket to `handler`, pumping it on `runtime`.
///
/// The handler immediately receives `on_open`; from then on every frame read
/// from `socket` is delivered in order.
pub fn attach<S, H>(
    runtime: &Handle,
    socket: S,
    handler: H,
    origin: impl Into<String>,
) -> WebSocketConnection
where
    S: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + 'static,
    H: WebSocketHandler + Send + 'static,
{
    let binding = WebSocketBinding::new(handler, origin);
    let id = binding.id();
    let (commands, rx) = mpsc::unbounded_channel();
    let task = runtime.spawn(pump(socket, binding, rx));
    WebSocketConnection { id, commands, task }
}

async fn pump<S, H>(
    socket: S,
    mut binding: WebSocketBinding<H>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) -> Teardown
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Sink<Message, Error = WsError>,
    H: WebSocketHandler,
{
    let (mut sink, mut stream) = socket.split();
    let mut commands_open = true;

    binding.dispatch(SocketEvent::Open);

    loop {
        tokio::select! {
            command = commands.recv(), if commands_open => match command {
                Some(Command::Send(data)) => {
                    if let Err(e) = sink.send(Message::Binary(data)).await {
                        tracing::warn!(handler = %binding.id(), error = %e, "failed to send message");
                        binding.dispatch(SocketEvent::Error);
                        binding.dispatch(SocketEvent::Close(CloseEvent::abnormal(e.to_string())));
                        return Teardown::Closed;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        tracing::debug!(handler = %binding.id(), error = %e, "failed to send close frame");
                    }
                }
                Some(Command::Detach) => {
                    if binding.detach().is_ok() {
                        if let Err(e) = sink.close().await {
                            tracing::debug!(error = %e, "error closing detached socket");
                        }
                        return Teardown::Detached;
                    }
                    return Teardown::Closed;
                }
                None => commands_open = false,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Binary(data))) => {
                    binding.dispatch(SocketEvent::Message(Bytes::from(data)));
                }
                Some(Ok(Message::Text(text))) => {
                    tracing::warn!(
                        handler = %binding.id(),
                        len = text.len(),
                        "dropping text frame; only binary frames are bridged"
                    );
                }
                Some(Ok(Message::Close(frame))) => {
                    let close = match frame {
                        Some(frame) => CloseEvent {
                            code: u16::from(frame.code),
                            reason: frame.reason.into_owned(),
                            was_clean: true,
                        },
                        None => CloseEvent {
                            code: CLOSE_NO_STATUS,
                            reason: String::new(),
                            was_clean: true,
                        },
                    };
                    binding.dispatch(SocketEvent::Close(close));
                    // Push out the close reply queued by the protocol layer.
                    if let Err(e) = sink.flush().await {
                        tracing::trace!(error = %e, "flush after close failed");
                    }
                    return Teardown::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(handler = %binding.id(), error = %e, "WebSocket error");
                    binding.dispatch(SocketEvent::Error);
                    binding.dispatch(SocketEvent::Close(CloseEvent::abnormal("")));
                    return Teardown::Closed;
                }
                None => {
                    binding.dispatch(SocketEvent::Close(CloseEvent::abnormal("")));
                    return Teardown::Closed;
                }
            },
        }
    }
}

/// Opens WebSocket connections in binary mode.
///
/// The handshake and the socket pump run on the runtime set with
/// [`WebSocketConnector::with_runtime`], falling back to the runtime current
/// at connect time.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: TransportConfig,
    runtime: Option<Handle>,
}

impl WebSocketConnector {
    /// Create a connector with the given configuration.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            runtime: None,
        }
    }

    /// Run connections on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Connect to `url` and attach `handler` to the resulting socket.
    ///
    /// If the connection cannot be established the handler receives
    /// `on_error` followed by `on_close(1006, reason, false)` and is released
    /// before the error is returned.
    pub async fn connect<H>(&self, url: &str, handler: H) -> Result<WebSocketConnection>
    where
        H: WebSocketHandler + Send + 'static,
    {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                // No socket ever existed, so there is nothing to close.
                drop(WebSocketBinding::new(handler, ""));
                return Err(e.into());
            }
        };
        let origin = parsed.origin().ascii_serialization();

        let opened = match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                let handshake = open(self.config.clone(), parsed);
                match runtime.spawn(handshake).await {
                    Ok(opened) => opened.map(|socket| (runtime, socket)),
                    Err(e) => Err(TransportError::Interrupted(e.to_string())),
                }
            }
            None => Err(TransportError::NoRuntime),
        };

        match opened {
            Ok((runtime, socket)) => {
                tracing::debug!(%url, "WebSocket connected");
                Ok(attach(&runtime, socket, handler, origin))
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "WebSocket connection failed");
                let mut binding = WebSocketBinding::new(handler, origin);
                binding.dispatch(SocketEvent::Error);
                binding.dispatch(SocketEvent::Close(CloseEvent::abnormal(e.to_string())));
                Err(e)
            }
        }
    }

}

type ClientSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn open(config: TransportConfig, url: Url) -> Result<ClientSocket> {
    let mut request = url.as_str().into_client_request()?;
    match HeaderValue::from_str(&config.user_agent) {
        Ok(value) => {
            request.headers_mut().insert(USER_AGENT, value);
        }
        Err(e) => tracing::warn!(error = %e, "ignoring invalid user agent"),
    }

    let timeout = config.connect_timeout;
    let (socket, _response) =
        tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CLOSE_ABNORMAL;
    use semantic_host_handle::testing::{ReleaseCounter, ReleaseProbe};
    use semantic_host_handle::Release;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Open,
        Message(Vec<u8>, String),
        Error,
        Close(u16, String, bool),
    }

    struct RecordingHandler {
        calls: Arc<Mutex<Vec<Call>>>,
        probe: ReleaseProbe,
    }

    fn recording_handler() -> (RecordingHandler, Arc<Mutex<Vec<Call>>>, ReleaseCounter) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (probe, released) = ReleaseProbe::new();
        let handler = RecordingHandler {
            calls: calls.clone(),
            probe,
        };
        (handler, calls, released)
    }

    impl WebSocketHandler for RecordingHandler {
        fn on_open(&mut self) {
            self.calls.lock().unwrap().push(Call::Open);
        }

        fn on_message(&mut self, data: &[u8], origin: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Message(data.to_vec(), origin.to_string()));
        }

        fn on_error(&mut self) {
            self.calls.lock().unwrap().push(Call::Error);
        }

        fn on_close(&mut self, code: u16, reason: &str, was_clean: bool) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Close(code, reason.to_string(), was_clean));
        }
    }

    impl Release for RecordingHandler {
        fn release(self) {
            self.probe.release();
        }
    }

    fn close(code: u16) -> SocketEvent {
        SocketEvent::Close(CloseEvent {
            code,
            reason: "bye".to_string(),
            was_clean: true,
        })
    }

    #[test]
    fn binding_delivers_events_in_order() {
        let (handler, calls, released) = recording_handler();
        let mut binding = WebSocketBinding::new(handler, "ws://engine");

        assert_eq!(binding.dispatch(SocketEvent::Open), Dispatch::Delivered);
        assert_eq!(
            binding.dispatch(SocketEvent::Message(Bytes::from_static(&[1, 2, 3]))),
            Dispatch::Delivered
        );
        assert_eq!(binding.dispatch(close(1000)), Dispatch::Closed);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Call::Open,
                Call::Message(vec![1, 2, 3], "ws://engine".to_string()),
                Call::Close(1000, "bye".to_string(), true),
            ]
        );
        assert_eq!(released.released(), 1);
        assert!(!binding.is_attached());
    }

    #[test]
    fn binding_drops_events_after_close() {
        let (handler, calls, released) = recording_handler();
        let mut binding = WebSocketBinding::new(handler, "ws://engine");

        binding.dispatch(close(1000));
        assert_eq!(binding.dispatch(SocketEvent::Open), Dispatch::Ignored);
        assert_eq!(binding.dispatch(SocketEvent::Error), Dispatch::Ignored);
        assert_eq!(
            binding.dispatch(SocketEvent::Message(Bytes::from_static(b"late"))),
            Dispatch::Ignored
        );
        assert_eq!(binding.dispatch(close(1001)), Dispatch::Ignored);

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(released.released(), 1);
    }

    #[test]
    fn binding_releases_once_when_close_follows_error() {
        let (handler, calls, released) = recording_handler();
        let mut binding = WebSocketBinding::new(handler, "");

        binding.dispatch(SocketEvent::Open);
        binding.dispatch(SocketEvent::Error);
        assert_eq!(released.released(), 0);
        binding.dispatch(SocketEvent::Close(CloseEvent::abnormal("")));

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Call::Open,
                Call::Error,
                Call::Close(CLOSE_ABNORMAL, String::new(), false),
            ]
        );
        assert_eq!(released.released(), 1);
    }

    #[test]
    fn detach_releases_without_close() {
        let (handler, calls, released) = recording_handler();
        let mut binding = WebSocketBinding::new(handler, "");

        binding.dispatch(SocketEvent::Open);
        assert!(binding.detach().is_ok());
        assert_eq!(binding.dispatch(close(1000)), Dispatch::Ignored);

        assert_eq!(*calls.lock().unwrap(), vec![Call::Open]);
        assert_eq!(released.released(), 1);
    }

    #[test]
    fn detach_after_close_is_rejected() {
        let (handler, _calls, released) = recording_handler();
        let mut binding = WebSocketBinding::new(handler, "");

        binding.dispatch(close(1000));
        assert!(binding.detach().is_err());
        assert_eq!(released.released(), 1);
    }

    #[test]
    fn second_detach_is_rejected() {
        let (handler, _calls, released) = recording_handler();
        let mut binding = WebSocketBinding::new(handler, "");

        binding.detach().unwrap();
        assert_eq!(
            binding.detach(),
            Err(HandleError::Released(binding.id()))
        );
        assert_eq!(released.released(), 1);
    }

    #[test]
    fn dropping_bound_binding_releases() {
        let (handler, _calls, released) = recording_handler();
        drop(WebSocketBinding::new(handler, ""));
        assert_eq!(released.released(), 1);
    }

    #[tokio::test]
    async fn connect_to_invalid_url_releases_without_events() {
        let (handler, calls, released) = recording_handler();
        let result = WebSocketConnector::default().connect("not a url", handler).await;

        assert!(matches!(result, Err(TransportError::UrlParse(_))));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(released.released(), 1);
    }

    #[tokio::test]
    async fn connect_failure_delivers_error_then_close() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (handler, calls, released) = recording_handler();
        let result = WebSocketConnector::default()
            .connect(&format!("ws://{}", addr), handler)
            .await;

        assert!(result.is_err());
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], Call::Error);
        assert!(matches!(calls[1], Call::Close(CLOSE_ABNORMAL, _, false)));
        assert_eq!(released.released(), 1);
    }

    #[test]
    fn connect_without_runtime_fails_like_a_refused_socket() {
        let (handler, calls, released) = recording_handler();
        let result = futures::executor::block_on(
            WebSocketConnector::default().connect("ws://127.0.0.1:9", handler),
        );

        assert!(matches!(result, Err(TransportError::NoRuntime)));
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], Call::Error);
        assert!(matches!(calls[1], Call::Close(CLOSE_ABNORMAL, _, false)));
        assert_eq!(released.released(), 1);
    }

    #[test]
    fn connect_from_foreign_thread_runs_on_captured_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        runtime.spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
            socket.send(Message::Binary(vec![7])).await.unwrap();
            socket.close(None).await.unwrap();
        });

        let connector =
            WebSocketConnector::new(TransportConfig::default()).with_runtime(runtime.handle().clone());
        let (handler, calls, released) = recording_handler();
        let teardown = std::thread::spawn(move || {
            futures::executor::block_on(async move {
                let connection = connector
                    .connect(&format!("ws://{}", addr), handler)
                    .await
                    .unwrap();
                connection.closed().await.unwrap()
            })
        })
        .join()
        .unwrap();

        assert_eq!(teardown, Teardown::Closed);
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], Call::Open);
        assert_eq!(calls[1], Call::Message(vec![7], format!("ws://{}", addr)));
        assert!(matches!(calls[2], Call::Close(_, _, true)));
        assert_eq!(released.released(), 1);
    }
}
