//! Engine-side handler interfaces.
//!
//! Handlers are created by the engine, one per connection or request, and
//! handed to the host. The host invokes their callbacks in dispatch order and
//! releases them on the terminal event.

use bytes::Bytes;
use semantic_host_handle::Release;

/// Sink for the lifecycle events of one WebSocket connection.
pub trait WebSocketHandler: Release {
    /// The connection is open.
    fn on_open(&mut self);

    /// A binary message arrived.
    fn on_message(&mut self, data: &[u8], origin: &str);

    /// The connection reported an error. A close event follows.
    fn on_error(&mut self);

    /// The connection closed. This is the last call the handler receives.
    fn on_close(&mut self, code: u16, reason: &str, was_clean: bool);
}

/// Sink for the single outcome of one HTTP fetch.
pub trait FetchHandler: Release {
    /// The exchange succeeded with the given response body.
    fn resolve(&mut self, data: &[u8]);

    /// The exchange failed; `error` describes what was observed.
    fn reject(&mut self, error: &str);
}

/// Close status used when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Close status used when a close frame carried no status code.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close status for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Details of a WebSocket close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
}

impl CloseEvent {
    /// A close without a closing handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

/// One host-side WebSocket event, normalized for delivery to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Open,
    Message(Bytes),
    Error,
    Close(CloseEvent),
}

impl SocketEvent {
    /// Whether this event ends the connection.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SocketEvent::Close(_))
    }
}
