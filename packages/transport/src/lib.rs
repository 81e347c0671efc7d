//! # semantic-host-transport
//!
//! Host-side WebSocket and HTTP fetch adapters.
//!
//! The engine hands the host a handler object per connection or request. The
//! host performs the I/O and delivers the resulting events to the handler,
//! releasing it on the terminal event.
//!
//! ## WebSocket
//!
//! Binary-mode connections with open / message / error / close callbacks:
//!
//! ```ignore
//! use semantic_host_transport::{ChannelSocketHandler, WebSocketConnector};
//!
//! let (handler, mut events) = ChannelSocketHandler::new();
//! let connection = WebSocketConnector::default().connect("ws://localhost:8080", handler).await?;
//! connection.send(vec![1, 2, 3])?;
//! while let Some(event) = events.recv().await {
//!     // Open, Message, Error, Close
//! }
//! ```
//!
//! ## Fetch
//!
//! One binary POST per handler, resolved or rejected exactly once:
//!
//! ```ignore
//! use semantic_host_transport::{ChannelFetchHandler, FetchAdapter, TransportConfig};
//!
//! let adapter = FetchAdapter::new(&TransportConfig::default())?;
//! let (handler, call) = ChannelFetchHandler::channel();
//! adapter.spawn_fetch("https://engine.example.com/rpc", payload, handler);
//! let body = call.await?;
//! ```
//!
//! [`HttpRpcClient`] wraps the fetch adapter for request/response RPC.

pub mod channel;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod handler;
pub mod rpc;
pub mod websocket;

pub use channel::{ChannelFetchHandler, ChannelSocketHandler, FetchCall, SocketEvents};
pub use config::TransportConfig;
pub use error::{Result, TransportError};
pub use executor::{FetchExecutor, FetchRequest, FetchResponse, ReqwestExecutor};
pub use fetch::{FetchAdapter, FetchOutcome, REQUEST_CONTENT_TYPE, RESPONSE_CONTENT_TYPE};
pub use handler::{
    CloseEvent, FetchHandler, SocketEvent, WebSocketHandler, CLOSE_ABNORMAL, CLOSE_NORMAL,
    CLOSE_NO_STATUS,
};
pub use rpc::HttpRpcClient;
pub use websocket::{attach, Dispatch, Teardown, WebSocketBinding, WebSocketConnection, WebSocketConnector};
