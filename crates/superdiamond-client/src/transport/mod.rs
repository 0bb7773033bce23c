//! Channel to the configuration authority.
//!
//! The engine only needs three things from a channel: send one line, block
//! for the next message, and be closable from another thread so a blocked
//! receive returns. [`Transport`] captures that contract; [`TcpConnector`]
//! provides the production implementation.

mod errors;
mod tcp;

use std::sync::Arc;

use superdiamond_config::ServerEndpoint;

pub use self::errors::TransportError;
pub use self::tcp::{CONNECTION_TIMEOUT, MAX_FRAME_BYTES, TcpConnector, TcpTransport};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Outcome of a blocking receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// One complete snapshot blob.
    Message(String),
    /// The authority went away; the channel may not be used again.
    Disconnected,
    /// The channel was closed locally and will never yield again.
    Closed,
}

/// A connected channel to the authority.
pub trait Transport: Send {
    /// Sends one line; the transport appends the line terminator.
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Blocks until a message arrives or the channel ends.
    fn receive(&mut self) -> Result<Received, TransportError>;

    /// Whether the channel can still carry messages.
    fn is_connected(&self) -> bool;

    /// Handle that closes the channel from another thread.
    fn close_handle(&self) -> Arc<dyn CloseHandle>;
}

/// Closes a transport, waking any receive blocked on it.
pub trait CloseHandle: Send + Sync {
    /// Closes the channel. Calling it more than once has no further effect.
    fn close(&self);
}

/// Opens transports to an authority endpoint.
pub trait Connector: Send + Sync {
    /// Establishes a new channel.
    fn connect(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn Transport>, TransportError>;
}
