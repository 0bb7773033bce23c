//! Error types for authority transport operations.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors surfaced while talking to the configuration authority.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The authority host name did not resolve.
    #[error("failed to resolve authority address {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP connection could not be established.
    #[error("failed to connect to authority at {endpoint}: {source}")]
    Connect {
        /// Endpoint being dialled.
        endpoint: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// Writing to the authority failed.
    #[error("failed to send to authority at {endpoint}: {source}")]
    Send {
        /// Remote endpoint.
        endpoint: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// Reading from the authority failed.
    #[error("failed to receive from authority at {endpoint}: {source}")]
    Receive {
        /// Remote endpoint.
        endpoint: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// A frame announced more bytes than the transport accepts.
    #[error("authority at {endpoint} sent a {length} byte frame (limit {limit})")]
    FrameTooLarge {
        /// Remote endpoint.
        endpoint: String,
        /// Announced frame length.
        length: usize,
        /// Largest accepted frame.
        limit: usize,
    },
    /// A frame was not valid UTF-8.
    #[error("authority at {endpoint} sent a frame that is not UTF-8: {source}")]
    InvalidUtf8 {
        /// Remote endpoint.
        endpoint: String,
        /// Decoding error.
        #[source]
        source: FromUtf8Error,
    },
}

impl TransportError {
    /// Whether the error means the authority could not be reached at all.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Resolve { .. } | Self::Connect { .. })
    }
}
