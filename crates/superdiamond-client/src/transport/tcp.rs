//! TCP transport to the authority.
//!
//! The client writes one `\r\n`-terminated line per request. The authority
//! answers with frames: a four byte big-endian length, then that many bytes
//! of UTF-8 snapshot text.

use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use superdiamond_config::ServerEndpoint;
use tracing::debug;

use super::{CloseHandle, Connector, Received, TRANSPORT_TARGET, Transport, TransportError};

/// Upper bound on establishing a connection.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest snapshot frame accepted from the authority.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Connector dialling the authority over TCP.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    timeout: Duration,
}

impl TcpConnector {
    /// Builds a connector with the default timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: CONNECTION_TIMEOUT,
        }
    }

    /// Replaces the connection timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TcpConnector {
    fn connect(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn Transport>, TransportError> {
        let endpoint_display = endpoint.to_string();
        let address = resolve_tcp_address(endpoint.host(), endpoint.port()).map_err(|source| {
            TransportError::Resolve {
                endpoint: endpoint_display.clone(),
                source,
            }
        })?;
        let stream = TcpStream::connect_timeout(&address, self.timeout).map_err(|source| {
            TransportError::Connect {
                endpoint: endpoint_display.clone(),
                source,
            }
        })?;
        let transport = TcpTransport::new(stream, endpoint_display)?;
        Ok(Box::new(transport))
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

/// Framed TCP channel to the authority.
pub struct TcpTransport {
    endpoint: String,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    connected: bool,
    control: Arc<TcpCloseHandle>,
}

impl TcpTransport {
    /// Wraps a connected stream.
    pub fn new(stream: TcpStream, endpoint: impl Into<String>) -> Result<Self, TransportError> {
        let endpoint = endpoint.into();
        let clone_error = |source| TransportError::Connect {
            endpoint: endpoint.clone(),
            source,
        };
        let writer = stream.try_clone().map_err(clone_error)?;
        let control = stream.try_clone().map_err(clone_error)?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            connected: true,
            control: Arc::new(TcpCloseHandle {
                stream: control,
                closed: AtomicBool::new(false),
                endpoint: endpoint.clone(),
            }),
            endpoint,
        })
    }

    fn read_failed(&mut self, source: io::Error) -> Result<Received, TransportError> {
        self.connected = false;
        if self.control.is_closed() {
            return Ok(Received::Closed);
        }
        Err(TransportError::Receive {
            endpoint: self.endpoint.clone(),
            source,
        })
    }
}

impl Transport for TcpTransport {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let result = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.write_all(b"\r\n"))
            .and_then(|()| self.writer.flush());
        result.map_err(|source| {
            self.connected = false;
            TransportError::Send {
                endpoint: self.endpoint.clone(),
                source,
            }
        })
    }

    fn receive(&mut self) -> Result<Received, TransportError> {
        if self.control.is_closed() {
            return Ok(Received::Closed);
        }

        let mut header = [0_u8; 4];
        match self.reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                self.connected = false;
                if self.control.is_closed() {
                    return Ok(Received::Closed);
                }
                return Ok(Received::Disconnected);
            }
            Err(error) => return self.read_failed(error),
        }

        let length = usize::try_from(u32::from_be_bytes(header)).unwrap_or(usize::MAX);
        if length > MAX_FRAME_BYTES {
            // The stream position is now meaningless.
            self.connected = false;
            return Err(TransportError::FrameTooLarge {
                endpoint: self.endpoint.clone(),
                length,
                limit: MAX_FRAME_BYTES,
            });
        }

        let mut payload = vec![0_u8; length];
        if let Err(error) = self.reader.read_exact(&mut payload) {
            return self.read_failed(error);
        }

        String::from_utf8(payload)
            .map(Received::Message)
            .map_err(|source| TransportError::InvalidUtf8 {
                endpoint: self.endpoint.clone(),
                source,
            })
    }

    fn is_connected(&self) -> bool {
        self.connected && !self.control.is_closed()
    }

    fn close_handle(&self) -> Arc<dyn CloseHandle> {
        Arc::clone(&self.control) as Arc<dyn CloseHandle>
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.control.close();
    }
}

struct TcpCloseHandle {
    stream: TcpStream,
    closed: AtomicBool,
    endpoint: String,
}

impl TcpCloseHandle {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl CloseHandle for TcpCloseHandle {
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(error) = self.stream.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            debug!(
                target: TRANSPORT_TARGET,
                endpoint = %self.endpoint,
                error = %error,
                "failed to shut down authority connection"
            );
        }
    }
}
