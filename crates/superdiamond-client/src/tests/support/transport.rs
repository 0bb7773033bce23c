//! Scripted in-memory authority.
//!
//! Each queued connection attempt either refuses or accepts. Accepted
//! connections are fed through a [`PushChannel`] held by the test; dropping
//! the channel hangs up.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use superdiamond_config::ServerEndpoint;

use crate::transport::{CloseHandle, Connector, Received, Transport, TransportError};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

enum Frame {
    Message(String),
    Fail,
    HangUp,
}

/// Test-side handle of one accepted connection.
pub struct PushChannel {
    sender: Sender<Frame>,
}

impl PushChannel {
    /// Pushes a snapshot blob to the client.
    pub fn push(&self, raw: &str) {
        self.sender
            .send(Frame::Message(raw.to_owned()))
            .expect("client transport dropped");
    }

    /// Makes the next receive fail without ending the connection.
    pub fn fail_once(&self) {
        self.sender.send(Frame::Fail).expect("client transport dropped");
    }

    /// Ends the connection from the authority side.
    pub fn hang_up(&self) {
        // The client may already have dropped its end.
        let _ = self.sender.send(Frame::HangUp);
    }
}

/// Connector replaying queued connection attempts.
#[derive(Default)]
pub struct ScriptedConnector {
    attempts: Mutex<VecDeque<Option<Receiver<Frame>>>>,
    handshakes: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    /// Queues a refused attempt. Attempts beyond the queue are refused too.
    pub fn refuse(&self) {
        self.attempts
            .lock()
            .expect("attempts mutex poisoned")
            .push_back(None);
    }

    /// Queues an accepted attempt and returns its push channel.
    pub fn accept(&self) -> PushChannel {
        let (sender, receiver) = mpsc::channel();
        self.attempts
            .lock()
            .expect("attempts mutex poisoned")
            .push_back(Some(receiver));
        PushChannel { sender }
    }

    /// Queues an accepted attempt whose first message is `raw`.
    pub fn accept_with(&self, raw: &str) -> PushChannel {
        let channel = self.accept();
        channel.push(raw);
        channel
    }

    /// Handshake lines received so far.
    pub fn handshakes(&self) -> Vec<String> {
        self.handshakes
            .lock()
            .expect("handshake mutex poisoned")
            .clone()
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, endpoint: &ServerEndpoint) -> Result<Box<dyn Transport>, TransportError> {
        let attempt = self
            .attempts
            .lock()
            .expect("attempts mutex poisoned")
            .pop_front()
            .flatten();
        let Some(frames) = attempt else {
            return Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        };
        Ok(Box::new(ScriptedTransport {
            endpoint: endpoint.to_string(),
            frames,
            handshakes: Arc::clone(&self.handshakes),
            connected: true,
            closer: Arc::new(ScriptedCloser::default()),
        }))
    }
}

struct ScriptedTransport {
    endpoint: String,
    frames: Receiver<Frame>,
    handshakes: Arc<Mutex<Vec<String>>>,
    connected: bool,
    closer: Arc<ScriptedCloser>,
}

impl Transport for ScriptedTransport {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.handshakes
            .lock()
            .expect("handshake mutex poisoned")
            .push(line.to_owned());
        Ok(())
    }

    fn receive(&mut self) -> Result<Received, TransportError> {
        loop {
            if self.closer.closed.load(Ordering::SeqCst) {
                self.connected = false;
                return Ok(Received::Closed);
            }
            match self.frames.recv_timeout(POLL_INTERVAL) {
                Ok(Frame::Message(raw)) => return Ok(Received::Message(raw)),
                Ok(Frame::Fail) => {
                    return Err(TransportError::Receive {
                        endpoint: self.endpoint.clone(),
                        source: io::Error::other("scripted receive failure"),
                    });
                }
                Ok(Frame::HangUp) | Err(RecvTimeoutError::Disconnected) => {
                    self.connected = false;
                    return Ok(Received::Disconnected);
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected && !self.closer.closed.load(Ordering::SeqCst)
    }

    fn close_handle(&self) -> Arc<dyn CloseHandle> {
        Arc::clone(&self.closer) as Arc<dyn CloseHandle>
    }
}

#[derive(Default)]
struct ScriptedCloser {
    closed: AtomicBool,
}

impl CloseHandle for ScriptedCloser {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
