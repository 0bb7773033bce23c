//! Background worker applying snapshots pushed by the authority.
//!
//! The worker owns the transport. It blocks on receive while connected and
//! idles in one second steps otherwise, checking its stop flag every
//! iteration. A failing iteration is reported and the loop carries on; only
//! a stop request or a locally closed channel ends it.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use superdiamond_config::ServerEndpoint;
use thiserror::Error;
use tracing::debug;

use crate::bootstrap::{self, HandshakeError};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::{ConnectionState, Shared};
use crate::store::LoadMode;
use crate::transport::{Connector, Received, Transport, TransportError};

const RELOAD_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::reload");

/// Pause between iterations while no channel is open.
pub(crate) const IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Failures of a single reload iteration.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The channel failed while waiting for a snapshot.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A pushed snapshot could not be parsed and was dropped.
    #[error("dropped malformed snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    /// Re-establishing the channel failed.
    #[error("failed to reconnect: {0}")]
    Reconnect(#[source] HandshakeError),
    /// A reload iteration panicked, most often inside a change listener.
    #[error("reload iteration panicked: {message}")]
    IterationPanicked {
        /// Panic payload, when it was a string.
        message: String,
    },
    /// The worker thread itself panicked.
    #[error("reload worker thread panicked")]
    ThreadPanic,
}

/// How to reopen the channel once it is lost.
pub(crate) struct Reconnector {
    connector: Arc<dyn Connector>,
    endpoint: ServerEndpoint,
    failures: u32,
}

impl Reconnector {
    pub(crate) fn new(connector: Arc<dyn Connector>, endpoint: ServerEndpoint) -> Self {
        Self {
            connector,
            endpoint,
            failures: 0,
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

pub(crate) struct ReloadWorker {
    shared: Arc<Shared>,
    transport: Option<Box<dyn Transport>>,
    reconnect: Option<Reconnector>,
    stop: Arc<AtomicBool>,
}

impl ReloadWorker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        transport: Option<Box<dyn Transport>>,
        reconnect: Option<Reconnector>,
    ) -> Self {
        Self {
            shared,
            transport,
            reconnect,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn spawn(self) -> io::Result<ReloadHandle> {
        let stop = Arc::clone(&self.stop);
        let name = format!("superdiamond-reload-{}", self.shared.identity);
        let handle = thread::Builder::new().name(name).spawn(move || self.run())?;
        Ok(ReloadHandle {
            stop,
            handle: Some(handle),
        })
    }

    fn run(mut self) {
        debug!(
            target: RELOAD_TARGET,
            identity = %self.shared.identity,
            "reload worker running"
        );
        while !self.stop.load(Ordering::SeqCst) {
            match panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
                Ok(Ok(Flow::Continue)) => {}
                Ok(Ok(Flow::Stop)) => break,
                Ok(Err(error)) => self.shared.reporter.reload_failed(&self.shared.identity, &error),
                Err(payload) => {
                    let error = ReloadError::IterationPanicked {
                        message: panic_message(payload.as_ref()),
                    };
                    self.shared.reporter.reload_failed(&self.shared.identity, &error);
                }
            }
        }
        self.transport = None;
        self.shared.reporter.reload_stopped(&self.shared.identity);
    }

    fn tick(&mut self) -> Result<Flow, ReloadError> {
        let connected = self.shared.status.get() == ConnectionState::Connected;
        let Some(transport) = self.transport.as_mut().filter(|_| connected) else {
            thread::park_timeout(IDLE_INTERVAL);
            self.try_reconnect()?;
            return Ok(Flow::Continue);
        };

        match transport.receive() {
            Ok(Received::Message(raw)) => {
                let snapshot = Snapshot::parse(raw)?;
                self.publish(&snapshot);
                Ok(Flow::Continue)
            }
            Ok(Received::Disconnected) => {
                self.connection_lost();
                Ok(Flow::Continue)
            }
            Ok(Received::Closed) => Ok(Flow::Stop),
            Err(error) => {
                if !transport.is_connected() {
                    self.connection_lost();
                }
                Err(error.into())
            }
        }
    }

    fn publish(&self, snapshot: &Snapshot) {
        self.shared.persist(snapshot);
        let changes = self.shared.apply(snapshot, LoadMode::Reload);
        self.shared
            .reporter
            .snapshot_reloaded(&self.shared.identity, snapshot.version(), changes);
    }

    fn connection_lost(&mut self) {
        self.transport = None;
        drop(self.shared.take_closer());
        if self
            .shared
            .status
            .transition(ConnectionState::Connected, ConnectionState::Disconnected)
        {
            self.shared.reporter.connection_lost(&self.shared.identity);
        }
    }

    fn try_reconnect(&mut self) -> Result<(), ReloadError> {
        if self.reconnect.is_none()
            || self.stopping()
            || self.shared.status.get() != ConnectionState::Disconnected
        {
            return Ok(());
        }

        let (transport, snapshot) = match self.reopen() {
            Ok(Some(opened)) => opened,
            Ok(None) => return Ok(()),
            Err(error) => return self.reconnect_failed(error),
        };
        if let Some(reconnect) = self.reconnect.as_mut() {
            reconnect.failures = 0;
        }

        if self.stopping()
            || !self
                .shared
                .status
                .transition(ConnectionState::Disconnected, ConnectionState::Connected)
        {
            if let Some(closer) = self.shared.take_closer() {
                closer.close();
            }
            return Ok(());
        }

        self.transport = Some(transport);
        self.shared.reporter.reconnected(&self.shared.identity);
        self.publish(&snapshot);
        Ok(())
    }

    /// Connects and registers the close handle before waiting on the
    /// handshake, so a concurrent `close` can interrupt the wait.
    ///
    /// Returns `Ok(None)` when a stop was requested along the way.
    fn reopen(&self) -> Result<Option<(Box<dyn Transport>, Snapshot)>, HandshakeError> {
        let Some(reconnect) = self.reconnect.as_ref() else {
            return Ok(None);
        };
        let mut transport = reconnect.connector.connect(&reconnect.endpoint)?;
        let closer = transport.close_handle();
        self.shared.install_closer(Arc::clone(&closer));
        if self.stopping() {
            drop(self.shared.take_closer());
            closer.close();
            return Ok(None);
        }

        match bootstrap::request_snapshot(transport.as_mut(), &self.shared.identity) {
            Ok(snapshot) => Ok(Some((transport, snapshot))),
            Err(_) if self.stopping() => {
                drop(self.shared.take_closer());
                Ok(None)
            }
            Err(error) => {
                drop(self.shared.take_closer());
                closer.close();
                Err(error)
            }
        }
    }

    fn reconnect_failed(&mut self, error: HandshakeError) -> Result<(), ReloadError> {
        let Some(reconnect) = self.reconnect.as_mut() else {
            return Ok(());
        };
        reconnect.failures = reconnect.failures.saturating_add(1);
        if reconnect.failures == 1 {
            return Err(ReloadError::Reconnect(error));
        }
        debug!(
            target: RELOAD_TARGET,
            identity = %self.shared.identity,
            attempts = reconnect.failures,
            error = %error,
            "authority still unreachable"
        );
        Ok(())
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.shared.status.get() == ConnectionState::Closing
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Controls a running reload worker.
pub(crate) struct ReloadHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReloadHandle {
    /// Asks the worker to stop and wakes it if it is idling.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    }

    /// Waits for the worker to exit.
    ///
    /// Returns immediately when called from the worker itself, which happens
    /// when a listener closes its own client.
    pub(crate) fn join(mut self) -> Result<(), ReloadError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if handle.thread().id() == thread::current().id() {
            return Ok(());
        }
        handle.join().map_err(|_| ReloadError::ThreadPanic)
    }
}

impl Drop for ReloadHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
