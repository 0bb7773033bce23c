//! Client bootstrap: handshake with the authority, fall back to the backup.

use std::io;
use std::sync::Arc;

use superdiamond_config::{ClientSettings, OrthoError, ReconnectPolicy, ServerEndpoint};
use thiserror::Error;
use tracing::warn;

use crate::backup::{BackupStore, FileBackupStore};
use crate::client::{BootstrapSource, ConfigClient};
use crate::event::{ChangeEvent, EventFilter, EventSource};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::identity::{IdentityError, ProjectIdentity};
use crate::reload::{Reconnector, ReloadWorker};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::{ConnectionState, Shared};
use crate::store::LoadMode;
use crate::transport::{Connector, Received, TcpConnector, Transport, TransportError};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Reasons the authority could not supply a snapshot.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The channel failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The authority hung up before answering.
    #[error("authority closed the connection before sending a snapshot")]
    NoSnapshot,
    /// The authority answered with something that is not a snapshot.
    #[error("authority sent a malformed snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors surfaced while starting a client.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Neither the authority nor the local backup could supply configuration.
    #[error("no configuration available for {identity}: {cause}; no usable local backup")]
    NoConfiguration {
        /// Project and profile being loaded.
        identity: ProjectIdentity,
        /// Why the authority could not be used.
        #[source]
        cause: HandshakeError,
    },
    /// The reload worker thread could not be started.
    #[error("failed to start reload worker: {source}")]
    Spawn {
        /// Error reported by the operating system.
        #[source]
        source: io::Error,
    },
    /// Project code or profile was invalid.
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// Settings could not be loaded from the environment or configuration file.
    #[error("invalid settings: {0}")]
    Settings(#[from] Arc<OrthoError>),
}

/// Opens a channel, sends the handshake and waits for the first snapshot.
fn handshake(
    connector: &dyn Connector,
    endpoint: &ServerEndpoint,
    identity: &ProjectIdentity,
) -> Result<(Box<dyn Transport>, Snapshot), HandshakeError> {
    let mut transport = connector.connect(endpoint)?;
    let snapshot = request_snapshot(transport.as_mut(), identity)?;
    Ok((transport, snapshot))
}

/// Sends the handshake line on an open channel and waits for the snapshot.
///
/// A channel closed locally while waiting yields [`HandshakeError::NoSnapshot`].
pub(crate) fn request_snapshot(
    transport: &mut dyn Transport,
    identity: &ProjectIdentity,
) -> Result<Snapshot, HandshakeError> {
    transport.send_line(&identity.handshake_line())?;
    match transport.receive()? {
        Received::Message(raw) => Ok(Snapshot::parse(raw)?),
        Received::Disconnected | Received::Closed => Err(HandshakeError::NoSnapshot),
    }
}

/// Configures and starts a [`ConfigClient`].
///
/// The defaults dial the authority over TCP, keep backups under the
/// configured backup directory and report health through `tracing`.
pub struct ClientBuilder {
    identity: ProjectIdentity,
    settings: ClientSettings,
    connector: Arc<dyn Connector>,
    backup: Option<Arc<dyn BackupStore>>,
    reporter: Arc<dyn HealthReporter>,
    events: EventSource,
}

impl ClientBuilder {
    /// Starts a builder for `identity` using `settings`.
    #[must_use]
    pub fn new(identity: ProjectIdentity, settings: ClientSettings) -> Self {
        Self {
            identity,
            settings,
            connector: Arc::new(TcpConnector::new()),
            backup: None,
            reporter: Arc::new(StructuredHealthReporter::new()),
            events: EventSource::new(),
        }
    }

    /// Replaces the channel factory.
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replaces the local backup store.
    #[must_use]
    pub fn backup_store(mut self, backup: Arc<dyn BackupStore>) -> Self {
        self.backup = Some(backup);
        self
    }

    /// Replaces the health reporter.
    #[must_use]
    pub fn health_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Registers a change listener before the initial snapshot loads.
    ///
    /// The bootstrap load itself never fires events; the listener sees
    /// changes from the first pushed reload onwards.
    #[must_use]
    pub fn listener<F>(self, filter: EventFilter, listener: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.events.add_listener(filter, listener);
        self
    }

    /// Loads the initial snapshot and starts the reload worker.
    ///
    /// Tries the authority first. Any failure there falls back to the local
    /// backup; the call only fails when the backup is missing or unusable too.
    pub fn connect(self) -> Result<ConfigClient, BootstrapError> {
        let Self {
            identity,
            settings,
            connector,
            backup,
            reporter,
            events,
        } = self;
        let backup = backup.unwrap_or_else(|| {
            Arc::new(FileBackupStore::new(settings.backup_dir().clone())) as Arc<dyn BackupStore>
        });

        let endpoint = settings.endpoint();
        reporter.bootstrap_starting(&identity, &endpoint);
        let shared = Arc::new(Shared::new(
            identity,
            backup,
            reporter,
            events,
            settings.blank_value_policy(),
        ));

        let (transport, source) =
            match handshake(connector.as_ref(), &endpoint, &shared.identity) {
                Ok((transport, snapshot)) => {
                    shared.persist(&snapshot);
                    shared.apply(&snapshot, LoadMode::Bootstrap);
                    shared
                        .reporter
                        .loaded_from_authority(&shared.identity, snapshot.version());
                    (Some(transport), BootstrapSource::Authority)
                }
                Err(cause) => {
                    shared.reporter.authority_unavailable(&shared.identity, &cause);
                    let Some(snapshot) = load_backup(&shared) else {
                        let error = BootstrapError::NoConfiguration {
                            identity: shared.identity.clone(),
                            cause,
                        };
                        shared.reporter.bootstrap_failed(&error);
                        return Err(error);
                    };
                    shared.apply(&snapshot, LoadMode::Bootstrap);
                    shared
                        .reporter
                        .loaded_from_backup(&shared.identity, snapshot.version());
                    (None, BootstrapSource::Backup)
                }
            };

        if let Some(transport) = &transport {
            shared.install_closer(transport.close_handle());
            shared.status.set(ConnectionState::Connected);
        }

        let reconnect = match settings.reconnect_policy() {
            ReconnectPolicy::Always => Some(Reconnector::new(connector, endpoint)),
            ReconnectPolicy::Never => None,
        };

        let worker = ReloadWorker::new(Arc::clone(&shared), transport, reconnect);
        let reload = match worker.spawn() {
            Ok(handle) => handle,
            Err(source) => {
                if let Some(closer) = shared.take_closer() {
                    closer.close();
                }
                let error = BootstrapError::Spawn { source };
                shared.reporter.bootstrap_failed(&error);
                return Err(error);
            }
        };

        Ok(ConfigClient::new(shared, reload, source))
    }
}

/// Reads and parses the local backup; unreadable or malformed backups count as absent.
fn load_backup(shared: &Shared) -> Option<Snapshot> {
    let raw = match shared.backup.load(&shared.identity) {
        Ok(raw) => raw?,
        Err(error) => {
            warn!(
                target: BOOTSTRAP_TARGET,
                identity = %shared.identity,
                error = %error,
                "failed to read local backup"
            );
            return None;
        }
    };
    match Snapshot::parse(raw) {
        Ok(snapshot) => Some(snapshot),
        Err(error) => {
            warn!(
                target: BOOTSTRAP_TARGET,
                identity = %shared.identity,
                error = %error,
                "ignoring malformed local backup"
            );
            None
        }
    }
}
