//! The client handle applications hold.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use superdiamond_config::ClientSettings;

use crate::bootstrap::{BootstrapError, ClientBuilder};
use crate::event::{ChangeEvent, EventFilter, ListenerId};
use crate::identity::ProjectIdentity;
use crate::reload::ReloadHandle;
use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::{ConnectionState, Shared};
use crate::store::LoadMode;

/// Where the initial snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapSource {
    /// The authority answered the handshake.
    Authority,
    /// The authority was unavailable; the local backup was used.
    Backup,
}

/// Live view of one project's configuration for one profile.
///
/// Reads are served from memory and may run on any thread while the reload
/// worker applies pushed snapshots. Dropping the client closes it.
pub struct ConfigClient {
    pub(crate) shared: Arc<Shared>,
    reload: Mutex<Option<ReloadHandle>>,
    source: BootstrapSource,
}

impl ConfigClient {
    pub(crate) fn new(shared: Arc<Shared>, reload: ReloadHandle, source: BootstrapSource) -> Self {
        Self {
            shared,
            reload: Mutex::new(Some(reload)),
            source,
        }
    }

    /// Starts a builder for full control over collaborators.
    #[must_use]
    pub fn builder(identity: ProjectIdentity, settings: ClientSettings) -> ClientBuilder {
        ClientBuilder::new(identity, settings)
    }

    /// Connects with settings loaded from `SUPERDIAMOND_*` environment
    /// variables, an optional configuration file and built-in defaults.
    pub fn connect(
        proj_code: impl Into<String>,
        profile: impl Into<String>,
    ) -> Result<Self, BootstrapError> {
        let identity = ProjectIdentity::new(proj_code, profile)?;
        let settings = ClientSettings::load_from_environment()?;
        ClientBuilder::new(identity, settings).connect()
    }

    /// Project and profile this client serves.
    #[must_use]
    pub fn identity(&self) -> &ProjectIdentity {
        &self.shared.identity
    }

    /// Where the initial snapshot came from.
    #[must_use]
    pub const fn bootstrap_source(&self) -> BootstrapSource {
        self.source
    }

    /// Version header of the most recently applied snapshot.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.shared.version.read().clone()
    }

    /// Current state of the authority connection.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.status.get()
    }

    /// Registers a change listener. It runs on the reload thread.
    pub fn add_listener<F>(&self, filter: EventFilter, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.shared.events.add_listener(filter, listener)
    }

    /// Removes a change listener; returns `false` when it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.events.remove_listener(id)
    }

    /// Loads a snapshot blob supplied by the caller, without raising events.
    ///
    /// The blob is neither sent to nor fetched from the authority and is not
    /// written to the local backup.
    pub fn load_str(&self, raw: &str) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::parse(raw)?;
        self.shared.apply(&snapshot, LoadMode::Bootstrap);
        Ok(())
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.reload.lock().is_none()
    }

    /// Stops the reload worker and closes the channel.
    ///
    /// Safe to call more than once and from any thread. Reads keep working
    /// against the last applied snapshot.
    pub fn close(&self) {
        let Some(reload) = self.reload.lock().take() else {
            return;
        };
        self.shared.status.set(ConnectionState::Closing);
        reload.request_stop();
        if let Some(closer) = self.shared.take_closer() {
            closer.close();
        }
        if let Err(error) = reload.join() {
            self.shared
                .reporter
                .reload_failed(&self.shared.identity, &error);
        }
    }
}

impl Drop for ConfigClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ConfigClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigClient")
            .field("identity", &self.shared.identity)
            .field("source", &self.source)
            .field("state", &self.connection_state())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
