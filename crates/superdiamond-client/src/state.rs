//! State shared between a client handle and its reload worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{Mutex, RwLock};
use superdiamond_config::BlankValuePolicy;

use crate::backup::BackupStore;
use crate::event::EventSource;
use crate::health::HealthReporter;
use crate::identity::ProjectIdentity;
use crate::snapshot::Snapshot;
use crate::store::{LoadMode, VersionedStore};
use crate::transport::CloseHandle;

/// Connection state as seen by the reload worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable channel to the authority.
    Disconnected,
    /// A channel is open and the worker is listening on it.
    Connected,
    /// The client is shutting down.
    Closing,
}

impl ConnectionState {
    const fn encode(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connected => 1,
            Self::Closing => 2,
        }
    }

    const fn decode(raw: u8) -> Self {
        match raw {
            1 => Self::Connected,
            2 => Self::Closing,
            _ => Self::Disconnected,
        }
    }
}

/// Atomic cell holding a [`ConnectionState`].
#[derive(Debug)]
pub(crate) struct ConnectionStatus(AtomicU8);

impl ConnectionStatus {
    pub(crate) const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state.encode()))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::decode(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.0.store(state.encode(), Ordering::SeqCst);
    }

    /// Moves from `from` to `to`; returns `false` when the state was not `from`.
    pub(crate) fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from.encode(), to.encode(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

pub(crate) struct Shared {
    pub(crate) identity: ProjectIdentity,
    pub(crate) store: VersionedStore,
    pub(crate) events: EventSource,
    pub(crate) status: ConnectionStatus,
    pub(crate) version: RwLock<Option<String>>,
    pub(crate) closer: Mutex<Option<Arc<dyn CloseHandle>>>,
    pub(crate) backup: Arc<dyn BackupStore>,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) blank_values: BlankValuePolicy,
}

impl Shared {
    pub(crate) fn new(
        identity: ProjectIdentity,
        backup: Arc<dyn BackupStore>,
        reporter: Arc<dyn HealthReporter>,
        events: EventSource,
        blank_values: BlankValuePolicy,
    ) -> Self {
        Self {
            identity,
            store: VersionedStore::new(),
            events,
            status: ConnectionStatus::new(ConnectionState::Disconnected),
            version: RwLock::new(None),
            closer: Mutex::new(None),
            backup,
            reporter,
            blank_values,
        }
    }

    /// Writes the raw blob to the local backup; failures are reported, not returned.
    pub(crate) fn persist(&self, snapshot: &Snapshot) {
        if let Err(error) = self.backup.save(&self.identity, snapshot.raw()) {
            self.reporter.backup_failed(&self.identity, &error);
        }
    }

    /// Applies a snapshot to the store, firing events for reloads.
    pub(crate) fn apply(&self, snapshot: &Snapshot, mode: LoadMode) -> usize {
        let changes = self
            .store
            .apply(snapshot.entries(), mode, self.blank_values, |event| {
                self.events.fire(&event);
            });
        *self.version.write() = Some(snapshot.version().to_owned());
        changes
    }

    pub(crate) fn install_closer(&self, closer: Arc<dyn CloseHandle>) {
        *self.closer.lock() = Some(closer);
    }

    pub(crate) fn take_closer(&self) -> Option<Arc<dyn CloseHandle>> {
        self.closer.lock().take()
    }
}
