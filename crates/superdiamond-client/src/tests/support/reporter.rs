//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use superdiamond_config::ServerEndpoint;

use crate::backup::BackupError;
use crate::bootstrap::{BootstrapError, HandshakeError};
use crate::health::HealthReporter;
use crate::identity::ProjectIdentity;
use crate::reload::ReloadError;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    AuthorityUnavailable(String),
    LoadedFromAuthority(String),
    LoadedFromBackup(String),
    BootstrapFailed(String),
    SnapshotReloaded { version: String, changes: usize },
    ReloadFailed(String),
    BackupFailed(String),
    ConnectionLost,
    Reconnected,
    ReloadStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Whether any recorded event satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&HealthEvent) -> bool) -> bool {
        self.events().iter().any(predicate)
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self, _identity: &ProjectIdentity, _endpoint: &ServerEndpoint) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn authority_unavailable(&self, _identity: &ProjectIdentity, error: &HandshakeError) {
        self.record(HealthEvent::AuthorityUnavailable(error.to_string()));
    }

    fn loaded_from_authority(&self, _identity: &ProjectIdentity, version: &str) {
        self.record(HealthEvent::LoadedFromAuthority(version.to_owned()));
    }

    fn loaded_from_backup(&self, _identity: &ProjectIdentity, version: &str) {
        self.record(HealthEvent::LoadedFromBackup(version.to_owned()));
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn snapshot_reloaded(&self, _identity: &ProjectIdentity, version: &str, changes: usize) {
        self.record(HealthEvent::SnapshotReloaded {
            version: version.to_owned(),
            changes,
        });
    }

    fn reload_failed(&self, _identity: &ProjectIdentity, error: &ReloadError) {
        self.record(HealthEvent::ReloadFailed(error.to_string()));
    }

    fn backup_failed(&self, _identity: &ProjectIdentity, error: &BackupError) {
        self.record(HealthEvent::BackupFailed(error.to_string()));
    }

    fn connection_lost(&self, _identity: &ProjectIdentity) {
        self.record(HealthEvent::ConnectionLost);
    }

    fn reconnected(&self, _identity: &ProjectIdentity) {
        self.record(HealthEvent::Reconnected);
    }

    fn reload_stopped(&self, _identity: &ProjectIdentity) {
        self.record(HealthEvent::ReloadStopped);
    }
}
