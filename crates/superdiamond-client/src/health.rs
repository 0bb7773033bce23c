//! Structured health reporting for client lifecycle events.

use std::sync::Arc;

use superdiamond_config::ServerEndpoint;

use crate::backup::BackupError;
use crate::bootstrap::{BootstrapError, HandshakeError};
use crate::identity::ProjectIdentity;
use crate::reload::ReloadError;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before the client contacts the authority.
    fn bootstrap_starting(&self, identity: &ProjectIdentity, endpoint: &ServerEndpoint);

    /// Invoked when the authority could not supply the initial snapshot.
    fn authority_unavailable(&self, identity: &ProjectIdentity, error: &HandshakeError);

    /// Invoked after the initial snapshot was loaded from the authority.
    fn loaded_from_authority(&self, identity: &ProjectIdentity, version: &str);

    /// Invoked after the initial snapshot was loaded from the local backup.
    fn loaded_from_backup(&self, identity: &ProjectIdentity, version: &str);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a pushed snapshot was applied.
    fn snapshot_reloaded(&self, identity: &ProjectIdentity, version: &str, changes: usize);

    /// Invoked when one reload iteration fails.
    fn reload_failed(&self, identity: &ProjectIdentity, error: &ReloadError);

    /// Invoked when a snapshot could not be persisted locally.
    fn backup_failed(&self, identity: &ProjectIdentity, error: &BackupError);

    /// Invoked when the authority connection is lost.
    fn connection_lost(&self, identity: &ProjectIdentity);

    /// Invoked when a lost connection has been re-established.
    fn reconnected(&self, identity: &ProjectIdentity);

    /// Invoked when the reload worker exits.
    fn reload_stopped(&self, identity: &ProjectIdentity);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self, identity: &ProjectIdentity, endpoint: &ServerEndpoint) {
        (**self).bootstrap_starting(identity, endpoint);
    }

    fn authority_unavailable(&self, identity: &ProjectIdentity, error: &HandshakeError) {
        (**self).authority_unavailable(identity, error);
    }

    fn loaded_from_authority(&self, identity: &ProjectIdentity, version: &str) {
        (**self).loaded_from_authority(identity, version);
    }

    fn loaded_from_backup(&self, identity: &ProjectIdentity, version: &str) {
        (**self).loaded_from_backup(identity, version);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn snapshot_reloaded(&self, identity: &ProjectIdentity, version: &str, changes: usize) {
        (**self).snapshot_reloaded(identity, version, changes);
    }

    fn reload_failed(&self, identity: &ProjectIdentity, error: &ReloadError) {
        (**self).reload_failed(identity, error);
    }

    fn backup_failed(&self, identity: &ProjectIdentity, error: &BackupError) {
        (**self).backup_failed(identity, error);
    }

    fn connection_lost(&self, identity: &ProjectIdentity) {
        (**self).connection_lost(identity);
    }

    fn reconnected(&self, identity: &ProjectIdentity) {
        (**self).reconnected(identity);
    }

    fn reload_stopped(&self, identity: &ProjectIdentity) {
        (**self).reload_stopped(identity);
    }
}

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self, identity: &ProjectIdentity, endpoint: &ServerEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            project = identity.proj_code(),
            profile = identity.profile(),
            endpoint = %endpoint,
            "loading configuration"
        );
    }

    fn authority_unavailable(&self, identity: &ProjectIdentity, error: &HandshakeError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "authority_unavailable",
            project = identity.proj_code(),
            profile = identity.profile(),
            error = %error,
            "authority unavailable, trying local backup"
        );
    }

    fn loaded_from_authority(&self, identity: &ProjectIdentity, version: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "loaded_from_authority",
            project = identity.proj_code(),
            profile = identity.profile(),
            version,
            "loaded remote configuration"
        );
    }

    fn loaded_from_backup(&self, identity: &ProjectIdentity, version: &str) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "loaded_from_backup",
            project = identity.proj_code(),
            profile = identity.profile(),
            version,
            "loaded configuration from local backup"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "configuration client failed to start"
        );
    }

    fn snapshot_reloaded(&self, identity: &ProjectIdentity, version: &str, changes: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "snapshot_reloaded",
            project = identity.proj_code(),
            profile = identity.profile(),
            version,
            changes,
            "reloaded configuration"
        );
    }

    fn reload_failed(&self, identity: &ProjectIdentity, error: &ReloadError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "reload_failed",
            project = identity.proj_code(),
            profile = identity.profile(),
            error = %error,
            "reload iteration failed"
        );
    }

    fn backup_failed(&self, identity: &ProjectIdentity, error: &BackupError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "backup_failed",
            project = identity.proj_code(),
            profile = identity.profile(),
            error = %error,
            "failed to persist configuration backup"
        );
    }

    fn connection_lost(&self, identity: &ProjectIdentity) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "connection_lost",
            project = identity.proj_code(),
            profile = identity.profile(),
            "authority connection lost"
        );
    }

    fn reconnected(&self, identity: &ProjectIdentity) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "reconnected",
            project = identity.proj_code(),
            profile = identity.profile(),
            "authority connection re-established"
        );
    }

    fn reload_stopped(&self, identity: &ProjectIdentity) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "reload_stopped",
            project = identity.proj_code(),
            profile = identity.profile(),
            "reload worker stopped"
        );
    }
}
