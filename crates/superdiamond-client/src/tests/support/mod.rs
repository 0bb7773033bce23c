//! Test harness utilities for the client behavioural suites.

mod reporter;
mod transport;

use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use superdiamond_config::{ClientSettings, ServerEndpoint};

use crate::backup::{BackupError, BackupStore};
use crate::bootstrap::{BootstrapError, ClientBuilder};
use crate::client::ConfigClient;
use crate::event::{ChangeEvent, EventFilter};
use crate::identity::ProjectIdentity;

pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use transport::{PushChannel, ScriptedConnector};

/// Longest a test waits for the reload thread.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// In-memory backup store.
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    blobs: Mutex<HashMap<ProjectIdentity, String>>,
    fail_writes: bool,
}

impl MemoryBackupStore {
    /// Store whose writes always fail.
    pub fn failing() -> Self {
        Self {
            blobs: Mutex::default(),
            fail_writes: true,
        }
    }

    /// Seeds a blob.
    pub fn seed(&self, identity: &ProjectIdentity, raw: &str) {
        self.blobs
            .lock()
            .expect("backup mutex poisoned")
            .insert(identity.clone(), raw.to_owned());
    }

    /// Blob currently held for `identity`.
    pub fn blob(&self, identity: &ProjectIdentity) -> Option<String> {
        self.blobs
            .lock()
            .expect("backup mutex poisoned")
            .get(identity)
            .cloned()
    }
}

impl BackupStore for MemoryBackupStore {
    fn load(&self, identity: &ProjectIdentity) -> Result<Option<String>, BackupError> {
        Ok(self.blob(identity))
    }

    fn save(&self, identity: &ProjectIdentity, raw: &str) -> Result<(), BackupError> {
        if self.fail_writes {
            return Err(BackupError::Write {
                path: Utf8PathBuf::from("memory"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        self.seed(identity, raw);
        Ok(())
    }
}

/// Identity used by most scenarios.
pub fn identity() -> ProjectIdentity {
    ProjectIdentity::new("billing", "dev").expect("valid identity")
}

/// Settings pointing at an address the scripted connector ignores.
pub fn settings() -> ClientSettings {
    ClientSettings::default()
        .with_endpoint(ServerEndpoint::new("authority.test", 8283))
        .with_backup_dir("/nonexistent/superdiamond")
}

/// Collaborators shared by a scenario.
pub struct Harness {
    pub connector: Arc<ScriptedConnector>,
    pub backup: Arc<MemoryBackupStore>,
    pub reporter: Arc<RecordingHealthReporter>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_backup(MemoryBackupStore::default())
    }

    pub fn with_backup(backup: MemoryBackupStore) -> Self {
        Self {
            connector: Arc::new(ScriptedConnector::default()),
            backup: Arc::new(backup),
            reporter: Arc::new(RecordingHealthReporter::default()),
        }
    }

    pub fn connect(&self) -> Result<ConfigClient, BootstrapError> {
        self.connect_with(settings())
    }

    pub fn connect_with(&self, settings: ClientSettings) -> Result<ConfigClient, BootstrapError> {
        self.builder(settings).connect()
    }

    /// Builder wired to this harness's collaborators.
    pub fn builder(&self, settings: ClientSettings) -> ClientBuilder {
        ConfigClient::builder(identity(), settings)
            .connector(Arc::clone(&self.connector) as _)
            .backup_store(Arc::clone(&self.backup) as _)
            .health_reporter(Arc::clone(&self.reporter) as _)
    }
}

/// Forwards every event raised by `client` into a channel.
pub fn record_events(client: &ConfigClient) -> Receiver<ChangeEvent> {
    let (sender, receiver) = mpsc::channel();
    client.add_listener(EventFilter::Any, forward_to(sender));
    receiver
}

/// Registers an event recorder on `builder` before the client starts.
pub fn record_events_from_start(builder: ClientBuilder) -> (ClientBuilder, Receiver<ChangeEvent>) {
    let (sender, receiver) = mpsc::channel();
    (builder.listener(EventFilter::Any, forward_to(sender)), receiver)
}

fn forward_to(sender: Sender<ChangeEvent>) -> impl Fn(&ChangeEvent) + Send + Sync + 'static {
    move |event| {
        // The receiver may be gone once the test has its answer.
        let _ = sender.send(event.clone());
    }
}

/// Polls `condition` until it holds or [`WAIT_LIMIT`] passes.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
