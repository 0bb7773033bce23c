//! Local persistence of the last applied snapshot.
//!
//! The backup is what lets a client start while the authority is down, so it
//! always holds the raw blob of the most recent snapshot that parsed and
//! applied cleanly.

use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use superdiamond_config::{BackupPathError, BackupPaths};

use crate::identity::ProjectIdentity;

/// Storage for raw snapshot blobs keyed by project identity.
pub trait BackupStore: Send + Sync {
    /// Returns the stored blob, or `None` when nothing was saved yet.
    fn load(&self, identity: &ProjectIdentity) -> Result<Option<String>, BackupError>;

    /// Replaces the stored blob.
    fn save(&self, identity: &ProjectIdentity, raw: &str) -> Result<(), BackupError>;
}

/// Backup store writing one file per identity beneath a root directory.
#[derive(Debug, Clone)]
pub struct FileBackupStore {
    root: Utf8PathBuf,
}

impl FileBackupStore {
    /// Builds a store rooted at `root`; directories are created on first save.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.root.as_path()
    }

    fn paths(&self, identity: &ProjectIdentity) -> Result<BackupPaths, BackupError> {
        BackupPaths::for_identity(&self.root, identity.proj_code(), identity.profile())
            .map_err(BackupError::Path)
    }
}

impl BackupStore for FileBackupStore {
    fn load(&self, identity: &ProjectIdentity) -> Result<Option<String>, BackupError> {
        let paths = self.paths(identity)?;
        match fs::read_to_string(paths.file()) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BackupError::Read {
                path: paths.file().to_path_buf(),
                source,
            }),
        }
    }

    fn save(&self, identity: &ProjectIdentity, raw: &str) -> Result<(), BackupError> {
        let paths = self.paths(identity)?;
        let write_error = |source| BackupError::Write {
            path: paths.file().to_path_buf(),
            source,
        };

        fs::create_dir_all(paths.directory()).map_err(write_error)?;
        // Write beside the target and rename so a crash never leaves a
        // truncated backup behind.
        let mut staged = NamedTempFile::new_in(paths.directory()).map_err(write_error)?;
        staged.write_all(raw.as_bytes()).map_err(write_error)?;
        staged.as_file().sync_all().map_err(write_error)?;
        staged
            .persist(paths.file())
            .map_err(|error| write_error(error.error))?;
        Ok(())
    }
}

/// Errors raised by backup stores.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The identity could not be mapped to a backup path.
    #[error("cannot derive backup path: {0}")]
    Path(#[source] BackupPathError),
    /// Reading an existing backup failed.
    #[error("failed to read backup '{path}': {source}")]
    Read {
        /// Backup file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the backup failed.
    #[error("failed to write backup '{path}': {source}")]
    Write {
        /// Backup file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
