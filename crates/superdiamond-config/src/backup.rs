//! Derives where local snapshot backups live on disk.
//!
//! The client and the command-line tool must agree on the layout so a
//! snapshot saved by one can seed the other when the authority is down.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

const BACKUP_FILE_NAME: &str = "superdiamond.properties";

/// Location of the backup artefact for one project and profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    directory: Utf8PathBuf,
    file: Utf8PathBuf,
}

impl BackupPaths {
    /// Derives the backup location for `(proj_code, profile)` under `root`.
    ///
    /// The layout is `<root>/<proj_code>/<profile>/superdiamond.properties`.
    pub fn for_identity(
        root: &Utf8Path,
        proj_code: &str,
        profile: &str,
    ) -> Result<Self, BackupPathError> {
        validate_component("project code", proj_code)?;
        validate_component("profile", profile)?;
        let directory = root.join(proj_code).join(profile);
        Ok(Self {
            file: directory.join(BACKUP_FILE_NAME),
            directory,
        })
    }

    /// Directory containing the backup file.
    #[must_use]
    pub fn directory(&self) -> &Utf8Path {
        self.directory.as_path()
    }

    /// Path to the backup file itself.
    #[must_use]
    pub fn file(&self) -> &Utf8Path {
        self.file.as_path()
    }
}

fn validate_component(component: &'static str, value: &str) -> Result<(), BackupPathError> {
    if value.trim().is_empty() {
        return Err(BackupPathError::Empty { component });
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(BackupPathError::Unsafe {
            component,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Errors raised while deriving backup paths.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackupPathError {
    /// An identity component was blank.
    #[error("{component} must not be blank")]
    Empty {
        /// Which part of the identity was blank.
        component: &'static str,
    },
    /// An identity component would escape the backup directory.
    #[error("{component} '{value}' cannot be used as a directory name")]
    Unsafe {
        /// Which part of the identity was rejected.
        component: &'static str,
        /// Offending value.
        value: String,
    },
}
