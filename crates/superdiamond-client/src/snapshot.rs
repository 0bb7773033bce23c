//! Parsed configuration snapshots as pushed by the authority.
//!
//! A snapshot blob starts with a `version = <token>` line followed by
//! properties text. The raw blob is kept alongside the parsed pairs because
//! the local backup stores it verbatim.

use thiserror::Error;

use crate::properties::{self, PropertiesError};

const VERSION_KEY: &str = "version";

/// One immutable configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    version: String,
    raw: String,
    entries: Vec<(String, String)>,
}

impl Snapshot {
    /// Parses a raw snapshot blob.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SnapshotError> {
        let raw = raw.into();
        let (header, body) = raw.split_once('\n').unwrap_or((raw.as_str(), ""));
        let version = parse_version(header.strip_suffix('\r').unwrap_or(header))?;
        let entries = properties::parse_from_line(body, 2)?;
        Ok(Self {
            version,
            entries,
            raw,
        })
    }

    /// Version token from the metadata line.
    #[must_use]
    pub fn version(&self) -> &str {
        self.version.as_str()
    }

    /// The blob exactly as received.
    #[must_use]
    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }

    /// Key/value pairs in the order they appear in the blob.
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

fn parse_version(header: &str) -> Result<String, SnapshotError> {
    let Some((name, token)) = header.split_once('=') else {
        return Err(SnapshotError::MissingVersion {
            header: header.to_owned(),
        });
    };
    if name.trim() != VERSION_KEY {
        return Err(SnapshotError::MissingVersion {
            header: header.to_owned(),
        });
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(SnapshotError::EmptyVersion);
    }
    Ok(token.to_owned())
}

/// Errors raised while parsing a snapshot blob.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The first line was not a `version = <token>` header.
    #[error("snapshot does not start with a version header (found '{header}')")]
    MissingVersion {
        /// First line of the blob.
        header: String,
    },
    /// The version header carried no token.
    #[error("snapshot version header has an empty token")]
    EmptyVersion,
    /// The properties body was malformed.
    #[error("malformed snapshot body: {0}")]
    Properties(#[from] PropertiesError),
}
