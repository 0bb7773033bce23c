//! Client for the SuperDiamond push-based configuration authority.
//!
//! A [`ConfigClient`] loads one project's configuration for one profile and
//! keeps it current. On start it sends a single handshake line to the
//! authority and waits for a snapshot: a `version = <token>` header followed
//! by a Java-properties body. Every snapshot is written to a local backup, so
//! a later start can proceed while the authority is down.
//!
//! After bootstrap a background thread waits for further snapshots. Each one
//! is diffed key by key against the live store and the differences are
//! raised as [`ChangeEvent`]s to registered listeners. Keys are never removed
//! by omission, and blank values never overwrite existing ones unless
//! [`BlankValuePolicy::Remove`](superdiamond_config::BlankValuePolicy) is
//! selected.
//!
//! Reads go straight to the in-memory store and resolve `${key}`
//! placeholders at read time:
//!
//! ```no_run
//! use superdiamond_client::ConfigClient;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ConfigClient::connect("billing", "production")?;
//! let pool_size = client.get_int_or("db.pool.size", 8)?;
//! let url = client.get_string("db.url")?;
//! # let _ = (pool_size, url);
//! client.close();
//! # Ok(())
//! # }
//! ```
//!
//! Lifecycle milestones are reported through [`HealthReporter`]; the default
//! [`StructuredHealthReporter`] logs them with `tracing`.

mod accessor;
mod backup;
mod bootstrap;
mod client;
mod event;
mod health;
mod identity;
mod interpolate;
pub mod properties;
mod reload;
mod snapshot;
mod state;
mod store;
pub mod transport;

pub use accessor::{AccessError, FromConfigValue};
pub use backup::{BackupError, BackupStore, FileBackupStore};
pub use bootstrap::{BootstrapError, ClientBuilder, HandshakeError};
pub use client::{BootstrapSource, ConfigClient};
pub use event::{ChangeEvent, ChangeKind, EventFilter, EventSource, ListenerId};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use identity::{IdentityError, ProjectIdentity};
pub use properties::PropertiesError;
pub use reload::ReloadError;
pub use snapshot::{Snapshot, SnapshotError};
pub use state::ConnectionState;
pub use store::VersionedStore;
