//! Client settings layered by `ortho_config`.
//!
//! Values merge from lowest to highest precedence: built-in defaults, a
//! `superdiamond` configuration file (`--config-path` or
//! `SUPERDIAMOND_CONFIG_PATH`), `SUPERDIAMOND_*` environment variables, and
//! finally command-line flags. Embedding applications that never pass flags
//! get environment, then file, then default.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{
    DEFAULT_HOST, DEFAULT_PORT, default_backup_dir, default_log_filter, default_log_format,
};
use crate::endpoint::ServerEndpoint;
use crate::logging::LogFormat;

/// How blank values pushed by the authority are treated.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BlankValuePolicy {
    /// Blank values are ignored; any previous value survives.
    #[default]
    Retain,
    /// A blank value removes the key from the store.
    Remove,
}

/// Whether the reload worker re-establishes a lost connection.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReconnectPolicy {
    /// A lost connection stays lost until the client is rebuilt.
    #[default]
    Never,
    /// Each idle tick attempts one connect and handshake.
    Always,
}

/// Settings shared by the client library and the command-line tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SUPERDIAMOND_")]
pub struct ClientSettings {
    /// Authority host name or address.
    #[ortho_config(default = DEFAULT_HOST.to_owned())]
    host: String,
    /// Authority TCP port.
    #[ortho_config(default = DEFAULT_PORT)]
    port: u16,
    /// Directory holding local snapshot backups.
    #[ortho_config(default = default_backup_dir())]
    backup_dir: Utf8PathBuf,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter().to_owned())]
    log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,
    /// Treatment of blank pushed values.
    #[ortho_config(default = BlankValuePolicy::Retain)]
    blank_values: BlankValuePolicy,
    /// Whether a lost authority connection is reopened.
    #[ortho_config(default = ReconnectPolicy::Never)]
    reconnect: ReconnectPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            backup_dir: default_backup_dir(),
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
            blank_values: BlankValuePolicy::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientSettings {
    /// Loads settings without command-line flags.
    ///
    /// Used by embedding applications: the host process's own arguments are
    /// never parsed.
    pub fn load_from_environment() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter([OsString::from(env!("CARGO_PKG_NAME"))])
    }

    /// Replaces the authority endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: ServerEndpoint) -> Self {
        self.host = endpoint.host().to_owned();
        self.port = endpoint.port();
        self
    }

    /// Replaces the backup directory.
    #[must_use]
    pub fn with_backup_dir(mut self, backup_dir: impl Into<Utf8PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    /// Replaces the `tracing` filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Replaces the log output format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Selects how blank pushed values are treated.
    #[must_use]
    pub const fn with_blank_value_policy(mut self, policy: BlankValuePolicy) -> Self {
        self.blank_values = policy;
        self
    }

    /// Selects whether lost connections are re-established.
    #[must_use]
    pub const fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Authority endpoint.
    #[must_use]
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.host.as_str(), self.port)
    }

    /// Directory holding local snapshot backups.
    #[must_use]
    pub fn backup_dir(&self) -> &Utf8PathBuf {
        &self.backup_dir
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Blank value policy.
    #[must_use]
    pub const fn blank_value_policy(&self) -> BlankValuePolicy {
        self.blank_values
    }

    /// Reconnect policy.
    #[must_use]
    pub const fn reconnect_policy(&self) -> ReconnectPolicy {
        self.reconnect
    }
}
