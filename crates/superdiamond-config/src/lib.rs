//! Shared configuration for the SuperDiamond client and command-line tool.
//!
//! Settings are layered by `ortho_config`: command-line flags, then
//! `SUPERDIAMOND_*` environment variables, then an optional configuration
//! file, then built-in defaults. The crate also owns the on-disk layout of
//! local snapshot backups so every consumer reads and writes the same files.

mod backup;
mod defaults;
mod endpoint;
mod logging;
mod settings;

pub use backup::{BackupPathError, BackupPaths};
pub use defaults::{
    BACKUP_DIR_ENV, BLANK_VALUES_ENV, CONFIG_PATH_ENV, DEFAULT_HOST, DEFAULT_LOG_FILTER,
    DEFAULT_PORT, HOST_ENV, LOG_FILTER_ENV, LOG_FORMAT_ENV, PORT_ENV, RECONNECT_ENV,
    default_backup_dir, default_log_filter, default_log_format,
};
pub use endpoint::{EndpointParseError, ServerEndpoint};
pub use logging::{LogFormat, LogFormatParseError};
pub use ortho_config::OrthoError;
pub use settings::{BlankValuePolicy, ClientSettings, ReconnectPolicy};
