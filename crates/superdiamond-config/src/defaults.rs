use camino::Utf8PathBuf;
use std::env;

use dirs::home_dir;

/// Host used when no layer names one.
pub const DEFAULT_HOST: &str = "localhost";

/// Port the authority listens on by default.
pub const DEFAULT_PORT: u16 = 8283;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable overriding the authority host.
pub const HOST_ENV: &str = "SUPERDIAMOND_HOST";

/// Environment variable overriding the authority port.
pub const PORT_ENV: &str = "SUPERDIAMOND_PORT";

/// Environment variable overriding the backup directory.
pub const BACKUP_DIR_ENV: &str = "SUPERDIAMOND_BACKUP_DIR";

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "SUPERDIAMOND_LOG_FILTER";

/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "SUPERDIAMOND_LOG_FORMAT";

/// Environment variable selecting the blank value policy.
pub const BLANK_VALUES_ENV: &str = "SUPERDIAMOND_BLANK_VALUES";

/// Environment variable selecting the reconnect policy.
pub const RECONNECT_ENV: &str = "SUPERDIAMOND_RECONNECT";

/// Environment variable naming a configuration file.
pub const CONFIG_PATH_ENV: &str = "SUPERDIAMOND_CONFIG_PATH";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Directory holding local snapshot backups.
///
/// Lives under the user's home directory; hosts without one fall back to the
/// system temporary directory.
#[must_use]
pub fn default_backup_dir() -> Utf8PathBuf {
    home_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .map_or_else(fallback_base_directory, |mut dir| {
            dir.push(".superdiamond");
            dir
        })
}

fn fallback_base_directory() -> Utf8PathBuf {
    let mut dir = Utf8PathBuf::from_path_buf(env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
    dir.push("superdiamond");
    dir
}
