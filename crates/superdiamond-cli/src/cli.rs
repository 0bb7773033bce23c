//! CLI argument definitions for the `superdiamond` tool.

use clap::{Parser, ValueEnum};

/// What to do once the configuration has loaded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum Action {
    /// Print every key with its resolved value and exit.
    Dump,
    /// Print every key, then print changes as the authority pushes them.
    Watch,
}

/// Reads one project's configuration from a SuperDiamond authority.
#[derive(Parser, Debug)]
#[command(
    name = "superdiamond",
    version,
    disable_help_subcommand = true,
    after_help = SETTINGS_HELP
)]
pub(crate) struct Cli {
    /// Project code.
    #[arg(value_name = "PROJECT")]
    pub(crate) project: String,
    /// Profile, for example `production`.
    #[arg(value_name = "PROFILE")]
    pub(crate) profile: String,
    /// Action to perform.
    #[arg(value_enum, value_name = "ACTION")]
    pub(crate) action: Action,
}

const SETTINGS_HELP: &str = "\
Settings flags must come before PROJECT:
      --config-path <PATH>     TOML file with any of the settings below
      --host <HOST>            Authority host name [env: SUPERDIAMOND_HOST]
      --port <PORT>            Authority TCP port [env: SUPERDIAMOND_PORT]
      --backup-dir <DIR>       Local snapshot backups [env: SUPERDIAMOND_BACKUP_DIR]
      --log-filter <FILTER>    Diagnostics filter on stderr [env: SUPERDIAMOND_LOG_FILTER]
      --log-format <FORMAT>    compact or json [env: SUPERDIAMOND_LOG_FORMAT]
      --blank-values <POLICY>  retain or remove [env: SUPERDIAMOND_BLANK_VALUES]
      --reconnect <POLICY>     never or always [env: SUPERDIAMOND_RECONNECT]

Flags override environment variables, which override the configuration file.";
