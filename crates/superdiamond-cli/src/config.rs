//! Settings loading for the `superdiamond` tool.
//!
//! Leading settings flags are split off and handed to `ortho_config`, which
//! layers them over `SUPERDIAMOND_*` environment variables, an optional
//! configuration file and the built-in defaults. Everything from the first
//! other token onwards is parsed by clap.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use superdiamond_config::ClientSettings;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads settings from the program name plus the leading settings flags.
    ///
    /// Settings flags (listed in `CONFIG_CLI_FLAGS`) must come before the
    /// project, profile and action; later ones reach clap and are rejected.
    fn load(&self, args: &[OsString]) -> Result<ClientSettings, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<ClientSettings, AppError> {
        ClientSettings::load_from_iter(args.iter().cloned()).map_err(AppError::Settings)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        let Some(stripped) = argument_text.strip_prefix("--") else {
            return FlagAction::Skip;
        };

        let (name, inline_value) = match stripped.split_once('=') {
            Some((name, _)) => (name, true),
            None => (stripped, false),
        };
        if super::CONFIG_CLI_FLAGS
            .iter()
            .any(|flag| flag.strip_prefix("--") == Some(name))
        {
            return FlagAction::Include {
                needs_value: !inline_value,
            };
        }

        FlagAction::Skip
    }
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut pending_value = false;
    let mut command_start = 1usize;

    for argument in args.iter().skip(1) {
        if pending_value {
            pending_value = false;
        } else {
            match OrthoConfigLoader::process_config_flag(argument.as_os_str()) {
                FlagAction::Include { needs_value } => pending_value = needs_value,
                FlagAction::Skip => break,
            }
        }
        config_arguments.push(argument.clone());
        command_start += 1;
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}
