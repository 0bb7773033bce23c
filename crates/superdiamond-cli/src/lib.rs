//! Command-line runtime for the `superdiamond` tool.
//!
//! The runtime parses arguments, loads settings, starts a
//! [`ConfigClient`] and either dumps the loaded configuration or streams
//! changes until interrupted. IO streams are injected so tests can drive the
//! whole flow with in-memory writers.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use superdiamond_client::{ChangeEvent, ConfigClient, EventFilter, ProjectIdentity};
use superdiamond_config::ClientSettings;
use tracing::info_span;

mod cli;
mod config;
mod errors;
mod telemetry;

use cli::{Action, Cli};
pub(crate) use config::{
    ConfigArgumentSplit, ConfigLoader, OrthoConfigLoader, split_config_arguments,
};
use errors::AppError;

/// Flags consumed by the settings loader rather than clap.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--backup-dir",
    "--log-filter",
    "--log-format",
    "--blank-values",
    "--reconnect",
];

/// How often `watch` checks for a shutdown request.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Source of the request that ends `watch`.
pub(crate) enum Shutdown {
    /// SIGINT or SIGTERM.
    Signals,
    /// A flag raised by the caller.
    #[cfg_attr(not(test), expect(dead_code, reason = "raised by tests only"))]
    Flag(Arc<AtomicBool>),
}

impl Shutdown {
    fn arm(self) -> Result<Arc<AtomicBool>, AppError> {
        match self {
            Self::Flag(flag) => Ok(flag),
            Self::Signals => {
                let flag = Arc::new(AtomicBool::new(false));
                for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
                    signal_hook::flag::register(signal, Arc::clone(&flag))
                        .map_err(AppError::Signal)?;
                }
                Ok(flag)
            }
        }
    }
}

/// Runs the CLI with the given arguments and streams, returning the exit code.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader, Shutdown::Signals)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(command) = args.get(split.command_start..) {
        cli_arguments.extend(command.iter().cloned());
    }
    cli_arguments
}

/// Runs the CLI with a custom settings loader and shutdown source.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    shutdown: Shutdown,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = match Cli::try_parse_from(prepare_cli_arguments(&args, &split)) {
        Ok(cli) => cli,
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return match write!(stdout, "{error}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => {
            let _ = write!(stderr, "{}", AppError::CliUsage(error));
            return ExitCode::FAILURE;
        }
    };

    let outcome = loader
        .load(&split.config_arguments)
        .and_then(|settings| execute(cli, settings, stdout, shutdown));
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(
    cli: Cli,
    settings: ClientSettings,
    stdout: &mut W,
    shutdown: Shutdown,
) -> Result<(), AppError> {
    telemetry::initialise(&settings)?;
    let span = info_span!(
        "superdiamond",
        project = %cli.project,
        profile = %cli.profile,
        action = ?cli.action,
    );
    let _entered = span.enter();

    let identity = ProjectIdentity::new(cli.project, cli.profile)?;
    let client = ConfigClient::builder(identity, settings).connect()?;

    dump(&client, stdout)?;
    if cli.action == Action::Watch {
        let flag = shutdown.arm()?;
        watch(&client, stdout, &flag)?;
    }
    client.close();
    Ok(())
}

fn dump<W: Write>(client: &ConfigClient, stdout: &mut W) -> Result<(), AppError> {
    for (key, value) in client.properties()? {
        writeln!(stdout, "{key} = {value}").map_err(AppError::Output)?;
    }
    stdout.flush().map_err(AppError::Output)
}

fn watch<W: Write>(
    client: &ConfigClient,
    stdout: &mut W,
    shutdown: &AtomicBool,
) -> Result<(), AppError> {
    let (sender, events) = mpsc::channel::<ChangeEvent>();
    let listener = client.add_listener(EventFilter::Any, move |event| {
        // The receiver only goes away once watching has stopped.
        let _ = sender.send(event.clone());
    });

    let outcome = forward_events(&events, stdout, shutdown);
    client.remove_listener(listener);
    outcome
}

fn forward_events<W: Write>(
    events: &mpsc::Receiver<ChangeEvent>,
    stdout: &mut W,
    shutdown: &AtomicBool,
) -> Result<(), AppError> {
    while !shutdown.load(Ordering::SeqCst) {
        match events.recv_timeout(WATCH_POLL_INTERVAL) {
            Ok(event) => {
                writeln!(stdout, "{} {} = {}", event.kind, event.key, event.value)
                    .and_then(|()| stdout.flush())
                    .map_err(AppError::Output)?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
