//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use ortho_config::OrthoError;
use superdiamond_client::{AccessError, BootstrapError, IdentityError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid settings: {0}")]
    Settings(#[source] Arc<OrthoError>),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("invalid project identity: {0}")]
    Identity(#[from] IdentityError),
    #[error("failed to load configuration: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("failed to resolve configuration values: {0}")]
    Access(#[from] AccessError),
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}
