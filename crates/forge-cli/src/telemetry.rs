//! Log output for the terminal host.
//!
//! Events go to stderr so stdout carries nothing but tool output, and each
//! line names its thread: every invocation runs on a worker called
//! `dataforge-<id>`, which ties log lines to the run that produced them.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use forge_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Reasons the log subscriber could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid filter directive.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
    /// A global subscriber was already installed elsewhere.
    #[error("failed to install log subscriber: {0}")]
    Install(SetGlobalDefaultError),
}

/// Installs the stderr subscriber described by `config`.
///
/// Only the first call installs anything; the runtime is entered repeatedly
/// from tests within one process.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] or [`TelemetryError::Install`].
pub fn initialise(config: &Config) -> Result<(), TelemetryError> {
    INSTALLED.get_or_try_init(|| install(config)).map(|_| ())
}

fn install(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::InvalidFilter(error.to_string()))?;
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_thread_names(true)
        .with_timer(UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Install)
}
