//! Terminal host for the dataforge bridge.
//!
//! `dataforge-bridge [CONFIG FLAGS] <FILE>...` registers the bridge's
//! run-on-file command with a [`TerminalHost`](host::TerminalHost), triggers
//! it once per file, and prints each outcome the way the editor integrations
//! word them. The process exits successfully only when every file produced
//! tool output. Termination signals cancel all in-flight runs.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use forge_bridge::{
    CommandDispatcher, DispatchSettings, HostAdapter, InvokerSettings, RUN_ON_FILE_COMMAND,
    SystemInvoker,
};
use forge_config::Config;
use thiserror::Error;
use tracing::info;

mod config;
mod host;
mod shutdown;
pub mod telemetry;

use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use host::{HostEvent, Tally, TerminalHost, render};
use shutdown::ShutdownListener;
use telemetry::TelemetryError;

/// Tracing target for the terminal host.
pub(crate) const CLI_TARGET: &str = "forge_cli";

/// How often the renderer checks whether every run has finished.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Runs `dataforge` on each of the given files.
#[derive(Debug, Parser)]
#[command(
    name = "dataforge-bridge",
    version,
    about = "Run dataforge on files and report the results",
    after_help = "Configuration flags (--executable, --path-flag, --working-dir, \
                  --grace-period-ms, --timeout-secs, --log-filter, --log-format, \
                  --config-path) must precede the files."
)]
struct Cli {
    /// Files to analyse.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

/// Runs the terminal host using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&args, stdout, stderr, loader) {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error))
            if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W, E, L>(
    args: &[OsString],
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> Result<ExitCode, AppError>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let split = split_config_arguments(args);
    let cli_arguments = args
        .first()
        .into_iter()
        .chain(args.iter().skip(split.files_start))
        .cloned();
    let cli = Cli::try_parse_from(cli_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;

    let (host, events) = TerminalHost::channel();
    let host = Arc::new(host);
    let adapter: Arc<dyn HostAdapter> = Arc::clone(&host) as Arc<dyn HostAdapter>;
    let dispatcher = Arc::new(CommandDispatcher::new(
        invoker_for(&config),
        adapter,
        dispatch_settings_for(&config),
    ));
    dispatcher.install();
    let _listener =
        ShutdownListener::spawn(Arc::clone(dispatcher.registry())).map_err(AppError::Signals)?;

    let targets = distinct_targets(cli.files);
    info!(
        target: CLI_TARGET,
        files = targets.len(),
        executable = config.executable(),
        "running dataforge"
    );
    for target in &targets {
        if !host.trigger(RUN_ON_FILE_COMMAND, target) {
            return Err(AppError::CommandUnavailable(RUN_ON_FILE_COMMAND));
        }
    }

    let tally = render_until_idle(&dispatcher, &events, stdout, stderr).map_err(AppError::Output)?;
    info!(
        target: CLI_TARGET,
        infos = tally.infos,
        warnings = tally.warnings,
        errors = tally.errors,
        "all invocations finished"
    );
    Ok(if tally.all_succeeded(targets.len()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn invoker_for(config: &Config) -> SystemInvoker {
    SystemInvoker::default().with_settings(
        InvokerSettings::default()
            .with_grace_period(config.grace_period())
            .with_timeout(config.timeout()),
    )
}

fn dispatch_settings_for(config: &Config) -> DispatchSettings {
    DispatchSettings::new(config.executable())
        .with_path_flag(config.path_flag().map(str::to_owned))
        .with_working_dir(config.working_dir().map(|dir| dir.as_std_path().to_path_buf()))
}

/// Drops repeated spellings of the same file, which would otherwise cancel
/// each other's runs.
fn distinct_targets(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|file| seen.insert(fs::canonicalize(file).unwrap_or_else(|_| file.clone())))
        .collect()
}

/// Renders host events until every worker has reported.
fn render_until_idle<I, W, E>(
    dispatcher: &CommandDispatcher<I>,
    events: &Receiver<HostEvent>,
    stdout: &mut W,
    stderr: &mut E,
) -> io::Result<Tally>
where
    W: Write,
    E: Write,
{
    let mut tally = Tally::default();
    loop {
        match events.recv_timeout(IDLE_POLL) {
            Ok(event) => render(&event, stdout, stderr, &mut tally)?,
            Err(RecvTimeoutError::Timeout) if dispatcher.wait_idle(Duration::ZERO) => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(tally),
        }
    }
    // Workers queue their notification before they count as finished.
    for event in events.try_iter() {
        render(&event, stdout, stderr, &mut tally)?;
    }
    stdout.flush()?;
    stderr.flush()?;
    Ok(tally)
}

/// Errors that stop the terminal host before or while it runs.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    /// The command line was malformed.
    #[error("{0}")]
    CliUsage(clap::Error),
    /// Telemetry could not be initialised.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Termination signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signals(io::Error),
    /// The bridge never registered its command with the host.
    #[error("command '{0}' is not registered")]
    CommandUnavailable(&'static str),
    /// Writing results to the terminal failed.
    #[error("failed to write output: {0}")]
    Output(io::Error),
}
