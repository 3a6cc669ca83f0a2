//! Process entry: parse, dispatch, report, finish the profile, pick the exit status.

use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::process::ExitCode;

use watchdog_service::{LoadSettingsError, NativeServiceProvider, ServiceError, ServiceProvider, ServiceSettings};

use crate::cli::{self, Invocation, ParseError};
use crate::gateway::{self, CommandRegistry};
use crate::logging;
use crate::profiling::ProfileSession;

/// Status for any failed invocation. Matches `exit(-1)` on unix.
pub const FAILURE_EXIT_CODE: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    Failure,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::Failure => FAILURE_EXIT_CODE,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[derive(Debug)]
pub enum CliError {
    /// Bad command line, no provider was touched
    Dispatch(ParseError),
    Settings(LoadSettingsError),
    /// Returned by the provider, shown as-is
    Operation(ServiceError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Dispatch(e) => write!(f, "{}", e),
            CliError::Settings(e) => write!(f, "{}", e),
            CliError::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ParseError> for CliError {
    fn from(e: ParseError) -> Self {
        CliError::Dispatch(e)
    }
}

impl From<LoadSettingsError> for CliError {
    fn from(e: LoadSettingsError) -> Self {
        CliError::Settings(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Operation(e)
    }
}

/// Produces the provider once the command line is known to be valid.
#[allow(async_fn_in_trait)]
pub trait Connect {
    type Provider: ServiceProvider;

    async fn connect(self, settings_path: Option<&str>) -> Result<Self::Provider, CliError>;
}

/// Connects to the OS service manager using the settings file.
pub struct NativeConnect;

impl Connect for NativeConnect {
    type Provider = NativeServiceProvider;

    async fn connect(self, settings_path: Option<&str>) -> Result<Self::Provider, CliError> {
        let (settings, path) = ServiceSettings::load(settings_path).await?;
        tracing::debug!(%path, label = %settings.label, "loaded service settings");

        Ok(NativeServiceProvider::connect(settings)?)
    }
}

/// Run one invocation end to end.
///
/// `session` is finished after the outcome is reported and before the exit status
/// is returned, on every path.
pub async fn run<I, T, C, S, W>(args: I, session: S, connector: C, out: &mut W) -> Exit
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    C: Connect,
    S: ProfileSession,
    W: Write,
{
    let registry = CommandRegistry::new();
    let parsed = cli::parse(&registry, args);

    let _log_guard = parsed
        .as_ref()
        .ok()
        .and_then(|invocation| logging::init(&invocation.log_target));

    let result = match parsed {
        Ok(invocation) => dispatch(invocation, connector, out).await,
        Err(error) => Err(CliError::Dispatch(error)),
    };

    let exit = report(result, out);
    session.finish();
    exit
}

async fn dispatch<C: Connect, W: Write>(invocation: Invocation, connector: C, out: &mut W) -> Result<(), CliError> {
    let provider = connector.connect(invocation.settings_path.as_deref()).await?;
    gateway::execute(invocation.operation, &provider, out).await?;
    Ok(())
}

fn report<W: Write>(result: Result<(), CliError>, out: &mut W) -> Exit {
    let error = match result {
        Ok(()) => return Exit::Success,
        Err(error) => error,
    };

    let (text, exit) = match &error {
        CliError::Dispatch(parse) if parse.is_informational() => (error.to_string(), Exit::Success),
        CliError::Dispatch(ParseError::Clap(_)) => (error.to_string(), Exit::Failure),
        _ => (format!("{}\n", error), Exit::Failure),
    };

    if exit == Exit::Failure {
        tracing::debug!(error = %text.trim_end(), "command failed");
    }

    if let Err(error) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        tracing::error!(?error, "failed to write error output");
    }

    exit
}
