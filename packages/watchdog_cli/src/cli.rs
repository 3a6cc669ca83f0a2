use std::ffi::OsString;

use clap::{Arg, ArgAction, Command};

use crate::gateway::{CommandRegistry, Operation};
use crate::version::{LONG_VERSION, VERSION};

pub const BIN_NAME: &str = "watchdog";

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Stdout,
    File(String),
}

/// A parsed command line: the selected operation plus global options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub operation: Operation,
    pub settings_path: Option<String>,
    pub log_target: LogTarget,
}

pub fn cli(registry: &CommandRegistry) -> Command {
    let mut cmd = Command::new(BIN_NAME)
        .about("Manage the harmony-watchdog service")
        .version(VERSION)
        .long_version(LONG_VERSION.as_str())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("settings_path")
                .long("settings-path")
                .value_name("PATH")
                .help("path to the service settings file (.toml, .yaml or .json)")
                .global(true),
        )
        .arg(
            Arg::new("stdout")
                .short('s')
                .long("stdout")
                .action(ArgAction::SetTrue)
                .help("prints logs to stdout")
                .global(true),
        )
        .arg(
            Arg::new("log_path")
                .short('l')
                .long("log-path")
                .value_name("PATH")
                .help("path to write logs to")
                .conflicts_with("stdout")
                .global(true),
        );

    for descriptor in registry.commands() {
        cmd = cmd.subcommand(Command::new(descriptor.name).about(descriptor.about));
    }

    cmd
}

/// Parse `args` (program name first) against the registry.
pub fn parse<I, T>(registry: &CommandRegistry, args: I) -> Result<Invocation, ParseError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = cli(registry).try_get_matches_from(args).map_err(ParseError::Clap)?;

    let (name, _) = matches.subcommand().ok_or(ParseError::MissingCommand)?;
    let descriptor = registry
        .lookup(name)
        .ok_or_else(|| ParseError::UnknownCommand(name.to_string()))?;

    let log_target = match matches.get_one::<String>("log_path") {
        Some(path) => LogTarget::File(path.clone()),
        None if matches.get_flag("stdout") => LogTarget::Stdout,
        None => LogTarget::Stderr,
    };

    Ok(Invocation {
        operation: descriptor.operation,
        settings_path: matches.get_one::<String>("settings_path").cloned(),
        log_target,
    })
}

#[derive(Debug)]
pub enum ParseError {
    Clap(clap::Error),
    MissingCommand,
    UnknownCommand(String),
}

impl ParseError {
    /// `--help` and `--version` come back from clap as errors but are successful runs
    pub fn is_informational(&self) -> bool {
        match self {
            ParseError::Clap(error) => matches!(
                error.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ),
            _ => false,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Clap(error) => write!(f, "{}", error.render()),
            ParseError::MissingCommand => write!(f, "no command provided"),
            ParseError::UnknownCommand(name) => write!(f, "unknown command: {}", name),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Result<Invocation, ParseError> {
        parse(&CommandRegistry::new(), args.iter().copied())
    }

    #[test]
    fn command_tree_is_valid() {
        cli(&CommandRegistry::new()).debug_assert();
    }

    #[test]
    fn parses_each_command() {
        for operation in Operation::ALL {
            let invocation = parse_args(&["watchdog", operation.name()]).unwrap();
            assert_eq!(invocation.operation, operation);
            assert_eq!(invocation.settings_path, None);
            assert_eq!(invocation.log_target, LogTarget::Stderr);
        }
    }

    #[test]
    fn global_options_after_command() {
        let invocation = parse_args(&["watchdog", "start", "--settings-path", "/etc/watchdog.toml", "-l", "/tmp/w.log"]).unwrap();
        assert_eq!(invocation.operation, Operation::Start);
        assert_eq!(invocation.settings_path.as_deref(), Some("/etc/watchdog.toml"));
        assert_eq!(invocation.log_target, LogTarget::File("/tmp/w.log".to_string()));
    }

    #[test]
    fn stdout_logging() {
        let invocation = parse_args(&["watchdog", "-s", "status"]).unwrap();
        assert_eq!(invocation.log_target, LogTarget::Stdout);
    }

    #[test]
    fn stdout_and_log_path_conflict() {
        let err = parse_args(&["watchdog", "-s", "-l", "/tmp/w.log", "status"]).unwrap_err();
        assert!(!err.is_informational());
    }

    #[test]
    fn missing_command_is_an_error() {
        let err = parse_args(&["watchdog"]).unwrap_err();
        assert!(matches!(err, ParseError::Clap(_)));
        assert!(!err.is_informational());

        let err = parse_args(&["watchdog", "-s"]).unwrap_err();
        assert!(!err.is_informational());
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = parse_args(&["watchdog", "restart"]).unwrap_err();
        assert!(matches!(err, ParseError::Clap(_)));
        assert!(!err.is_informational());
    }

    #[test]
    fn help_and_version_are_informational() {
        assert!(parse_args(&["watchdog", "--help"]).unwrap_err().is_informational());
        assert!(parse_args(&["watchdog", "--version"]).unwrap_err().is_informational());

        let help = parse_args(&["watchdog", "--help"]).unwrap_err().to_string();
        assert!(help.contains("install the harmony-watchdog service"));
        assert!(help.contains("check status of the harmony-watchdog service"));
    }
}
