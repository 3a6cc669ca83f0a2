//! Maps the service subcommands onto [`ServiceProvider`] operations.

use std::io::Write;

use watchdog_service::{Outcome, ServiceError, ServiceProvider};

const INSTALL_ABOUT: &str = "install the harmony-watchdog service";
const REMOVE_ABOUT: &str = "remove the harmony-watchdog service";
const START_ABOUT: &str = "start the harmony-watchdog service";
const STOP_ABOUT: &str = "stop the harmony-watchdog service";
const STATUS_ABOUT: &str = "check status of the harmony-watchdog service";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Remove,
    Start,
    Stop,
    Status,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Install,
        Operation::Remove,
        Operation::Start,
        Operation::Stop,
        Operation::Status,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Remove => "remove",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Status => "status",
        }
    }

    fn about(self) -> &'static str {
        match self {
            Operation::Install => INSTALL_ABOUT,
            Operation::Remove => REMOVE_ABOUT,
            Operation::Start => START_ABOUT,
            Operation::Stop => STOP_ABOUT,
            Operation::Status => STATUS_ABOUT,
        }
    }

    pub async fn invoke<P: ServiceProvider>(self, provider: &P) -> Outcome {
        match self {
            Operation::Install => provider.install().await,
            Operation::Remove => provider.remove().await,
            Operation::Start => provider.start().await,
            Operation::Stop => provider.stop().await,
            Operation::Status => provider.status().await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub about: &'static str,
    pub operation: Operation,
}

/// The service subcommands, in display order.
///
/// Built once at startup and handed to whoever needs to dispatch.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let commands = Operation::ALL
            .into_iter()
            .map(|operation| CommandDescriptor {
                name: operation.name(),
                about: operation.about(),
                operation,
            })
            .collect();

        CommandRegistry { commands }
    }

    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|cmd| cmd.name == name)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one operation and print its message.
///
/// Failures are handed back untouched and nothing is printed for them.
pub async fn execute<P, W>(operation: Operation, provider: &P, out: &mut W) -> Result<(), ServiceError>
where
    P: ServiceProvider,
    W: Write,
{
    tracing::debug!(command = operation.name(), "running service command");

    let message = operation.invoke(provider).await?;

    if let Err(error) = writeln!(out, "{}", message) {
        tracing::error!(?error, command = operation.name(), "failed to write command output");
    }

    Ok(())
}
