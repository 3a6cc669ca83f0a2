use serde::{Deserialize, Serialize};

/// Lifecycle state of the daemon as reported by the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    NotInstalled,
    /// Installed but not running
    Installed,
    Running,
}

impl From<service_manager::ServiceStatus> for DaemonState {
    fn from(status: service_manager::ServiceStatus) -> Self {
        match status {
            service_manager::ServiceStatus::NotInstalled => DaemonState::NotInstalled,
            service_manager::ServiceStatus::Stopped(_) => DaemonState::Installed,
            service_manager::ServiceStatus::Running => DaemonState::Running,
        }
    }
}

/// What `remove` does when the daemon is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovePolicy {
    /// Fail and leave the service untouched
    #[default]
    Reject,
    /// Stop the daemon, wait for it to exit, then remove it
    StopFirst,
}
