//! Service manager integration for install/uninstall/start/stop.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use service_manager::{
    RestartPolicy, ServiceInstallCtx, ServiceLabel, ServiceLevel, ServiceManager, ServiceStartCtx,
    ServiceStatusCtx, ServiceStopCtx, ServiceUninstallCtx,
};

use crate::error::{ServiceError, ServiceErrorKind};
use crate::settings::ServiceSettings;
use crate::state::DaemonState;

/// Everything the service manager needs to register the daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallRequest {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_directory: Option<PathBuf>,
    pub environment: Vec<(String, String)>,
    pub username: Option<String>,
    pub autostart: bool,
    pub restart_delay_secs: Option<u32>,
}

/// Raw calls into whatever manages services on this machine.
///
/// No policy lives here, each call maps to exactly one service manager request.
pub trait ServiceBackend {
    fn install(&self, request: InstallRequest) -> io::Result<()>;

    fn uninstall(&self) -> io::Result<()>;

    fn start(&self) -> io::Result<()>;

    fn stop(&self) -> io::Result<()>;

    fn state(&self) -> io::Result<DaemonState>;
}

/// Backend using the platform's native service manager (systemd, launchd, sc.exe, ...)
pub struct ManagerBackend {
    manager: Box<dyn ServiceManager>,
    label: ServiceLabel,
}

impl ManagerBackend {
    pub fn new(settings: &ServiceSettings) -> Result<Self, ServiceError> {
        let mut manager = <dyn ServiceManager>::native().map_err(|e| {
            ServiceError::new(
                ServiceErrorKind::Unavailable,
                format!("service manager not available: {}", e),
            )
        })?;

        match manager.available() {
            Ok(true) => {}
            Ok(false) => {
                return Err(ServiceError::new(
                    ServiceErrorKind::Unavailable,
                    "service manager not available on this system",
                ));
            }
            Err(e) => return Err(ServiceError::io("query service manager", e)),
        }

        if settings.user_level {
            manager.set_level(ServiceLevel::User).map_err(|e| {
                ServiceError::new(
                    ServiceErrorKind::Unavailable,
                    format!("user level services not supported: {}", e),
                )
            })?;
        }

        let label: ServiceLabel = settings.label.parse().map_err(|e| {
            ServiceError::new(
                ServiceErrorKind::NotConfigured,
                format!("invalid service label {:?}: {}", settings.label, e),
            )
        })?;

        tracing::debug!(?label, user_level = settings.user_level, "using native service manager");

        Ok(ManagerBackend { manager, label })
    }
}

impl ServiceBackend for ManagerBackend {
    fn install(&self, request: InstallRequest) -> io::Result<()> {
        let environment = if request.environment.is_empty() {
            None
        } else {
            Some(request.environment)
        };

        let ctx = ServiceInstallCtx {
            label: self.label.clone(),
            program: request.program,
            args: request.args,
            contents: None,
            username: request.username,
            working_directory: request.working_directory,
            environment,
            autostart: request.autostart,
            restart_policy: RestartPolicy::OnFailure {
                delay_secs: request.restart_delay_secs,
            },
        };

        self.manager.install(ctx)
    }

    fn uninstall(&self) -> io::Result<()> {
        self.manager.uninstall(ServiceUninstallCtx {
            label: self.label.clone(),
        })
    }

    fn start(&self) -> io::Result<()> {
        self.manager.start(ServiceStartCtx {
            label: self.label.clone(),
        })
    }

    fn stop(&self) -> io::Result<()> {
        self.manager.stop(ServiceStopCtx {
            label: self.label.clone(),
        })
    }

    fn state(&self) -> io::Result<DaemonState> {
        let status = self.manager.status(ServiceStatusCtx {
            label: self.label.clone(),
        })?;

        Ok(DaemonState::from(status))
    }
}

impl InstallRequest {
    pub fn from_settings(settings: &ServiceSettings) -> Result<Self, ServiceError> {
        let Some(program) = settings.program.clone() else {
            return Err(ServiceError::new(
                ServiceErrorKind::NotConfigured,
                format!(
                    "no program configured for the {} service, set `program` in the settings file",
                    settings.display_name
                ),
            ));
        };

        let mut environment: Vec<(String, String)> = settings
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        environment.sort();

        Ok(InstallRequest {
            program,
            args: settings.args.iter().map(OsString::from).collect(),
            working_directory: settings.working_directory.clone(),
            environment,
            username: settings.username.clone(),
            autostart: settings.autostart,
            restart_delay_secs: settings.restart_delay_secs,
        })
    }
}
