use std::time::Duration;

use crate::backend::{InstallRequest, ManagerBackend, ServiceBackend};
use crate::error::{ServiceError, ServiceErrorKind};
use crate::provider::{Outcome, ServiceProvider};
use crate::settings::ServiceSettings;
use crate::state::{DaemonState, RemovePolicy};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Service provider that registers the daemon with the OS service manager.
///
/// Enforces the install → start → stop → remove lifecycle on top of the raw
/// backend calls and confirms start/stop by polling the reported state.
pub struct NativeServiceProvider<B = ManagerBackend> {
    backend: B,
    settings: ServiceSettings,
}

impl NativeServiceProvider<ManagerBackend> {
    pub fn connect(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let backend = ManagerBackend::new(&settings)?;
        Ok(NativeServiceProvider { backend, settings })
    }
}

impl<B: ServiceBackend> NativeServiceProvider<B> {
    pub fn with_backend(backend: B, settings: ServiceSettings) -> Self {
        NativeServiceProvider { backend, settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn name(&self) -> &str {
        &self.settings.display_name
    }

    fn state(&self) -> Result<DaemonState, ServiceError> {
        self.backend
            .state()
            .map_err(|e| ServiceError::io("query service status", e))
    }

    fn not_installed(&self) -> ServiceError {
        ServiceError::new(
            ServiceErrorKind::NotInstalled,
            format!("{} service is not installed", self.name()),
        )
    }

    /// Poll until `done` accepts the reported state, bounded by the transition timeout.
    async fn wait_for(&self, action: &str, done: impl Fn(DaemonState) -> bool) -> Result<(), ServiceError> {
        let timeout = Duration::from_secs(self.settings.transition_timeout_secs);
        let attempts = (timeout.as_millis() / POLL_INTERVAL.as_millis()).max(1);

        for _ in 0..attempts {
            tokio::time::sleep(POLL_INTERVAL).await;

            let state = self.state()?;
            if done(state) {
                return Ok(());
            }

            tracing::trace!(?state, action, "waiting for service");
        }

        Err(ServiceError::new(
            ServiceErrorKind::Timeout,
            format!(
                "{} service did not {} within {} seconds",
                self.name(),
                action,
                self.settings.transition_timeout_secs
            ),
        ))
    }

    async fn stop_running(&self) -> Result<(), ServiceError> {
        self.backend
            .stop()
            .map_err(|e| ServiceError::io("stop service", e))?;

        self.wait_for("stop", |state| state != DaemonState::Running).await
    }
}

impl<B: ServiceBackend> ServiceProvider for NativeServiceProvider<B> {
    async fn install(&self) -> Outcome {
        if self.state()? != DaemonState::NotInstalled {
            return Err(ServiceError::new(
                ServiceErrorKind::AlreadyInstalled,
                format!("{} service is already installed", self.name()),
            ));
        }

        let request = InstallRequest::from_settings(&self.settings)?;
        tracing::info!(program = %request.program.display(), "installing service");

        self.backend
            .install(request)
            .map_err(|e| ServiceError::io("install service", e))?;

        Ok(format!("{} service installed", self.name()))
    }

    async fn remove(&self) -> Outcome {
        match self.state()? {
            DaemonState::NotInstalled => return Err(self.not_installed()),
            DaemonState::Installed => {}
            DaemonState::Running => match self.settings.remove_policy {
                RemovePolicy::Reject => {
                    return Err(ServiceError::new(
                        ServiceErrorKind::Running,
                        format!(
                            "{} service is running, stop it first or set remove_policy = \"stop-first\"",
                            self.name()
                        ),
                    ));
                }
                RemovePolicy::StopFirst => {
                    tracing::info!("service is running, stopping before remove");
                    self.stop_running().await?;
                }
            },
        }

        self.backend
            .uninstall()
            .map_err(|e| ServiceError::io("remove service", e))?;

        Ok(format!("{} service removed", self.name()))
    }

    async fn start(&self) -> Outcome {
        match self.state()? {
            DaemonState::NotInstalled => return Err(self.not_installed()),
            DaemonState::Running => {
                return Err(ServiceError::new(
                    ServiceErrorKind::AlreadyRunning,
                    format!("{} service is already running", self.name()),
                ));
            }
            DaemonState::Installed => {}
        }

        self.backend
            .start()
            .map_err(|e| ServiceError::io("start service", e))?;

        self.wait_for("start", |state| state == DaemonState::Running).await?;
        Ok(format!("{} service started", self.name()))
    }

    async fn stop(&self) -> Outcome {
        match self.state()? {
            DaemonState::NotInstalled => return Err(self.not_installed()),
            DaemonState::Installed => {
                return Err(ServiceError::new(
                    ServiceErrorKind::NotRunning,
                    format!("{} service is not running", self.name()),
                ));
            }
            DaemonState::Running => {}
        }

        self.stop_running().await?;
        Ok(format!("{} service stopped", self.name()))
    }

    async fn status(&self) -> Outcome {
        match self.state()? {
            DaemonState::NotInstalled => Err(self.not_installed()),
            DaemonState::Installed => Ok(format!("{} service is stopped", self.name())),
            DaemonState::Running => Ok(format!("{} service is running", self.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::io;
    use std::path::PathBuf;

    use super::*;

    /// In-memory service manager, `start` takes effect immediately unless `stuck` is set.
    struct FakeBackend {
        state: Cell<DaemonState>,
        stuck: bool,
        installed: RefCell<Option<InstallRequest>>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl FakeBackend {
        fn new(state: DaemonState) -> Self {
            FakeBackend {
                state: Cell::new(state),
                stuck: false,
                installed: RefCell::new(None),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ServiceBackend for FakeBackend {
        fn install(&self, request: InstallRequest) -> io::Result<()> {
            self.calls.borrow_mut().push("install");
            self.installed.replace(Some(request));
            self.state.set(DaemonState::Installed);
            Ok(())
        }

        fn uninstall(&self) -> io::Result<()> {
            self.calls.borrow_mut().push("uninstall");
            self.state.set(DaemonState::NotInstalled);
            Ok(())
        }

        fn start(&self) -> io::Result<()> {
            self.calls.borrow_mut().push("start");
            if !self.stuck {
                self.state.set(DaemonState::Running);
            }
            Ok(())
        }

        fn stop(&self) -> io::Result<()> {
            self.calls.borrow_mut().push("stop");
            if !self.stuck {
                self.state.set(DaemonState::Installed);
            }
            Ok(())
        }

        fn state(&self) -> io::Result<DaemonState> {
            Ok(self.state.get())
        }
    }

    struct BrokenBackend;

    impl ServiceBackend for BrokenBackend {
        fn install(&self, _: InstallRequest) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
        }

        fn uninstall(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
        }

        fn start(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
        }

        fn stop(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"))
        }

        fn state(&self) -> io::Result<DaemonState> {
            Ok(DaemonState::NotInstalled)
        }
    }

    fn settings() -> ServiceSettings {
        ServiceSettings {
            program: Some(PathBuf::from("/usr/local/bin/harmony-watchdog")),
            transition_timeout_secs: 0,
            ..ServiceSettings::default()
        }
    }

    fn provider(state: DaemonState) -> NativeServiceProvider<FakeBackend> {
        NativeServiceProvider::with_backend(FakeBackend::new(state), settings())
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let provider = provider(DaemonState::NotInstalled);

        assert_eq!(provider.install().await.unwrap(), "harmony-watchdog service installed");
        assert_eq!(provider.status().await.unwrap(), "harmony-watchdog service is stopped");
        assert_eq!(provider.start().await.unwrap(), "harmony-watchdog service started");
        assert_eq!(provider.status().await.unwrap(), "harmony-watchdog service is running");
        assert_eq!(provider.stop().await.unwrap(), "harmony-watchdog service stopped");
        assert_eq!(provider.remove().await.unwrap(), "harmony-watchdog service removed");

        assert_eq!(
            *provider.backend.calls.borrow(),
            vec!["install", "start", "stop", "uninstall"]
        );
    }

    #[tokio::test]
    async fn install_passes_settings_to_backend() {
        let provider = provider(DaemonState::NotInstalled);
        provider.install().await.unwrap();

        let installed = provider.backend.installed.borrow();
        let request = installed.as_ref().unwrap();
        assert_eq!(request.program, PathBuf::from("/usr/local/bin/harmony-watchdog"));
        assert!(request.autostart);
    }

    #[tokio::test]
    async fn install_twice_fails() {
        let provider = provider(DaemonState::Installed);
        let err = provider.install().await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::AlreadyInstalled);
        assert!(provider.backend.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn install_without_program_fails() {
        let provider = NativeServiceProvider::with_backend(
            FakeBackend::new(DaemonState::NotInstalled),
            ServiceSettings::default(),
        );

        let err = provider.install().await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::NotConfigured);
        assert!(provider.backend.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn operations_on_missing_service() {
        let provider = provider(DaemonState::NotInstalled);

        for res in [
            provider.remove().await,
            provider.start().await,
            provider.stop().await,
            provider.status().await,
        ] {
            let err = res.unwrap_err();
            assert_eq!(err.kind(), ServiceErrorKind::NotInstalled);
            assert_eq!(err.to_string(), "harmony-watchdog service is not installed");
        }

        assert!(provider.backend.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn start_when_running_fails() {
        let provider = provider(DaemonState::Running);
        let err = provider.start().await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::AlreadyRunning);
    }

    #[tokio::test]
    async fn stop_when_stopped_fails() {
        let provider = provider(DaemonState::Installed);
        let err = provider.stop().await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::NotRunning);
    }

    #[tokio::test]
    async fn remove_running_rejected_by_default() {
        let provider = provider(DaemonState::Running);
        let err = provider.remove().await.unwrap_err();

        assert_eq!(err.kind(), ServiceErrorKind::Running);
        assert_eq!(provider.backend.state.get(), DaemonState::Running);
        assert!(provider.backend.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn remove_running_with_stop_first() {
        let provider = NativeServiceProvider::with_backend(
            FakeBackend::new(DaemonState::Running),
            ServiceSettings {
                remove_policy: RemovePolicy::StopFirst,
                ..settings()
            },
        );

        assert_eq!(provider.remove().await.unwrap(), "harmony-watchdog service removed");
        assert_eq!(*provider.backend.calls.borrow(), vec!["stop", "uninstall"]);
        assert_eq!(provider.backend.state.get(), DaemonState::NotInstalled);
    }

    #[tokio::test]
    async fn start_times_out_when_service_never_runs() {
        let mut backend = FakeBackend::new(DaemonState::Installed);
        backend.stuck = true;
        let provider = NativeServiceProvider::with_backend(backend, settings());

        let err = provider.start().await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::Timeout);
        assert_eq!(err.to_string(), "harmony-watchdog service did not start within 0 seconds");
    }

    #[tokio::test]
    async fn stop_first_does_not_remove_if_stop_times_out() {
        let mut backend = FakeBackend::new(DaemonState::Running);
        backend.stuck = true;
        let provider = NativeServiceProvider::with_backend(
            backend,
            ServiceSettings {
                remove_policy: RemovePolicy::StopFirst,
                ..settings()
            },
        );

        let err = provider.remove().await.unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::Timeout);
        assert_eq!(*provider.backend.calls.borrow(), vec!["stop"]);
    }

    #[tokio::test]
    async fn backend_errors_are_reported_as_io() {
        let provider = NativeServiceProvider::with_backend(BrokenBackend, settings());
        let err = provider.install().await.unwrap_err();

        assert_eq!(err.kind(), ServiceErrorKind::Io);
        assert_eq!(err.to_string(), "failed to install service: access denied");
    }

    #[tokio::test]
    async fn messages_use_display_name() {
        let provider = NativeServiceProvider::with_backend(
            FakeBackend::new(DaemonState::Running),
            ServiceSettings {
                display_name: "node-metadata-watcher".to_string(),
                ..settings()
            },
        );

        assert_eq!(provider.status().await.unwrap(), "node-metadata-watcher service is running");
        assert_eq!(provider.settings().display_name, "node-metadata-watcher");
    }
}
