use std::fmt::{Display, Formatter};

/// Machine readable reason attached to a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// No usable service manager on this platform
    Unavailable,
    /// Settings are missing something the operation needs
    NotConfigured,
    AlreadyInstalled,
    NotInstalled,
    AlreadyRunning,
    NotRunning,
    /// Remove was refused because the daemon is still running
    Running,
    /// The service manager accepted the request but the daemon never reached the expected state
    Timeout,
    /// The service manager call itself failed
    Io,
}

/// Failure returned by a service provider operation.
///
/// The message is what the user sees; the kind lets callers branch without parsing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    kind: ServiceErrorKind,
    message: String,
}

impl ServiceError {
    pub fn new<M: Into<String>>(kind: ServiceErrorKind, message: M) -> Self {
        ServiceError {
            kind,
            message: message.into(),
        }
    }

    pub fn io(action: &str, error: std::io::Error) -> Self {
        ServiceError::new(ServiceErrorKind::Io, format!("failed to {}: {}", action, error))
    }

    pub fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ServiceError {}
