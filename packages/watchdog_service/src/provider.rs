use crate::error::ServiceError;

/// Result of a provider operation: a message for the user, or the failure to report.
pub type Outcome = Result<String, ServiceError>;

/// Lifecycle operations on the harmony-watchdog daemon.
///
/// Implementations own all daemon state; callers only forward the outcome.
#[allow(async_fn_in_trait)]
pub trait ServiceProvider {
    /// Register the daemon with the OS service manager
    async fn install(&self) -> Outcome;

    /// Unregister the daemon
    async fn remove(&self) -> Outcome;

    async fn start(&self) -> Outcome;

    async fn stop(&self) -> Outcome;

    /// Describe the current state without changing it
    async fn status(&self) -> Outcome;
}

impl<P: ServiceProvider> ServiceProvider for &P {
    async fn install(&self) -> Outcome {
        (**self).install().await
    }

    async fn remove(&self) -> Outcome {
        (**self).remove().await
    }

    async fn start(&self) -> Outcome {
        (**self).start().await
    }

    async fn stop(&self) -> Outcome {
        (**self).stop().await
    }

    async fn status(&self) -> Outcome {
        (**self).status().await
    }
}
