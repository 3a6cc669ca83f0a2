use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::cli::LogTarget;

pub const LOG_ENV: &str = "WATCHDOG_LOG";

/// Install the global subscriber.
///
/// The returned guard flushes buffered log lines when dropped, so it must outlive
/// everything that still logs. A subscriber that is already installed is left in place.
pub fn init(target: &LogTarget) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            None
        }
        LogTarget::Stdout => {
            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .try_init();
            Some(guard)
        }
        LogTarget::File(path) => {
            let write_path = match path.rsplit_once('/') {
                Some((dir, file)) => tracing_appender::rolling::never(dir, file),
                None => tracing_appender::rolling::never(".", path),
            };

            let (non_blocking, guard) = tracing_appender::non_blocking(write_path);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(non_blocking)
                .try_init();
            Some(guard)
        }
    }
}
