//! CPU profile covering one CLI invocation.

use std::path::{Path, PathBuf};

pub const PROFILE_DIR_ENV: &str = "WATCHDOG_PROFILE_DIR";

#[cfg(unix)]
const SAMPLE_FREQUENCY: i32 = 100;

/// A resource opened when the process starts and finished right before it exits.
pub trait ProfileSession {
    /// Flush and close the session. Consumes it, so it can only happen once.
    fn finish(self);
}

/// Directory from `WATCHDOG_PROFILE_DIR`, else the OS temp dir.
pub fn profile_dir() -> PathBuf {
    std::env::var_os(PROFILE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Sampling CPU profiler writing a protobuf `.pprof` file on finish.
///
/// If `finish` is skipped (a panic unwinding through main) the profile is still
/// written on drop. Either way it is written once.
pub struct CpuProfile {
    output: PathBuf,
    #[cfg(unix)]
    guard: Option<pprof::ProfilerGuard<'static>>,
    start_error: Option<String>,
}

fn profile_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "watchdog-cpu-{}-{}.pprof",
        chrono::Local::now().format("%Y%m%dT%H%M%S"),
        std::process::id()
    ))
}

impl CpuProfile {
    pub fn start(dir: &Path) -> Self {
        let output = profile_path(dir);

        #[cfg(unix)]
        {
            match pprof::ProfilerGuard::new(SAMPLE_FREQUENCY) {
                Ok(guard) => CpuProfile {
                    output,
                    guard: Some(guard),
                    start_error: None,
                },
                Err(error) => CpuProfile {
                    output,
                    guard: None,
                    start_error: Some(error.to_string()),
                },
            }
        }

        #[cfg(not(unix))]
        {
            CpuProfile {
                output,
                start_error: Some("cpu profiling is not supported on this platform".to_string()),
            }
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Write the profile if it is still open. Returns the path when something was written.
    fn write(&mut self) -> Result<Option<PathBuf>, ProfileError> {
        #[cfg(unix)]
        {
            use pprof::protos::Message;

            let Some(guard) = self.guard.take() else {
                return Ok(None);
            };

            let report = guard
                .report()
                .build()
                .map_err(|e| ProfileError::Profiler(e.to_string()))?;
            let profile = report
                .pprof()
                .map_err(|e| ProfileError::Profiler(e.to_string()))?;

            std::fs::write(&self.output, profile.encode_to_vec()).map_err(ProfileError::Io)?;
            Ok(Some(self.output.clone()))
        }

        #[cfg(not(unix))]
        {
            Ok(None)
        }
    }
}

impl ProfileSession for CpuProfile {
    fn finish(mut self) {
        if let Some(error) = self.start_error.take() {
            tracing::warn!(%error, "cpu profiling was not enabled");
        }

        match self.write() {
            Ok(Some(path)) => tracing::info!(path = %path.display(), "cpu profile written"),
            Ok(None) => {}
            Err(error) => tracing::error!(%error, "failed to write cpu profile"),
        }
    }
}

impl Drop for CpuProfile {
    fn drop(&mut self) {
        if let Err(error) = self.write() {
            tracing::error!(%error, "failed to write cpu profile");
        }
    }
}

#[derive(Debug)]
pub enum ProfileError {
    Profiler(String),
    Io(std::io::Error),
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileError::Profiler(e) => write!(f, "profiler error: {}", e),
            ProfileError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ProfileError {}
