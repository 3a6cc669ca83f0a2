//! Lifecycle control for the harmony-watchdog daemon.
//!
//! This crate provides:
//! - the [`ServiceProvider`] trait the CLI dispatches to
//! - a native provider backed by the OS service manager
//! - service settings loaded from toml/yaml/json

pub mod backend;
pub mod error;
pub mod native;
pub mod provider;
pub mod settings;
pub mod state;

pub use error::{ServiceError, ServiceErrorKind};
pub use native::NativeServiceProvider;
pub use provider::{Outcome, ServiceProvider};
pub use settings::{LoadSettingsError, ServiceSettings};
pub use state::{DaemonState, RemovePolicy};
