use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::state::RemovePolicy;

pub const DEFAULT_LABEL: &str = "one.harmony.watchdog";
pub const DEFAULT_DISPLAY_NAME: &str = "harmony-watchdog";
const SETTINGS_FILE_NAME: &str = "watchdog.toml";

/// How the harmony-watchdog daemon is registered and controlled.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /* what the service manager runs */
    #[serde(default)]
    pub program: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub username: Option<String>,

    /* registration */
    #[serde(default)]
    pub user_level: bool,
    #[serde(default = "default_true")]
    pub autostart: bool,
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: Option<u32>,

    /* lifecycle */
    #[serde(default)]
    pub remove_policy: RemovePolicy,
    #[serde(default = "default_transition_timeout")]
    pub transition_timeout_secs: u64,
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_restart_delay() -> Option<u32> {
    Some(5)
}

fn default_transition_timeout() -> u64 {
    5
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            label: default_label(),
            display_name: default_display_name(),
            program: None,
            args: Vec::new(),
            working_directory: None,
            environment: HashMap::new(),
            username: None,
            user_level: false,
            autostart: true,
            restart_delay_secs: default_restart_delay(),
            remove_policy: RemovePolicy::default(),
            transition_timeout_secs: default_transition_timeout(),
        }
    }
}

impl ServiceSettings {
    /// Load settings from `path`, or from the default location when no path is given.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub async fn load(path: Option<&str>) -> Result<(Self, String), LoadSettingsError> {
        let (path, explicit) = match path {
            Some(v) => (v.to_string(), true),
            None => (Self::get_default_path().await, false),
        };

        if !explicit && !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(%path, "no settings file found, using defaults");
            return Ok((ServiceSettings::default(), path));
        }

        let settings = filetype_load(&path).await?;
        Ok((settings, path))
    }

    pub async fn get_default_path() -> String {
        if tokio::fs::try_exists(SETTINGS_FILE_NAME).await.unwrap_or(false) {
            return SETTINGS_FILE_NAME.to_string();
        }

        #[cfg(target_os = "linux")]
        {
            let system_path = "/etc/harmony/watchdog.toml";
            if tokio::fs::try_exists(system_path).await.unwrap_or(false) {
                return system_path.to_string();
            }
        }

        let Some(config_path) = dirs::config_local_dir() else {
            return SETTINGS_FILE_NAME.to_string();
        };

        config_path
            .join("harmony_watchdog")
            .join(SETTINGS_FILE_NAME)
            .to_string_lossy()
            .into_owned()
    }
}

async fn filetype_load<T: DeserializeOwned>(path: &str) -> Result<T, LoadSettingsError> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| LoadSettingsError::IoError(path.to_string(), error))?;

    parse_settings(Path::new(path), &data)
}

fn parse_settings<T: DeserializeOwned>(path: &Path, data: &str) -> Result<T, LoadSettingsError> {
    let parse_error = |reason: String| LoadSettingsError::ParseError(path.display().to_string(), reason);

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(data).map_err(|e| parse_error(e.to_string())),
        Some("yaml") | Some("yml") => serde_yaml::from_str(data).map_err(|e| parse_error(e.to_string())),
        Some("json") => serde_json::from_str(data).map_err(|e| parse_error(e.to_string())),
        _ => serde_json::from_str(data)
            .map_err(|_| LoadSettingsError::UnknownFiletype(path.display().to_string())),
    }
}

#[derive(Debug)]
pub enum LoadSettingsError {
    IoError(String, std::io::Error),
    ParseError(String, String),
    UnknownFiletype(String),
}

impl std::fmt::Display for LoadSettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadSettingsError::IoError(path, e) => write!(f, "failed to read settings {}: {}", path, e),
            LoadSettingsError::ParseError(path, e) => write!(f, "invalid settings {}: {}", path, e),
            LoadSettingsError::UnknownFiletype(path) => {
                write!(f, "unknown settings file type: {} (use .toml, .yaml or .json)", path)
            }
        }
    }
}

impl std::error::Error for LoadSettingsError {}
