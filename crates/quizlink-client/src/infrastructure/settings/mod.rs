//! TOML-based settings persistence for QuizLink clients.
//!
//! Reads and writes [`Settings`] at the platform-appropriate path:
//! - Windows:  `%APPDATA%\QuizLink\settings.toml`
//! - Linux:    `~/.config/quizlink/settings.toml`
//! - macOS:    `~/Library/Application Support/QuizLink/settings.toml`
//!
//! Every field carries a serde default, so a missing file, an empty file, and
//! a file written by an older version all load cleanly.  Example:
//!
//! ```toml
//! [hub]
//! url = "ws://quiz-hub.local:3001/ws"
//!
//! [reconnect]
//! max_attempts = 5
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//!
//! [monitor]
//! log_level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ChannelConfig;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Settings schema types ─────────────────────────────────────────────────────

/// Top-level settings stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub hub: HubSettings,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

/// Where to find the quiz hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubSettings {
    /// WebSocket URL of the quiz hub.
    #[serde(default = "default_hub_url")]
    pub url: String,
}

/// Self-healing parameters for the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectSettings {
    /// Ceiling on consecutive unexpected drops before the channel gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first redial of a failure episode, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on the backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Monitor binary behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSettings {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_hub_url() -> String {
    "ws://127.0.0.1:3001/ws".to_string()
}
fn default_max_attempts() -> u32 {
    5
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            url: default_hub_url(),
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Converts the persisted settings into a runtime [`ChannelConfig`].
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            hub_url: self.hub.url.clone(),
            max_reconnect_attempts: self.reconnect.max_attempts,
            reconnect_initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
            reconnect_max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn settings_dir() -> Result<PathBuf, SettingsError> {
    platform_settings_dir().ok_or(SettingsError::NoPlatformConfigDir)
}

/// Resolves the full path to the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] if the base directory
/// cannot be determined.
pub fn settings_file_path() -> Result<PathBuf, SettingsError> {
    Ok(settings_dir()?.join("settings.toml"))
}

/// Loads [`Settings`] from the platform path, returning `Settings::default()`
/// if the file does not yet exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system errors other than "not
/// found", and [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings() -> Result<Settings, SettingsError> {
    let path = settings_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(SettingsError::Io { path, source: e }),
    }
}

/// Loads [`Settings`] from an explicit path.
///
/// Unlike [`load_settings`], a missing file is an error here: when the user
/// names a settings file, silently substituting defaults would hide a typo.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] if the file cannot be read and
/// [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings_from(path: &Path) -> Result<Settings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Persists `settings` to the platform path.
///
/// Creates the settings directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system failures or
/// [`SettingsError::Serialize`] if serialization fails.
pub fn save_settings(settings: &Settings) -> Result<(), SettingsError> {
    let path = settings_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(&path, content).map_err(|source| SettingsError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the QuizLink
/// subdirectory.
fn platform_settings_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("QuizLink"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("quizlink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("QuizLink")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
