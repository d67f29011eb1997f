use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CasError, Result};

/// Config filename looked up in the working directory.
pub const CONFIG_FILE: &str = "cas-parser.toml";

/// Resolved configuration for the parser and the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path the settings were (or would be) loaded from.
    pub config_path: PathBuf,
    /// User settings loaded from `cas-parser.toml`.
    pub settings: UserSettings,
}

/// User-configurable settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub parser: ParserSettings,
    pub output: OutputSettings,
    pub events: EventSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Documents larger than this are rejected before decoding.
    pub max_document_size_mb: u32,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            max_document_size_mb: 25,
        }
    }
}

/// Output-related settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output format: "pretty" (default) or "minified".
    pub format: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "pretty".into(),
        }
    }
}

/// Lifecycle event settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// JSONL file to append events to; events go to the log when unset.
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "warn".into(),
        }
    }
}

impl Config {
    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or invalid.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let config_path = path.into();
        let settings = Self::load_settings(&config_path).unwrap_or_default();
        Self {
            config_path,
            settings,
        }
    }

    /// Load `cas-parser.toml` from the current working directory.
    pub fn from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| CasError::Config(format!("cannot get cwd: {e}")))?;
        Ok(Self::load(cwd.join(CONFIG_FILE)))
    }

    fn load_settings(config_path: &Path) -> Option<UserSettings> {
        if !config_path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(config_path).ok()?;
        match toml::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "invalid config, using defaults");
                None
            }
        }
    }

    /// Size limit in bytes for a single document.
    #[must_use]
    pub fn max_document_bytes(&self) -> usize {
        self.settings.parser.max_document_size_mb as usize * 1024 * 1024
    }

    #[must_use]
    pub fn pretty_output(&self) -> bool {
        self.settings.output.format != "minified"
    }

    /// Event log path, resolved relative to the config file's directory.
    #[must_use]
    pub fn event_log_path(&self) -> Option<PathBuf> {
        let custom = self.settings.events.log_file.as_ref()?;
        let path = Path::new(custom);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        let base = self.config_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(path))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_FILE),
            settings: UserSettings::default(),
        }
    }
}
