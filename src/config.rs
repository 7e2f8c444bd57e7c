use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::prompt::is_known_language;
use crate::reduce::{MAX_TRANSCRIPT_CHARACTERS, Reducer};
use crate::store::Preferences;

const DEFAULT_VALIDATION_TIMEOUT_SECS: u64 = 8;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub default_lang: Option<String>,
    pub default_model: Option<String>,
    pub default_length: Option<String>,
    pub max_transcript_chars: Option<usize>,
    pub inline_timestamps: Option<bool>,
    pub validation_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub storage_path: Option<PathBuf>,
}

impl Config {
    /// Load config from ~/.config/ytgist/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Preferences used until the user has stored their own
    pub fn default_preferences(&self) -> Preferences {
        let mut prefs = Preferences::default();
        if let Some(lang) = &self.default_lang {
            if is_known_language(lang) {
                prefs.language = lang.clone();
            } else {
                warn!("Ignoring default_lang: unknown language code: {lang}");
            }
        }
        if let Some(model) = &self.default_model {
            match model.parse() {
                Ok(model) => prefs.model = model,
                Err(e) => warn!("Ignoring default_model: {e}"),
            }
        }
        if let Some(length) = &self.default_length {
            match length.parse() {
                Ok(length) => prefs.length = length,
                Err(e) => warn!("Ignoring default_length: {e}"),
            }
        }
        prefs
    }

    pub fn reducer(&self) -> Reducer {
        Reducer {
            max_chars: self.max_transcript_chars.unwrap_or(MAX_TRANSCRIPT_CHARACTERS),
            timestamps: self.inline_timestamps.unwrap_or(true),
        }
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs.unwrap_or(DEFAULT_VALIDATION_TIMEOUT_SECS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS).max(1))
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(crate::store::default_storage_path)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytgist")
        .join("config.toml")
}
