//! Configuration management

use crate::speech::utterance::UtteranceIdStrategy;
use crate::{Result, SpeechError};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Adapter configuration
///
/// Holds adapter behaviour only. Voice, rate and pitch are chosen per
/// request by the host and never stored here.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.tts-highlight.cfg by default)
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location or create it
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| SpeechError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| SpeechError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// In-memory defaults, not backed by a file the caller cares about
    pub fn defaults() -> Self {
        Self {
            ini: Self::default_config(),
            path: Self::config_path(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| SpeechError::Config(format!("Failed to save config: {}", e)))
    }

    /// Default config file path (~/.tts-highlight.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tts-highlight.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("adapter"))
            .set("utterance_ids", "uuid")
            .set("init_timeout_ms", "5000");

        ini.with_section(Some("logging")).set("level", "error");

        ini
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an unsigned integer value from config
    pub fn get_u64(&self, section: &str, key: &str, default: u64) -> u64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// How ids are generated for requests without one
    pub fn utterance_id_strategy(&self) -> UtteranceIdStrategy {
        let raw = self.get_string("adapter", "utterance_ids", "uuid");
        raw.parse().unwrap_or_else(|e| {
            warn!("{}, using uuid", e);
            UtteranceIdStrategy::Uuid
        })
    }

    /// How long callers wait for the engine to come up
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.get_u64("adapter", "init_timeout_ms", 5000))
    }

    /// Log level for normal (non-debug) runs
    pub fn log_level(&self) -> log::LevelFilter {
        self.get_string("logging", "level", "error")
            .parse()
            .unwrap_or(log::LevelFilter::Error)
    }
}
