//! Configuration management for lecture-lens
//!
//! Config is stored at ~/.config/lecture-lens/config.toml. Every field is
//! optional in the file; missing values fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::speech::local::DEFAULT_SYNTHESIZER;
use crate::speech::{PlayerType, SpeechKind};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const SERVER_ENV: &str = "LECTURE_LENS_SERVER";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lecture server base URL
    pub server_url: String,
    /// Which speech backend the TUI starts with
    pub speech: SpeechKind,
    /// Player for server-synthesized audio
    pub player: PlayerType,
    /// Local synthesizer executable
    pub synthesizer: String,
    /// Seconds between reconnection attempts
    pub reconnect_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            speech: SpeechKind::default(),
            player: PlayerType::default(),
            synthesizer: DEFAULT_SYNTHESIZER.to_string(),
            reconnect_delay_secs: 2,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/lecture-lens/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lecture-lens").join("config.toml"))
    }

    /// Load config from the default location, or defaults if absent
    pub fn load() -> Self {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                log::warn!("Ignoring config: {:#}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config =
            toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Server URL with the fallback chain:
    /// 1. Explicit override (`--server`)
    /// 2. Environment variable LECTURE_LENS_SERVER
    /// 3. Config file / default
    pub fn resolve_server(&self, flag: Option<&str>) -> String {
        let env = std::env::var(SERVER_ENV).ok();
        self.resolve_server_with(flag, env.as_deref())
    }

    fn resolve_server_with(&self, flag: Option<&str>, env: Option<&str>) -> String {
        flag.or(env)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.server_url)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs.max(1))
    }
}
