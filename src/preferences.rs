//! Audience preferences
//!
//! Persisted across sessions at `~/.config/lecture-lens/preferences.toml`:
//! theme, font size, TTS speed and the selected language. Whether TTS is
//! enabled is deliberately session-only and always starts off.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const FONT_SIZE_DEFAULT: f32 = 1.35;
pub const FONT_SIZE_MIN: f32 = 0.8;
pub const FONT_SIZE_MAX: f32 = 2.0;
pub const FONT_SIZE_STEP: f32 = 0.2;

pub const TTS_SPEED_DEFAULT: f32 = 1.0;
pub const TTS_SPEED_MIN: f32 = 0.5;
pub const TTS_SPEED_MAX: f32 = 2.0;
pub const TTS_SPEED_STEP: f32 = 0.1;

/// Color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: ThemeMode,
    /// History text scale (1.0 = one cell per character)
    pub font_size: f32,
    /// Speech rate multiplier
    pub tts_speed: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_language: Option<String>,
    /// Speech output on/off; never persisted
    #[serde(skip)]
    pub tts_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Dark,
            font_size: FONT_SIZE_DEFAULT,
            tts_speed: TTS_SPEED_DEFAULT,
            selected_language: None,
            tts_enabled: false,
        }
    }
}

/// Clamp to bounds and round to two decimals so repeated steps don't drift
fn step(value: f32, delta: f32, min: f32, max: f32) -> f32 {
    let next = (value + delta).clamp(min, max);
    (next * 100.0).round() / 100.0
}

impl Preferences {
    /// Preferences file path (~/.config/lecture-lens/preferences.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lecture-lens").join("preferences.toml"))
    }

    /// Load from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Load from a file; missing or unreadable files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let mut prefs: Self = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default();
        prefs.sanitize();
        prefs
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Pull hand-edited values back into range
    fn sanitize(&mut self) {
        if !self.font_size.is_finite() {
            self.font_size = FONT_SIZE_DEFAULT;
        }
        if !self.tts_speed.is_finite() {
            self.tts_speed = TTS_SPEED_DEFAULT;
        }
        self.font_size = step(self.font_size, 0.0, FONT_SIZE_MIN, FONT_SIZE_MAX);
        self.tts_speed = step(self.tts_speed, 0.0, TTS_SPEED_MIN, TTS_SPEED_MAX);
        if self.selected_language.as_deref() == Some("") {
            self.selected_language = None;
        }
    }

    pub fn increase_font(&mut self) -> f32 {
        self.adjust_font(FONT_SIZE_STEP)
    }

    pub fn decrease_font(&mut self) -> f32 {
        self.adjust_font(-FONT_SIZE_STEP)
    }

    pub fn adjust_font(&mut self, delta: f32) -> f32 {
        self.font_size = step(self.font_size, delta, FONT_SIZE_MIN, FONT_SIZE_MAX);
        self.font_size
    }

    pub fn faster(&mut self) -> f32 {
        self.adjust_speed(TTS_SPEED_STEP)
    }

    pub fn slower(&mut self) -> f32 {
        self.adjust_speed(-TTS_SPEED_STEP)
    }

    pub fn adjust_speed(&mut self, delta: f32) -> f32 {
        self.tts_speed = step(self.tts_speed, delta, TTS_SPEED_MIN, TTS_SPEED_MAX);
        self.tts_speed
    }

    pub fn toggle_theme(&mut self) -> ThemeMode {
        self.theme = self.theme.toggled();
        self.theme
    }
}
