//! lecture-lens - terminal audience client for live lecture subtitles
//!
//! Follows a lecture subtitle server over its push channel, shows the
//! realtime and finalized subtitles for one chosen language, and can read
//! finalized sentences aloud.
//!
//! # Modules
//!
//! - `models` - Languages, subtitle events, connection status
//! - `net` - Socket.IO push channel and its wire codec
//! - `api` - HTTP snapshot client
//! - `registry` - Offered languages and the active selection
//! - `reconciler` - Realtime/final subtitle state machine
//! - `speech` - Local and server-side speech backends
//! - `preferences` - Persisted display and speech preferences
//! - `ui` - TUI components
//! - `app` - Application state and key handling

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod event;
pub mod list;
pub mod models;
pub mod net;
pub mod preferences;
pub mod reconciler;
pub mod registry;
pub mod speech;
pub mod ui;

// Re-export commonly used types
pub use models::{
    ConnectionStatus, CurrentSubtitles, Language, LanguagesUpdate, SourceLanguage,
    SubtitleEvent, SubtitleKind,
};

pub use api::{LectureClient, LectureError};
pub use app::{App, Focus};
pub use config::Config;
pub use event::AppEvent;
pub use preferences::{Preferences, ThemeMode};
pub use reconciler::{Outcome, Phase, Reconciler};
pub use registry::LanguageRegistry;
pub use speech::{SpeechBackend, SpeechKind};
