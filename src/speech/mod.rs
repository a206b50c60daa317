//! Speech output
//!
//! Two interchangeable backends behind [`SpeechBackend`], picked at startup:
//! - Local: an on-device synthesizer process (espeak-ng by default)
//! - Server: synthesis requested over the channel, audio played from a FIFO
//!   queue by an external player (mpv by default)
//!
//! Backends never block: lifecycle notifications (playback ended, utterance
//! finished, audio arrived) come back through [`SpeechEvent`]s on the app
//! event queue and are fed to [`SpeechBackend::handle`].

pub mod clip;
pub mod local;
pub mod player;
pub mod queue;
pub mod server;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use clip::AudioClip;
pub use local::LocalSpeech;
pub use player::{PlayerError, PlayerType, ProcessPlayer};
pub use queue::{AudioQueue, AudioSink};
pub use server::ServerSpeech;

/// Which backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SpeechKind {
    /// Synthesize on this machine
    Local,
    /// Request synthesized audio from the lecture server
    #[default]
    Server,
}

impl fmt::Display for SpeechKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechKind::Local => write!(f, "local"),
            SpeechKind::Server => write!(f, "server"),
        }
    }
}

/// Lifecycle notifications delivered back to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Base64 audio received from the server
    Audio(String),
    /// Server reported a synthesis failure
    ServerError(String),
    /// The player finished (or failed) the clip started with `ticket`
    PlaybackEnded { ticket: u64, error: Option<String> },
    /// The local synthesizer finished (or failed) utterance `ticket`
    UtteranceEnded { ticket: u64, error: Option<String> },
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech output unavailable: {0}")]
    Unsupported(String),
    #[error("Audio output has not been enabled yet")]
    NotPrimed,
    #[error("Nothing to speak")]
    EmptyText,
    #[error("Invalid audio payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Audio encoding failed: {0}")]
    Encode(#[from] hound::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error("Channel closed")]
    ChannelClosed,
}

/// Text to speak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    /// Language code as announced by the server (e.g. "en")
    pub lang: &'a str,
    /// Rate multiplier
    pub speed: f32,
}

/// A speech output implementation
pub trait SpeechBackend: Send {
    fn kind(&self) -> SpeechKind;

    /// Whether speech can work at all on this machine
    fn is_supported(&self) -> bool;

    /// Activate audio output from inside a user action. Must succeed once
    /// before `speak` is accepted by backends that need it.
    fn prime(&mut self) -> Result<(), SpeechError> {
        Ok(())
    }

    /// Speak `request`, replacing or queueing behind current output
    fn speak(&mut self, request: SpeechRequest<'_>) -> Result<(), SpeechError>;

    /// Drop everything pending, halt current output, clear busy. Idempotent.
    fn stop(&mut self);

    fn handle(&mut self, event: SpeechEvent);

    /// The channel session ended: replies to requests already sent will
    /// never arrive
    fn reset_pending(&mut self) {}

    /// Busy indicator: something is being synthesized or played
    fn is_busy(&self) -> bool;
}

/// Backend used when speech is unavailable; refuses every request
#[derive(Debug)]
pub struct DisabledSpeech {
    kind: SpeechKind,
    reason: String,
}

impl DisabledSpeech {
    pub fn new(kind: SpeechKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl SpeechBackend for DisabledSpeech {
    fn kind(&self) -> SpeechKind {
        self.kind
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn prime(&mut self) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported(self.reason.clone()))
    }

    fn speak(&mut self, _request: SpeechRequest<'_>) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported(self.reason.clone()))
    }

    fn stop(&mut self) {}

    fn handle(&mut self, _event: SpeechEvent) {}

    fn is_busy(&self) -> bool {
        false
    }
}
