//! External audio player - mpv/ffplay playback
//!
//! Plays clips by spawning a headless player process. One process runs at a
//! time; its exit is reported to the app loop as
//! [`SpeechEvent::PlaybackEnded`] tagged with the ticket it was started with.

use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::oneshot;

use super::clip::AudioClip;
use super::queue::AudioSink;
use super::SpeechEvent;
use crate::event::{AppEvent, EventSender};

/// Supported players
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    /// mpv media player (default)
    #[default]
    Mpv,
    /// ffplay from FFmpeg
    Ffplay,
}

impl PlayerType {
    /// Get the command name for this player
    pub fn command(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "mpv",
            PlayerType::Ffplay => "ffplay",
        }
    }

    /// Arguments for audio-only, non-interactive playback
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            PlayerType::Mpv => &["--no-video", "--really-quiet", "--no-terminal"],
            PlayerType::Ffplay => &["-nodisp", "-autoexit", "-loglevel", "quiet"],
        }
    }

    /// Get a display name for this player
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "mpv",
            PlayerType::Ffplay => "ffplay",
        }
    }

    /// Check if the player is on PATH
    pub fn is_available(&self) -> bool {
        std::process::Command::new("which")
            .arg(self.command())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Errors from player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
}

/// The single reusable playback process
pub struct ProcessPlayer {
    player_type: PlayerType,
    events: EventSender,
    /// Signals the running playback task to kill its process
    active: Option<oneshot::Sender<()>>,
}

impl ProcessPlayer {
    pub fn new(player_type: PlayerType, events: EventSender) -> Self {
        Self {
            player_type,
            events,
            active: None,
        }
    }
}

impl AudioSink<AudioClip> for ProcessPlayer {
    fn start(&mut self, clip: &AudioClip, ticket: u64) -> Result<(), PlayerError> {
        self.halt();

        let mut cmd = Command::new(self.player_type.command());
        cmd.args(self.player_type.args())
            .arg(clip.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.player_type.command().to_string())
            } else {
                PlayerError::StartFailed(e)
            }
        })?;

        let (kill_tx, kill_rx) = oneshot::channel();
        self.active = Some(kill_tx);
        let events = self.events.clone();

        tokio::spawn(async move {
            let exit = tokio::select! {
                status = child.wait() => Some(status),
                _ = kill_rx => None,
            };

            match exit {
                Some(status) => {
                    let error = match status {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some(format!("player exited with {}", status)),
                        Err(e) => Some(e.to_string()),
                    };
                    let _ = events.send(AppEvent::Speech(SpeechEvent::PlaybackEnded {
                        ticket,
                        error,
                    }));
                }
                None => {
                    let _ = child.kill().await;
                }
            }
        });

        log::debug!("Playing clip {} with {}", ticket, self.player_type);
        Ok(())
    }

    fn halt(&mut self) {
        if let Some(kill) = self.active.take() {
            let _ = kill.send(());
        }
    }
}

impl Drop for ProcessPlayer {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_type_command() {
        assert_eq!(PlayerType::Mpv.command(), "mpv");
        assert_eq!(PlayerType::Ffplay.command(), "ffplay");
    }

    #[test]
    fn test_player_args_are_headless() {
        assert!(PlayerType::Mpv.args().contains(&"--no-video"));
        assert!(PlayerType::Ffplay.args().contains(&"-nodisp"));
        assert!(PlayerType::Ffplay.args().contains(&"-autoexit"));
    }

    #[test]
    fn test_player_type_display() {
        assert_eq!(PlayerType::Mpv.to_string(), "mpv");
        assert_eq!(PlayerType::Ffplay.to_string(), "ffplay");
    }

    #[test]
    fn test_default_player() {
        assert_eq!(PlayerType::default(), PlayerType::Mpv);
    }
}
