//! Server-synthesized speech
//!
//! `speak` emits `request_tts` on the channel; the server answers with
//! `tts_audio` (base64) or `tts_error`. Decoded clips go through the FIFO
//! queue to the shared player.
//!
//! Replies to requests that were in flight when speech was stopped are
//! discarded on arrival, so a stop really silences everything already asked
//! for.

use std::path::PathBuf;

use super::clip::{default_clip_dir, AudioClip};
use super::queue::{AudioQueue, AudioSink};
use super::{SpeechBackend, SpeechError, SpeechEvent, SpeechKind, SpeechRequest};
use crate::net::{ClientEvent, Outbox};

pub struct ServerSpeech<S: AudioSink<AudioClip>> {
    outbox: Outbox,
    sink: S,
    queue: AudioQueue<AudioClip>,
    clip_dir: PathBuf,
    /// Near-silent clip played from a user action; `Some` once primed
    primer: Option<AudioClip>,
    /// Requests sent and not yet answered
    in_flight: usize,
    /// Answers still to be thrown away after a stop
    discard: usize,
}

impl<S: AudioSink<AudioClip>> ServerSpeech<S> {
    pub fn new(outbox: Outbox, sink: S) -> Self {
        Self {
            outbox,
            sink,
            queue: AudioQueue::new(),
            clip_dir: default_clip_dir(),
            primer: None,
            in_flight: 0,
            discard: 0,
        }
    }

    pub fn with_clip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.clip_dir = dir.into();
        self
    }

    fn on_audio(&mut self, encoded: &str) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.discard > 0 {
            self.discard -= 1;
            log::debug!("Discarding audio for a cancelled request");
            return;
        }

        match AudioClip::from_base64(encoded, &self.clip_dir) {
            Ok(clip) => self.queue.push(clip, &mut self.sink),
            Err(e) => log::warn!("Dropping undecodable audio: {}", e),
        }
    }

    fn on_server_error(&mut self, message: &str) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.discard = self.discard.saturating_sub(1);
        log::warn!("Server TTS failed: {}", message);
    }
}

impl<S: AudioSink<AudioClip> + Send> SpeechBackend for ServerSpeech<S> {
    fn kind(&self) -> SpeechKind {
        SpeechKind::Server
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn prime(&mut self) -> Result<(), SpeechError> {
        if self.primer.is_some() {
            return Ok(());
        }
        // Ticket 0 is never issued by the queue, so its end is ignored
        let clip = AudioClip::silence(&self.clip_dir)?;
        if self.queue.is_idle() {
            self.sink.start(&clip, 0)?;
        }
        self.primer = Some(clip);
        log::info!("Audio output primed");
        Ok(())
    }

    fn speak(&mut self, request: SpeechRequest<'_>) -> Result<(), SpeechError> {
        if self.primer.is_none() {
            return Err(SpeechError::NotPrimed);
        }
        if request.text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        self.outbox
            .send(ClientEvent::RequestTts {
                text: request.text.to_string(),
                lang: request.lang.to_string(),
                speed: request.speed,
            })
            .map_err(|_| SpeechError::ChannelClosed)?;
        self.in_flight += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let discarded = self.queue.flush(&mut self.sink);
        self.discard = self.in_flight;
        if discarded > 0 || self.discard > 0 {
            log::info!(
                "Speech stopped ({} clips dropped, {} replies to discard)",
                discarded,
                self.discard
            );
        }
    }

    fn reset_pending(&mut self) {
        if self.in_flight > 0 {
            log::info!("Forgetting {} unanswered speech requests", self.in_flight);
        }
        self.in_flight = 0;
        self.discard = 0;
    }

    fn handle(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Audio(encoded) => self.on_audio(&encoded),
            SpeechEvent::ServerError(message) => self.on_server_error(&message),
            SpeechEvent::PlaybackEnded { ticket, error } => {
                if let Some(error) = error {
                    log::warn!("Playback of clip {} failed: {}", ticket, error);
                }
                self.queue.finished(ticket, &mut self.sink);
            }
            SpeechEvent::UtteranceEnded { .. } => {}
        }
    }

    fn is_busy(&self) -> bool {
        !self.queue.is_idle() || self.in_flight > self.discard
    }
}
