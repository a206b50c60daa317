//! On-device speech synthesis via espeak-ng
//!
//! Each utterance replaces the previous one: starting a new sentence cancels
//! whatever is still being spoken.

use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;

use super::{SpeechBackend, SpeechError, SpeechEvent, SpeechKind, SpeechRequest};
use crate::event::{AppEvent, EventSender};

pub const DEFAULT_SYNTHESIZER: &str = "espeak-ng";

/// Words per minute at speed 1.0
const BASE_RATE_WPM: f32 = 175.0;

const DEFAULT_LOCALE: &str = "en-US";

/// Server language code to synthesizer locale
pub fn locale_for(lang: &str) -> &'static str {
    match lang {
        "ko" => "ko-KR",
        "en" => "en-US",
        "ja" => "ja-JP",
        "zh" => "zh-CN",
        "es" => "es-ES",
        "fr" => "fr-FR",
        "de" => "de-DE",
        "pt" => "pt-BR",
        "ru" => "ru-RU",
        "vi" => "vi-VN",
        _ => DEFAULT_LOCALE,
    }
}

/// An installed voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub locale: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }
}

fn normalize(locale: &str) -> String {
    locale.replace('_', "-").to_lowercase()
}

/// Pick a voice for `lang`: exact locale match first, then a voice whose
/// locale starts with the language part (`en` for `en-US`)
pub fn select_voice<'a>(voices: &'a [Voice], lang: &str) -> Option<&'a Voice> {
    let wanted = normalize(locale_for(lang));
    if let Some(voice) = voices.iter().find(|v| normalize(&v.locale) == wanted) {
        return Some(voice);
    }

    let prefix = wanted.split('-').next().unwrap_or(&wanted);
    voices.iter().find(|v| {
        let locale = normalize(&v.locale);
        locale == prefix || locale.starts_with(&format!("{}-", prefix))
    })
}

/// Parse `espeak-ng --voices` output
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 2)
/// ```
pub fn parse_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _priority = cols.next()?;
            let locale = cols.next()?;
            let _age_gender = cols.next()?;
            let name = cols.next()?;
            Some(Voice::new(name, locale))
        })
        .collect()
}

/// Rate argument for a speed multiplier
pub fn rate_wpm(speed: f32) -> u32 {
    (BASE_RATE_WPM * speed).round().max(1.0) as u32
}

/// Synthesizer arguments. The text follows `--` so a leading `-` is never
/// read as an option.
fn synth_args(voice: &str, speed: f32, text: &str) -> Vec<String> {
    vec![
        "-v".into(),
        voice.into(),
        "-s".into(),
        rate_wpm(speed).to_string(),
        "--".into(),
        text.into(),
    ]
}

pub struct LocalSpeech {
    program: String,
    voices: Vec<Voice>,
    events: EventSender,
    /// Kills the running utterance
    active: Option<oneshot::Sender<()>>,
    ticket: u64,
    busy: bool,
}

impl LocalSpeech {
    /// Probe the synthesizer for its voices. A synthesizer that cannot be run
    /// leaves the backend unsupported.
    pub fn new(program: impl Into<String>, events: EventSender) -> Self {
        let program = program.into();
        let voices = match std::process::Command::new(&program)
            .arg("--voices")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                parse_voices(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                log::warn!("{} --voices exited with {}", program, output.status);
                Vec::new()
            }
            Err(e) => {
                log::warn!("Speech synthesizer '{}' unavailable: {}", program, e);
                Vec::new()
            }
        };
        log::info!("{} voices available from {}", voices.len(), program);
        Self::with_voices(program, voices, events)
    }

    pub fn with_voices(program: impl Into<String>, voices: Vec<Voice>, events: EventSender) -> Self {
        Self {
            program: program.into(),
            voices,
            events,
            active: None,
            ticket: 0,
            busy: false,
        }
    }

    fn cancel(&mut self) {
        if let Some(kill) = self.active.take() {
            let _ = kill.send(());
        }
    }
}

impl SpeechBackend for LocalSpeech {
    fn kind(&self) -> SpeechKind {
        SpeechKind::Local
    }

    fn is_supported(&self) -> bool {
        !self.voices.is_empty()
    }

    fn speak(&mut self, request: SpeechRequest<'_>) -> Result<(), SpeechError> {
        if !self.is_supported() {
            return Err(SpeechError::Unsupported(format!(
                "{} has no voices",
                self.program
            )));
        }
        let text = request.text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        self.cancel();

        let voice = select_voice(&self.voices, request.lang)
            .map(|v| v.locale.clone())
            .unwrap_or_else(|| locale_for(request.lang).to_string());

        let mut child = Command::new(&self.program)
            .args(synth_args(&voice, request.speed, text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        self.ticket += 1;
        let ticket = self.ticket;
        let (kill_tx, kill_rx) = oneshot::channel();
        self.active = Some(kill_tx);
        self.busy = true;
        let events = self.events.clone();

        tokio::spawn(async move {
            let exit = tokio::select! {
                status = child.wait() => Some(status),
                _ = kill_rx => None,
            };

            let error = match exit {
                Some(Ok(status)) if status.success() => None,
                Some(Ok(status)) => Some(format!("synthesizer exited with {}", status)),
                Some(Err(e)) => Some(e.to_string()),
                None => {
                    let _ = child.kill().await;
                    return;
                }
            };
            let _ = events.send(AppEvent::Speech(SpeechEvent::UtteranceEnded { ticket, error }));
        });

        log::debug!("Speaking utterance {} with voice {}", ticket, voice);
        Ok(())
    }

    fn stop(&mut self) {
        self.cancel();
        self.busy = false;
    }

    fn handle(&mut self, event: SpeechEvent) {
        if let SpeechEvent::UtteranceEnded { ticket, error } = event {
            if ticket != self.ticket {
                return;
            }
            if let Some(error) = error {
                log::warn!("Utterance {} failed: {}", ticket, error);
            }
            self.active = None;
            self.busy = false;
        }
    }

    fn is_busy(&self) -> bool {
        self.busy
    }
}

impl Drop for LocalSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}
