//! App state and core application logic
//!
//! `App` owns every piece of client state. Channel traffic and speech
//! lifecycle notifications arrive through [`App::handle_event`]; keyboard
//! input through [`App::handle_key`]. Both run on the UI loop only.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::event::AppEvent;
use crate::models::{ConnectionStatus, LanguagesUpdate, SourceLanguage, SubtitleEvent};
use crate::net::{ChannelEvent, ServerEvent};
use crate::preferences::Preferences;
use crate::reconciler::{Outcome, Reconciler};
use crate::registry::LanguageRegistry;
use crate::speech::{SpeechBackend, SpeechError, SpeechEvent, SpeechRequest};

/// History lines moved per page key
const PAGE_SIZE: usize = 5;

// =============================================================================
// Focus
// =============================================================================

/// Which part of the screen receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Subtitle view (history scrolling, speech and display controls)
    #[default]
    Subtitles,
    /// Language picker overlay
    Languages,
}

// =============================================================================
// Main Application State
// =============================================================================

pub struct App {
    /// Whether the app is running
    pub running: bool,
    pub status: ConnectionStatus,
    pub registry: LanguageRegistry,
    pub reconciler: Reconciler,
    pub prefs: Preferences,
    pub focus: Focus,
    /// One-line message shown until the next key press
    pub notice: Option<String>,
    /// Language the lecturer speaks, as last announced
    pub source: Option<SourceLanguage>,
    prefs_path: Option<PathBuf>,
    speech: Box<dyn SpeechBackend>,
    /// Language requested on the command line; wins over the persisted one
    preferred_language: Option<String>,
    /// Last final text, available for replay until the language changes
    replay: Option<String>,
}

impl App {
    pub fn new(speech: Box<dyn SpeechBackend>, prefs: Preferences) -> Self {
        Self {
            running: true,
            status: ConnectionStatus::default(),
            registry: LanguageRegistry::new(),
            reconciler: Reconciler::new(),
            prefs,
            focus: Focus::default(),
            notice: None,
            source: None,
            prefs_path: None,
            speech,
            preferred_language: None,
            replay: None,
        }
    }

    /// Persist preference changes to `path`
    pub fn with_prefs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prefs_path = Some(path.into());
        self
    }

    /// Select `code` as soon as the server offers it
    pub fn with_preferred_language(mut self, code: Option<String>) -> Self {
        self.preferred_language = code;
        self
    }

    pub fn speech(&self) -> &dyn SpeechBackend {
        self.speech.as_ref()
    }

    /// Text the replay action would speak
    pub fn replay_text(&self) -> Option<&str> {
        self.replay.as_deref()
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn set_notice(&mut self, msg: impl Into<String>) {
        self.notice = Some(msg.into());
    }

    // -------------------------------------------------------------------------
    // Event Handling
    // -------------------------------------------------------------------------

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Channel(ChannelEvent::Status(status)) => self.set_status(status),
            AppEvent::Channel(ChannelEvent::Server(event)) => match event {
                ServerEvent::LanguagesUpdate(update) => self.on_languages(update),
                ServerEvent::SubtitleUpdate(subtitle) => self.on_subtitle(&subtitle),
                ServerEvent::TtsAudio(tts) => self.speech.handle(SpeechEvent::Audio(tts.audio)),
                ServerEvent::TtsError(tts) => {
                    self.speech.handle(SpeechEvent::ServerError(tts.error))
                }
            },
            AppEvent::Speech(event) => self.speech.handle(event),
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if status != self.status {
            log::info!("Channel: {}", status);
        }
        if matches!(
            status,
            ConnectionStatus::Disconnected | ConnectionStatus::Error(_)
        ) {
            self.speech.reset_pending();
        }
        self.status = status;
    }

    fn on_languages(&mut self, update: LanguagesUpdate) {
        if update.source.is_some() {
            self.source = update.source;
        }

        let before = self.registry.selected_code().map(String::from);
        let preferred = [
            self.preferred_language.as_deref(),
            self.prefs.selected_language.as_deref(),
        ];
        let after = self
            .registry
            .update(update.languages, &preferred)
            .map(String::from);
        log::info!("{} languages offered", self.registry.languages().len());

        if after != before {
            // Restored or lost because of the server; only user picks persist
            self.language_changed(false);
        }
    }

    fn on_subtitle(&mut self, event: &SubtitleEvent) {
        if let Some(source) = &event.source_lang {
            self.source = Some(source.clone());
        }

        if let Outcome::Appended { text, sentences } = self.reconciler.apply(event) {
            log::debug!("Final subtitle, {} sentences", sentences);
            if self.prefs.tts_enabled {
                self.speak(&text);
            }
            self.replay = Some(text);
        }
    }

    // -------------------------------------------------------------------------
    // Language Selection
    // -------------------------------------------------------------------------

    /// User selection (`None` clears). Returns `true` if the language changed.
    pub fn select_language(&mut self, code: Option<&str>) -> bool {
        if !self.registry.select(code) {
            return false;
        }
        // From now on the user's own pick is what gets restored
        self.preferred_language = None;
        self.language_changed(true);
        true
    }

    fn language_changed(&mut self, persist: bool) {
        let code = self.registry.selected_code().map(String::from);
        log::info!("Language: {}", code.as_deref().unwrap_or("none"));

        self.reconciler.select_language(code.clone());
        self.speech.stop();
        self.replay = None;

        if persist {
            self.prefs.selected_language = code;
            self.save_prefs();
        }
    }

    // -------------------------------------------------------------------------
    // Speech
    // -------------------------------------------------------------------------

    /// Turn speech on or off. Turning it on primes audio output, which must
    /// happen inside this key press.
    pub fn toggle_tts(&mut self) {
        if self.prefs.tts_enabled {
            self.speech.stop();
            self.prefs.tts_enabled = false;
            self.set_notice("Speech off");
            return;
        }

        match self.speech.prime() {
            Ok(()) => {
                self.prefs.tts_enabled = true;
                self.set_notice(format!("Speech on ({})", self.speech.kind()));
            }
            Err(e) => {
                log::warn!("Cannot enable speech: {}", e);
                self.set_notice(e.to_string());
            }
        }
    }

    /// Stop when speaking, otherwise replay the last final text
    pub fn speak_or_stop(&mut self) {
        if self.speech.is_busy() {
            self.stop_speech();
        } else {
            self.replay();
        }
    }

    pub fn stop_speech(&mut self) {
        self.speech.stop();
    }

    pub fn replay(&mut self) {
        let Some(text) = self.replay.clone() else {
            self.set_notice("Nothing to replay yet");
            return;
        };
        if let Err(e) = self.speech.prime() {
            self.set_notice(e.to_string());
            return;
        }
        self.speak(&text);
    }

    fn speak(&mut self, text: &str) {
        let Some(lang) = self.registry.selected_code() else {
            return;
        };
        let request = SpeechRequest {
            text,
            lang,
            speed: self.prefs.tts_speed,
        };

        match self.speech.speak(request) {
            Ok(()) => {}
            Err(SpeechError::NotPrimed) => {
                log::warn!("Speech requested before audio output was enabled");
                self.notice = Some("Press t to enable audio output".into());
            }
            Err(e) => log::warn!("Speech failed: {}", e),
        }
    }

    // -------------------------------------------------------------------------
    // Preferences
    // -------------------------------------------------------------------------

    fn save_prefs(&self) {
        if let Some(path) = &self.prefs_path {
            if let Err(e) = self.prefs.save_to(path) {
                log::warn!("Failed to save preferences: {:#}", e);
            }
        }
    }

    pub fn increase_font(&mut self) {
        let size = self.prefs.increase_font();
        self.set_notice(format!("Text size {:.2}", size));
        self.save_prefs();
    }

    pub fn decrease_font(&mut self) {
        let size = self.prefs.decrease_font();
        self.set_notice(format!("Text size {:.2}", size));
        self.save_prefs();
    }

    pub fn faster(&mut self) {
        let speed = self.prefs.faster();
        self.set_notice(format!("Speech rate {:.1}x", speed));
        self.save_prefs();
    }

    pub fn slower(&mut self) {
        let speed = self.prefs.slower();
        self.set_notice(format!("Speech rate {:.1}x", speed));
        self.save_prefs();
    }

    pub fn toggle_theme(&mut self) {
        self.prefs.toggle_theme();
        self.save_prefs();
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event, returns true if event was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.notice = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return true;
        }

        match self.focus {
            Focus::Subtitles => self.handle_subtitles_key(key),
            Focus::Languages => self.handle_languages_key(key),
        }
    }

    pub fn open_language_picker(&mut self) {
        self.registry.sync_cursor();
        self.focus = Focus::Languages;
    }

    fn handle_subtitles_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('l') => self.open_language_picker(),
            KeyCode::Char('t') => self.toggle_tts(),
            KeyCode::Char(' ') => self.speak_or_stop(),
            KeyCode::Char('x') => self.stop_speech(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.increase_font(),
            KeyCode::Char('-') => self.decrease_font(),
            KeyCode::Char(']') => self.faster(),
            KeyCode::Char('[') => self.slower(),
            KeyCode::Char('d') => self.toggle_theme(),
            KeyCode::Up | KeyCode::Char('k') => self.reconciler.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.reconciler.scroll_down(1),
            KeyCode::PageUp => self.reconciler.scroll_up(PAGE_SIZE),
            KeyCode::PageDown => self.reconciler.scroll_down(PAGE_SIZE),
            KeyCode::Home | KeyCode::Char('g') => self.reconciler.scroll_to_start(),
            KeyCode::End | KeyCode::Char('G') => self.reconciler.scroll_to_latest(),
            KeyCode::Esc => {}
            _ => return false,
        }
        true
    }

    fn handle_languages_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.registry.list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.registry.list.down(),
            KeyCode::PageUp => self.registry.list.page_up(PAGE_SIZE),
            KeyCode::PageDown => self.registry.list.page_down(PAGE_SIZE),
            KeyCode::Home => self.registry.list.first(),
            KeyCode::End => self.registry.list.last(),
            KeyCode::Enter => {
                let code = self.registry.highlighted().map(String::from);
                self.select_language(code.as_deref());
                self.focus = Focus::Subtitles;
            }
            KeyCode::Esc | KeyCode::Char('l') => self.focus = Focus::Subtitles,
            KeyCode::Char('q') => self.quit(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, SubtitleKind};
    use crate::reconciler::Phase;
    use crate::speech::SpeechKind;
    use std::sync::{Arc, Mutex};

    /// What the fake backend was asked to do
    #[derive(Debug, Default)]
    struct Calls {
        primed: usize,
        spoken: Vec<(String, String, f32)>,
        stops: usize,
        handled: Vec<SpeechEvent>,
        busy: bool,
        resets: usize,
    }

    struct FakeSpeech {
        calls: Arc<Mutex<Calls>>,
        refuse: bool,
    }

    impl SpeechBackend for FakeSpeech {
        fn kind(&self) -> SpeechKind {
            SpeechKind::Server
        }

        fn is_supported(&self) -> bool {
            !self.refuse
        }

        fn prime(&mut self) -> Result<(), SpeechError> {
            if self.refuse {
                return Err(SpeechError::Unsupported("no player".into()));
            }
            self.calls.lock().unwrap().primed += 1;
            Ok(())
        }

        fn speak(&mut self, request: SpeechRequest<'_>) -> Result<(), SpeechError> {
            let mut calls = self.calls.lock().unwrap();
            calls.spoken.push((
                request.text.to_string(),
                request.lang.to_string(),
                request.speed,
            ));
            calls.busy = true;
            Ok(())
        }

        fn stop(&mut self) {
            let mut calls = self.calls.lock().unwrap();
            calls.stops += 1;
            calls.busy = false;
        }

        fn handle(&mut self, event: SpeechEvent) {
            self.calls.lock().unwrap().handled.push(event);
        }

        fn reset_pending(&mut self) {
            let mut calls = self.calls.lock().unwrap();
            calls.resets += 1;
            calls.busy = false;
        }

        fn is_busy(&self) -> bool {
            self.calls.lock().unwrap().busy
        }
    }

    fn app_with(prefs: Preferences) -> (App, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let speech = FakeSpeech {
            calls: calls.clone(),
            refuse: false,
        };
        (App::new(Box::new(speech), prefs), calls)
    }

    fn app() -> (App, Arc<Mutex<Calls>>) {
        app_with(Preferences::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn server(event: ServerEvent) -> AppEvent {
        AppEvent::Channel(ChannelEvent::Server(event))
    }

    fn languages(codes: &[&str]) -> AppEvent {
        server(ServerEvent::LanguagesUpdate(LanguagesUpdate {
            languages: codes
                .iter()
                .map(|c| Language::new(*c, c.to_uppercase()))
                .collect(),
            source: None,
        }))
    }

    fn subtitle(kind: SubtitleKind, lang: &str, text: &str) -> AppEvent {
        server(ServerEvent::SubtitleUpdate(
            SubtitleEvent::new(kind).with_text(lang, text),
        ))
    }

    #[test]
    fn test_app_quit_key() {
        let (mut app, _) = app();
        assert!(app.running);
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn test_app_quit_ctrl_c() {
        let (mut app, _) = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.running);
    }

    #[test]
    fn test_status_updates() {
        let (mut app, _) = app();
        assert_eq!(app.status, ConnectionStatus::Connecting);
        app.handle_event(AppEvent::Channel(ChannelEvent::Status(
            ConnectionStatus::Connected,
        )));
        assert!(app.status.is_connected());
    }

    #[test]
    fn test_persisted_language_restored() {
        let prefs = Preferences {
            selected_language: Some("ja".into()),
            ..Preferences::default()
        };
        let (mut app, _) = app_with(prefs);

        app.handle_event(languages(&["en", "ja"]));
        assert_eq!(app.registry.selected_code(), Some("ja"));
        assert_eq!(app.reconciler.language(), Some("ja"));
        assert_eq!(app.reconciler.phase(), Phase::Waiting);
    }

    #[test]
    fn test_command_line_language_wins() {
        let prefs = Preferences {
            selected_language: Some("ja".into()),
            ..Preferences::default()
        };
        let (app, _) = app_with(prefs);
        let mut app = app.with_preferred_language(Some("en".into()));

        app.handle_event(languages(&["en", "ja"]));
        assert_eq!(app.registry.selected_code(), Some("en"));
    }

    #[test]
    fn test_user_pick_outlives_command_line_language() {
        let (app, _) = app();
        let mut app = app.with_preferred_language(Some("en".into()));
        app.handle_event(languages(&["en", "ja"]));
        assert_eq!(app.registry.selected_code(), Some("en"));

        // User explicitly picks "none", then the server resends its list
        assert!(app.select_language(None));
        app.handle_event(languages(&["en", "ja"]));
        assert_eq!(app.registry.selected_code(), None);

        // User picks ja; after ja is withdrawn and returns, ja comes back
        assert!(app.select_language(Some("ja")));
        app.handle_event(languages(&["en"]));
        assert_eq!(app.registry.selected_code(), None);
        app.handle_event(languages(&["en", "ja"]));
        assert_eq!(app.registry.selected_code(), Some("ja"));
    }

    #[test]
    fn test_session_end_forgets_pending_speech() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));
        app.toggle_tts();
        app.handle_event(subtitle(SubtitleKind::Final, "en", "Lost reply."));
        assert!(app.speech().is_busy());

        app.handle_event(AppEvent::Channel(ChannelEvent::Status(
            ConnectionStatus::Error("reset by peer".into()),
        )));
        assert_eq!(calls.lock().unwrap().resets, 1);
        assert!(!app.speech().is_busy());

        // Space now replays instead of stopping
        let stops = calls.lock().unwrap().stops;
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(calls.lock().unwrap().stops, stops);
        assert_eq!(calls.lock().unwrap().spoken.len(), 2);

        app.handle_event(AppEvent::Channel(ChannelEvent::Status(
            ConnectionStatus::Connected,
        )));
        assert_eq!(calls.lock().unwrap().resets, 1);
    }

    #[test]
    fn test_no_language_means_idle() {
        let (mut app, _) = app();
        app.handle_event(languages(&["en"]));
        assert!(app.registry.selected_code().is_none());

        app.handle_event(subtitle(SubtitleKind::Final, "en", "Hello."));
        assert!(app.reconciler.history().is_empty());
        assert_eq!(app.reconciler.phase(), Phase::Idle);
    }

    #[test]
    fn test_final_appends_and_speaks_when_enabled() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));

        app.handle_key(key(KeyCode::Char('t')));
        assert!(app.prefs.tts_enabled);
        assert_eq!(calls.lock().unwrap().primed, 1);

        app.handle_event(subtitle(
            SubtitleKind::Final,
            "en",
            "Hello world. How are you?",
        ));
        assert_eq!(
            app.reconciler.history(),
            &["Hello world.".to_string(), "How are you?".to_string()]
        );
        let spoken = &calls.lock().unwrap().spoken;
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].0, "Hello world. How are you?");
        assert_eq!(spoken[0].1, "en");
    }

    #[test]
    fn test_duplicate_final_is_silent() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));
        app.toggle_tts();

        app.handle_event(subtitle(SubtitleKind::Final, "en", "Same text."));
        app.handle_event(subtitle(SubtitleKind::Final, "en", "Same text."));
        assert_eq!(app.reconciler.history().len(), 1);
        assert_eq!(calls.lock().unwrap().spoken.len(), 1);
    }

    #[test]
    fn test_final_not_spoken_when_disabled() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));

        app.handle_event(subtitle(SubtitleKind::Final, "en", "Quiet."));
        assert_eq!(app.reconciler.history().len(), 1);
        assert!(calls.lock().unwrap().spoken.is_empty());
        assert_eq!(app.replay_text(), Some("Quiet."));
    }

    #[test]
    fn test_language_switch_clears_and_stops() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en", "ja"]));
        app.select_language(Some("en"));
        app.handle_event(subtitle(SubtitleKind::Final, "en", "One. Two."));
        app.handle_event(subtitle(SubtitleKind::Realtime, "en", "Thr"));
        let stops = calls.lock().unwrap().stops;

        assert!(app.select_language(Some("ja")));
        assert!(app.reconciler.history().is_empty());
        assert!(app.reconciler.transient().is_empty());
        assert!(app.replay_text().is_none());
        assert_eq!(calls.lock().unwrap().stops, stops + 1);
        assert_eq!(app.prefs.selected_language.as_deref(), Some("ja"));

        // Same language again is not a change
        assert!(!app.select_language(Some("ja")));
    }

    #[test]
    fn test_language_picker_flow() {
        let (mut app, _) = app();
        app.handle_event(languages(&["en", "ja", "ko"]));

        app.handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.focus, Focus::Languages);
        assert_eq!(app.registry.highlighted(), None);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.registry.highlighted(), Some("ja"));

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.focus, Focus::Subtitles);
        assert_eq!(app.registry.selected_code(), Some("ja"));
        assert_eq!(app.reconciler.language(), Some("ja"));

        app.handle_key(key(KeyCode::Char('l')));
        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.registry.selected_code(), Some("ja"));
    }

    #[test]
    fn test_language_withdrawn_by_server() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en", "ja"]));
        app.select_language(Some("ja"));
        let stops = calls.lock().unwrap().stops;

        app.handle_event(languages(&["en"]));
        assert!(app.registry.selected_code().is_none());
        assert_eq!(app.reconciler.phase(), Phase::Idle);
        assert_eq!(calls.lock().unwrap().stops, stops + 1);
        // The user's choice is still remembered for when it comes back
        assert_eq!(app.prefs.selected_language.as_deref(), Some("ja"));

        app.handle_event(languages(&["en", "ja"]));
        assert_eq!(app.registry.selected_code(), Some("ja"));
    }

    #[test]
    fn test_same_language_list_keeps_history() {
        let (mut app, _) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));
        app.handle_event(subtitle(SubtitleKind::Final, "en", "Kept."));

        app.handle_event(languages(&["en", "fr"]));
        assert_eq!(app.reconciler.history().len(), 1);
    }

    #[test]
    fn test_speak_or_stop() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));

        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.notice.as_deref(), Some("Nothing to replay yet"));

        app.handle_event(subtitle(SubtitleKind::Final, "en", "Replay me."));
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(calls.lock().unwrap().spoken.len(), 1);
        assert!(app.speech().is_busy());

        app.handle_key(key(KeyCode::Char(' ')));
        assert!(!app.speech().is_busy());
        assert_eq!(calls.lock().unwrap().spoken.len(), 1);
    }

    #[test]
    fn test_tts_events_routed_to_speech() {
        let (mut app, calls) = app();
        app.handle_event(server(ServerEvent::TtsAudio(crate::models::TtsAudio {
            audio: "AAAA".into(),
        })));
        app.handle_event(server(ServerEvent::TtsError(crate::models::TtsError {
            error: "boom".into(),
        })));
        app.handle_event(AppEvent::Speech(SpeechEvent::PlaybackEnded {
            ticket: 3,
            error: None,
        }));

        let handled = &calls.lock().unwrap().handled;
        assert_eq!(
            handled,
            &vec![
                SpeechEvent::Audio("AAAA".into()),
                SpeechEvent::ServerError("boom".into()),
                SpeechEvent::PlaybackEnded {
                    ticket: 3,
                    error: None
                },
            ]
        );
    }

    #[test]
    fn test_unsupported_speech_shows_notice() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let speech = FakeSpeech {
            calls,
            refuse: true,
        };
        let mut app = App::new(Box::new(speech), Preferences::default());

        app.toggle_tts();
        assert!(!app.prefs.tts_enabled);
        assert!(app.notice.is_some());
    }

    #[test]
    fn test_toggle_off_stops() {
        let (mut app, calls) = app();
        app.toggle_tts();
        app.toggle_tts();
        assert!(!app.prefs.tts_enabled);
        assert_eq!(calls.lock().unwrap().stops, 1);
    }

    #[test]
    fn test_display_keys_adjust_prefs() {
        let (mut app, _) = app();
        app.handle_key(key(KeyCode::Char('+')));
        assert_eq!(app.prefs.font_size, 1.55);
        app.handle_key(key(KeyCode::Char('-')));
        app.handle_key(key(KeyCode::Char('-')));
        assert_eq!(app.prefs.font_size, 1.15);

        app.handle_key(key(KeyCode::Char(']')));
        assert_eq!(app.prefs.tts_speed, 1.1);
        app.handle_key(key(KeyCode::Char('[')));
        app.handle_key(key(KeyCode::Char('[')));
        assert_eq!(app.prefs.tts_speed, 0.9);

        let theme = app.prefs.theme;
        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(app.prefs.theme, theme.toggled());
    }

    #[test]
    fn test_speed_used_for_requests() {
        let (mut app, calls) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));
        app.faster();
        app.faster();
        app.toggle_tts();

        app.handle_event(subtitle(SubtitleKind::Final, "en", "Fast."));
        assert_eq!(calls.lock().unwrap().spoken[0].2, 1.2);
    }

    #[test]
    fn test_prefs_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        let (app, _) = app();
        let mut app = app.with_prefs_path(&path);

        app.handle_event(languages(&["en", "ko"]));
        app.select_language(Some("ko"));
        app.increase_font();
        app.toggle_tts();

        let saved = Preferences::load_from(&path);
        assert_eq!(saved.selected_language.as_deref(), Some("ko"));
        assert_eq!(saved.font_size, 1.55);
        assert!(!saved.tts_enabled);
    }

    #[test]
    fn test_history_scroll_keys() {
        let (mut app, _) = app();
        app.handle_event(languages(&["en"]));
        app.select_language(Some("en"));
        app.handle_event(subtitle(SubtitleKind::Final, "en", "A. B. C. D."));
        assert!(app.reconciler.is_following());

        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.reconciler.scroll(), 2);
        app.handle_key(key(KeyCode::Home));
        assert_eq!(app.reconciler.scroll(), 0);
        app.handle_key(key(KeyCode::End));
        assert!(app.reconciler.is_following());
    }

    #[test]
    fn test_source_language_tracked() {
        let (mut app, _) = app();
        let mut event = SubtitleEvent::new(SubtitleKind::Processing);
        event.source_lang = Some(SourceLanguage {
            name: Some("Korean".into()),
            flag: None,
        });
        app.handle_event(server(ServerEvent::SubtitleUpdate(event)));
        assert_eq!(
            app.source.as_ref().and_then(|s| s.name.as_deref()),
            Some("Korean")
        );
    }
}
