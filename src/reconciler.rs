//! Subtitle reconciler
//!
//! Pure state machine applying subtitle events to what the audience sees:
//! a transient region showing the in-progress translation, and an
//! append-only history of finalized sentences for the selected language.
//!
//! ```text
//! idle ──select──▶ waiting ──realtime──▶ realtime ◀──▶ final
//! ```
//!
//! Rendering lives in `ui`; this module never touches the terminal. The
//! renderer reports the transient region's size through [`Reconciler::set_viewport`]
//! so realtime text can be shrunk to fit.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{SubtitleEvent, SubtitleKind};

/// Realtime text starts at this size on every update
pub const REALTIME_FONT_DEFAULT: u16 = 32;

/// Realtime text never shrinks below this size
pub const REALTIME_FONT_FLOOR: u16 = 16;

/// Size at which one character occupies exactly one terminal cell
const CELL_FONT: u16 = 16;

/// Sentence terminators (Latin and CJK) followed by optional whitespace
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?。！？…]+\s*").expect("static regex"));

/// Split finalized text into sentences.
///
/// Empty fragments are discarded; text without terminators yields itself as
/// the single sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        push_fragment(&mut sentences, &text[start..m.end()]);
        start = m.end();
    }
    push_fragment(&mut sentences, &text[start..]);

    if sentences.is_empty() && !text.trim().is_empty() {
        sentences.push(text.trim().to_string());
    }
    sentences
}

fn push_fragment(sentences: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        sentences.push(fragment.to_string());
    }
}

// =============================================================================
// Viewport fitting
// =============================================================================

/// Size of the transient region in terminal cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub cols: u16,
    pub rows: u16,
}

impl Viewport {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Wrap width for text rendered at `font`: larger fonts get fewer columns
    pub fn columns_at(&self, font: u16) -> usize {
        let cols = self.cols as usize * CELL_FONT as usize / font.max(1) as usize;
        cols.max(1)
    }

    /// Whether `text` at `font` fits without overflowing. An unmeasured
    /// viewport fits everything.
    pub fn fits(&self, text: &str, font: u16) -> bool {
        if self.cols == 0 || self.rows == 0 {
            return true;
        }
        textwrap::wrap(text, self.columns_at(font)).len() <= self.rows as usize
    }
}

/// Shrink from `default` in unit steps until `text` fits or `floor` is reached
pub fn fit_font_size(text: &str, viewport: Viewport, default: u16, floor: u16) -> u16 {
    let mut size = default;
    while size > floor && !viewport.fits(text, size) {
        size -= 1;
    }
    size
}

// =============================================================================
// Reconciler
// =============================================================================

/// Display phase for the selected language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No language selected
    #[default]
    Idle,
    /// Language selected, nothing in progress
    Waiting,
    /// Speech recognized, translation pending
    Processing,
    Realtime,
    Final,
}

impl Phase {
    /// Status line shown above the subtitle text
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Select a language",
            Phase::Waiting => "Waiting for speech...",
            Phase::Processing => "Translating...",
            Phase::Realtime => "Real-time translation",
            Phase::Final => "Translation complete",
        }
    }
}

/// What applying an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No language selected; the prompt stays up
    NoLanguage,
    /// Status changed but the event had no text for the selected language
    StatusOnly,
    /// Indeterminate placeholder shown
    Placeholder,
    /// Transient region replaced
    Transient,
    /// Final text identical to the previous final; nothing appended
    Duplicate,
    /// Sentences appended; `text` is the full final text, ready for speech
    Appended { sentences: usize, text: String },
    /// Event kind not understood
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    language: Option<String>,
    phase: Phase,
    transient: String,
    history: Vec<String>,
    last_final: Option<String>,
    font: u16,
    viewport: Viewport,
    /// Index of the history entry pinned to the bottom of the view
    scroll: usize,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            language: None,
            phase: Phase::Idle,
            transient: String::new(),
            history: Vec::new(),
            last_final: None,
            font: REALTIME_FONT_DEFAULT,
            viewport: Viewport::default(),
            scroll: 0,
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transient(&self) -> &str {
        &self.transient
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Last final text seen for the current language
    pub fn last_final(&self) -> Option<&str> {
        self.last_final.as_deref()
    }

    /// Current transient font size
    pub fn font_size(&self) -> u16 {
        self.font
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Switch language, clearing all transient and historical state
    pub fn select_language(&mut self, language: Option<String>) {
        self.phase = if language.is_some() {
            Phase::Waiting
        } else {
            Phase::Idle
        };
        self.language = language;
        self.transient.clear();
        self.history.clear();
        self.last_final = None;
        self.font = REALTIME_FONT_DEFAULT;
        self.scroll = 0;
    }

    /// Record the transient region's size, refitting the text on change
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.refit();
        }
    }

    /// Apply one subtitle event
    pub fn apply(&mut self, event: &SubtitleEvent) -> Outcome {
        let Some(language) = self.language.clone() else {
            return Outcome::NoLanguage;
        };
        let text = event.text_for(&language);

        match event.kind {
            SubtitleKind::Processing => {
                self.phase = Phase::Processing;
                Outcome::Placeholder
            }
            SubtitleKind::Realtime => {
                self.phase = Phase::Realtime;
                match text {
                    Some(text) => {
                        self.show_transient(text);
                        Outcome::Transient
                    }
                    None => Outcome::StatusOnly,
                }
            }
            SubtitleKind::Current => {
                self.phase = Phase::Waiting;
                match text {
                    Some(text) => {
                        self.show_transient(text);
                        Outcome::Transient
                    }
                    None => Outcome::StatusOnly,
                }
            }
            SubtitleKind::Final => {
                self.phase = Phase::Final;
                match text {
                    Some(text) => self.finalize(text),
                    None => Outcome::StatusOnly,
                }
            }
            SubtitleKind::Unknown => Outcome::Ignored,
        }
    }

    fn show_transient(&mut self, text: &str) {
        self.transient = text.to_string();
        self.refit();
    }

    fn refit(&mut self) {
        self.font = fit_font_size(
            &self.transient,
            self.viewport,
            REALTIME_FONT_DEFAULT,
            REALTIME_FONT_FLOOR,
        );
    }

    fn finalize(&mut self, text: &str) -> Outcome {
        if self.last_final.as_deref() == Some(text) {
            return Outcome::Duplicate;
        }
        self.last_final = Some(text.to_string());

        let sentences = split_sentences(text);
        let count = sentences.len();
        self.history.extend(sentences);

        self.transient.clear();
        self.font = REALTIME_FONT_DEFAULT;
        self.scroll_to_latest();

        Outcome::Appended {
            sentences: count,
            text: text.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // History scrolling
    // -------------------------------------------------------------------------

    pub fn scroll_to_latest(&mut self) {
        self.scroll = self.history.len().saturating_sub(1);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let last = self.history.len().saturating_sub(1);
        self.scroll = (self.scroll + lines).min(last);
    }

    pub fn scroll_to_start(&mut self) {
        self.scroll = 0;
    }

    /// Whether the view is pinned to the newest entry
    pub fn is_following(&self) -> bool {
        self.scroll + 1 >= self.history.len()
    }
}
