//! Terminal UI
//!
//! Thin ratatui layer over [`App`]: it only draws state, except for reporting
//! the transient region's size back to the reconciler so realtime text can be
//! fitted.

pub mod languages;
pub mod subtitles;
pub mod theme;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, Focus};
use crate::models::ConnectionStatus;
pub use theme::Palette;

/// Rows of the transient region, borders included
const TRANSIENT_HEIGHT: u16 = 7;

/// Main render function
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let palette = Palette::for_mode(app.prefs.theme);

    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(palette.base()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                // Header
            Constraint::Min(3),                   // History
            Constraint::Length(TRANSIENT_HEIGHT), // Realtime text
            Constraint::Length(1),                // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app, palette);
    subtitles::render_history(frame, chunks[1], app, palette);
    subtitles::render_transient(frame, chunks[2], app, palette);
    render_status_bar(frame, chunks[3], app, palette);

    if app.focus == Focus::Languages {
        languages::render_picker(frame, area, app, palette);
    }

    if let Some(notice) = &app.notice {
        render_notice(frame, area, notice, palette);
    }
}

fn connection_span<'a>(status: &ConnectionStatus, palette: &Palette) -> Span<'a> {
    let (symbol, style) = match status {
        ConnectionStatus::Connected => ("●", palette.success()),
        ConnectionStatus::Connecting => ("◌", palette.warning()),
        ConnectionStatus::Disconnected => ("○", palette.dimmed()),
        ConnectionStatus::Error(_) => ("✗", palette.error()),
    };
    Span::styled(format!("{} {}", symbol, status.label()), style)
}

/// Header: name, connection status, selected and source language
fn render_header(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let language = match app.registry.selected() {
        Some(lang) => Span::styled(lang.label(), palette.accent()),
        None => Span::styled("no language", palette.dimmed()),
    };

    let mut spans = vec![
        connection_span(&app.status, palette),
        Span::styled("  │  ", palette.dimmed()),
        language,
    ];

    if let Some(source) = &app.source {
        let label = match (&source.flag, &source.name) {
            (Some(flag), Some(name)) => format!("{} {}", flag, name),
            (None, Some(name)) => name.clone(),
            (Some(flag), None) => flag.clone(),
            (None, None) => String::new(),
        };
        if !label.is_empty() {
            spans.push(Span::styled("  ◂ ", palette.dimmed()));
            spans.push(Span::styled(label, palette.secondary()));
        }
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(palette.border())
            .title(Span::styled(" LECTURE LENS ", palette.title())),
    );
    frame.render_widget(header, area);
}

/// Status bar: speech state, display settings, key hints
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let speech = app.speech();
    let speech_span = if !speech.is_supported() {
        Span::styled(" TTS n/a ", palette.dimmed())
    } else if speech.is_busy() {
        Span::styled(format!(" ♪ {} speaking ", speech.kind()), palette.success())
    } else if app.prefs.tts_enabled {
        Span::styled(format!(" ♪ {} on ", speech.kind()), palette.accent())
    } else {
        Span::styled(" ♪ off ", palette.dimmed())
    };

    let settings = Span::styled(
        format!(
            " {} │ {:.1}x │ A {:.2} ",
            app.reconciler.phase().label(),
            app.prefs.tts_speed,
            app.prefs.font_size
        ),
        palette.text(),
    );

    let hints = if app.focus == Focus::Languages {
        " ↑↓:move  ↵:select  esc:close "
    } else {
        " l:language  t:tts  space:replay/stop  +/-:size  [/]:rate  d:theme  q:quit "
    };

    let status_line = Line::from(vec![
        speech_span,
        Span::raw("│"),
        settings,
        Span::raw("│"),
        Span::styled(hints, palette.dimmed()),
    ]);

    frame.render_widget(Paragraph::new(status_line).style(palette.status_bar()), area);
}

/// One-line notice near the bottom of the screen
fn render_notice(frame: &mut Frame, area: Rect, notice: &str, palette: &Palette) {
    let popup_width = (notice.chars().count() as u16 + 6)
        .min(area.width.saturating_sub(4))
        .max(10);
    let popup_height = 3;

    let popup_area = Rect {
        x: area.x + (area.width.saturating_sub(popup_width)) / 2,
        y: area.y + area.height.saturating_sub(popup_height + 2),
        width: popup_width.min(area.width),
        height: popup_height.min(area.height),
    };

    frame.render_widget(Clear, popup_area);

    let block = Paragraph::new(Span::styled(notice.to_string(), palette.warning()))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(palette.warning())
                .style(palette.base()),
        );
    frame.render_widget(block, popup_area);
}

/// Rect of `width` x `height` centered in `area`, clamped to it
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
