//! Subtitle views: finalized history and the realtime region

use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use super::theme::Palette;
use crate::app::App;
use crate::reconciler::{Phase, Viewport, REALTIME_FONT_DEFAULT};

/// Wrap width for history at a text scale: larger scale, narrower column
pub fn history_width(cols: u16, scale: f32) -> usize {
    ((cols as f32 / scale.max(0.1)).floor() as usize).clamp(1, cols.max(1) as usize)
}

/// Wrapped lines for history entries `0..=pin`, keeping the last `rows` lines
/// so the pinned entry sits at the bottom. Each line carries its entry index.
pub fn history_lines(entries: &[String], pin: usize, width: usize, rows: usize) -> Vec<(usize, String)> {
    let end = (pin + 1).min(entries.len());
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (index, entry) in entries[..end].iter().enumerate().rev() {
        let wrapped = textwrap::wrap(entry, width);
        for line in wrapped.into_iter().rev() {
            lines.push((index, line.into_owned()));
        }
        if lines.len() >= rows {
            break;
        }
    }

    lines.truncate(rows);
    lines.reverse();
    lines
}

pub fn render_history(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let history = app.reconciler.history();
    let title = if app.reconciler.is_following() || history.is_empty() {
        format!(" HISTORY ({}) ", history.len())
    } else {
        format!(" HISTORY ({}/{}) ↓ End ", app.reconciler.scroll() + 1, history.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(palette.border())
        .title(Span::styled(title, palette.title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if history.is_empty() {
        let hint = if app.reconciler.language().is_none() {
            "Press l to choose a language"
        } else {
            "Finalized sentences appear here"
        };
        frame.render_widget(
            Paragraph::new(hint)
                .style(palette.dimmed())
                .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let width = history_width(inner.width, app.prefs.font_size);
    let latest = history.len() - 1;
    let lines: Vec<Line> = history_lines(history, app.reconciler.scroll(), width, inner.height as usize)
        .into_iter()
        .map(|(index, text)| {
            let style = if index == latest {
                palette.latest()
            } else {
                palette.text()
            };
            Line::from(Span::styled(text, style))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

pub fn render_transient(frame: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(palette.border_focused())
        .title(Span::styled(
            format!(" {} ", app.reconciler.phase().label()),
            palette.accent(),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    app.reconciler
        .set_viewport(Viewport::new(inner.width, inner.height));
    let reconciler = &app.reconciler;

    let placeholder = match reconciler.phase() {
        Phase::Idle => Some("Select a language to start"),
        Phase::Processing => Some("⟳ Translating..."),
        _ if reconciler.transient().is_empty() => Some("…"),
        _ => None,
    };
    if let Some(text) = placeholder {
        frame.render_widget(
            Paragraph::new(text)
                .style(palette.dimmed())
                .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let font = reconciler.font_size();
    let width = reconciler.viewport().columns_at(font);
    let mut style = palette.transient();
    if font >= REALTIME_FONT_DEFAULT {
        style = style.add_modifier(Modifier::BOLD);
    }

    let lines: Vec<Line> = textwrap::wrap(reconciler.transient(), width)
        .into_iter()
        .take(inner.height as usize)
        .map(|line| Line::from(Span::styled(line.into_owned(), style)))
        .collect();

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}
