//! Language picker overlay

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem},
    Frame,
};

use super::{centered_rect, theme::Palette};
use crate::app::App;

pub fn render_picker(frame: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let height = app.registry.languages().len() as u16 + 3;
    let popup = centered_rect(area, 40, height);
    let visible = popup.height.saturating_sub(2) as usize;
    app.registry.list.scroll_into_view(visible);

    frame.render_widget(Clear, popup);

    let registry = &app.registry;
    let selected = registry.selected_code();
    let cursor = registry.list.selected;

    let none_row = ("—  none".to_string(), selected.is_none());
    let rows = std::iter::once(none_row).chain(
        registry
            .languages()
            .iter()
            .map(|lang| (lang.label(), selected == Some(lang.code.as_str()))),
    );

    let items: Vec<ListItem> = rows
        .enumerate()
        .skip(registry.list.offset)
        .take(visible)
        .map(|(row, (label, active))| {
            let marker = if active { "● " } else { "  " };
            let style = if row == cursor {
                palette.list_item_selected()
            } else if active {
                palette.accent()
            } else {
                palette.text()
            };
            ListItem::new(Line::from(Span::styled(format!("{}{}", marker, label), style)))
        })
        .collect();

    let title = if registry.is_empty() {
        " LANGUAGES (waiting for server) "
    } else {
        " LANGUAGES "
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(palette.border_focused())
            .title(Span::styled(title, palette.title()))
            .style(palette.base()),
    );
    frame.render_widget(list, popup);
}
