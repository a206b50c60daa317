//! Color palettes for lecture-lens
//!
//! One palette per theme mode. The dark palette is the neon-on-black look;
//! the light palette keeps the same roles with print-friendly colors.

use ratatui::style::{Color, Modifier, Style};

use crate::preferences::ThemeMode;

/// Colors for one theme mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    /// Slightly offset background for panels and the status bar
    pub panel: Color,
    pub text: Color,
    pub dim: Color,
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub highlight: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub border: Color,
}

impl Palette {
    pub const DARK: Palette = Palette {
        background: Color::Rgb(0x0a, 0x0a, 0x0f),
        panel: Color::Rgb(0x14, 0x14, 0x1e),
        text: Color::Rgb(0xe0, 0xe0, 0xe0),
        dim: Color::Rgb(0x70, 0x70, 0x85),
        primary: Color::Rgb(0x00, 0xff, 0xf2),
        secondary: Color::Rgb(0xff, 0x00, 0xff),
        accent: Color::Rgb(0xff, 0xff, 0x00),
        highlight: Color::Rgb(0xff, 0x00, 0x80),
        success: Color::Rgb(0x00, 0xff, 0x00),
        warning: Color::Rgb(0xff, 0xaa, 0x00),
        error: Color::Rgb(0xff, 0x00, 0x40),
        border: Color::Rgb(0x00, 0x80, 0x78),
    };

    pub const LIGHT: Palette = Palette {
        background: Color::Rgb(0xfa, 0xfa, 0xfa),
        panel: Color::Rgb(0xec, 0xef, 0xf1),
        text: Color::Rgb(0x1a, 0x1a, 0x1a),
        dim: Color::Rgb(0x5f, 0x63, 0x68),
        primary: Color::Rgb(0x00, 0x69, 0x5c),
        secondary: Color::Rgb(0x6a, 0x1b, 0x9a),
        accent: Color::Rgb(0x8a, 0x5a, 0x00),
        highlight: Color::Rgb(0xc2, 0x18, 0x5b),
        success: Color::Rgb(0x2e, 0x7d, 0x32),
        warning: Color::Rgb(0xa1, 0x4a, 0x00),
        error: Color::Rgb(0xc6, 0x28, 0x28),
        border: Color::Rgb(0x90, 0xa4, 0xae),
    };

    pub fn for_mode(mode: ThemeMode) -> &'static Palette {
        match mode {
            ThemeMode::Dark => &Self::DARK,
            ThemeMode::Light => &Self::LIGHT,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.dim)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn secondary(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn accent(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default()
            .fg(self.success)
            .add_modifier(Modifier::BOLD)
    }

    pub fn warning(&self) -> Style {
        Style::default()
            .fg(self.warning)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error(&self) -> Style {
        Style::default()
            .fg(self.error)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn border_focused(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Selected list row (inverted with primary)
    pub fn list_item_selected(&self) -> Style {
        Style::default()
            .fg(self.background)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Newest history entry
    pub fn latest(&self) -> Style {
        Style::default()
            .fg(self.text)
            .add_modifier(Modifier::BOLD)
    }

    /// Realtime (not yet final) text
    pub fn transient(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn keybind(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn status_bar(&self) -> Style {
        Style::default().fg(self.text).bg(self.panel)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COLOR UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// Calculate relative luminance for a color (used in contrast ratio)
/// Formula: https://www.w3.org/TR/WCAG20/#relativeluminancedef
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn channel_luminance(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    0.2126 * channel_luminance(r) + 0.7152 * channel_luminance(g) + 0.0722 * channel_luminance(b)
}

/// Contrast ratio between two colors, from 1 (same) to 21 (black/white).
/// WCAG AA requires >= 4.5:1 for normal text, >= 3:1 for large text
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let l1 = relative_luminance(fg.0, fg.1, fg.2);
    let l2 = relative_luminance(bg.0, bg.1, bg.2);

    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };

    (lighter + 0.05) / (darker + 0.05)
}

pub fn meets_wcag_aa(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 4.5
}

pub fn meets_wcag_aa_large(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 3.0
}

/// Extract RGB tuple from ratatui Color (only works for Rgb variant)
pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}
