//! Color palettes and style helpers.
//!
//! Unlike a fixed constant palette, the theme is an instance so it can be
//! switched at runtime; the chosen name is persisted in the `ui_prefs` slice
//! and forgotten after a year.

use ratatui::style::{Color, Modifier, Style};

/// Default theme name, applied when no (fresh) preference is stored.
pub const DEFAULT_THEME: &str = "macchiato";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub bg: Color,
    pub surface: Color,
    pub text: Color,
    pub subtext: Color,
    pub accent: Color,
    pub playing: Color,
    pub error: Color,
    pub muted: Color,
    pub border: Color,
    pub border_focused: Color,
    pub selection_bg: Color,
    pub search_fg: Color,
    pub search_bg: Color,
}

impl Theme {
    pub const NAMES: [&'static str; 4] = ["macchiato", "latte", "frappe", "mocha"];

    pub fn macchiato() -> Self {
        Self {
            name: "macchiato",
            bg: Color::Rgb(36, 39, 58),
            surface: Color::Rgb(54, 58, 79),
            text: Color::Rgb(202, 211, 245),
            subtext: Color::Rgb(165, 173, 203),
            accent: Color::Rgb(198, 160, 246),
            playing: Color::Rgb(166, 218, 149),
            error: Color::Rgb(237, 135, 150),
            muted: Color::Rgb(110, 115, 141),
            border: Color::Rgb(73, 77, 100),
            border_focused: Color::Rgb(198, 160, 246),
            selection_bg: Color::Rgb(54, 58, 79),
            search_fg: Color::Rgb(238, 212, 159),
            search_bg: Color::Rgb(30, 32, 48),
        }
    }

    pub fn latte() -> Self {
        Self {
            name: "latte",
            bg: Color::Rgb(239, 241, 245),
            surface: Color::Rgb(204, 208, 218),
            text: Color::Rgb(76, 79, 105),
            subtext: Color::Rgb(92, 95, 119),
            accent: Color::Rgb(136, 57, 239),
            playing: Color::Rgb(64, 160, 43),
            error: Color::Rgb(210, 15, 57),
            muted: Color::Rgb(156, 160, 176),
            border: Color::Rgb(188, 192, 204),
            border_focused: Color::Rgb(136, 57, 239),
            selection_bg: Color::Rgb(220, 224, 232),
            search_fg: Color::Rgb(223, 142, 29),
            search_bg: Color::Rgb(230, 233, 239),
        }
    }

    pub fn frappe() -> Self {
        Self {
            name: "frappe",
            bg: Color::Rgb(48, 52, 70),
            surface: Color::Rgb(65, 69, 89),
            text: Color::Rgb(198, 208, 245),
            subtext: Color::Rgb(165, 173, 206),
            accent: Color::Rgb(202, 158, 230),
            playing: Color::Rgb(166, 209, 137),
            error: Color::Rgb(231, 130, 132),
            muted: Color::Rgb(115, 121, 148),
            border: Color::Rgb(81, 87, 109),
            border_focused: Color::Rgb(202, 158, 230),
            selection_bg: Color::Rgb(65, 69, 89),
            search_fg: Color::Rgb(229, 200, 144),
            search_bg: Color::Rgb(41, 44, 60),
        }
    }

    pub fn mocha() -> Self {
        Self {
            name: "mocha",
            bg: Color::Rgb(30, 30, 46),
            surface: Color::Rgb(49, 50, 68),
            text: Color::Rgb(205, 214, 244),
            subtext: Color::Rgb(166, 173, 200),
            accent: Color::Rgb(203, 166, 247),
            playing: Color::Rgb(166, 227, 161),
            error: Color::Rgb(243, 139, 168),
            muted: Color::Rgb(108, 112, 134),
            border: Color::Rgb(69, 71, 90),
            border_focused: Color::Rgb(203, 166, 247),
            selection_bg: Color::Rgb(49, 50, 68),
            search_fg: Color::Rgb(249, 226, 175),
            search_bg: Color::Rgb(24, 24, 37),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "macchiato" => Some(Self::macchiato()),
            "latte" => Some(Self::latte()),
            "frappe" => Some(Self::frappe()),
            "mocha" => Some(Self::mocha()),
            _ => None,
        }
    }

    /// The next theme in the cycle order of [`NAMES`](Self::NAMES).
    pub fn next(&self) -> Self {
        let pos = Self::NAMES.iter().position(|n| *n == self.name).unwrap_or(0);
        let next = Self::NAMES[(pos + 1) % Self::NAMES.len()];
        Self::by_name(next).unwrap_or_default()
    }

    // ── Predefined styles ────────────────────────────────────────────────────

    pub fn style_default(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn style_secondary(&self) -> Style {
        Style::default().fg(self.subtext)
    }

    pub fn style_accent(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn style_playing(&self) -> Style {
        Style::default().fg(self.playing)
    }

    pub fn style_error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn style_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn style_selected(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .fg(self.text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn style_border(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn style_border_focused(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    pub fn style_search(&self) -> Style {
        Style::default().fg(self.search_fg).bg(self.search_bg)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::macchiato()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_visits_every_theme() {
        let mut theme = Theme::default();
        let mut seen = vec![theme.name];
        for _ in 0..Theme::NAMES.len() - 1 {
            theme = theme.next();
            seen.push(theme.name);
        }
        for name in Theme::NAMES {
            assert!(seen.contains(&name), "cycle missed {name}");
        }
        assert_eq!(theme.next().name, DEFAULT_THEME);
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(Theme::by_name("solarized").is_none());
        assert_eq!(Theme::by_name(DEFAULT_THEME).unwrap().name, "macchiato");
    }
}
