//! SearchInput — wraps tui-input for the directory search box.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::Theme;

pub enum SearchAction {
    Changed(String),
    Confirmed,
    Cancelled,
}

pub struct SearchInput {
    input: Input,
    active: bool,
    placeholder: String,
}

impl SearchInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    /// Handle a key event.
    ///
    /// Esc behaviour:
    ///   - with text: clear it, emit `Changed("")` (box stays open, empty)
    ///   - already empty: deactivate and emit `Cancelled`
    pub fn handle_key(&mut self, key: KeyEvent) -> SearchAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    SearchAction::Changed(String::new())
                } else {
                    self.deactivate();
                    SearchAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.deactivate();
                SearchAction::Confirmed
            }
            _ => {
                self.input.handle_event(&crossterm::event::Event::Key(key));
                SearchAction::Changed(self.input.value().to_string())
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(format!("/ {}", self.placeholder), theme.style_muted())
        } else {
            Span::styled(format!("/ {}", &value[scroll..]), theme.style_search())
        };

        let paragraph = Paragraph::new(Line::from(vec![display]))
            .style(ratatui::style::Style::default().bg(theme.search_bg));
        frame.render_widget(paragraph, area);

        if self.active && !value.is_empty() {
            let cursor_x = area.x + 2 + (self.input.visual_cursor() - scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
        }
    }
}

impl Default for SearchInput {
    fn default() -> Self {
        Self::new("search…")
    }
}
