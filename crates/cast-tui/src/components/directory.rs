//! Directory pane: the searchable grid of podcast cards.
//!
//! Search does not filter in place — cards are scored, zero scores hidden,
//! and the rest reordered by descending score, so the best match is always
//! the top row.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::api::Podcast;
use crate::event::Action;
use crate::search;
use crate::theme::Theme;
use crate::widgets::search_input::{SearchAction, SearchInput};

use super::truncate_to_width;

pub struct DirectoryPane {
    search: SearchInput,
    query: String,
    /// `(podcast_index, score)` of visible cards, best first.
    ranked: Vec<(usize, u32)>,
    selected: usize,
    scroll: usize,
}

impl DirectoryPane {
    pub fn new() -> Self {
        Self {
            search: SearchInput::new("title, author, description…"),
            query: String::new(),
            ranked: Vec::new(),
            selected: 0,
            scroll: 0,
        }
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_active()
    }

    /// Re-rank after the podcast set or the query changed.
    pub fn refresh(&mut self, podcasts: &[Podcast]) {
        self.ranked = search::rank(
            podcasts
                .iter()
                .map(|p| (p.title.as_str(), p.author.as_str(), p.description.as_str())),
            &self.query,
        );
        if self.selected >= self.ranked.len() {
            self.selected = self.ranked.len().saturating_sub(1);
        }
    }

    pub fn set_query(&mut self, query: String, podcasts: &[Podcast]) {
        self.query = query;
        self.selected = 0;
        self.scroll = 0;
        self.refresh(podcasts);
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.ranked.get(self.selected).map(|(i, _)| *i)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if self.search.is_active() {
            return match self.search.handle_key(key) {
                SearchAction::Changed(q) => vec![Action::SearchChanged(q)],
                SearchAction::Confirmed => Vec::new(),
                SearchAction::Cancelled => vec![Action::SearchChanged(String::new())],
            };
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.ranked.len() {
                    self.selected += 1;
                }
                Vec::new()
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Char('g') => {
                self.selected = 0;
                Vec::new()
            }
            KeyCode::Char('G') => {
                self.selected = self.ranked.len().saturating_sub(1);
                Vec::new()
            }
            KeyCode::Char('/') => {
                self.search.activate();
                Vec::new()
            }
            KeyCode::Enter | KeyCode::Char('l') => match self.selected_index() {
                Some(i) => vec![Action::OpenPodcast(i)],
                None => Vec::new(),
            },
            KeyCode::Char('p') => match self.selected_index() {
                Some(i) => vec![Action::PlayLatestOf(i)],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, podcasts: &[Podcast], theme: &Theme) {
        let block = Block::default()
            .title(" Podcasts ")
            .borders(Borders::ALL)
            .border_style(theme.style_border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let search_height = if self.search.is_active() || !self.search.is_empty() {
            1
        } else {
            0
        };
        if search_height > 0 && inner.height > 0 {
            let search_area = Rect::new(inner.x, inner.y, inner.width, 1);
            self.search.draw(frame, search_area, theme);
        }

        let list_area = Rect::new(
            inner.x,
            inner.y + search_height,
            inner.width,
            inner.height.saturating_sub(search_height),
        );
        if list_area.height == 0 {
            return;
        }

        if self.ranked.is_empty() {
            let message = if podcasts.is_empty() {
                "no podcasts loaded"
            } else {
                "no matches"
            };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(message, theme.style_muted()))),
                list_area,
            );
            return;
        }

        // Keep the selection inside the window.
        let rows = list_area.height as usize;
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + rows {
            self.scroll = self.selected + 1 - rows;
        }

        let width = list_area.width as usize;
        let mut lines = Vec::with_capacity(rows);
        for (row, (podcast_idx, _score)) in
            self.ranked.iter().enumerate().skip(self.scroll).take(rows)
        {
            let Some(podcast) = podcasts.get(*podcast_idx) else {
                continue;
            };
            let is_selected = row == self.selected;

            let title_style = if is_selected {
                theme.style_selected()
            } else {
                theme.style_default()
            };
            let mut spans = vec![Span::styled(
                truncate_to_width(&podcast.title, width.min(40)),
                title_style,
            )];
            if !podcast.author.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", truncate_to_width(&podcast.author, 24)),
                    theme.style_secondary(),
                ));
            }
            if !podcast.description.is_empty() {
                let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
                let rest = width.saturating_sub(used + 2);
                if rest > 4 {
                    spans.push(Span::styled(
                        format!("  {}", truncate_to_width(&podcast.description, rest)),
                        theme.style_muted(),
                    ));
                }
            }
            lines.push(Line::from(spans));
        }

        frame.render_widget(Paragraph::new(lines), list_area);
    }
}

impl Default for DirectoryPane {
    fn default() -> Self {
        Self::new()
    }
}
