//! Episode pane: the episode table of one podcast plus the on-demand
//! description panel.

use cast_proto::protocol::Episode;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::api::Podcast;
use crate::descriptions::{DescriptionStatus, Descriptions};
use crate::event::Action;
use crate::theme::Theme;

use super::{fmt_time, truncate_to_width};

/// Collapsed description height in rows.
const COLLAPSED_DESCRIPTION_ROWS: u16 = 4;

pub struct EpisodePane {
    pub podcast: Option<Podcast>,
    pub episodes: Vec<Episode>,
    pub loading: bool,
    selected: usize,
    scroll: usize,
}

impl EpisodePane {
    pub fn new() -> Self {
        Self {
            podcast: None,
            episodes: Vec::new(),
            loading: false,
            selected: 0,
            scroll: 0,
        }
    }

    pub fn open(&mut self, podcast: Podcast) {
        self.podcast = Some(podcast);
        self.episodes.clear();
        self.loading = true;
        self.selected = 0;
        self.scroll = 0;
    }

    pub fn set_episodes(&mut self, episodes: Vec<Episode>) {
        self.episodes = episodes;
        self.loading = false;
        if self.selected >= self.episodes.len() {
            self.selected = self.episodes.len().saturating_sub(1);
        }
    }

    pub fn selected_episode(&self) -> Option<&Episode> {
        self.episodes.get(self.selected)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.episodes.len() {
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
                self.selected = self.episodes.len().saturating_sub(1);
                Vec::new()
            }
            KeyCode::Enter | KeyCode::Char('l') => {
                if self.episodes.is_empty() {
                    Vec::new()
                } else {
                    vec![Action::PlayEpisode(self.selected)]
                }
            }
            KeyCode::Char('d') => {
                if self.episodes.is_empty() {
                    Vec::new()
                } else {
                    vec![Action::ToggleDescription(self.selected)]
                }
            }
            KeyCode::Char('e') => vec![Action::ToggleShowMore],
            KeyCode::Char('r') => {
                if self.episodes.is_empty() {
                    Vec::new()
                } else {
                    vec![Action::RefreshEpisode(self.selected)]
                }
            }
            KeyCode::Esc | KeyCode::Char('h') => vec![Action::Back],
            _ => Vec::new(),
        }
    }

    pub fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        descriptions: &Descriptions,
        playing_src: Option<&str>,
        theme: &Theme,
    ) {
        let title = self
            .podcast
            .as_ref()
            .map(|p| format!(" {} ", p.title))
            .unwrap_or_else(|| " Episodes ".to_string());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(theme.style_border_focused());
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        // The visible description claims the bottom of the pane.
        let description_height = self.description_height(descriptions, inner.height);
        let list_area = Rect::new(
            inner.x,
            inner.y,
            inner.width,
            inner.height - description_height,
        );

        if self.loading {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled("loading…", theme.style_muted()))),
                list_area,
            );
        } else if self.episodes.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled("no episodes", theme.style_muted()))),
                list_area,
            );
        } else {
            self.draw_rows(frame, list_area, playing_src, theme);
        }

        if description_height > 0 {
            let desc_area = Rect::new(
                inner.x,
                inner.y + inner.height - description_height,
                inner.width,
                description_height,
            );
            self.draw_description(frame, desc_area, descriptions, theme);
        }
    }

    fn draw_rows(&mut self, frame: &mut Frame, area: Rect, playing_src: Option<&str>, theme: &Theme) {
        let rows = area.height as usize;
        if rows == 0 {
            return;
        }
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + rows {
            self.scroll = self.selected + 1 - rows;
        }

        let width = area.width as usize;
        let mut lines = Vec::with_capacity(rows);
        for (row, episode) in self
            .episodes
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(rows)
        {
            let is_selected = row == self.selected;
            let is_playing = playing_src == Some(episode.audio_url.as_str());

            let marker = if is_playing { "▶ " } else { "  " };
            let date = episode.date.format("%Y-%m-%d").to_string();
            let duration = episode
                .duration_secs
                .map(|d| fmt_time(d as f64))
                .unwrap_or_default();

            let title_width = width.saturating_sub(2 + date.len() + 2 + duration.len() + 2);
            let row_style = if is_selected {
                theme.style_selected()
            } else if is_playing {
                theme.style_playing()
            } else {
                theme.style_default()
            };

            lines.push(Line::from(vec![
                Span::styled(marker, theme.style_playing()),
                Span::styled(format!("{date}  "), theme.style_secondary()),
                Span::styled(truncate_to_width(&episode.title, title_width), row_style),
                Span::styled(format!("  {duration}"), theme.style_muted()),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_description(
        &self,
        frame: &mut Frame,
        area: Rect,
        descriptions: &Descriptions,
        theme: &Theme,
    ) {
        let Some((_, status)) = descriptions.visible() else {
            return;
        };
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(theme.style_border());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let paragraph = match status {
            DescriptionStatus::Loading => {
                Paragraph::new(Line::from(Span::styled("loading…", theme.style_muted())))
            }
            DescriptionStatus::Failed => Paragraph::new(Line::from(Span::styled(
                "Error loading the description",
                theme.style_error(),
            ))),
            DescriptionStatus::Loaded(desc) => {
                let mut lines: Vec<Line> = vec![Line::from(Span::styled(
                    desc.text.clone(),
                    theme.style_default(),
                ))];
                if desc.truncatable {
                    let hint = if desc.expanded {
                        "· show less (e)"
                    } else {
                        "· show more (e)"
                    };
                    lines.push(Line::from(Span::styled(hint, theme.style_accent())));
                }
                Paragraph::new(lines).wrap(Wrap { trim: true })
            }
        };
        frame.render_widget(paragraph, inner);
    }

    fn description_height(&self, descriptions: &Descriptions, total: u16) -> u16 {
        let Some((_, status)) = descriptions.visible() else {
            return 0;
        };
        let wanted = match status {
            DescriptionStatus::Loading | DescriptionStatus::Failed => 2,
            DescriptionStatus::Loaded(desc) => {
                if desc.truncatable && desc.expanded {
                    total / 2
                } else {
                    COLLAPSED_DESCRIPTION_ROWS
                }
            }
        };
        wanted.min(total.saturating_sub(2))
    }
}

impl Default for EpisodePane {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn episodes() -> Vec<Episode> {
        (0..3)
            .map(|i| Episode {
                title: format!("ep {i}"),
                date: Utc.with_ymd_and_hms(2024, 3, 3 - i, 6, 0, 0).unwrap(),
                audio_url: format!("https://a/{i}.mp3"),
                ilpost_id: Some(format!("id-{i}")),
                duration_secs: Some(60),
            })
            .collect()
    }

    #[test]
    fn open_resets_selection_and_marks_loading() {
        let mut pane = EpisodePane::new();
        pane.set_episodes(episodes());
        pane.selected = 2;

        pane.open(Podcast {
            id: "1".into(),
            title: "T".into(),
            ..Podcast::default()
        });
        assert!(pane.loading);
        assert!(pane.episodes.is_empty());
        assert_eq!(pane.selected, 0);

        pane.set_episodes(episodes());
        assert!(!pane.loading);
        assert_eq!(pane.selected_episode().unwrap().title, "ep 0");
    }

    #[test]
    fn keys_map_to_actions() {
        let mut pane = EpisodePane::new();
        pane.set_episodes(episodes());

        pane.handle_key(KeyEvent::from(KeyCode::Char('j')));
        assert_eq!(
            pane.handle_key(KeyEvent::from(KeyCode::Enter)),
            vec![Action::PlayEpisode(1)]
        );
        assert_eq!(
            pane.handle_key(KeyEvent::from(KeyCode::Char('d'))),
            vec![Action::ToggleDescription(1)]
        );
        assert_eq!(
            pane.handle_key(KeyEvent::from(KeyCode::Esc)),
            vec![Action::Back]
        );
    }

    #[test]
    fn empty_pane_produces_no_play_actions() {
        let mut pane = EpisodePane::new();
        assert!(pane.handle_key(KeyEvent::from(KeyCode::Enter)).is_empty());
        assert!(pane
            .handle_key(KeyEvent::from(KeyCode::Char('d')))
            .is_empty());
    }
}
