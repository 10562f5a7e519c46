//! Bottom player bar.  Render-only: all state lives in the player core.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::player::Player;
use crate::theme::Theme;

use super::{fmt_time, truncate_to_width};

/// Rows the bar occupies: none when closed, one when minimized.
pub fn height(player: &Player) -> u16 {
    if !player.is_open() {
        0
    } else if player.state().is_minimized {
        1
    } else {
        4
    }
}

pub fn draw(frame: &mut Frame, area: Rect, player: &Player, theme: &Theme) {
    if !player.is_open() || area.height == 0 {
        return;
    }

    let state = player.state();
    let position = fmt_time(player.position());
    let status_icon = if player.is_paused() { "⏸" } else { "▶" };

    if state.is_minimized {
        let line = Line::from(vec![
            Span::styled(format!("{status_icon} "), theme.style_playing()),
            Span::styled(
                truncate_to_width(&state.title, area.width.saturating_sub(18) as usize),
                theme.style_default(),
            ),
            Span::styled(format!("  {position}"), theme.style_secondary()),
            Span::styled("  [m]", theme.style_muted()),
        ]);
        frame.render_widget(Paragraph::new(line).style(ratatui::style::Style::default().bg(theme.surface)), area);
        return;
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(theme.style_border());
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let mut lines = Vec::with_capacity(3);

    // Title row.
    lines.push(Line::from(vec![
        Span::styled(format!("{status_icon} "), theme.style_playing()),
        Span::styled(
            truncate_to_width(&state.title, inner.width.saturating_sub(4) as usize),
            theme.style_default(),
        ),
    ]));

    // Clock row: position, and total duration when the selection knows it.
    let duration = state
        .episode_index
        .and_then(|i| state.episodes.get(i))
        .and_then(|e| e.duration_secs)
        .map(|d| format!(" / {}", fmt_time(d as f64)))
        .unwrap_or_default();
    lines.push(Line::from(vec![
        Span::styled(format!("  {position}{duration}"), theme.style_secondary()),
        Span::styled(
            match (state.episode_index, state.episodes.len()) {
                (Some(i), n) if n > 0 => format!("   episode {} of {}", i + 1, n),
                _ => "   standalone".to_string(),
            },
            theme.style_muted(),
        ),
    ]));

    // Controls row; prev/next dim out exactly at the list boundaries.
    let prev_style = if state.has_prev() {
        theme.style_accent()
    } else {
        theme.style_muted()
    };
    let next_style = if state.has_next() {
        theme.style_accent()
    } else {
        theme.style_muted()
    };
    lines.push(Line::from(vec![
        Span::styled("  ⏮ P prev", prev_style),
        Span::styled("  ␣ pause", theme.style_secondary()),
        Span::styled("  N next ⏭", next_style),
        Span::styled("  m minimize  x close  y copy url", theme.style_muted()),
    ]));

    frame.render_widget(Paragraph::new(lines), inner);
}
