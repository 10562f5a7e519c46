//! Loading indicator rendering: the thin fetch bar and the background
//! update overlay.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::loading::{LoadingTracker, UpdateStatus};
use crate::theme::Theme;

/// One-cell-high smooth bar, 8 eighths per cell.
fn fill_bar(width: usize, percent: u8) -> String {
    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

    let eighths = (percent as usize * width * 8) / 100;
    let full = eighths / 8;
    let partial = eighths % 8;

    let mut bar = String::with_capacity(width + 4);
    for _ in 0..full {
        bar.push('█');
    }
    if full < width {
        bar.push(BLOCKS[partial]);
        for _ in (full + 1)..width {
            bar.push(' ');
        }
    }
    bar
}

/// The thin bar shown while fetches are in flight.
pub fn draw_loading_bar(frame: &mut Frame, area: Rect, tracker: &LoadingTracker, theme: &Theme) {
    if area.height == 0 || !tracker.is_visible() {
        return;
    }
    let label = if tracker.in_flight() > 1 {
        format!(" ×{}", tracker.in_flight())
    } else {
        String::new()
    };
    let bar = fill_bar(
        (area.width as usize).saturating_sub(label.chars().count()),
        tracker.progress(),
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(bar, theme.style_accent()),
            Span::styled(label, theme.style_muted()),
        ])),
        area,
    );
}

/// Centered overlay while a background podcast update runs.
pub fn draw_update_overlay(frame: &mut Frame, area: Rect, status: &UpdateStatus, theme: &Theme) {
    if !status.is_active() {
        return;
    }

    let width = (area.width.saturating_sub(4)).min(48).max(20);
    let height = 6;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let popup = Rect::new(x, y, width, height).intersection(area);
    if popup.width < 6 || popup.height < 3 {
        return;
    }

    frame.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(Span::styled(status.message(), theme.style_default())),
        Line::from(Span::styled(
            format!("{} of {}", status.loaded, status.total),
            theme.style_secondary(),
        )),
        Line::from(Span::styled(
            fill_bar(width.saturating_sub(4) as usize, status.progress_percent()),
            theme.style_playing(),
        )),
    ];
    if status.errors > 0 {
        let detail = status.last_error.as_deref().unwrap_or("");
        lines.push(Line::from(Span::styled(
            format!("errors: {} {}", status.errors, detail),
            theme.style_error(),
        )));
    }

    let block = Block::default()
        .title(" Updating ")
        .borders(Borders::ALL)
        .border_style(theme.style_border_focused());
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
