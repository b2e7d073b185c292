//! Queue screen widget - displays the playback queue

use crate::app::state::AppState;
use crate::queue::RepeatMode;
use crate::tui::theme::Theme;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::{format_time, truncate_str};

pub fn render(frame: &mut Frame, theme: &Theme, state: &mut AppState, area: Rect) {
    let icons = &theme.icons;
    let muted = Style::default().fg(theme.palette.fg_secondary);

    let padded = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area)[1];

    let queue = state.session.queue();
    if queue.is_empty() {
        let empty_msg = Line::from(Span::styled(
            "Queue is empty. Press a or n on a song, album or playlist to add it.",
            muted,
        ));
        frame.render_widget(Paragraph::new(empty_msg), padded);
        return;
    }

    let on = Style::default().fg(theme.palette.accent);
    let (repeat_icon, repeat_label) = match queue.repeat() {
        RepeatMode::One => (icons.repeat_one, "One"),
        RepeatMode::All => (icons.repeat, "All"),
        RepeatMode::Off => (icons.repeat, "Off"),
    };
    let header = Line::from(vec![
        Span::styled(
            format!(
                "{} songs · {}",
                queue.len(),
                format_time(queue.total_duration() as f64)
            ),
            muted,
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} Shuffle {}",
                icons.shuffle,
                if queue.is_shuffle_enabled() { "ON" } else { "OFF" }
            ),
            if queue.is_shuffle_enabled() { on } else { muted },
        ),
        Span::raw("  "),
        Span::styled(
            format!("{repeat_icon} Repeat {repeat_label}"),
            if queue.repeat() == RepeatMode::Off { muted } else { on },
        ),
    ]);

    // Header, spacer and hint line take three rows.
    let visible_height = padded.height.saturating_sub(3) as usize;
    let len = queue.len();
    let current_idx = queue.current_index();
    let max_width = padded.width.saturating_sub(14) as usize;

    let selected = state.queue_selected.min(len - 1);
    let mut scroll = state.queue_scroll;
    if selected < scroll {
        scroll = selected;
    } else if visible_height > 0 && selected >= scroll + visible_height {
        scroll = selected + 1 - visible_height;
    }

    let mut lines: Vec<Line> = vec![header, Line::default()];
    for (i, song) in queue
        .songs()
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible_height)
    {
        let is_current = current_idx == Some(i);
        let is_selected = i == selected;

        let prefix = if is_current {
            format!("{} ", state.session.state().icon())
        } else {
            "  ".to_string()
        };

        let style = if is_selected {
            Style::default()
                .fg(theme.palette.fg_primary)
                .bg(theme.palette.bg_highlight)
                .add_modifier(Modifier::BOLD)
        } else if is_current {
            Style::default()
                .fg(theme.palette.playing)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.palette.fg_primary)
        };

        let duration = song
            .duration
            .map(|d| format_time(f64::from(d)))
            .unwrap_or_default();

        lines.push(Line::from(vec![
            Span::styled(prefix, if is_current { on } else { muted }),
            Span::styled(format!("{:>3}. ", i + 1), muted),
            Span::styled(truncate_str(&song.display(), max_width), style),
            Span::styled(format!("  {duration}"), muted),
        ]));
    }

    let remaining = (padded.height as usize).saturating_sub(lines.len());
    if remaining > 0 {
        lines.extend(std::iter::repeat_n(Line::default(), remaining - 1));
        lines.push(Line::from(Span::styled(
            "Enter: Play  d: Remove  c: Clear  K/J: Move  s: Shuffle  R: Repeat",
            muted,
        )));
    }

    frame.render_widget(Paragraph::new(lines), padded);
    state.queue_selected = selected;
    state.queue_scroll = scroll;
}
