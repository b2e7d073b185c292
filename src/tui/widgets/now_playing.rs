//! Now Playing widget - compact text-only player for bottom bar

use crate::app::state::{AppState, ToastKind};
use crate::playback::PlayState;
use crate::queue::RepeatMode;
use crate::tui::theme::{Icons, Theme};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::{format_time, progress_bar, truncate_str};

pub fn render(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border))
        .title(format!(" {} {} ", icons.music, state.session.state().label()))
        .title_style(Style::default().fg(theme.palette.accent));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let padded = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner)[1];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(1), // Artist · album
            Constraint::Length(1), // Progress bar
            Constraint::Length(1), // Time + controls + volume
            Constraint::Min(0),    // Toast or status
        ])
        .split(padded);

    let content_width = padded.width.saturating_sub(1) as usize;
    let session = &state.session;

    let (title, detail) = match session.current() {
        Some(song) => {
            let mut detail = song.artist_name().to_string();
            if let Some(album) = song.album.as_deref() {
                if !detail.is_empty() {
                    detail.push_str(" · ");
                }
                detail.push_str(album);
            }
            (song.title.clone(), detail)
        }
        None => ("Not playing".to_string(), String::new()),
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            truncate_str(&title, content_width),
            Style::default()
                .fg(theme.palette.fg_primary)
                .add_modifier(Modifier::BOLD),
        ))),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            truncate_str(&detail, content_width),
            Style::default().fg(theme.palette.fg_secondary),
        ))),
        rows[1],
    );

    let ratio = if session.duration() > 0.0 {
        session.position() / session.duration()
    } else {
        0.0
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            progress_bar(rows[2].width as usize, ratio, icons),
            Style::default().fg(theme.palette.accent),
        ))),
        rows[2],
    );

    frame.render_widget(Paragraph::new(controls_line(theme, state)), rows[3]);

    if let Some(toast) = &state.toast
        && !toast.is_expired()
    {
        let (prefix, color) = match toast.kind {
            ToastKind::Success => (icons.success, theme.palette.playing),
            ToastKind::Error => (icons.error, theme.palette.error),
        };
        let toast_line = Line::from(vec![
            Span::styled(format!("{} ", prefix), Style::default().fg(color)),
            Span::styled(
                truncate_str(&toast.message, content_width.saturating_sub(3)),
                Style::default().fg(color),
            ),
        ]);
        frame.render_widget(Paragraph::new(toast_line), rows[4]);
    } else if !state.status.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                truncate_str(&state.status, content_width),
                Style::default().fg(theme.palette.fg_secondary),
            ))),
            rows[4],
        );
    }
}

/// Time, transport, volume and mode indicators on one line.
pub(crate) fn controls_line(theme: &Theme, state: &AppState) -> Line<'static> {
    let icons = &theme.icons;
    let session = &state.session;
    let muted = Style::default().fg(theme.palette.fg_secondary);
    let active = Style::default().fg(theme.palette.accent_alt);

    let play_icon = if session.state() == PlayState::Playing {
        icons.pause
    } else {
        icons.play
    };

    let mut spans = vec![
        Span::styled(
            format!(
                "{}/{}",
                format_time(session.position()),
                format_time(session.duration())
            ),
            muted,
        ),
        Span::raw("  "),
        Span::styled(icons.prev, muted),
        Span::raw(" "),
        Span::styled(play_icon, Style::default().fg(theme.palette.playing)),
        Span::raw(" "),
        Span::styled(icons.next, muted),
        Span::raw("  "),
        Span::styled(volume_icon(icons, session.volume()), muted),
        Span::raw(" "),
        Span::styled(format!("{}%", session.volume()), muted),
    ];

    let queue = session.queue();
    if queue.is_shuffle_enabled() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(icons.shuffle, active));
    }
    match queue.repeat() {
        RepeatMode::Off => {}
        RepeatMode::One => {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(icons.repeat_one, active));
        }
        RepeatMode::All => {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(icons.repeat, active));
        }
    }
    if let Some(song) = session.current()
        && song.is_starred()
    {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(icons.star, active));
    }
    Line::from(spans)
}

fn volume_icon(icons: &Icons, volume: u8) -> &'static str {
    if volume == 0 {
        icons.volume_mute
    } else if volume < 50 {
        icons.volume_low
    } else {
        icons.volume_high
    }
}
