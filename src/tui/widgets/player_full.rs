//! Full-screen player: the current song in large type with lyrics underneath.

use crate::app::state::AppState;
use crate::tui::theme::Theme;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::{now_playing, progress_bar, root, truncate_str};

pub fn render(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border))
        .title(format!(" {} Now playing ", icons.music))
        .title_bottom(Line::from(" F/Esc close ").alignment(Alignment::Right))
        .title_style(Style::default().fg(theme.palette.accent));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Spacing
            Constraint::Length(5), // Song details
            Constraint::Length(1), // Progress bar
            Constraint::Length(1), // Controls
            Constraint::Length(1), // Up next
            Constraint::Length(1), // Spacing
            Constraint::Min(1),    // Lyrics
        ])
        .split(inner);

    let width = inner.width.saturating_sub(4) as usize;
    frame.render_widget(
        Paragraph::new(song_lines(theme, state, width)).alignment(Alignment::Center),
        rows[1],
    );

    let bar_area = centered(rows[2], 80);
    let session = &state.session;
    let ratio = if session.duration() > 0.0 {
        session.position() / session.duration()
    } else {
        0.0
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            progress_bar(bar_area.width as usize, ratio, icons),
            Style::default().fg(theme.palette.accent),
        ))),
        bar_area,
    );

    frame.render_widget(
        Paragraph::new(now_playing::controls_line(theme, state)).alignment(Alignment::Center),
        rows[3],
    );

    if let Some(next) = session.queue().peek_next() {
        let text = format!("Up next: {}", next.display());
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                truncate_str(&text, width),
                Style::default().fg(theme.palette.fg_secondary),
            )))
            .alignment(Alignment::Center),
            rows[4],
        );
    }

    let lyrics_area = rows[6];
    let context = (lyrics_area.height as usize).saturating_sub(1) / 2;
    let lines = root::lyric_lines(theme, state, lyrics_area.width as usize, context);
    let top_padding = (lyrics_area.height as usize).saturating_sub(lines.len()) / 2;
    let mut padded: Vec<Line> = vec![Line::default(); top_padding];
    padded.extend(lines);
    frame.render_widget(Paragraph::new(padded), lyrics_area);
}

fn song_lines(theme: &Theme, state: &AppState, width: usize) -> Vec<Line<'static>> {
    let muted = Style::default().fg(theme.palette.fg_secondary);
    let Some(song) = state.session.current() else {
        return vec![
            Line::default(),
            Line::from(Span::styled("Nothing is playing", muted)),
        ];
    };

    let mut lines = vec![
        Line::from(Span::styled(
            truncate_str(&song.title.to_uppercase(), width),
            Style::default()
                .fg(theme.palette.fg_primary)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            truncate_str(song.artist_name(), width),
            Style::default().fg(theme.palette.accent),
        )),
    ];
    if let Some(album) = song.album.as_deref() {
        let album = match song.year {
            Some(y) => format!("{album} ({y})"),
            None => album.to_string(),
        };
        lines.push(Line::from(Span::styled(truncate_str(&album, width), muted)));
    }

    let mut tech = Vec::new();
    if let Some(suffix) = song.suffix.as_deref() {
        tech.push(suffix.to_uppercase());
    }
    if let Some(br) = song.bit_rate {
        tech.push(format!("{br} kbps"));
    }
    if !tech.is_empty() {
        lines.push(Line::from(Span::styled(tech.join(" · "), muted)));
    }
    lines
}

/// A horizontally centred slice `percent` wide.
fn centered(area: Rect, percent: u16) -> Rect {
    let side = (100 - percent.min(100)) / 2;
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(side),
            Constraint::Percentage(percent),
            Constraint::Percentage(side),
        ])
        .split(area)[1]
}
