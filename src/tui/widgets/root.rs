//! Root layout widget - orchestrates main layout structure

use crate::app::state::{AppState, Screen};
use crate::config::Config;
use crate::tui::theme::Theme;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::{browse, help, now_playing, player_full, queue, settings, sidebar, truncate_str};

/// Main layout structure:
/// ┌──────────┬─────────────────────────────────────────┐
/// │  Albums  │           Main Content                  │
/// │  Artists │     (browse stack / queue /             │
/// │  ...     │      settings / help)                   │
/// ├──────────┴─────────┬───────────────────────────────┤
/// │      Player        │            Lyrics             │
/// └────────────────────┴───────────────────────────────┘
///
/// The full-screen player replaces all of it.
pub fn render(frame: &mut Frame, cfg: &Config, theme: &Theme, state: &mut AppState) {
    let root = frame.area();

    if state.fullscreen {
        player_full::render(frame, theme, state, root);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),    // sidebar + content
            Constraint::Length(7), // player + lyrics
        ])
        .split(root);

    let top_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(40)])
        .split(rows[0]);

    let bottom_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);

    sidebar::render(frame, theme, state, top_cols[0]);
    render_main_content(frame, cfg, theme, state, top_cols[1]);
    now_playing::render(frame, theme, state, bottom_cols[0]);
    render_lyrics_section(frame, theme, state, bottom_cols[1]);
}

/// A few lines of lyrics around the current position.
fn render_lyrics_section(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;

    let title = match &state.lyrics {
        Some(l) => format!(" {} Lyrics · {} ", icons.lyrics, l.source.label()),
        None => format!(" {} Lyrics ", icons.lyrics),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border))
        .title(title)
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

    let lines = lyric_lines(theme, state, padded.width as usize, 1);
    let top_padding = (padded.height as usize).saturating_sub(lines.len()) / 2;
    let mut centered: Vec<Line> = vec![Line::default(); top_padding];
    centered.extend(lines);
    frame.render_widget(Paragraph::new(centered), padded);
}

/// Lyrics lines centred on the current one, `context` lines either side.
/// Unsynced lyrics have no current line and are shown from the top.
pub(crate) fn lyric_lines(
    theme: &Theme,
    state: &AppState,
    width: usize,
    context: usize,
) -> Vec<Line<'static>> {
    let muted = Style::default().fg(theme.palette.fg_secondary);
    let Some(lyrics) = state.lyrics.as_ref().filter(|l| !l.is_empty()) else {
        let msg = if state.lyrics_loading {
            "Loading..."
        } else if state.session.current().is_some() {
            "No lyrics available"
        } else {
            ""
        };
        return vec![Line::from(Span::styled(msg, muted)).alignment(Alignment::Center)];
    };

    let position_ms = (state.session.position() * 1000.0).max(0.0) as u64;
    let current = lyrics.current_line(position_ms);
    let anchor = current.unwrap_or(0);
    let (start, end) = if current.is_some() {
        (
            anchor.saturating_sub(context),
            (anchor + context + 1).min(lyrics.lines.len()),
        )
    } else {
        (0, (context * 2 + 1).min(lyrics.lines.len()))
    };

    let max_width = width.saturating_sub(2);
    (start..end)
        .map(|i| {
            let text = lyrics.lines[i].text.as_str();
            let style = if Some(i) == current {
                Style::default()
                    .fg(theme.palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                muted
            };
            Line::from(Span::styled(truncate_str(text, max_width), style))
                .alignment(Alignment::Center)
        })
        .collect()
}

fn render_main_content(
    frame: &mut Frame,
    cfg: &Config,
    theme: &Theme,
    state: &mut AppState,
    area: Rect,
) {
    let icons = &theme.icons;
    let screen = state.screen;

    let label = match screen {
        Screen::Albums => format!("Albums · {}", state.album_kind.label()),
        Screen::Help => "Keybinds".to_string(),
        s => s.title().to_string(),
    };
    let crumbs = state
        .stack(screen)
        .filter(|s| s.depth() > 1)
        .map(|s| s.path())
        .unwrap_or(label);
    let title = format!(" {} {} ", icons.screen(screen), crumbs);

    let main = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border))
        .title(title)
        .title_style(Style::default().fg(theme.palette.accent));
    let inner = main.inner(area);
    frame.render_widget(main, area);

    match screen {
        Screen::Search => {
            let sub = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(3)])
                .split(inner);
            browse::render_search_box(frame, theme, state, sub[0]);
            browse::render(frame, theme, state, sub[1]);
        }
        Screen::Queue => queue::render(frame, theme, state, inner),
        Screen::Settings => settings::render(frame, cfg, theme, state, inner),
        Screen::Help => help::render(frame, theme, inner),
        _ => browse::render(frame, theme, state, inner),
    }
}
