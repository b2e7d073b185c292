//! Help screen listing the keybindings

use crate::tui::theme::Theme;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

const NAVIGATION: &[(&str, &str)] = &[
    ("j / Down", "Move down"),
    ("k / Up", "Move up"),
    ("g / G", "Top / bottom"),
    ("Ctrl+d / u", "Page down / up"),
    ("h / l", "Sidebar up / down"),
    ("Tab", "Next screen"),
    ("1-9", "Jump to sidebar entry"),
    ("Enter", "Open or play"),
    ("Esc", "Back"),
    ("/", "Search"),
    ("Q", "Queue"),
];

const PLAYBACK: &[(&str, &str)] = &[
    ("Space", "Play / pause"),
    ("N / P", "Next / previous"),
    ("] / [", "Seek 10s"),
    ("+ / -", "Volume"),
    ("s", "Shuffle"),
    ("R", "Repeat off / all / one"),
    ("F", "Full-screen player"),
];

const LIBRARY: &[(&str, &str)] = &[
    ("a", "Add to queue"),
    ("n", "Play next"),
    ("f", "Star / unstar"),
    ("t", "Cycle album list"),
    ("x", "Random mix"),
    ("r", "Refresh"),
];

const QUEUE: &[(&str, &str)] = &[
    ("Enter", "Play selected"),
    ("d", "Remove"),
    ("K / J", "Move up / down"),
    ("c", "Clear"),
];

const GENERAL: &[(&str, &str)] = &[
    ("q", "Quit"),
    ("Ctrl+r", "Reload"),
    ("? / F1", "This help"),
];

pub fn render(frame: &mut Frame, theme: &Theme, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut left = section("Navigation", NAVIGATION, theme);
    left.push(Line::default());
    left.extend(section("Playback", PLAYBACK, theme));

    let mut right = section("Library", LIBRARY, theme);
    right.push(Line::default());
    right.extend(section("Queue", QUEUE, theme));
    right.push(Line::default());
    right.extend(section("General", GENERAL, theme));

    frame.render_widget(Paragraph::new(left).wrap(Wrap { trim: false }), cols[0]);
    frame.render_widget(Paragraph::new(right).wrap(Wrap { trim: false }), cols[1]);
}

fn section(title: &str, binds: &[(&str, &str)], theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("━━ {title} ━━"),
        Style::default()
            .fg(theme.palette.accent)
            .add_modifier(Modifier::BOLD),
    ))];
    lines.extend(binds.iter().map(|(key, desc)| {
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                format!("{key:12}"),
                Style::default()
                    .fg(theme.palette.accent_alt)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(desc.to_string(), Style::default().fg(theme.palette.fg_primary)),
        ])
    }));
    lines
}
