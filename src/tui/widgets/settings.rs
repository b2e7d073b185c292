use crate::app::state::{AppState, ScrobbleOption, ServerStatus, SettingsFocus};
use crate::config::Config;
use crate::tui::theme::{THEME_NAMES, Theme};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

pub fn render(frame: &mut Frame, cfg: &Config, theme: &Theme, state: &AppState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3)])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),                               // Server
            Constraint::Length(THEME_NAMES.len() as u16 + 2),    // Theme
            Constraint::Min(4),                                  // Sidebar
        ])
        .split(cols[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(ScrobbleOption::ALL.len() as u16 + 2), // Scrobbling
            Constraint::Min(4),                                       // Audio
            Constraint::Length(6),                                    // Cache
        ])
        .split(cols[1]);

    render_server_section(frame, cfg, theme, state, left[0]);
    render_theme_section(frame, theme, state, left[1]);
    render_sidebar_section(frame, cfg, theme, state, left[2]);
    render_scrobble_section(frame, cfg, theme, state, right[0]);
    render_audio_section(frame, cfg, theme, state, right[1]);
    render_cache_section(frame, theme, state, right[2]);
    render_help(frame, theme, state, rows[1]);
}

fn section_block(theme: &Theme, state: &AppState, focus: SettingsFocus, icon: &str) -> Block<'static> {
    let border_color = if state.settings_focus == focus {
        theme.palette.accent
    } else {
        theme.palette.border
    };
    Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} {} ", icon, focus.label()))
        .title_style(Style::default().fg(theme.palette.accent))
}

fn highlight(theme: &Theme, focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(theme.palette.bg_primary)
            .bg(theme.palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.palette.fg_secondary)
    }
}

fn render_server_section(frame: &mut Frame, cfg: &Config, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;
    let block = section_block(theme, state, SettingsFocus::Server, icons.server);
    let muted = Style::default().fg(theme.palette.fg_secondary);

    let (status_icon, status_text, status_color) = match &state.server_status {
        ServerStatus::Connected => (icons.success, "Connected".to_string(), theme.palette.playing),
        ServerStatus::NotConfigured => (
            icons.error,
            "Not configured (run `mice login`)".to_string(),
            theme.palette.error,
        ),
        ServerStatus::Failed(e) => (icons.error, format!("Failed: {e}"), theme.palette.error),
        ServerStatus::Unknown => (icons.server, "Checking...".to_string(), theme.palette.fg_secondary),
    };

    let field = |label: &'static str, value: &str| {
        let value = if value.is_empty() { "-" } else { value };
        Line::from(vec![
            Span::styled(format!("{label:<8}"), muted),
            Span::styled(value.to_string(), Style::default().fg(theme.palette.fg_primary)),
        ])
    };

    let content = vec![
        Line::from(vec![
            Span::styled(format!("{:<8}", "Status"), muted),
            Span::styled(format!("{status_icon} {status_text}"), Style::default().fg(status_color)),
        ]),
        field("URL", &cfg.server.url),
        field("User", &cfg.server.username),
    ];
    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_theme_section(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;
    let focused = state.settings_focus == SettingsFocus::Theme;
    let block = section_block(theme, state, SettingsFocus::Theme, icons.settings);

    let items: Vec<ListItem> = THEME_NAMES
        .iter()
        .map(|name| {
            let current = *name == theme.name;
            let mark = if current { icons.selected } else { icons.unselected };
            let style = if current {
                Style::default().fg(theme.palette.playing).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.palette.fg_primary)
            };
            ListItem::new(Line::from(Span::styled(format!("{mark} {name}"), style)))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(state.theme_selected.min(THEME_NAMES.len() - 1)));
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight(theme, focused));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_sidebar_section(frame: &mut Frame, cfg: &Config, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;
    let focused = state.settings_focus == SettingsFocus::Sidebar;
    let block = section_block(theme, state, SettingsFocus::Sidebar, icons.queue);
    let ordered = cfg.sidebar.ordered();

    let items: Vec<ListItem> = ordered
        .iter()
        .map(|screen| {
            let hidden = cfg.sidebar.is_hidden(*screen);
            let mark = if hidden { icons.unchecked } else { icons.checked };
            let style = if hidden {
                Style::default().fg(theme.palette.fg_secondary)
            } else {
                Style::default().fg(theme.palette.fg_primary)
            };
            let pinned = if screen.is_hideable() { "" } else { " (always shown)" };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{mark} "), Style::default().fg(theme.palette.accent_alt)),
                Span::styled(format!("{} {}", icons.screen(*screen), screen.title()), style),
                Span::styled(pinned, Style::default().fg(theme.palette.fg_secondary)),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(state.sidebar_cursor.min(ordered.len().saturating_sub(1))));
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight(theme, focused));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_scrobble_section(frame: &mut Frame, cfg: &Config, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;
    let focused = state.settings_focus == SettingsFocus::Scrobble;
    let block = section_block(theme, state, SettingsFocus::Scrobble, icons.history);
    let lastfm = &cfg.scrobble.lastfm;

    let toggle = |on: bool| if on { icons.checked } else { icons.unchecked };
    let items: Vec<ListItem> = ScrobbleOption::ALL
        .iter()
        .map(|opt| {
            let text = match opt {
                ScrobbleOption::Server => {
                    format!("{} Scrobble to server", toggle(cfg.scrobble.enabled))
                }
                ScrobbleOption::Lastfm => {
                    let detail = match (&lastfm.username, lastfm.is_ready()) {
                        (Some(user), true) => format!(" ({user})"),
                        _ if lastfm.enabled => " (not logged in)".to_string(),
                        _ => String::new(),
                    };
                    format!("{} Last.fm{detail}", toggle(lastfm.enabled))
                }
                ScrobbleOption::Threshold => {
                    format!("  Scrobble after {}% played", cfg.scrobble.threshold_percent)
                }
            };
            ListItem::new(Line::from(Span::styled(
                text,
                Style::default().fg(theme.palette.fg_primary),
            )))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(state.scrobble_cursor.min(ScrobbleOption::ALL.len() - 1)));
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight(theme, focused));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_audio_section(frame: &mut Frame, cfg: &Config, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;
    let focused = state.settings_focus == SettingsFocus::Audio;
    let block = section_block(theme, state, SettingsFocus::Audio, icons.volume_high);

    if !state.audio_loaded {
        let loading = Paragraph::new("Loading audio devices... (r to retry)")
            .style(Style::default().fg(theme.palette.fg_secondary))
            .block(block);
        frame.render_widget(loading, area);
        return;
    }

    let current = cfg.player.audio_device.as_deref().unwrap_or("auto");
    let items: Vec<ListItem> = state
        .audio_devices
        .iter()
        .map(|d| {
            let is_current = d.name == current;
            let style = if is_current {
                Style::default().fg(theme.palette.playing).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.palette.fg_primary)
            };
            let mark = if is_current { icons.selected } else { icons.unselected };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{mark} {}", d.description), style),
                Span::styled(
                    format!("  {}", d.name),
                    Style::default().fg(theme.palette.fg_secondary),
                ),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(state.audio_selected.min(items.len().saturating_sub(1))));
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight(theme, focused));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_cache_section(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;
    let block = section_block(theme, state, SettingsFocus::Cache, icons.cache);
    let muted = Style::default().fg(theme.palette.fg_secondary);
    let value = Style::default().fg(theme.palette.fg_primary);

    let mut content = Vec::new();
    match state.cache_stats {
        Some(stats) => {
            let rate = stats
                .hit_rate()
                .map(|r| format!("{r:.0}%"))
                .unwrap_or_else(|| "-".to_string());
            content.push(Line::from(vec![
                Span::styled("Responses ", muted),
                Span::styled(format!("{}/{}", stats.entries, stats.capacity), value),
                Span::styled("  hit rate ", muted),
                Span::styled(rate, value),
            ]));
            content.push(Line::from(vec![
                Span::styled("Evicted ", muted),
                Span::styled(stats.evictions.to_string(), value),
                Span::styled("  expired ", muted),
                Span::styled(stats.expired.to_string(), value),
                Span::styled(format!("  ttl {}s", stats.ttl.as_secs()), muted),
            ]));
        }
        None => content.push(Line::from(Span::styled("Responses: not connected", muted))),
    }
    content.push(Line::from(vec![
        Span::styled("Database ", muted),
        Span::styled(format_size(state.db_size_bytes), value),
    ]));
    content.push(Line::from(Span::styled("c clears cached responses and lyrics", muted)));

    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_help(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border));

    let key = Style::default().fg(theme.palette.accent_alt);
    let text = Style::default().fg(theme.palette.fg_secondary);
    let mut spans = vec![
        Span::styled("Tab", key),
        Span::styled(" section  ", text),
        Span::styled("j/k", key),
        Span::styled(" navigate  ", text),
        Span::styled("Enter", key),
        Span::styled(" apply  ", text),
    ];
    match state.settings_focus {
        SettingsFocus::Sidebar => {
            spans.push(Span::styled("K/J", key));
            spans.push(Span::styled(" reorder  ", text));
        }
        SettingsFocus::Cache => {
            spans.push(Span::styled("c", key));
            spans.push(Span::styled(" clear  ", text));
        }
        _ => {}
    }
    spans.push(Span::styled(
        format!("[{}]", state.settings_focus.label()),
        Style::default().fg(theme.palette.playing),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::format_size;

    #[test]
    fn sizes_pick_the_largest_whole_unit() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
