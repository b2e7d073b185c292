//! Browse list widget - albums, artists, playlists and songs with virtual scrolling

use crate::app::state::{AppState, Item, Screen, SearchFocus};
use crate::tui::theme::{LoadingSpinner, Theme};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::{format_time, truncate_str};

pub fn render_search_box(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let is_focused = state.search_focus == SearchFocus::Input;
    let border_color = if is_focused {
        theme.palette.accent
    } else {
        theme.palette.border
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(border_color))
        .title(" Query ")
        .title_style(Style::default().fg(theme.palette.accent));

    let prompt = if state.search.current().loading {
        format!("{} {}", state.search_query, LoadingSpinner::frame(state.tick))
    } else {
        let cursor = if is_focused { "▏" } else { "" };
        format!("{}{}", state.search_query, cursor)
    };

    let p = Paragraph::new(Line::from(prompt))
        .style(Style::default().fg(theme.palette.fg_primary))
        .block(block);
    frame.render_widget(p, area);
}

pub fn render(frame: &mut Frame, theme: &Theme, state: &mut AppState, area: Rect) {
    let screen = state.screen;
    let tick = state.tick;
    let playing_id = state.session.current().map(|s| s.id.clone());
    let query = (screen == Screen::Search && !state.search_query.trim().is_empty())
        .then(|| state.search_query.to_lowercase());

    let Some(view) = state.active_view_mut() else {
        return;
    };

    if view.loading && view.items.is_empty() {
        let loading = Paragraph::new(Line::from(format!(
            "{} Loading...",
            LoadingSpinner::frame(tick)
        )))
        .style(Style::default().fg(theme.palette.fg_secondary));
        frame.render_widget(loading, area);
        return;
    }

    if view.items.is_empty() {
        let empty_msg = match screen {
            _ if !view.loaded => "Nothing loaded yet (r to refresh)",
            Screen::History => "No history yet. Play some music!",
            Screen::Search => "Search for music above",
            Screen::Starred => "Nothing starred yet (f stars the selection)",
            _ => "No items",
        };
        let empty = Paragraph::new(Line::from(empty_msg))
            .style(Style::default().fg(theme.palette.fg_secondary));
        frame.render_widget(empty, area);
        return;
    }

    let visible_height = area.height as usize;
    view.update_scroll(visible_height);
    let scroll_offset = view.scroll_offset;
    let max_width = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = view
        .items
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height)
        .map(|(i, item)| {
            let is_selected = i == view.selected;
            let is_playing = item
                .song()
                .is_some_and(|s| playing_id.as_deref() == Some(s.id.as_str()));
            ListItem::new(item_line(theme, item, is_selected, is_playing, query.as_deref(), max_width))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(view.selected.saturating_sub(scroll_offset)));

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(theme.palette.bg_highlight)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("\u{f054} "); // nf-fa-chevron_right

    frame.render_stateful_widget(list, area, &mut list_state);

    // Scroll position indicator in the top-right corner
    if view.items.len() > visible_height {
        let pos_text = format!("{}/{}", view.selected + 1, view.items.len());
        let pos_len = pos_text.len() as u16;
        let pos_x = area.x + area.width.saturating_sub(pos_len);
        if pos_x > area.x {
            frame.render_widget(
                Paragraph::new(pos_text).style(Style::default().fg(theme.palette.fg_secondary)),
                Rect::new(pos_x, area.y, pos_len, 1),
            );
        }
    }
}

fn item_line(
    theme: &Theme,
    item: &Item,
    is_selected: bool,
    is_playing: bool,
    query: Option<&str>,
    max_width: usize,
) -> Line<'static> {
    let icons = &theme.icons;
    let title_style = if is_playing {
        Style::default()
            .fg(theme.palette.playing)
            .add_modifier(Modifier::BOLD)
    } else if is_selected {
        Style::default()
            .fg(theme.palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.palette.fg_primary)
    };
    let muted = Style::default().fg(theme.palette.fg_secondary);

    let icon = match item {
        _ if is_playing => icons.play,
        Item::Album(_) => icons.album,
        Item::Artist(_) => icons.artist,
        Item::Playlist(_) => icons.playlist,
        Item::Song(_) => icons.music,
    };
    let star = if item.is_starred() { icons.star } else { " " };

    let subtitle = item.subtitle();
    let duration = match item {
        Item::Song(s) => s.duration.map(|d| format_time(f64::from(d))),
        Item::Album(a) => a.duration.map(|d| format_time(f64::from(d))),
        _ => None,
    };

    let fixed = 4 + duration.as_ref().map_or(0, |d| d.chars().count() + 2);
    let title_budget = max_width.saturating_sub(fixed);
    let title = truncate_str(item.title(), title_budget);
    let sub_budget = title_budget.saturating_sub(title.chars().count() + 3);

    let mut spans = vec![
        Span::styled(format!("{icon} "), muted),
        Span::styled(format!("{star} "), Style::default().fg(theme.palette.accent_alt)),
    ];
    match query {
        Some(q) => spans.extend(highlight_text(&title, q, title_style, theme)),
        None => spans.push(Span::styled(title, title_style)),
    }
    if !subtitle.is_empty() && sub_budget > 3 {
        spans.push(Span::styled(
            format!(" · {}", truncate_str(&subtitle, sub_budget)),
            muted,
        ));
    }
    if let Some(d) = duration {
        spans.push(Span::styled(format!("  {d}"), muted));
    }
    Line::from(spans)
}

/// Highlight each query word where it occurs in `text`.
fn highlight_text(text: &str, query: &str, base_style: Style, theme: &Theme) -> Vec<Span<'static>> {
    let highlight_style = base_style.bg(theme.palette.bg_highlight);
    let lower_text = text.to_lowercase();
    // Lowercasing can change byte lengths; fall back to no highlight then.
    if lower_text.len() != text.len() {
        return vec![Span::styled(text.to_string(), base_style)];
    }

    let mut matches: Vec<(usize, usize)> = Vec::new();
    for word in query.split_whitespace() {
        let mut search_start = 0;
        while let Some(start) = lower_text[search_start..].find(word) {
            let abs_start = search_start + start;
            let abs_end = abs_start + word.len();
            matches.push((abs_start, abs_end));
            search_start = abs_end;
        }
    }
    matches.sort_unstable();

    let mut spans = Vec::new();
    let mut last_end = 0;
    for (start, end) in matches {
        if start < last_end {
            continue;
        }
        if start > last_end {
            spans.push(Span::styled(text[last_end..start].to_string(), base_style));
        }
        spans.push(Span::styled(text[start..end].to_string(), highlight_style));
        last_end = end;
    }
    if last_end < text.len() {
        spans.push(Span::styled(text[last_end..].to_string(), base_style));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::theme::get_theme;

    fn text_of(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn highlight_keeps_text_and_marks_every_word() {
        let theme = get_theme("mono");
        let base = Style::default();
        let spans = highlight_text("Blue in Green", "green blue", base, &theme);
        assert_eq!(text_of(&spans), "Blue in Green");
        let marked: Vec<_> = spans
            .iter()
            .filter(|s| s.style.bg == Some(theme.palette.bg_highlight))
            .map(|s| s.content.to_string())
            .collect();
        assert_eq!(marked, ["Blue", "Green"]);
    }

    #[test]
    fn highlight_without_match_is_one_span() {
        let theme = get_theme("mono");
        let spans = highlight_text("So What", "freddie", Style::default(), &theme);
        assert_eq!(spans.len(), 1);
    }
}
