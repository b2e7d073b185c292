use crate::app::state::{AppState, Screen};
use crate::tui::theme::Theme;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

pub fn render(frame: &mut Frame, theme: &Theme, state: &AppState, area: Rect) {
    let icons = &theme.icons;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border))
        .title(" mice ")
        .title_style(Style::default().fg(theme.palette.accent));

    // Settings and Help sit apart from the browse screens.
    let mut rows: Vec<Option<Screen>> = Vec::with_capacity(state.sidebar_items.len() + 1);
    let mut separated = false;
    for screen in &state.sidebar_items {
        if !screen.is_hideable() && !separated {
            rows.push(None);
            separated = true;
        }
        rows.push(Some(*screen));
    }

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let Some(screen) = row else {
                return ListItem::new(Line::from(""));
            };
            let is_selected = *screen == state.screen;

            let style = if is_selected {
                Style::default()
                    .fg(theme.palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.palette.fg_primary)
            };
            let icon_style = if is_selected {
                Style::default().fg(theme.palette.accent)
            } else {
                Style::default().fg(theme.palette.fg_secondary)
            };
            let prefix = if is_selected { icons.selected } else { icons.unselected };

            let mut spans = vec![
                Span::styled(prefix, icon_style),
                Span::raw(" "),
                Span::styled(icons.screen(*screen), icon_style),
                Span::raw(" "),
                Span::styled(screen.title(), style),
            ];
            if *screen == Screen::Queue && !state.session.queue().is_empty() {
                spans.push(Span::styled(
                    format!(" {}", state.session.queue().len()),
                    Style::default().fg(theme.palette.fg_secondary),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(rows.iter().position(|r| *r == Some(state.screen)));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(theme.palette.bg_primary)
                .bg(theme.palette.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("");

    frame.render_stateful_widget(list, area, &mut list_state);
}
