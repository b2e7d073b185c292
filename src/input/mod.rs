use crate::app::actions::Action;
use crate::app::events::{Event, InputEvent};
use crate::app::state::{AppState, Screen, SearchFocus, SettingsFocus};
use crossterm::event::{
    self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};
use tokio::sync::mpsc;

pub fn spawn_input_task(tx: mpsc::Sender<Event>, mouse_enabled: bool) {
    tokio::task::spawn_blocking(move || {
        loop {
            if !event::poll(std::time::Duration::from_millis(250)).unwrap_or(false) {
                continue;
            }
            let ev = match event::read() {
                Ok(CtEvent::Key(k)) if k.kind == KeyEventKind::Press => InputEvent::Key(k),
                Ok(CtEvent::Mouse(m)) if mouse_enabled => InputEvent::Mouse(m),
                Ok(CtEvent::Resize(_, _)) => InputEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "terminal read failed");
                    continue;
                }
            };
            if tx.blocking_send(Event::Input(ev)).is_err() {
                break;
            }
        }
    });
}

pub fn map_input_to_action(state: &AppState, ev: InputEvent) -> Option<Action> {
    match ev {
        InputEvent::Resize => Some(Action::Resize),
        InputEvent::Mouse(m) => match m.kind {
            MouseEventKind::ScrollUp => Some(Action::ListUp),
            MouseEventKind::ScrollDown => Some(Action::ListDown),
            _ => None,
        },
        InputEvent::Key(k) => handle_key(state, k),
    }
}

fn handle_key(state: &AppState, k: KeyEvent) -> Option<Action> {
    if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    if state.fullscreen {
        return match k.code {
            KeyCode::Esc | KeyCode::Char('F') => Some(Action::ToggleFullscreen),
            _ => handle_global(state, k),
        };
    }

    match state.screen {
        Screen::Search if state.search_focus == SearchFocus::Input => handle_search_input(state, k),
        Screen::Queue => handle_queue_screen(state, k).or_else(|| handle_global(state, k)),
        Screen::Settings => handle_settings_screen(state, k).or_else(|| handle_global(state, k)),
        Screen::Help => handle_global(state, k),
        _ => handle_browse_screen(state, k).or_else(|| handle_global(state, k)),
    }
}

/// Keys that mean the same thing on every screen.
fn handle_global(state: &AppState, k: KeyEvent) -> Option<Action> {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Char('q') => Some(Action::Quit),

        // Navigation - vim style
        KeyCode::Up | KeyCode::Char('k') => Some(Action::ListUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::ListDown),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::GoTop),
        KeyCode::Char('G') | KeyCode::End => Some(Action::GoBottom),
        KeyCode::Char('d') if ctrl => Some(Action::PageDown),
        KeyCode::Char('u') if ctrl => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),

        KeyCode::Left | KeyCode::Char('h') => Some(Action::SidebarUp),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::SidebarDown),
        KeyCode::Tab => Some(Action::NextScreen),
        KeyCode::BackTab => Some(Action::PrevScreen),
        KeyCode::Char(c @ '1'..='9') => {
            let idx = c.to_digit(10)? as usize - 1;
            state.sidebar_items.get(idx).copied().map(Action::SetScreen)
        }
        KeyCode::Char('/') => Some(Action::SetScreen(Screen::Search)),
        KeyCode::Char('Q') => Some(Action::SetScreen(Screen::Queue)),
        KeyCode::Char('?') | KeyCode::F(1) => Some(Action::SetScreen(Screen::Help)),

        // Playback
        KeyCode::Char(' ') => Some(Action::TogglePause),
        KeyCode::Char('N') => Some(Action::PlayNext),
        KeyCode::Char('P') => Some(Action::PlayPrev),
        KeyCode::Char('=') | KeyCode::Char('+') => Some(Action::VolumeUp),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(Action::VolumeDown),
        KeyCode::Char(']') => Some(Action::SeekForward),
        KeyCode::Char('[') => Some(Action::SeekBack),
        KeyCode::Char('s') => Some(Action::ToggleShuffle),
        KeyCode::Char('R') => Some(Action::CycleRepeat),
        KeyCode::Char('F') => Some(Action::ToggleFullscreen),

        KeyCode::Char('r') if ctrl => Some(Action::Refresh),
        KeyCode::F(5) => Some(Action::Refresh),
        _ => None,
    }
}

/// Albums, Artists, Playlists, Starred, History and search results.
fn handle_browse_screen(state: &AppState, k: KeyEvent) -> Option<Action> {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Enter => Some(Action::Activate),
        KeyCode::Esc | KeyCode::Backspace => {
            let depth = state.stack(state.screen).map_or(1, |s| s.depth());
            if depth > 1 {
                Some(Action::Back)
            } else if state.screen == Screen::Search {
                Some(Action::SetSearchFocus(SearchFocus::Input))
            } else {
                None
            }
        }
        KeyCode::Char('i') | KeyCode::Char('/') if state.screen == Screen::Search => {
            Some(Action::SetSearchFocus(SearchFocus::Input))
        }
        KeyCode::Char('a') => Some(Action::Enqueue),
        KeyCode::Char('n') => Some(Action::EnqueueNext),
        KeyCode::Char('f') => Some(Action::ToggleStar),
        KeyCode::Char('t') if state.screen == Screen::Albums => Some(Action::CycleAlbumKind),
        KeyCode::Char('x') => Some(Action::PlayRandom),
        KeyCode::Char('r') if !ctrl => Some(Action::Refresh),
        _ => None,
    }
}

fn handle_search_input(state: &AppState, k: KeyEvent) -> Option<Action> {
    match k.code {
        KeyCode::Esc => {
            if state.search.current().items.is_empty() {
                Some(Action::SetScreen(state.neighbour_screen(false)))
            } else {
                Some(Action::SetSearchFocus(SearchFocus::Results))
            }
        }
        KeyCode::Tab => Some(Action::NextScreen),
        KeyCode::BackTab => Some(Action::PrevScreen),
        KeyCode::Enter => Some(Action::StartSearch),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Down if !state.search.current().items.is_empty() => {
            Some(Action::SetSearchFocus(SearchFocus::Results))
        }
        KeyCode::Char('u') if k.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::ClearInput)
        }
        KeyCode::Char(c) => Some(Action::InputChar(c)),
        _ => None,
    }
}

fn handle_queue_screen(state: &AppState, k: KeyEvent) -> Option<Action> {
    if state.session.queue().is_empty() {
        return None;
    }
    let selected = state.queue_selected;
    match k.code {
        KeyCode::Enter => Some(Action::QueuePlayIndex(selected)),
        KeyCode::Char('d') if !k.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::QueueRemove(selected))
        }
        KeyCode::Delete => Some(Action::QueueRemove(selected)),
        KeyCode::Char('c') => Some(Action::QueueClear),
        KeyCode::Char('K') => Some(Action::QueueMoveUp),
        KeyCode::Char('J') => Some(Action::QueueMoveDown),
        _ => None,
    }
}

fn handle_settings_screen(state: &AppState, k: KeyEvent) -> Option<Action> {
    match k.code {
        // Tab moves between sections instead of screens here.
        KeyCode::Tab => Some(Action::SettingsFocusNext),
        KeyCode::BackTab => Some(Action::SettingsFocusPrev),
        KeyCode::Enter | KeyCode::Char(' ') if state.settings_focus != SettingsFocus::Server => {
            Some(Action::SettingsApply)
        }
        KeyCode::Char('K') if state.settings_focus == SettingsFocus::Sidebar => {
            Some(Action::SidebarMove(true))
        }
        KeyCode::Char('J') if state.settings_focus == SettingsFocus::Sidebar => {
            Some(Action::SidebarMove(false))
        }
        KeyCode::Char('c') if state.settings_focus == SettingsFocus::Cache => {
            Some(Action::ClearCache)
        }
        KeyCode::Char('r') => Some(Action::Refresh),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::{Item, ListView, ViewKind};
    use crate::playback::Session;
    use crate::queue::tests::make_song;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ch(c: char) -> InputEvent {
        key(KeyCode::Char(c))
    }

    fn state_on(screen: Screen) -> AppState {
        let mut s = AppState::new(Session::new(50, 50));
        s.set_screen(screen);
        s
    }

    #[test]
    fn browse_keys() {
        let s = state_on(Screen::Albums);
        assert_eq!(map_input_to_action(&s, key(KeyCode::Enter)), Some(Action::Activate));
        assert_eq!(map_input_to_action(&s, ch('a')), Some(Action::Enqueue));
        assert_eq!(map_input_to_action(&s, ch('n')), Some(Action::EnqueueNext));
        assert_eq!(map_input_to_action(&s, ch('f')), Some(Action::ToggleStar));
        assert_eq!(map_input_to_action(&s, ch('t')), Some(Action::CycleAlbumKind));
        assert_eq!(map_input_to_action(&s, ch('N')), Some(Action::PlayNext));
        assert_eq!(map_input_to_action(&s, ch('P')), Some(Action::PlayPrev));
        assert_eq!(map_input_to_action(&s, ch(' ')), Some(Action::TogglePause));
        assert_eq!(map_input_to_action(&s, ch('F')), Some(Action::ToggleFullscreen));
        // Nothing to pop at the root.
        assert_eq!(map_input_to_action(&s, key(KeyCode::Esc)), None);

        let s = state_on(Screen::Artists);
        assert_eq!(map_input_to_action(&s, ch('t')), None);
    }

    #[test]
    fn escape_pops_a_drill_down() {
        let mut s = state_on(Screen::Artists);
        s.artists
            .push(ListView::new(ViewKind::Artist("a".into()), "Band"));
        assert_eq!(map_input_to_action(&s, key(KeyCode::Esc)), Some(Action::Back));
        assert_eq!(map_input_to_action(&s, key(KeyCode::Backspace)), Some(Action::Back));
    }

    #[test]
    fn search_input_captures_letters() {
        let mut s = state_on(Screen::Search);
        assert_eq!(map_input_to_action(&s, ch('q')), Some(Action::InputChar('q')));
        assert_eq!(map_input_to_action(&s, ch('N')), Some(Action::InputChar('N')));
        assert_eq!(map_input_to_action(&s, key(KeyCode::Enter)), Some(Action::StartSearch));
        assert_eq!(map_input_to_action(&s, key(KeyCode::Down)), None);

        s.search
            .current_mut()
            .set_items(vec![Item::Song(make_song("1"))]);
        assert_eq!(
            map_input_to_action(&s, key(KeyCode::Down)),
            Some(Action::SetSearchFocus(SearchFocus::Results))
        );

        s.search_focus = SearchFocus::Results;
        assert_eq!(map_input_to_action(&s, ch('q')), Some(Action::Quit));
        assert_eq!(map_input_to_action(&s, ch('a')), Some(Action::Enqueue));
        assert_eq!(
            map_input_to_action(&s, key(KeyCode::Esc)),
            Some(Action::SetSearchFocus(SearchFocus::Input))
        );
    }

    #[test]
    fn queue_keys_act_on_the_selection() {
        let mut s = state_on(Screen::Queue);
        assert_eq!(map_input_to_action(&s, ch('c')), None);

        s.session.enqueue(vec![make_song("1"), make_song("2")]);
        s.queue_selected = 1;
        assert_eq!(map_input_to_action(&s, ch('d')), Some(Action::QueueRemove(1)));
        assert_eq!(map_input_to_action(&s, key(KeyCode::Enter)), Some(Action::QueuePlayIndex(1)));
        assert_eq!(map_input_to_action(&s, ch('c')), Some(Action::QueueClear));
        assert_eq!(map_input_to_action(&s, ch('K')), Some(Action::QueueMoveUp));
        assert_eq!(map_input_to_action(&s, ch('J')), Some(Action::QueueMoveDown));
        assert_eq!(
            map_input_to_action(&s, InputEvent::Key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL))),
            Some(Action::PageDown)
        );
    }

    #[test]
    fn settings_tab_cycles_sections() {
        let mut s = state_on(Screen::Settings);
        assert_eq!(map_input_to_action(&s, key(KeyCode::Tab)), Some(Action::SettingsFocusNext));
        assert_eq!(map_input_to_action(&s, key(KeyCode::Enter)), None);
        assert_eq!(map_input_to_action(&s, ch('K')), None);

        s.settings_focus = SettingsFocus::Sidebar;
        assert_eq!(map_input_to_action(&s, key(KeyCode::Enter)), Some(Action::SettingsApply));
        assert_eq!(map_input_to_action(&s, ch('K')), Some(Action::SidebarMove(true)));
    }

    #[test]
    fn digits_follow_the_sidebar_order() {
        let mut s = state_on(Screen::Albums);
        s.set_sidebar(vec![Screen::Queue, Screen::Albums, Screen::Settings, Screen::Help]);
        assert_eq!(map_input_to_action(&s, ch('1')), Some(Action::SetScreen(Screen::Queue)));
        assert_eq!(map_input_to_action(&s, ch('9')), None);
    }

    #[test]
    fn fullscreen_escape_closes_it() {
        let mut s = state_on(Screen::Albums);
        s.fullscreen = true;
        assert_eq!(map_input_to_action(&s, key(KeyCode::Esc)), Some(Action::ToggleFullscreen));
        assert_eq!(map_input_to_action(&s, ch(']')), Some(Action::SeekForward));
        assert_eq!(map_input_to_action(&s, key(KeyCode::Enter)), None);
    }
}
