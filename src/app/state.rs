use crate::cache::CacheStats;
use crate::lyrics::ParsedLyrics;
use crate::playback::Session;
use crate::player::AudioDevice;
use crate::subsonic::models::{Album, AlbumListKind, Artist, Playlist, Song, StarTarget};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Albums,
    Artists,
    Playlists,
    Starred,
    Search,
    Queue,
    History,
    Settings,
    Help,
}

impl Screen {
    /// Default sidebar order.
    pub const ALL: [Screen; 9] = [
        Screen::Albums,
        Screen::Artists,
        Screen::Playlists,
        Screen::Starred,
        Screen::Search,
        Screen::Queue,
        Screen::History,
        Screen::Settings,
        Screen::Help,
    ];

    pub fn is_hideable(self) -> bool {
        !matches!(self, Screen::Settings | Screen::Help)
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Albums => "Albums",
            Screen::Artists => "Artists",
            Screen::Playlists => "Playlists",
            Screen::Starred => "Starred",
            Screen::Search => "Search",
            Screen::Queue => "Queue",
            Screen::History => "History",
            Screen::Settings => "Settings",
            Screen::Help => "Help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFocus {
    Input,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsFocus {
    #[default]
    Server,
    Theme,
    Sidebar,
    Scrobble,
    Audio,
    Cache,
}

impl SettingsFocus {
    const ORDER: [SettingsFocus; 6] = [
        SettingsFocus::Server,
        SettingsFocus::Theme,
        SettingsFocus::Sidebar,
        SettingsFocus::Scrobble,
        SettingsFocus::Audio,
        SettingsFocus::Cache,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingsFocus::Server => "Server",
            SettingsFocus::Theme => "Theme",
            SettingsFocus::Sidebar => "Sidebar",
            SettingsFocus::Scrobble => "Scrobbling",
            SettingsFocus::Audio => "Audio",
            SettingsFocus::Cache => "Cache",
        }
    }
}

/// Rows of the scrobbling section, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrobbleOption {
    Server,
    Lastfm,
    Threshold,
}

impl ScrobbleOption {
    pub const ALL: [ScrobbleOption; 3] = [
        ScrobbleOption::Server,
        ScrobbleOption::Lastfm,
        ScrobbleOption::Threshold,
    ];
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub created_at: std::time::Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
            created_at: std::time::Instant::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
            created_at: std::time::Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > std::time::Duration::from_secs(3)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ServerStatus {
    #[default]
    Unknown,
    NotConfigured,
    Connected,
    Failed(String),
}

/// One row of a browse list.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Album(Album),
    Artist(Artist),
    Playlist(Playlist),
    Song(Song),
}

impl Item {
    pub fn title(&self) -> &str {
        match self {
            Item::Album(a) => &a.name,
            Item::Artist(a) => &a.name,
            Item::Playlist(p) => &p.name,
            Item::Song(s) => &s.title,
        }
    }

    pub fn subtitle(&self) -> String {
        match self {
            Item::Album(a) => {
                let artist = a.artist.as_deref().unwrap_or("");
                match a.year {
                    Some(y) if !artist.is_empty() => format!("{artist} ({y})"),
                    Some(y) => y.to_string(),
                    None => artist.to_string(),
                }
            }
            Item::Artist(a) => match a.album_count {
                Some(1) => "1 album".into(),
                Some(n) => format!("{n} albums"),
                None => String::new(),
            },
            Item::Playlist(p) => match p.song_count {
                Some(n) => format!("{n} songs"),
                None => String::new(),
            },
            Item::Song(s) => s.artist_name().to_string(),
        }
    }

    pub fn song(&self) -> Option<&Song> {
        match self {
            Item::Song(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_starred(&self) -> bool {
        match self {
            Item::Album(a) => a.starred.is_some(),
            Item::Artist(a) => a.starred.is_some(),
            Item::Song(s) => s.is_starred(),
            Item::Playlist(_) => false,
        }
    }

    pub fn star_target(&self) -> Option<StarTarget> {
        match self {
            Item::Album(a) => Some(StarTarget::Album(a.id.clone())),
            Item::Artist(a) => Some(StarTarget::Artist(a.id.clone())),
            Item::Song(s) => Some(StarTarget::Song(s.id.clone())),
            Item::Playlist(_) => None,
        }
    }

    /// Apply a star/unstar that the server accepted.
    pub fn set_starred(&mut self, starred: bool) {
        let value = starred.then(|| "now".to_string());
        match self {
            Item::Album(a) => a.starred = value,
            Item::Artist(a) => a.starred = value,
            Item::Song(s) => s.starred = value,
            Item::Playlist(_) => {}
        }
    }

    fn matches(&self, target: &StarTarget) -> bool {
        match (self, target) {
            (Item::Album(a), StarTarget::Album(id)) => a.id == *id,
            (Item::Artist(a), StarTarget::Artist(id)) => a.id == *id,
            (Item::Song(s), StarTarget::Song(id)) => s.id == *id,
            _ => false,
        }
    }
}

/// What a browse view shows, so it can be reloaded.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewKind {
    AlbumList(AlbumListKind),
    Album(String),
    Artists,
    Artist(String),
    Playlists,
    Playlist(String),
    Starred,
    Search(String),
    History,
}

#[derive(Debug, Clone)]
pub struct ListView {
    pub kind: ViewKind,
    pub title: String,
    pub items: Vec<Item>,
    pub selected: usize,
    pub scroll_offset: usize,
    pub loading: bool,
    pub loaded: bool,
}

impl ListView {
    pub fn new(kind: ViewKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            items: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            loading: false,
            loaded: false,
        }
    }

    pub fn set_items(&mut self, items: Vec<Item>) {
        self.items = items;
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
        self.loading = false;
        self.loaded = true;
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.items.get(self.selected)
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1).min(self.items.len() - 1);
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    pub fn page(&mut self, down: bool, amount: usize) {
        if down {
            self.selected = (self.selected + amount).min(self.items.len().saturating_sub(1));
        } else {
            self.selected = self.selected.saturating_sub(amount);
        }
    }

    /// Songs in this view; playing one queues them all.
    pub fn songs(&self) -> Vec<Song> {
        self.items.iter().filter_map(|i| i.song().cloned()).collect()
    }

    /// Position of the selected song within `songs()`.
    pub fn selected_song_index(&self) -> Option<usize> {
        self.selected_item()?.song()?;
        Some(
            self.items[..self.selected]
                .iter()
                .filter(|i| i.song().is_some())
                .count(),
        )
    }

    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected - visible_height + 1;
        }
    }
}

/// Drill-down navigation for one screen. The root view is never popped.
#[derive(Debug, Clone)]
pub struct BrowseStack {
    views: Vec<ListView>,
}

impl BrowseStack {
    pub fn new(root: ListView) -> Self {
        Self { views: vec![root] }
    }

    pub fn current(&self) -> &ListView {
        // Invariant: never empty.
        &self.views[self.views.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut ListView {
        let last = self.views.len() - 1;
        &mut self.views[last]
    }

    pub fn root_mut(&mut self) -> &mut ListView {
        &mut self.views[0]
    }

    pub fn push(&mut self, view: ListView) {
        self.views.push(view);
    }

    pub fn pop(&mut self) -> bool {
        if self.views.len() > 1 {
            self.views.pop();
            true
        } else {
            false
        }
    }

    pub fn depth(&self) -> usize {
        self.views.len()
    }

    /// Breadcrumb of view titles.
    pub fn path(&self) -> String {
        self.views
            .iter()
            .map(|v| v.title.as_str())
            .collect::<Vec<_>>()
            .join(" › ")
    }

    /// The view a response for `kind` should land in.
    pub fn find_mut(&mut self, kind: &ViewKind) -> Option<&mut ListView> {
        self.views.iter_mut().rev().find(|v| v.kind == *kind)
    }

    pub fn apply_star(&mut self, target: &StarTarget, starred: bool) {
        for view in &mut self.views {
            for item in view.items.iter_mut().filter(|i| i.matches(target)) {
                item.set_starred(starred);
            }
        }
    }

    pub fn stop_loading(&mut self) {
        for view in &mut self.views {
            view.loading = false;
        }
    }
}

pub struct AppState {
    pub should_quit: bool,
    pub tick: u64,

    pub screen: Screen,
    /// Visible sidebar entries, in configured order.
    pub sidebar_items: Vec<Screen>,
    pub sidebar_selected: usize,

    pub albums: BrowseStack,
    pub album_kind: AlbumListKind,
    pub artists: BrowseStack,
    pub playlists: BrowseStack,
    pub starred: BrowseStack,
    pub search: BrowseStack,
    pub history: BrowseStack,

    pub search_query: String,
    pub search_focus: SearchFocus,

    pub session: Session,
    pub queue_selected: usize,
    pub queue_scroll: usize,
    pub fullscreen: bool,

    pub lyrics: Option<ParsedLyrics>,
    pub lyrics_song_id: Option<String>,
    pub lyrics_loading: bool,

    pub server_status: ServerStatus,
    pub settings_focus: SettingsFocus,
    pub theme_selected: usize,
    pub sidebar_cursor: usize,
    pub scrobble_cursor: usize,
    pub audio_devices: Vec<AudioDevice>,
    pub audio_selected: usize,
    pub audio_loaded: bool,
    pub cache_stats: Option<CacheStats>,
    pub db_size_bytes: u64,

    pub toast: Option<Toast>,
    pub status: String,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        let album_kind = AlbumListKind::Newest;
        Self {
            should_quit: false,
            tick: 0,
            screen: Screen::Albums,
            sidebar_items: Screen::ALL.to_vec(),
            sidebar_selected: 0,
            albums: BrowseStack::new(ListView::new(
                ViewKind::AlbumList(album_kind),
                album_kind.label(),
            )),
            album_kind,
            artists: BrowseStack::new(ListView::new(ViewKind::Artists, "Artists")),
            playlists: BrowseStack::new(ListView::new(ViewKind::Playlists, "Playlists")),
            starred: BrowseStack::new(ListView::new(ViewKind::Starred, "Starred")),
            search: BrowseStack::new(ListView::new(ViewKind::Search(String::new()), "Results")),
            history: BrowseStack::new(ListView::new(ViewKind::History, "Recently played")),
            search_query: String::new(),
            search_focus: SearchFocus::Input,
            session,
            queue_selected: 0,
            queue_scroll: 0,
            fullscreen: false,
            lyrics: None,
            lyrics_song_id: None,
            lyrics_loading: false,
            server_status: ServerStatus::Unknown,
            settings_focus: SettingsFocus::default(),
            theme_selected: 0,
            sidebar_cursor: 0,
            scrobble_cursor: 0,
            audio_devices: Vec::new(),
            audio_selected: 0,
            audio_loaded: false,
            cache_stats: None,
            db_size_bytes: 0,
            toast: None,
            status: String::new(),
        }
    }

    /// Switch screens, keeping the sidebar cursor in step.
    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        if let Some(idx) = self.sidebar_items.iter().position(|s| *s == screen) {
            self.sidebar_selected = idx;
        }
        if screen == Screen::Search && self.search.current().items.is_empty() {
            self.search_focus = SearchFocus::Input;
        }
    }

    /// Replace the sidebar entries. Falls back to the first visible screen
    /// when the current one was hidden.
    pub fn set_sidebar(&mut self, items: Vec<Screen>) {
        self.sidebar_items = items;
        match self.sidebar_items.iter().position(|s| *s == self.screen) {
            Some(idx) => self.sidebar_selected = idx,
            None => {
                let first = self.sidebar_items.first().copied().unwrap_or(Screen::Settings);
                self.set_screen(first);
            }
        }
    }

    /// The next or previous sidebar screen, wrapping.
    pub fn neighbour_screen(&self, forward: bool) -> Screen {
        let len = self.sidebar_items.len();
        if len == 0 {
            return self.screen;
        }
        let idx = self.sidebar_selected.min(len - 1);
        let next = if forward {
            (idx + 1) % len
        } else {
            (idx + len - 1) % len
        };
        self.sidebar_items[next]
    }

    pub fn stack(&self, screen: Screen) -> Option<&BrowseStack> {
        match screen {
            Screen::Albums => Some(&self.albums),
            Screen::Artists => Some(&self.artists),
            Screen::Playlists => Some(&self.playlists),
            Screen::Starred => Some(&self.starred),
            Screen::Search => Some(&self.search),
            Screen::History => Some(&self.history),
            Screen::Queue | Screen::Settings | Screen::Help => None,
        }
    }

    pub fn stack_mut(&mut self, screen: Screen) -> Option<&mut BrowseStack> {
        match screen {
            Screen::Albums => Some(&mut self.albums),
            Screen::Artists => Some(&mut self.artists),
            Screen::Playlists => Some(&mut self.playlists),
            Screen::Starred => Some(&mut self.starred),
            Screen::Search => Some(&mut self.search),
            Screen::History => Some(&mut self.history),
            Screen::Queue | Screen::Settings | Screen::Help => None,
        }
    }

    pub fn active_view(&self) -> Option<&ListView> {
        self.stack(self.screen).map(BrowseStack::current)
    }

    pub fn active_view_mut(&mut self) -> Option<&mut ListView> {
        self.stack_mut(self.screen).map(BrowseStack::current_mut)
    }

    fn stacks_mut(&mut self) -> [&mut BrowseStack; 6] {
        [
            &mut self.albums,
            &mut self.artists,
            &mut self.playlists,
            &mut self.starred,
            &mut self.search,
            &mut self.history,
        ]
    }

    /// Run `f` on every open view showing `kind`. Returns whether any did.
    pub fn update_views(&mut self, kind: &ViewKind, mut f: impl FnMut(&mut ListView)) -> bool {
        let mut found = false;
        for stack in self.stacks_mut() {
            if let Some(view) = stack.find_mut(kind) {
                f(view);
                found = true;
            }
        }
        found
    }

    /// Reflect a star change in every list that shows the item.
    pub fn apply_star(&mut self, target: &StarTarget, starred: bool) {
        for stack in self.stacks_mut() {
            stack.apply_star(target, starred);
        }
        if let StarTarget::Song(id) = target {
            self.session.apply_star(id, starred);
        }
    }

    pub fn stop_loading(&mut self) {
        for stack in self.stacks_mut() {
            stack.stop_loading();
        }
    }

    /// Move `song` to the top of a loaded history list.
    pub fn record_history(&mut self, song: &Song) {
        let view = self.history.root_mut();
        if !view.loaded {
            return;
        }
        view.items
            .retain(|i| i.song().is_none_or(|s| s.id != song.id));
        view.items.insert(0, Item::Song(song.clone()));
    }

    pub fn clamp_queue_selection(&mut self) {
        let len = self.session.queue().len();
        self.queue_selected = self.queue_selected.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::make_song;

    fn song_view(ids: &[&str]) -> ListView {
        let mut v = ListView::new(ViewKind::History, "h");
        v.set_items(ids.iter().map(|id| Item::Song(make_song(id))).collect());
        v
    }

    #[test]
    fn browse_stack_keeps_its_root() {
        let mut stack = BrowseStack::new(ListView::new(ViewKind::Artists, "Artists"));
        stack.push(ListView::new(ViewKind::Artist("a1".into()), "Band"));
        stack.push(ListView::new(ViewKind::Album("al1".into()), "Record"));
        assert_eq!(stack.path(), "Artists › Band › Record");
        assert!(stack.find_mut(&ViewKind::Artist("a1".into())).is_some());

        assert!(stack.pop());
        assert!(stack.pop());
        assert!(!stack.pop());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn selected_song_index_skips_containers() {
        let mut v = song_view(&["1", "2"]);
        v.items.insert(
            0,
            Item::Playlist(Playlist {
                id: "p".into(),
                name: "Mix".into(),
                comment: None,
                owner: None,
                song_count: Some(2),
                duration: None,
                entry: Vec::new(),
            }),
        );
        v.selected = 2;
        assert_eq!(v.selected_song_index(), Some(1));
        assert_eq!(v.songs().len(), 2);
        v.selected = 0;
        assert_eq!(v.selected_song_index(), None);
    }

    #[test]
    fn star_changes_reach_every_view() {
        let mut stack = BrowseStack::new(song_view(&["1", "2"]));
        stack.push(song_view(&["2"]));
        stack.apply_star(&StarTarget::Song("2".into()), true);
        assert!(stack.current().items[0].is_starred());
        stack.pop();
        assert!(stack.current().items[1].is_starred());
        assert!(!stack.current().items[0].is_starred());
    }

    #[test]
    fn settings_focus_cycles() {
        let mut f = SettingsFocus::default();
        for _ in 0..6 {
            f = f.next();
        }
        assert_eq!(f, SettingsFocus::Server);
        assert_eq!(SettingsFocus::Server.prev(), SettingsFocus::Cache);
    }

    #[test]
    fn hiding_the_current_screen_moves_away() {
        let mut state = AppState::new(Session::new(50, 50));
        state.set_screen(Screen::History);
        assert_eq!(state.sidebar_selected, 6);
        assert_eq!(state.neighbour_screen(true), Screen::Settings);

        state.set_sidebar(vec![Screen::Albums, Screen::Settings, Screen::Help]);
        assert_eq!(state.screen, Screen::Albums);
        assert_eq!(state.neighbour_screen(false), Screen::Help);
    }

    #[test]
    fn only_settings_and_help_are_pinned() {
        let pinned: Vec<_> = Screen::ALL.into_iter().filter(|s| !s.is_hideable()).collect();
        assert_eq!(pinned, [Screen::Settings, Screen::Help]);
    }

    #[test]
    fn responses_land_in_every_matching_view() {
        let mut state = AppState::new(Session::new(50, 50));
        let kind = ViewKind::Album("al-1".into());
        state.albums.push(ListView::new(kind.clone(), "Album"));
        state.search.push(ListView::new(kind.clone(), "Album"));

        let hit = state.update_views(&kind, |v| v.set_items(vec![Item::Song(make_song("1"))]));
        assert!(hit);
        assert_eq!(state.albums.current().items.len(), 1);
        assert_eq!(state.search.current().items.len(), 1);
        assert!(!state.update_views(&ViewKind::Album("other".into()), |_| {}));
    }

    #[test]
    fn history_moves_replayed_song_to_top() {
        let mut state = AppState::new(Session::new(50, 50));
        state.record_history(&make_song("9"));
        assert!(state.history.current().items.is_empty(), "unloaded list untouched");

        state.history.root_mut().set_items(song_view(&["1", "2", "3"]).items);
        state.record_history(&make_song("3"));
        let ids: Vec<_> = state
            .history
            .current()
            .items
            .iter()
            .filter_map(|i| i.song().map(|s| s.id.clone()))
            .collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn starring_a_song_updates_the_queue() {
        let mut state = AppState::new(Session::new(50, 50));
        state.session.play_songs(vec![make_song("1")], 0);
        state.apply_star(&StarTarget::Song("1".into()), true);
        assert!(state.session.current().is_some_and(|s| s.is_starred()));
    }
}
