pub mod actions;
pub mod events;
pub mod state;

use crate::config::{self, Config};
use crate::input;
use crate::lyrics::{self, LrclibClient, LyricsSource, ParsedLyrics};
use crate::playback::{Effect, PlayState, Session};
use crate::player::{self, MpvHandle};
use crate::queue::QueueSnapshot;
use crate::scrobble::ScrobbleHub;
use crate::storage::StorageHandle;
use crate::subsonic::models::{SearchResults, Song};
use crate::subsonic::{SubsonicClient, SubsonicError};
use crate::tui::theme::THEME_NAMES;
use crate::tui::{self, TuiTerminal};
use actions::Action;
use anyhow::Context;
use events::{Event, NetworkEvent, PlayerEvent};
use state::{
    AppState, BrowseStack, Item, ListView, ScrobbleOption, Screen, SearchFocus, ServerStatus,
    SettingsFocus, Toast, ViewKind,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const ALBUM_LIST_SIZE: u32 = 200;
const SEARCH_ARTISTS: u32 = 20;
const SEARCH_ALBUMS: u32 = 40;
const SEARCH_SONGS: u32 = 100;
const RANDOM_SONGS: u32 = 50;
const HISTORY_LIMIT: usize = 200;
const PAGE_SIZE: usize = 10;
const SEEK_STEP_SECS: f64 = 10.0;
const VOLUME_STEP: i32 = 5;
const THRESHOLD_STEPS: [u8; 3] = [50, 75, 90];

pub struct App {
    cfg: Config,
    config_path: PathBuf,
    state: AppState,
    subsonic: Option<SubsonicClient>,
    lrclib: LrclibClient,
    mpv: Option<MpvHandle>,
    scrobblers: ScrobbleHub,
    storage: StorageHandle,
    /// Queue saves, written in order by a single task.
    persist_tx: Option<mpsc::UnboundedSender<QueueSave>>,
    persister: Option<JoinHandle<()>>,
}

type QueueSave = (QueueSnapshot, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nav {
    Up,
    Down,
    Top,
    Bottom,
    PageUp,
    PageDown,
}

impl App {
    pub fn new(cfg: Config, config_path: PathBuf) -> anyhow::Result<Self> {
        let subsonic = match SubsonicClient::new(&cfg.server, &cfg.cache, &cfg.player) {
            Ok(client) => Some(client),
            Err(SubsonicError::NotConfigured) => None,
            Err(e) => return Err(e).context("create subsonic client"),
        };

        let storage = StorageHandle::new(&cfg.paths.data_dir);
        // Creates the schema up front so later opens are cheap.
        storage.open().context("open database")?;

        let session = Session::new(cfg.player.volume, cfg.scrobble.threshold_percent);
        let mut state = AppState::new(session);
        state.set_sidebar(cfg.sidebar.visible());
        state.theme_selected = THEME_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(&cfg.theme.name))
            .unwrap_or(0);
        if subsonic.is_none() {
            state.server_status = ServerStatus::NotConfigured;
        }
        if let Some(screen) = cfg.ui.last_screen
            && (state.sidebar_items.contains(&screen) || !screen.is_hideable())
        {
            state.set_screen(screen);
        }

        let scrobblers = ScrobbleHub::from_config(&cfg.scrobble, subsonic.as_ref());
        tracing::info!(sinks = ?scrobblers.names(), "scrobblers ready");

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let persister = tokio::spawn(run_persister(storage.clone(), persist_rx));

        Ok(Self {
            cfg,
            config_path,
            state,
            subsonic,
            lrclib: LrclibClient::new(),
            mpv: None,
            scrobblers,
            storage,
            persist_tx: Some(persist_tx),
            persister: Some(persister),
        })
    }

    pub async fn run(&mut self, terminal: &mut TuiTerminal) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        input::spawn_input_task(tx.clone(), self.cfg.input.mouse);
        self.start_player(&tx).await;

        tui::draw(terminal, &self.cfg, &mut self.state)?;

        self.spawn_connect(&tx);
        if self.cfg.player.restore_position {
            self.restore_queue(&tx).await;
        }
        self.on_screen_enter(&tx);
        tui::draw(terminal, &self.cfg, &mut self.state)?;

        // Slow tick for toast expiry and spinners; everything else redraws on events.
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                ev = rx.recv() => {
                    let Some(ev) = ev else { break };
                    match ev {
                        Event::Input(input_ev) => {
                            if let Some(action) = input::map_input_to_action(&self.state, input_ev) {
                                self.handle_action(action, &tx).await;
                            }
                        }
                        Event::Player(pe) => self.handle_player(pe, &tx).await,
                        Event::Network(ne) => self.handle_network(ne, &tx).await,
                    }
                }
                _ = ticker.tick() => {
                    self.state.tick = self.state.tick.wrapping_add(1);
                }
            }

            if self.state.should_quit {
                break;
            }

            tui::draw(terminal, &self.cfg, &mut self.state)?;
        }

        self.shutdown().await;
        Ok(())
    }

    async fn start_player(&mut self, tx: &mpsc::Sender<Event>) {
        let mpv_log = self.cfg.paths.data_dir.join("mpv.log");
        match MpvHandle::spawn(
            tx.clone(),
            self.cfg.player.audio_device.as_deref(),
            Some(&mpv_log),
        )
        .await
        {
            Ok(handle) => {
                if let Err(e) = handle.set_volume(self.state.session.volume()).await {
                    tracing::warn!(error = %e, "initial volume not applied");
                }
                self.mpv = Some(handle);
            }
            Err(e) => {
                tracing::error!(error = %e, "mpv failed to start");
                self.state.toast = Some(Toast::error(format!("mpv disabled: {e:#}")));
                self.mpv = None;
            }
        }
    }

    async fn restore_queue(&mut self, tx: &mpsc::Sender<Event>) {
        let storage = self.storage.clone();
        match blocking(move || storage.load_queue()).await {
            Ok(Some((snapshot, position))) => {
                let count = snapshot.songs.len();
                let fx = self.state.session.restore(snapshot, position);
                self.apply_effects(fx, tx).await;
                if count > 0 {
                    tracing::info!(songs = count, position, "queue restored");
                    self.state.status = format!("Restored queue ({count} songs)");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "queue restore failed"),
        }
    }

    async fn shutdown(&mut self) {
        self.cfg.player.volume = self.state.session.volume();
        self.cfg.ui.last_screen = Some(self.state.screen);
        self.save_config();

        // The final snapshot goes through the same task so it lands after any pending save.
        self.persist_queue();
        self.persist_tx = None;
        if let Some(persister) = self.persister.take()
            && let Err(e) = persister.await
        {
            tracing::warn!(error = %e, "queue writer stopped");
        }

        if let Some(mpv) = self.mpv.take()
            && let Err(e) = mpv.stop().await
        {
            tracing::debug!(error = %e, "mpv stop on exit");
        }
    }

    fn save_config(&mut self) {
        if let Err(e) = config::save(&self.cfg, Some(&self.config_path)) {
            tracing::warn!(error = %e, "config save failed");
            self.state.toast = Some(Toast::error(format!("Config not saved: {e:#}")));
        }
    }

    fn on_screen_enter(&mut self, tx: &mpsc::Sender<Event>) {
        match self.state.screen {
            Screen::Settings => {
                self.spawn_load_audio_devices(tx);
                self.refresh_cache_stats();
            }
            Screen::Queue => self.state.clamp_queue_selection(),
            screen => {
                let pending = self
                    .state
                    .stack(screen)
                    .map(BrowseStack::current)
                    .filter(|v| !v.loaded && !v.loading)
                    .map(|v| v.kind.clone());
                if let Some(kind) = pending
                    && !matches!(&kind, ViewKind::Search(q) if q.is_empty())
                {
                    self.load_view(kind, tx);
                }
            }
        }
    }

    async fn handle_action(&mut self, action: Action, tx: &mpsc::Sender<Event>) {
        match action {
            Action::Quit => self.state.should_quit = true,
            Action::NextScreen | Action::PrevScreen => {
                let screen = self.state.neighbour_screen(action == Action::NextScreen);
                self.state.set_screen(screen);
                self.on_screen_enter(tx);
            }
            Action::SetScreen(screen) => {
                self.state.set_screen(screen);
                self.on_screen_enter(tx);
            }
            Action::SetSearchFocus(focus) => self.state.search_focus = focus,
            Action::SidebarUp | Action::SidebarDown => {
                let nav = if action == Action::SidebarUp {
                    Nav::Up
                } else {
                    Nav::Down
                };
                let idx = step(self.state.sidebar_selected, self.state.sidebar_items.len(), nav);
                if let Some(&screen) = self.state.sidebar_items.get(idx) {
                    self.state.set_screen(screen);
                    self.on_screen_enter(tx);
                }
            }
            Action::ListUp => self.navigate(Nav::Up),
            Action::ListDown => self.navigate(Nav::Down),
            Action::GoTop => self.navigate(Nav::Top),
            Action::GoBottom => self.navigate(Nav::Bottom),
            Action::PageUp => self.navigate(Nav::PageUp),
            Action::PageDown => self.navigate(Nav::PageDown),
            Action::Activate => self.activate(tx).await,
            Action::Back => {
                let screen = self.state.screen;
                if let Some(stack) = self.state.stack_mut(screen) {
                    stack.pop();
                }
            }
            Action::Refresh => self.refresh(tx),
            Action::CycleAlbumKind => {
                let kind = self.state.album_kind.next();
                self.state.album_kind = kind;
                self.state.albums =
                    BrowseStack::new(ListView::new(ViewKind::AlbumList(kind), kind.label()));
                self.load_view(ViewKind::AlbumList(kind), tx);
            }
            Action::ToggleStar => self.toggle_star(tx),
            Action::PlayRandom => {
                self.state.status = "Picking random songs...".into();
                self.request(tx, "random songs", |c| async move {
                    let songs = c.get_random_songs(RANDOM_SONGS).await?;
                    Ok(NetworkEvent::RandomSongs { songs })
                });
            }

            Action::InputChar(c) => self.state.search_query.push(c),
            Action::Backspace => {
                self.state.search_query.pop();
            }
            Action::ClearInput => self.state.search_query.clear(),
            Action::StartSearch => self.start_search(tx),

            Action::TogglePause => {
                let fx = self.state.session.toggle_pause();
                self.apply_effects(fx, tx).await;
            }
            Action::PlayNext => {
                let fx = self.state.session.next();
                self.apply_effects(fx, tx).await;
            }
            Action::PlayPrev => {
                let fx = self.state.session.previous();
                self.apply_effects(fx, tx).await;
            }
            Action::VolumeUp | Action::VolumeDown => {
                let delta = if action == Action::VolumeUp {
                    VOLUME_STEP
                } else {
                    -VOLUME_STEP
                };
                let volume = i32::from(self.state.session.volume()) + delta;
                let fx = self.state.session.set_volume(volume);
                self.apply_effects(fx, tx).await;
            }
            Action::SeekForward => {
                let fx = self.state.session.seek_relative(SEEK_STEP_SECS);
                self.apply_effects(fx, tx).await;
            }
            Action::SeekBack => {
                let fx = self.state.session.seek_relative(-SEEK_STEP_SECS);
                self.apply_effects(fx, tx).await;
            }
            Action::ToggleShuffle => {
                let (on, fx) = self.state.session.toggle_shuffle();
                self.state.status = format!("Shuffle {}", if on { "on" } else { "off" });
                self.apply_effects(fx, tx).await;
            }
            Action::CycleRepeat => {
                let (mode, fx) = self.state.session.cycle_repeat();
                self.state.status = format!("Repeat {}", mode.label());
                self.apply_effects(fx, tx).await;
            }
            Action::ToggleFullscreen => self.state.fullscreen = !self.state.fullscreen,

            Action::Enqueue => self.enqueue_selection(false, tx).await,
            Action::EnqueueNext => self.enqueue_selection(true, tx).await,
            Action::QueuePlayIndex(i) => {
                let fx = self.state.session.play_index(i);
                self.apply_effects(fx, tx).await;
            }
            Action::QueueRemove(i) => {
                let fx = self.state.session.remove(i);
                self.state.clamp_queue_selection();
                self.apply_effects(fx, tx).await;
            }
            Action::QueueClear => {
                let fx = self.state.session.clear_queue();
                self.state.queue_selected = 0;
                self.state.queue_scroll = 0;
                self.apply_effects(fx, tx).await;
            }
            Action::QueueMoveUp | Action::QueueMoveDown => {
                let from = self.state.queue_selected;
                let len = self.state.session.queue().len();
                let to = if action == Action::QueueMoveUp {
                    from.checked_sub(1)
                } else {
                    (from + 1 < len).then_some(from + 1)
                };
                if let Some(to) = to {
                    let fx = self.state.session.move_track(from, to);
                    self.state.queue_selected = to;
                    self.apply_effects(fx, tx).await;
                }
            }

            Action::SettingsFocusNext => {
                self.state.settings_focus = self.state.settings_focus.next();
            }
            Action::SettingsFocusPrev => {
                self.state.settings_focus = self.state.settings_focus.prev();
            }
            Action::SettingsApply => match self.state.settings_focus {
                SettingsFocus::Server => {}
                SettingsFocus::Theme => self.apply_theme(),
                SettingsFocus::Sidebar => self.toggle_sidebar_item(),
                SettingsFocus::Scrobble => self.apply_scrobble_option(),
                SettingsFocus::Audio => self.apply_audio_device(tx).await,
                SettingsFocus::Cache => self.clear_cache(tx),
            },
            Action::SidebarMove(up) => self.move_sidebar_item(up),
            Action::ClearCache => self.clear_cache(tx),

            Action::Resize => {}
        }
    }

    fn navigate(&mut self, nav: Nav) {
        match self.state.screen {
            Screen::Queue => {
                let len = self.state.session.queue().len();
                self.state.queue_selected = step(self.state.queue_selected, len, nav);
            }
            Screen::Settings => {
                let cursor = match self.state.settings_focus {
                    SettingsFocus::Theme => Some((&mut self.state.theme_selected, THEME_NAMES.len())),
                    SettingsFocus::Sidebar => Some((
                        &mut self.state.sidebar_cursor,
                        self.cfg.sidebar.ordered().len(),
                    )),
                    SettingsFocus::Scrobble => {
                        Some((&mut self.state.scrobble_cursor, ScrobbleOption::ALL.len()))
                    }
                    SettingsFocus::Audio => {
                        Some((&mut self.state.audio_selected, self.state.audio_devices.len()))
                    }
                    SettingsFocus::Server | SettingsFocus::Cache => None,
                };
                if let Some((cur, len)) = cursor {
                    *cur = step(*cur, len, nav);
                }
            }
            _ => {
                if let Some(view) = self.state.active_view_mut() {
                    match nav {
                        Nav::Up => view.select_prev(),
                        Nav::Down => view.select_next(),
                        Nav::Top => view.select_first(),
                        Nav::Bottom => view.select_last(),
                        Nav::PageUp => view.page(false, PAGE_SIZE),
                        Nav::PageDown => view.page(true, PAGE_SIZE),
                    }
                }
            }
        }
    }

    /// Enter on a browse row: songs play with their list as the queue,
    /// containers open a new view.
    async fn activate(&mut self, tx: &mpsc::Sender<Event>) {
        let Some(view) = self.state.active_view() else {
            return;
        };
        let Some(item) = view.selected_item().cloned() else {
            return;
        };
        match item {
            Item::Song(_) => {
                let songs = view.songs();
                let start = view.selected_song_index().unwrap_or(0);
                let fx = self.state.session.play_songs(songs, start);
                self.apply_effects(fx, tx).await;
            }
            Item::Album(a) => self.open_view(ViewKind::Album(a.id), a.name, tx),
            Item::Artist(a) => self.open_view(ViewKind::Artist(a.id), a.name, tx),
            Item::Playlist(p) => self.open_view(ViewKind::Playlist(p.id), p.name, tx),
        }
    }

    fn open_view(&mut self, kind: ViewKind, title: String, tx: &mpsc::Sender<Event>) {
        let screen = self.state.screen;
        let Some(stack) = self.state.stack_mut(screen) else {
            return;
        };
        stack.push(ListView::new(kind.clone(), title));
        self.load_view(kind, tx);
    }

    fn refresh(&mut self, tx: &mpsc::Sender<Event>) {
        match self.state.screen {
            Screen::Settings => {
                self.spawn_connect(tx);
                self.spawn_load_audio_devices(tx);
                self.refresh_cache_stats();
            }
            Screen::Queue | Screen::Help => {}
            screen => {
                let Some(kind) = self.state.stack(screen).map(|s| s.current().kind.clone()) else {
                    return;
                };
                if matches!(&kind, ViewKind::Search(q) if q.is_empty()) {
                    return;
                }
                if let Some(client) = &self.subsonic {
                    client.clear_cache();
                }
                self.load_view(kind, tx);
            }
        }
    }

    fn start_search(&mut self, tx: &mpsc::Sender<Event>) {
        let query = self.state.search_query.trim().to_string();
        if query.is_empty() {
            self.state.status = "Type a query first".into();
            return;
        }
        self.state.search = BrowseStack::new(ListView::new(
            ViewKind::Search(query.clone()),
            format!("\"{query}\""),
        ));
        self.state.status = format!("Searching: {query}");
        self.load_view(ViewKind::Search(query), tx);
    }

    /// Fetch the contents of every open view showing `kind`.
    fn load_view(&mut self, kind: ViewKind, tx: &mpsc::Sender<Event>) {
        self.state.update_views(&kind, |v| v.loading = true);
        match kind {
            ViewKind::History => self.spawn_load_history(tx),
            ViewKind::AlbumList(list) => self.request(tx, "album list", move |c| async move {
                let albums = c.get_album_list(list, ALBUM_LIST_SIZE, 0).await?;
                Ok(NetworkEvent::AlbumsLoaded {
                    kind: ViewKind::AlbumList(list),
                    albums,
                })
            }),
            ViewKind::Album(id) => self.request(tx, "album", move |c| async move {
                let album = c.get_album(&id).await?;
                Ok(NetworkEvent::AlbumLoaded { album })
            }),
            ViewKind::Artists => self.request(tx, "artists", |c| async move {
                let artists = c.get_artists().await?;
                Ok(NetworkEvent::ArtistsLoaded { artists })
            }),
            ViewKind::Artist(id) => self.request(tx, "artist", move |c| async move {
                let artist = c.get_artist(&id).await?;
                Ok(NetworkEvent::ArtistLoaded { artist })
            }),
            ViewKind::Playlists => self.request(tx, "playlists", |c| async move {
                let playlists = c.get_playlists().await?;
                Ok(NetworkEvent::PlaylistsLoaded { playlists })
            }),
            ViewKind::Playlist(id) => self.request(tx, "playlist", move |c| async move {
                let playlist = c.get_playlist(&id).await?;
                Ok(NetworkEvent::PlaylistLoaded { playlist })
            }),
            ViewKind::Starred => self.request(tx, "starred", |c| async move {
                let results = c.get_starred().await?;
                Ok(NetworkEvent::StarredLoaded { results })
            }),
            ViewKind::Search(query) => self.request(tx, "search", move |c| async move {
                let results = c
                    .search(&query, SEARCH_ARTISTS, SEARCH_ALBUMS, SEARCH_SONGS)
                    .await?;
                Ok(NetworkEvent::SearchResults { query, results })
            }),
        }
    }

    /// Run a server call in the background and post its result.
    fn request<F, Fut>(&mut self, tx: &mpsc::Sender<Event>, what: &'static str, f: F)
    where
        F: FnOnce(SubsonicClient) -> Fut + Send + 'static,
        Fut: Future<Output = Result<NetworkEvent, SubsonicError>> + Send + 'static,
    {
        let Some(client) = self.subsonic.clone() else {
            self.state.stop_loading();
            self.state.toast = Some(Toast::error(SubsonicError::NotConfigured.to_string()));
            return;
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match f(client).await {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::warn!(error = %e, "{what} failed");
                    NetworkEvent::Error(format!("{what}: {e}"))
                }
            };
            let _ = tx.send(Event::Network(ev)).await;
        });
    }

    fn spawn_connect(&mut self, tx: &mpsc::Sender<Event>) {
        let Some(client) = self.subsonic.clone() else {
            self.state.server_status = ServerStatus::NotConfigured;
            return;
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            match client.ping().await {
                Ok(()) => {
                    let _ = tx.send(Event::Network(NetworkEvent::Connected)).await;
                    match client.get_scan_status().await {
                        Ok(status) => {
                            let _ = tx
                                .send(Event::Network(NetworkEvent::ScanStatus(status)))
                                .await;
                        }
                        Err(e) => tracing::debug!(error = %e, "scan status unavailable"),
                    }
                }
                Err(e) => {
                    let _ = tx
                        .send(Event::Network(NetworkEvent::ConnectFailed(e.to_string())))
                        .await;
                }
            }
        });
    }

    fn spawn_load_history(&mut self, tx: &mpsc::Sender<Event>) {
        let storage = self.storage.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match blocking(move || storage.get_history(HISTORY_LIMIT)).await {
                Ok(songs) => NetworkEvent::HistoryLoaded { songs },
                Err(e) => NetworkEvent::Error(format!("history: {e:#}")),
            };
            let _ = tx.send(Event::Network(ev)).await;
        });
    }

    fn spawn_load_audio_devices(&mut self, tx: &mpsc::Sender<Event>) {
        self.state.audio_loaded = false;
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match player::list_audio_devices().await {
                Ok(devices) => NetworkEvent::AudioDevices { devices },
                Err(e) => NetworkEvent::Error(format!("audio devices: {e:#}")),
            };
            let _ = tx.send(Event::Network(ev)).await;
        });
    }

    fn refresh_cache_stats(&mut self) {
        self.state.cache_stats = self.subsonic.as_ref().map(SubsonicClient::cache_stats);
        self.state.db_size_bytes = self.storage.size_bytes();
    }

    fn toggle_star(&mut self, tx: &mpsc::Sender<Event>) {
        let Some(item) = self.state.active_view().and_then(ListView::selected_item) else {
            return;
        };
        let Some(target) = item.star_target() else {
            self.state.status = "Playlists cannot be starred".into();
            return;
        };
        let star = !item.is_starred();
        self.request(tx, if star { "star" } else { "unstar" }, move |c| async move {
            if star {
                c.star(&target).await?;
            } else {
                c.unstar(&target).await?;
            }
            Ok(NetworkEvent::StarChanged {
                target,
                starred: star,
            })
        });
    }

    async fn enqueue_selection(&mut self, next: bool, tx: &mpsc::Sender<Event>) {
        let Some(item) = self
            .state
            .active_view()
            .and_then(ListView::selected_item)
            .cloned()
        else {
            return;
        };
        match item {
            Item::Song(song) => self.enqueue_songs(vec![song], next, tx).await,
            Item::Album(album) => self.request(tx, "album", move |c| async move {
                let album = c.get_album(&album.id).await?;
                Ok(NetworkEvent::Enqueue {
                    songs: album.song,
                    next,
                })
            }),
            Item::Playlist(playlist) => self.request(tx, "playlist", move |c| async move {
                let playlist = c.get_playlist(&playlist.id).await?;
                Ok(NetworkEvent::Enqueue {
                    songs: playlist.entry,
                    next,
                })
            }),
            Item::Artist(artist) => self.request(tx, "artist", move |c| async move {
                let artist = c.get_artist(&artist.id).await?;
                let mut songs = Vec::new();
                for album in &artist.album {
                    songs.extend(c.get_album(&album.id).await?.song);
                }
                Ok(NetworkEvent::Enqueue { songs, next })
            }),
        }
    }

    async fn enqueue_songs(&mut self, songs: Vec<Song>, next: bool, tx: &mpsc::Sender<Event>) {
        if songs.is_empty() {
            self.state.status = "Nothing to add".into();
            return;
        }
        let count = songs.len();
        let fx = if next {
            self.state.session.enqueue_next(songs)
        } else {
            self.state.session.enqueue(songs)
        };
        let noun = if count == 1 { "song" } else { "songs" };
        let msg = if next {
            format!("Playing {count} {noun} next")
        } else {
            format!("Added {count} {noun} to queue")
        };
        self.state.toast = Some(Toast::success(msg));
        self.apply_effects(fx, tx).await;
    }

    fn apply_theme(&mut self) {
        let Some(name) = THEME_NAMES.get(self.state.theme_selected) else {
            return;
        };
        self.cfg.theme.name = (*name).to_string();
        self.save_config();
        self.state.toast = Some(Toast::success(format!("Theme: {name}")));
    }

    fn toggle_sidebar_item(&mut self) {
        let ordered = self.cfg.sidebar.ordered();
        let Some(&screen) = ordered.get(self.state.sidebar_cursor) else {
            return;
        };
        if !self.cfg.sidebar.toggle_hidden(screen) {
            self.state.toast = Some(Toast::error(format!("{} is always shown", screen.title())));
            return;
        }
        self.state.set_sidebar(self.cfg.sidebar.visible());
        self.save_config();
    }

    fn move_sidebar_item(&mut self, up: bool) {
        let Some(&screen) = self.cfg.sidebar.ordered().get(self.state.sidebar_cursor) else {
            return;
        };
        self.cfg.sidebar.move_item(screen, up);
        if let Some(pos) = self.cfg.sidebar.ordered().iter().position(|s| *s == screen) {
            self.state.sidebar_cursor = pos;
        }
        self.state.set_sidebar(self.cfg.sidebar.visible());
        self.save_config();
    }

    fn apply_scrobble_option(&mut self) {
        let Some(option) = ScrobbleOption::ALL.get(self.state.scrobble_cursor).copied() else {
            return;
        };
        let toast = match option {
            ScrobbleOption::Server => {
                let scrobble = &mut self.cfg.scrobble;
                scrobble.enabled = !scrobble.enabled;
                Toast::success(format!("Server scrobbling {}", on_off(scrobble.enabled)))
            }
            ScrobbleOption::Lastfm => {
                let lastfm = &mut self.cfg.scrobble.lastfm;
                lastfm.enabled = !lastfm.enabled;
                if lastfm.enabled && !lastfm.is_ready() {
                    Toast::error("Last.fm needs a session: run `mice lastfm login`")
                } else {
                    Toast::success(format!("Last.fm scrobbling {}", on_off(lastfm.enabled)))
                }
            }
            ScrobbleOption::Threshold => {
                let percent = next_threshold(self.cfg.scrobble.threshold_percent);
                self.cfg.scrobble.threshold_percent = percent;
                self.state.session.set_scrobble_threshold(percent);
                Toast::success(format!("Scrobble after {percent}% played"))
            }
        };
        self.scrobblers = ScrobbleHub::from_config(&self.cfg.scrobble, self.subsonic.as_ref());
        tracing::info!(sinks = ?self.scrobblers.names(), "scrobblers updated");
        self.state.toast = Some(toast);
        self.save_config();
    }

    /// Switch output device. mpv is restarted and the current song picks up
    /// where it was.
    async fn apply_audio_device(&mut self, tx: &mpsc::Sender<Event>) {
        let Some(device) = self.state.audio_devices.get(self.state.audio_selected) else {
            return;
        };
        let name = device.name.clone();
        self.cfg.player.audio_device = (name != "auto").then(|| name.clone());
        self.save_config();

        self.mpv = None;
        self.start_player(tx).await;

        let session = &self.state.session;
        if session.is_active()
            && let Some(song) = session.current().cloned()
        {
            let paused = session.state() != PlayState::Playing;
            let position = session.position();
            if let Err(e) = self.load_song(&song, position, paused).await {
                tracing::warn!(error = %e, "reload after device switch failed");
            }
        }
        self.state.toast = Some(Toast::success(format!("Audio output: {name}")));
    }

    fn clear_cache(&mut self, tx: &mpsc::Sender<Event>) {
        if let Some(client) = &self.subsonic {
            client.clear_cache();
        }
        let storage = self.storage.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match blocking(move || storage.clear_lyrics()).await {
                Ok(lyrics) => NetworkEvent::CacheCleared { lyrics },
                Err(e) => NetworkEvent::Error(format!("clear cache: {e:#}")),
            };
            let _ = tx.send(Event::Network(ev)).await;
        });
    }

    // ---- effects ----------------------------------------------------------

    async fn apply_effects(&mut self, effects: Vec<Effect>, tx: &mpsc::Sender<Event>) {
        let mut pending: VecDeque<Effect> = effects.into();
        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Load {
                    song,
                    start_at,
                    paused,
                } => {
                    self.spawn_lyrics_fetch(&song, tx);
                    self.state.status = song.display();
                    if let Err(e) = self.load_song(&song, start_at, paused).await {
                        tracing::warn!(song = %song.id, error = %e, "load failed");
                        self.state.toast = Some(Toast::error(format!("{e:#}")));
                        let fx = if self.mpv.is_some() {
                            self.state.session.on_error()
                        } else {
                            self.state.session.stop()
                        };
                        pending.extend(fx);
                    }
                }
                Effect::Pause
                | Effect::Resume
                | Effect::Seek(_)
                | Effect::Stop
                | Effect::SetVolume(_) => {
                    if let Err(e) = self.player_command(&effect).await {
                        tracing::warn!(error = %e, ?effect, "player command failed");
                        self.state.status = format!("mpv: {e:#}");
                    }
                }
                Effect::NowPlaying(song) => {
                    self.scrobblers.spawn_now_playing(song.clone());
                    self.state.record_history(&song);
                    let storage = self.storage.clone();
                    tokio::spawn(async move {
                        let played_at = unix_now();
                        if let Err(e) =
                            blocking(move || storage.add_to_history(&song, played_at)).await
                        {
                            tracing::warn!(error = %e, "history write failed");
                        }
                    });
                }
                Effect::Scrobble { song, played_at } => {
                    tracing::info!(song = %song.id, played_at, "scrobble");
                    self.scrobblers.spawn_scrobble(song, played_at);
                }
                Effect::Persist => self.persist_queue(),
                Effect::MediaSession => {
                    let title = tui::widgets::media_title(&self.state.session);
                    if let Err(e) = tui::set_title(&title) {
                        tracing::debug!(error = %e, "title update failed");
                    }
                }
            }
        }
    }

    async fn load_song(&self, song: &Song, start_at: f64, paused: bool) -> anyhow::Result<()> {
        let client = self
            .subsonic
            .as_ref()
            .context("no server configured (run `mice login`)")?;
        let mpv = self.mpv.as_ref().context("mpv is not running")?;
        mpv.load_url(&client.stream_url(&song.id), start_at, paused)
            .await
            .with_context(|| format!("load {}", song.title))
    }

    async fn player_command(&self, effect: &Effect) -> anyhow::Result<()> {
        let Some(mpv) = &self.mpv else {
            return Ok(());
        };
        match effect {
            Effect::Pause => mpv.set_pause(true).await,
            Effect::Resume => mpv.set_pause(false).await,
            Effect::Seek(secs) => mpv.seek_absolute(*secs).await,
            Effect::Stop => mpv.stop().await,
            Effect::SetVolume(v) => mpv.set_volume(*v).await,
            _ => Ok(()),
        }
    }

    fn persist_queue(&self) {
        let Some(tx) = &self.persist_tx else { return };
        if tx.send(self.state.session.snapshot()).is_err() {
            tracing::warn!("queue writer gone, save dropped");
        }
    }

    /// Cache first, then the server, then LRCLIB. Only the latest request wins.
    fn spawn_lyrics_fetch(&mut self, song: &Song, tx: &mpsc::Sender<Event>) {
        if self.state.lyrics_song_id.as_deref() == Some(song.id.as_str()) {
            return;
        }
        self.state.lyrics = None;
        self.state.lyrics_loading = true;
        self.state.lyrics_song_id = Some(song.id.clone());

        let storage = self.storage.clone();
        let subsonic = self.subsonic.clone();
        let lrclib = self.lrclib.clone();
        let song = song.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let song_id = song.id.clone();
            let cached = blocking({
                let storage = storage.clone();
                let id = song_id.clone();
                move || storage.get_lyrics(&id)
            })
            .await;
            if let Ok(Some((lrc, _synced))) = cached {
                let lyrics = ParsedLyrics::parse(&lrc, LyricsSource::Cache);
                let _ = tx
                    .send(Event::Network(NetworkEvent::LyricsLoaded { song_id, lyrics }))
                    .await;
                return;
            }

            let ev = match lyrics::fetch_lyrics(subsonic.as_ref(), &lrclib, &song).await {
                Ok(Some(lyrics)) => {
                    let lrc = lyrics.to_lrc();
                    let synced = lyrics.synced;
                    let id = song_id.clone();
                    let now = unix_now();
                    if let Err(e) =
                        blocking(move || storage.cache_lyrics(&id, &lrc, synced, now)).await
                    {
                        tracing::warn!(error = %e, "lyrics cache write failed");
                    }
                    NetworkEvent::LyricsLoaded { song_id, lyrics }
                }
                Ok(None) => NetworkEvent::LyricsNotFound { song_id },
                Err(e) => {
                    tracing::debug!(song = %song_id, error = %e, "lyrics lookup failed");
                    NetworkEvent::LyricsNotFound { song_id }
                }
            };
            let _ = tx.send(Event::Network(ev)).await;
        });
    }

    async fn handle_player(&mut self, pe: PlayerEvent, tx: &mpsc::Sender<Event>) {
        let session = &mut self.state.session;
        let fx = match pe {
            PlayerEvent::Loaded => session.on_loaded(),
            PlayerEvent::Started => session.on_paused(false),
            PlayerEvent::Paused => session.on_paused(true),
            PlayerEvent::Position { seconds } => session.on_position(seconds),
            PlayerEvent::Duration { seconds } => {
                session.on_duration(seconds);
                Vec::new()
            }
            PlayerEvent::Ended => session.on_ended(),
            PlayerEvent::Error(e) => {
                tracing::warn!(error = %e, "playback error");
                let fx = session.on_error();
                self.state.toast = Some(Toast::error(e));
                fx
            }
            PlayerEvent::Warning(w) => {
                tracing::warn!("{w}");
                Vec::new()
            }
        };
        self.apply_effects(fx, tx).await;
    }

    async fn handle_network(&mut self, ne: NetworkEvent, tx: &mpsc::Sender<Event>) {
        match ne {
            NetworkEvent::Error(e) => {
                self.state.stop_loading();
                self.state.toast = Some(Toast::error(e.clone()));
                self.state.status = format!("Error: {e} (r to retry)");
            }
            NetworkEvent::Connected => {
                tracing::info!(server = self.cfg.server.url.as_str(), "connected");
                self.state.server_status = ServerStatus::Connected;
            }
            NetworkEvent::ConnectFailed(e) => {
                tracing::warn!(error = %e, "server unreachable");
                self.state.toast = Some(Toast::error(format!("Server: {e}")));
                self.state.server_status = ServerStatus::Failed(e);
            }
            NetworkEvent::ScanStatus(status) => {
                if status.scanning {
                    self.state.status = match status.count {
                        Some(n) => format!("Server is scanning the library ({n} files)"),
                        None => "Server is scanning the library".into(),
                    };
                }
            }
            NetworkEvent::AlbumsLoaded { kind, albums } => {
                let items: Vec<Item> = albums.into_iter().map(Item::Album).collect();
                self.state.update_views(&kind, |v| v.set_items(items.clone()));
            }
            NetworkEvent::AlbumLoaded { album } => {
                let kind = ViewKind::Album(album.id.clone());
                let items: Vec<Item> = album.song.into_iter().map(Item::Song).collect();
                self.state.update_views(&kind, |v| v.set_items(items.clone()));
            }
            NetworkEvent::ArtistsLoaded { artists } => {
                let items: Vec<Item> = artists.into_iter().map(Item::Artist).collect();
                self.state
                    .update_views(&ViewKind::Artists, |v| v.set_items(items.clone()));
            }
            NetworkEvent::ArtistLoaded { artist } => {
                let kind = ViewKind::Artist(artist.id.clone());
                let items: Vec<Item> = artist.album.into_iter().map(Item::Album).collect();
                self.state.update_views(&kind, |v| v.set_items(items.clone()));
            }
            NetworkEvent::PlaylistsLoaded { playlists } => {
                let items: Vec<Item> = playlists.into_iter().map(Item::Playlist).collect();
                self.state
                    .update_views(&ViewKind::Playlists, |v| v.set_items(items.clone()));
            }
            NetworkEvent::PlaylistLoaded { playlist } => {
                let kind = ViewKind::Playlist(playlist.id.clone());
                let items: Vec<Item> = playlist.entry.into_iter().map(Item::Song).collect();
                self.state.update_views(&kind, |v| v.set_items(items.clone()));
            }
            NetworkEvent::StarredLoaded { results } => {
                let items = result_items(results);
                self.state
                    .update_views(&ViewKind::Starred, |v| v.set_items(items.clone()));
            }
            NetworkEvent::SearchResults { query, results } => {
                let items = result_items(results);
                let count = items.len();
                // A newer search replaced the view; drop the stale answer.
                if !self
                    .state
                    .update_views(&ViewKind::Search(query.clone()), |v| {
                        v.set_items(items.clone())
                    })
                {
                    return;
                }
                self.state.status = format!("{count} results for \"{query}\"");
                if count > 0 && self.state.screen == Screen::Search {
                    self.state.search_focus = SearchFocus::Results;
                }
            }
            NetworkEvent::HistoryLoaded { songs } => {
                let items: Vec<Item> = songs.into_iter().map(Item::Song).collect();
                self.state
                    .update_views(&ViewKind::History, |v| v.set_items(items.clone()));
            }
            NetworkEvent::RandomSongs { songs } => {
                if songs.is_empty() {
                    self.state.status = "The server returned no songs".into();
                    return;
                }
                let count = songs.len();
                let fx = self.state.session.play_songs(songs, 0);
                self.state.toast = Some(Toast::success(format!("Playing {count} random songs")));
                self.apply_effects(fx, tx).await;
            }
            NetworkEvent::Enqueue { songs, next } => self.enqueue_songs(songs, next, tx).await,
            NetworkEvent::StarChanged { target, starred } => {
                self.state.apply_star(&target, starred);
                if let Some(view) = self.state.starred.find_mut(&ViewKind::Starred) {
                    view.loaded = false;
                }
                self.state.toast = Some(Toast::success(if starred {
                    "Starred"
                } else {
                    "Unstarred"
                }));
            }
            NetworkEvent::AudioDevices { devices } => {
                let current = self.cfg.player.audio_device.as_deref().unwrap_or("auto");
                self.state.audio_selected = devices
                    .iter()
                    .position(|d| d.name == current)
                    .unwrap_or(0);
                self.state.audio_devices = devices;
                self.state.audio_loaded = true;
            }
            NetworkEvent::LyricsLoaded { song_id, lyrics } => {
                if self.state.lyrics_song_id.as_deref() == Some(song_id.as_str()) {
                    self.state.lyrics = Some(lyrics);
                    self.state.lyrics_loading = false;
                }
            }
            NetworkEvent::LyricsNotFound { song_id } => {
                if self.state.lyrics_song_id.as_deref() == Some(song_id.as_str()) {
                    self.state.lyrics = None;
                    self.state.lyrics_loading = false;
                }
            }
            NetworkEvent::CacheCleared { lyrics } => {
                tracing::info!(lyrics, "cache cleared");
                self.refresh_cache_stats();
                self.state.toast = Some(Toast::success(format!(
                    "Cache cleared ({lyrics} cached lyrics removed)"
                )));
            }
        }
    }
}

/// Run blocking storage work off the async threads.
async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("blocking task failed")?
}

/// Writes queue saves one at a time. When saves pile up only the newest is written.
async fn run_persister(storage: StorageHandle, mut rx: mpsc::UnboundedReceiver<QueueSave>) {
    while let Some(mut save) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            save = newer;
        }
        let storage = storage.clone();
        let (snapshot, position) = save;
        if let Err(e) = blocking(move || storage.save_queue(&snapshot, position, unix_now())).await
        {
            tracing::warn!(error = %e, "save queue failed");
        }
    }
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Cursor movement clamped to `len` rows.
fn step(cur: usize, len: usize, nav: Nav) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    match nav {
        Nav::Up => cur.saturating_sub(1).min(last),
        Nav::Down => (cur + 1).min(last),
        Nav::Top => 0,
        Nav::Bottom => last,
        Nav::PageUp => cur.saturating_sub(PAGE_SIZE).min(last),
        Nav::PageDown => (cur + PAGE_SIZE).min(last),
    }
}

fn next_threshold(current: u8) -> u8 {
    THRESHOLD_STEPS
        .iter()
        .copied()
        .find(|t| *t > current)
        .unwrap_or(THRESHOLD_STEPS[0])
}

/// Search and starred results as one list: artists, then albums, then songs.
fn result_items(results: SearchResults) -> Vec<Item> {
    results
        .artist
        .into_iter()
        .map(Item::Artist)
        .chain(results.album.into_iter().map(Item::Album))
        .chain(results.song.into_iter().map(Item::Song))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::make_song;
    use crate::subsonic::models::Artist;

    #[test]
    fn step_clamps_to_the_list() {
        assert_eq!(step(0, 0, Nav::Down), 0);
        assert_eq!(step(0, 3, Nav::Up), 0);
        assert_eq!(step(2, 3, Nav::Down), 2);
        assert_eq!(step(1, 3, Nav::Bottom), 2);
        assert_eq!(step(5, 30, Nav::PageDown), 15);
        assert_eq!(step(25, 30, Nav::PageDown), 29);
        assert_eq!(step(5, 30, Nav::PageUp), 0);
        // A stale cursor past the end is pulled back in.
        assert_eq!(step(9, 3, Nav::Up), 2);
    }

    #[test]
    fn threshold_cycles_through_steps() {
        assert_eq!(next_threshold(50), 75);
        assert_eq!(next_threshold(75), 90);
        assert_eq!(next_threshold(90), 50);
        assert_eq!(next_threshold(60), 75);
    }

    fn saved(ids: &[&str], current: usize) -> QueueSave {
        let snapshot = QueueSnapshot {
            songs: ids.iter().map(|id| make_song(id)).collect(),
            current_index: Some(current),
            ..Default::default()
        };
        (snapshot, current as f64 * 10.0)
    }

    #[tokio::test]
    async fn queue_saves_land_in_send_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageHandle::new(dir.path());
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_persister(storage.clone(), rx));

        for i in 0..20 {
            tx.send(saved(&["1", "2", "3"], i % 3)).unwrap();
        }
        tx.send(saved(&["9"], 0)).unwrap();
        drop(tx);
        writer.await.unwrap();

        let (snapshot, position) = storage.load_queue().unwrap().unwrap();
        assert_eq!(snapshot, saved(&["9"], 0).0);
        assert_eq!(position, 0.0);
    }

    #[tokio::test]
    async fn each_spaced_save_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageHandle::new(dir.path());
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_persister(storage.clone(), rx));

        tx.send(saved(&["1", "2"], 1)).unwrap();
        let mut loaded = None;
        for _ in 0..100 {
            loaded = storage.load_queue().unwrap();
            if loaded.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let (first, position) = loaded.unwrap();
        assert_eq!(first.current_index, Some(1));
        assert_eq!(position, 10.0);

        tx.send(saved(&["1", "2"], 0)).unwrap();
        drop(tx);
        writer.await.unwrap();
        let (second, _) = storage.load_queue().unwrap().unwrap();
        assert_eq!(second.current_index, Some(0));
    }

    #[test]
    fn results_list_artists_before_songs() {
        let results = SearchResults {
            artist: vec![Artist {
                id: "ar-1".into(),
                name: "Miles Davis".into(),
                album_count: Some(3),
                starred: None,
                album: Vec::new(),
            }],
            album: Vec::new(),
            song: vec![make_song("1"), make_song("2")],
        };
        let items = result_items(results);
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Item::Artist(_)));
        assert_eq!(items[2].title(), "Song 2");
    }
}
