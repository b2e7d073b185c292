use super::state::ViewKind;
use crate::lyrics::ParsedLyrics;
use crate::player::AudioDevice;
use crate::subsonic::models::{Album, Artist, Playlist, ScanStatus, SearchResults, Song, StarTarget};

#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Player(PlayerEvent),
    Network(NetworkEvent),
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(crossterm::event::KeyEvent),
    Mouse(crossterm::event::MouseEvent),
    Resize,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Loaded,
    Started,
    Paused,
    Position { seconds: f64 },
    Duration { seconds: f64 },
    Ended,
    Error(String),
    /// Non-fatal diagnostics; never skips a song.
    Warning(String),
}

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    Error(String),
    Connected,
    ConnectFailed(String),
    ScanStatus(ScanStatus),
    AlbumsLoaded { kind: ViewKind, albums: Vec<Album> },
    AlbumLoaded { album: Album },
    ArtistsLoaded { artists: Vec<Artist> },
    ArtistLoaded { artist: Artist },
    PlaylistsLoaded { playlists: Vec<Playlist> },
    PlaylistLoaded { playlist: Playlist },
    StarredLoaded { results: SearchResults },
    SearchResults { query: String, results: SearchResults },
    HistoryLoaded { songs: Vec<Song> },
    RandomSongs { songs: Vec<Song> },
    /// Songs resolved from a container, ready to queue.
    Enqueue { songs: Vec<Song>, next: bool },
    StarChanged { target: StarTarget, starred: bool },
    AudioDevices { devices: Vec<AudioDevice> },
    LyricsLoaded { song_id: String, lyrics: ParsedLyrics },
    LyricsNotFound { song_id: String },
    CacheCleared { lyrics: usize },
}
