use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub track: Option<u32>,
    #[serde(default)]
    pub disc_number: Option<u32>,
    #[serde(default)]
    pub year: Option<u32>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub bit_rate: Option<u32>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    /// Timestamp set by the server when the song is starred.
    #[serde(default)]
    pub starred: Option<String>,
}

impl Song {
    pub fn artist_name(&self) -> &str {
        self.artist.as_deref().unwrap_or("")
    }

    pub fn display(&self) -> String {
        match self.artist.as_deref() {
            Some(a) if !a.is_empty() => format!("{} - {}", self.title, a),
            _ => self.title.clone(),
        }
    }

    pub fn is_starred(&self) -> bool {
        self.starred.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub artist_id: Option<String>,
    #[serde(default)]
    pub song_count: Option<u32>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub starred: Option<String>,
    /// Present on `getAlbum` only.
    #[serde(default)]
    pub song: Vec<Song>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub album_count: Option<u32>,
    #[serde(default)]
    pub starred: Option<String>,
    /// Present on `getArtist` only.
    #[serde(default)]
    pub album: Vec<Album>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub song_count: Option<u32>,
    #[serde(default)]
    pub duration: Option<u32>,
    /// Present on `getPlaylist` only.
    #[serde(default)]
    pub entry: Vec<Song>,
}

/// `search3` and `getStarred2` share this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub artist: Vec<Artist>,
    #[serde(default)]
    pub album: Vec<Album>,
    #[serde(default)]
    pub song: Vec<Song>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.artist.is_empty() && self.album.is_empty() && self.song.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlbumListKind {
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "recent")]
    Recent,
    #[serde(rename = "frequent")]
    Frequent,
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "alphabeticalByName")]
    AlphabeticalByName,
    #[serde(rename = "highest")]
    Highest,
    #[serde(rename = "starred")]
    Starred,
}

impl AlbumListKind {
    pub const ALL: [AlbumListKind; 7] = [
        AlbumListKind::Newest,
        AlbumListKind::Recent,
        AlbumListKind::Frequent,
        AlbumListKind::Random,
        AlbumListKind::AlphabeticalByName,
        AlbumListKind::Highest,
        AlbumListKind::Starred,
    ];

    pub fn as_param(self) -> &'static str {
        match self {
            AlbumListKind::Newest => "newest",
            AlbumListKind::Recent => "recent",
            AlbumListKind::Frequent => "frequent",
            AlbumListKind::Random => "random",
            AlbumListKind::AlphabeticalByName => "alphabeticalByName",
            AlbumListKind::Highest => "highest",
            AlbumListKind::Starred => "starred",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlbumListKind::Newest => "Recently added",
            AlbumListKind::Recent => "Recently played",
            AlbumListKind::Frequent => "Most played",
            AlbumListKind::Random => "Random",
            AlbumListKind::AlphabeticalByName => "A-Z",
            AlbumListKind::Highest => "Top rated",
            AlbumListKind::Starred => "Starred",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_param().eq_ignore_ascii_case(s))
    }
}

/// Target of `star`/`unstar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarTarget {
    Song(String),
    Album(String),
    Artist(String),
}

impl StarTarget {
    pub fn param(&self) -> (&'static str, &str) {
        match self {
            StarTarget::Song(id) => ("id", id),
            StarTarget::Album(id) => ("albumId", id),
            StarTarget::Artist(id) => ("artistId", id),
        }
    }
}

/// OpenSubsonic structured lyrics (`getLyricsBySongId`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredLyrics {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub line: Vec<LyricLine>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LyricLine {
    /// Milliseconds, present when the lyrics are synced.
    #[serde(default)]
    pub start: Option<u64>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LyricsList {
    #[serde(default)]
    pub structured_lyrics: Vec<StructuredLyrics>,
}

/// Legacy `getLyrics` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PlainLyrics {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ScanStatus {
    #[serde(default)]
    pub scanning: bool,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AlbumList {
    #[serde(default)]
    pub album: Vec<Album>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ArtistIndexes {
    #[serde(default)]
    pub index: Vec<ArtistIndex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ArtistIndex {
    #[serde(default)]
    pub artist: Vec<Artist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PlaylistList {
    #[serde(default)]
    pub playlist: Vec<Playlist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SongList {
    #[serde(default)]
    pub song: Vec<Song>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_tolerates_missing_optional_fields() {
        let s: Song = serde_json::from_str(r#"{"id":"1","title":"Intro"}"#).unwrap();
        assert_eq!(s.display(), "Intro");
        assert!(!s.is_starred());

        let s: Song = serde_json::from_str(
            r#"{"id":"2","title":"Song","artist":"Band","duration":215,"albumId":"al-1","starred":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(s.display(), "Song - Band");
        assert_eq!(s.duration, Some(215));
        assert_eq!(s.album_id.as_deref(), Some("al-1"));
        assert!(s.is_starred());
    }

    #[test]
    fn album_list_kind_cycles_and_parses() {
        assert_eq!(AlbumListKind::Starred.next(), AlbumListKind::Newest);
        assert_eq!(AlbumListKind::parse("alphabeticalbyname"), Some(AlbumListKind::AlphabeticalByName));
        assert_eq!(AlbumListKind::parse("nope"), None);
    }

    #[test]
    fn star_target_picks_protocol_parameter() {
        assert_eq!(StarTarget::Album("a1".into()).param(), ("albumId", "a1"));
        assert_eq!(StarTarget::Song("s1".into()).param(), ("id", "s1"));
    }
}
