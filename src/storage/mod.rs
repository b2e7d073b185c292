use crate::queue::{QueueSnapshot, RepeatMode};
use crate::subsonic::models::Song;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "mice.sqlite3";

/// Queue, history and lyrics cache in one SQLite file.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    #[cfg(test)]
    fn in_memory() -> anyhow::Result<Self> {
        let s = Self {
            conn: Connection::open_in_memory()?,
        };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS play_queue (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  songs_json TEXT NOT NULL,
  current_index INTEGER,
  position REAL NOT NULL DEFAULT 0,
  shuffle INTEGER NOT NULL DEFAULT 0,
  repeat TEXT NOT NULL DEFAULT 'off',
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS play_history (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  song_id TEXT NOT NULL,
  song_json TEXT NOT NULL,
  played_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_played_at ON play_history(played_at DESC);
CREATE INDEX IF NOT EXISTS idx_history_song_id ON play_history(song_id);

CREATE TABLE IF NOT EXISTS lyrics_cache (
  song_id TEXT PRIMARY KEY,
  lrc_content TEXT NOT NULL,
  synced INTEGER DEFAULT 0,
  fetched_at INTEGER NOT NULL
);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    /// Overwrite the saved queue.
    pub fn save_queue(
        &self,
        snapshot: &QueueSnapshot,
        position: f64,
        now_unix: i64,
    ) -> anyhow::Result<()> {
        let songs_json = serde_json::to_string(&snapshot.songs).context("encode queue")?;
        let repeat = serde_json::to_value(snapshot.repeat)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "off".into());
        self.conn
            .execute(
                r#"
INSERT INTO play_queue(id, songs_json, current_index, position, shuffle, repeat, updated_at)
VALUES(1, ?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(id) DO UPDATE SET
  songs_json=excluded.songs_json,
  current_index=excluded.current_index,
  position=excluded.position,
  shuffle=excluded.shuffle,
  repeat=excluded.repeat,
  updated_at=excluded.updated_at
"#,
                params![
                    songs_json,
                    snapshot.current_index.map(|i| i as i64),
                    position,
                    snapshot.shuffle,
                    repeat,
                    now_unix
                ],
            )
            .context("save queue")?;
        Ok(())
    }

    /// The saved queue and playback position, if any.
    pub fn load_queue(&self) -> anyhow::Result<Option<(QueueSnapshot, f64)>> {
        let row = self
            .conn
            .query_row(
                "SELECT songs_json, current_index, position, shuffle, repeat FROM play_queue WHERE id=1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("load queue")?;

        let Some((songs_json, current_index, position, shuffle, repeat)) = row else {
            return Ok(None);
        };
        let songs: Vec<Song> = match serde_json::from_str(&songs_json) {
            Ok(songs) => songs,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable saved queue");
                return Ok(None);
            }
        };
        let repeat: RepeatMode =
            serde_json::from_value(serde_json::Value::String(repeat)).unwrap_or_default();

        Ok(Some((
            QueueSnapshot {
                songs,
                current_index: current_index.and_then(|i| usize::try_from(i).ok()),
                shuffle,
                repeat,
            },
            position,
        )))
    }

    pub fn add_to_history(&self, song: &Song, played_at: i64) -> anyhow::Result<()> {
        let song_json = serde_json::to_string(song).context("encode song")?;
        self.conn
            .execute(
                "INSERT INTO play_history(song_id, song_json, played_at) VALUES(?1, ?2, ?3)",
                params![song.id, song_json, played_at],
            )
            .context("add to history")?;
        Ok(())
    }

    /// Most recent first, unique songs only.
    pub fn get_history(&self, limit: usize) -> anyhow::Result<Vec<Song>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT h.song_json
FROM play_history h
JOIN (
  SELECT song_id, MAX(id) AS last_id FROM play_history GROUP BY song_id
) latest ON h.id = latest.last_id
ORDER BY h.played_at DESC, h.id DESC
LIMIT ?1
"#,
        )?;

        let songs = stmt
            .query_map(params![limit as i64], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|json| serde_json::from_str::<Song>(&json).ok())
            .collect();
        Ok(songs)
    }

    pub fn clear_history(&self) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM play_history", [])
            .context("clear history")?;
        Ok(())
    }

    pub fn cache_lyrics(
        &self,
        song_id: &str,
        lrc_content: &str,
        synced: bool,
        now_unix: i64,
    ) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO lyrics_cache(song_id, lrc_content, synced, fetched_at)
VALUES(?1, ?2, ?3, ?4)
ON CONFLICT(song_id) DO UPDATE SET
  lrc_content=excluded.lrc_content,
  synced=excluded.synced,
  fetched_at=excluded.fetched_at
"#,
                params![song_id, lrc_content, synced, now_unix],
            )
            .context("cache lyrics")?;
        Ok(())
    }

    pub fn get_lyrics(&self, song_id: &str) -> anyhow::Result<Option<(String, bool)>> {
        self.conn
            .query_row(
                "SELECT lrc_content, synced FROM lyrics_cache WHERE song_id=?1",
                params![song_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()
            .context("read cached lyrics")
    }

    /// Drop cached lyrics. Returns how many entries were removed.
    pub fn clear_lyrics(&self) -> anyhow::Result<usize> {
        self.conn
            .execute("DELETE FROM lyrics_cache", [])
            .context("clear lyrics cache")
    }
}

/// Opens the database per operation so it can be moved into
/// `spawn_blocking` closures.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    path: PathBuf,
}

impl StorageHandle {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(DB_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> anyhow::Result<Storage> {
        Storage::open(&self.path)
    }

    /// Size of the database file on disk.
    pub fn size_bytes(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    pub fn save_queue(&self, snapshot: &QueueSnapshot, position: f64, now: i64) -> anyhow::Result<()> {
        self.open()?.save_queue(snapshot, position, now)
    }

    pub fn load_queue(&self) -> anyhow::Result<Option<(QueueSnapshot, f64)>> {
        self.open()?.load_queue()
    }

    pub fn add_to_history(&self, song: &Song, played_at: i64) -> anyhow::Result<()> {
        self.open()?.add_to_history(song, played_at)
    }

    pub fn get_history(&self, limit: usize) -> anyhow::Result<Vec<Song>> {
        self.open()?.get_history(limit)
    }

    pub fn clear_history(&self) -> anyhow::Result<()> {
        self.open()?.clear_history()
    }

    pub fn get_lyrics(&self, song_id: &str) -> anyhow::Result<Option<(String, bool)>> {
        self.open()?.get_lyrics(song_id)
    }

    pub fn cache_lyrics(&self, song_id: &str, lrc: &str, synced: bool, now: i64) -> anyhow::Result<()> {
        self.open()?.cache_lyrics(song_id, lrc, synced, now)
    }

    pub fn clear_lyrics(&self) -> anyhow::Result<usize> {
        self.open()?.clear_lyrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::make_song;

    #[test]
    fn queue_round_trips_and_overwrites() {
        let s = Storage::in_memory().unwrap();
        assert!(s.load_queue().unwrap().is_none());

        let snap = QueueSnapshot {
            songs: vec![make_song("1"), make_song("2")],
            current_index: Some(1),
            shuffle: true,
            repeat: RepeatMode::One,
        };
        s.save_queue(&snap, 42.5, 100).unwrap();
        let (loaded, pos) = s.load_queue().unwrap().unwrap();
        assert_eq!(loaded, snap);
        assert_eq!(pos, 42.5);

        let empty = QueueSnapshot::default();
        s.save_queue(&empty, 0.0, 200).unwrap();
        let (loaded, _) = s.load_queue().unwrap().unwrap();
        assert!(loaded.songs.is_empty());
        assert_eq!(loaded.current_index, None);
    }

    #[test]
    fn history_is_unique_and_newest_first() {
        let s = Storage::in_memory().unwrap();
        s.add_to_history(&make_song("a"), 10).unwrap();
        s.add_to_history(&make_song("b"), 20).unwrap();
        s.add_to_history(&make_song("a"), 30).unwrap();

        let ids: Vec<String> = s.get_history(10).unwrap().into_iter().map(|x| x.id).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(s.get_history(1).unwrap().len(), 1);

        s.clear_history().unwrap();
        assert!(s.get_history(10).unwrap().is_empty());
    }

    #[test]
    fn lyrics_cache_upserts() {
        let s = Storage::in_memory().unwrap();
        assert!(s.get_lyrics("1").unwrap().is_none());
        s.cache_lyrics("1", "plain", false, 1).unwrap();
        s.cache_lyrics("1", "[00:01.00]x", true, 2).unwrap();
        assert_eq!(s.get_lyrics("1").unwrap(), Some(("[00:01.00]x".into(), true)));
        assert_eq!(s.clear_lyrics().unwrap(), 1);
    }

    #[test]
    fn handle_creates_database_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StorageHandle::new(&dir.path().join("nested"));
        handle.add_to_history(&make_song("x"), 5).unwrap();
        assert!(handle.path().exists());
        assert!(handle.size_bytes() > 0);
        assert_eq!(handle.get_history(5).unwrap()[0].id, "x");
    }
}
