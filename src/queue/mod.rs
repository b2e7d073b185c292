use crate::subsonic::models::Song;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "Repeat: Off",
            RepeatMode::One => "Repeat: One",
            RepeatMode::All => "Repeat: All",
        }
    }
}

/// Serializable queue state for persistence across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub songs: Vec<Song>,
    pub current_index: Option<usize>,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

#[derive(Debug, Clone, Default)]
pub struct Queue {
    songs: Vec<Song>,
    current_index: Option<usize>,
    shuffle_enabled: bool,
    shuffle_order: Vec<usize>,
    repeat: RepeatMode,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single song to the end of the queue
    pub fn add(&mut self, song: Song) {
        self.songs.push(song);
        self.after_append(1);
    }

    /// Add multiple songs to the end of the queue
    pub fn add_many(&mut self, songs: Vec<Song>) {
        let n = songs.len();
        self.songs.extend(songs);
        self.after_append(n);
    }

    /// Insert songs right after the current one ("play next").
    pub fn insert_next(&mut self, songs: Vec<Song>) {
        if songs.is_empty() {
            return;
        }
        let Some(current) = self.current_index else {
            self.add_many(songs);
            return;
        };

        let at = current + 1;
        let n = songs.len();
        self.songs.splice(at..at, songs);

        if self.shuffle_enabled {
            // Shift indices at or after the insertion point, then slot the new
            // songs directly after the current one in play order.
            for idx in self.shuffle_order.iter_mut() {
                if *idx >= at {
                    *idx += n;
                }
            }
            let pos = self
                .shuffle_order
                .iter()
                .position(|&x| x == current)
                .map(|p| p + 1)
                .unwrap_or(0);
            self.shuffle_order.splice(pos..pos, at..at + n);
        }
    }

    /// Replace the entire queue and make `start` current.
    pub fn replace(&mut self, songs: Vec<Song>, start: usize) {
        self.songs = songs;
        self.current_index = if self.songs.is_empty() {
            None
        } else {
            Some(start.min(self.songs.len() - 1))
        };
        self.rebuild_shuffle_order();
    }

    /// Remove the song at the given index.
    ///
    /// When the current song is removed, the song that followed it becomes
    /// current (or the new last song if it was at the end).
    pub fn remove(&mut self, index: usize) -> Option<Song> {
        if index >= self.songs.len() {
            return None;
        }

        // Under shuffle the song that follows is the next one in play order.
        let shuffle_successor = if self.shuffle_enabled && self.current_index == Some(index) {
            let order = self.order();
            order.iter().position(|&x| x == index).and_then(|pos| {
                order
                    .get(pos + 1)
                    .or_else(|| pos.checked_sub(1).and_then(|p| order.get(p)))
                    .copied()
            })
        } else {
            None
        };

        let song = self.songs.remove(index);

        if let Some(current) = self.current_index {
            if index < current {
                self.current_index = Some(current - 1);
            } else if index == current {
                if self.songs.is_empty() {
                    self.current_index = None;
                } else if let Some(next) = shuffle_successor {
                    self.current_index = Some(if next > index { next - 1 } else { next });
                } else if current >= self.songs.len() {
                    self.current_index = Some(self.songs.len() - 1);
                }
            }
        }

        if self.shuffle_enabled {
            self.shuffle_order.retain(|&x| x != index);
            for idx in self.shuffle_order.iter_mut() {
                if *idx > index {
                    *idx -= 1;
                }
            }
        }
        Some(song)
    }

    /// Clear the entire queue
    pub fn clear(&mut self) {
        self.songs.clear();
        self.current_index = None;
        self.shuffle_order.clear();
    }

    /// Move a song from one position to another
    pub fn move_track(&mut self, from: usize, to: usize) {
        if from >= self.songs.len() || to >= self.songs.len() || from == to {
            return;
        }

        let song = self.songs.remove(from);
        self.songs.insert(to, song);

        let remap = |i: usize| -> usize {
            if i == from {
                to
            } else if from < i && i <= to {
                i - 1
            } else if to <= i && i < from {
                i + 1
            } else {
                i
            }
        };

        self.current_index = self.current_index.map(remap);
        for idx in self.shuffle_order.iter_mut() {
            *idx = remap(*idx);
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.shuffle_enabled);
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle_enabled = enabled;
        self.rebuild_shuffle_order();
    }

    pub fn is_shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.next();
        self.repeat
    }

    /// Set the current playing index
    pub fn set_current(&mut self, index: usize) -> Option<&Song> {
        if index < self.songs.len() {
            self.current_index = Some(index);
        }
        self.current_song()
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.current_index.and_then(|i| self.songs.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Peek at the song that would follow on automatic advancement.
    pub fn peek_next(&self) -> Option<&Song> {
        let current = self.current_index?;
        let idx = self.next_index(current, true)?;
        self.songs.get(idx)
    }

    /// Move to the next song, honouring shuffle and repeat.
    ///
    /// `auto` is true when the previous song finished on its own; only then
    /// does repeat-one keep the same song.
    pub fn advance(&mut self, auto: bool) -> Option<&Song> {
        let current = self.current_index?;
        let next = self.next_index(current, auto)?;
        self.current_index = Some(next);
        self.songs.get(next)
    }

    /// Go to the previous song. Wraps to the end under repeat-all and
    /// repeat-one, mirroring a manual `advance`.
    pub fn go_back(&mut self) -> Option<&Song> {
        let current = self.current_index?;
        let prev = self.prev_index(current)?;
        self.current_index = Some(prev);
        self.songs.get(prev)
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// Update the starred flag of every queued copy of a song.
    pub fn set_starred(&mut self, id: &str, starred: Option<String>) {
        for song in self.songs.iter_mut().filter(|s| s.id == id) {
            song.starred = starred.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Total duration in seconds of the queued songs with a known length.
    pub fn total_duration(&self) -> u64 {
        self.songs
            .iter()
            .filter_map(|s| s.duration)
            .map(u64::from)
            .sum()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            songs: self.songs.clone(),
            current_index: self.current_index,
            shuffle: self.shuffle_enabled,
            repeat: self.repeat,
        }
    }

    pub fn restore(&mut self, snap: QueueSnapshot) {
        self.songs = snap.songs;
        self.current_index = snap
            .current_index
            .filter(|&i| i < self.songs.len())
            .or(if self.songs.is_empty() { None } else { Some(0) });
        self.shuffle_enabled = snap.shuffle;
        self.repeat = snap.repeat;
        self.rebuild_shuffle_order();
    }

    /// Play order as indices into `songs()`.
    fn order(&self) -> Vec<usize> {
        if self.shuffle_enabled && self.shuffle_order.len() == self.songs.len() {
            self.shuffle_order.clone()
        } else {
            (0..self.songs.len()).collect()
        }
    }

    fn next_index(&self, current: usize, auto: bool) -> Option<usize> {
        if self.songs.is_empty() {
            return None;
        }
        if auto && self.repeat == RepeatMode::One {
            return Some(current);
        }

        let order = self.order();
        let pos = order.iter().position(|&x| x == current)?;
        if pos + 1 < order.len() {
            Some(order[pos + 1])
        } else if self.repeat != RepeatMode::Off {
            order.first().copied()
        } else {
            None
        }
    }

    fn prev_index(&self, current: usize) -> Option<usize> {
        if self.songs.is_empty() {
            return None;
        }

        let order = self.order();
        let pos = order.iter().position(|&x| x == current)?;
        if pos > 0 {
            Some(order[pos - 1])
        } else if self.repeat != RepeatMode::Off {
            order.last().copied()
        } else {
            None
        }
    }

    fn after_append(&mut self, added: usize) {
        if self.current_index.is_none() && !self.songs.is_empty() {
            self.current_index = Some(0);
            // Nothing was playing: the new current song must lead the order.
            self.rebuild_shuffle_order();
            return;
        }
        if self.shuffle_enabled {
            // Appended songs are shuffled among themselves and played after
            // everything already in the order.
            let start = self.songs.len() - added;
            let mut tail: Vec<usize> = (start..self.songs.len()).collect();
            tail.shuffle(&mut rand::rng());
            self.shuffle_order.extend(tail);
            if self.shuffle_order.len() != self.songs.len() {
                self.rebuild_shuffle_order();
            }
        }
    }

    fn rebuild_shuffle_order(&mut self) {
        if !self.shuffle_enabled || self.songs.is_empty() {
            self.shuffle_order.clear();
            return;
        }

        let mut rng = rand::rng();
        self.shuffle_order = (0..self.songs.len()).collect();
        self.shuffle_order.shuffle(&mut rng);

        // The current song leads the shuffled order.
        if let Some(current) = self.current_index
            && let Some(pos) = self.shuffle_order.iter().position(|&x| x == current)
        {
            self.shuffle_order.swap(0, pos);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            title: format!("Song {}", id),
            album: Some("Album".to_string()),
            album_id: Some("al-1".to_string()),
            artist: Some("Artist".to_string()),
            artist_id: None,
            track: None,
            disc_number: None,
            year: None,
            duration: Some(180),
            bit_rate: None,
            suffix: None,
            cover_art: None,
            starred: None,
        }
    }

    fn songs(ids: &[&str]) -> Vec<Song> {
        ids.iter().map(|id| make_song(id)).collect()
    }

    fn current_id(q: &Queue) -> &str {
        q.current_song().map(|s| s.id.as_str()).unwrap_or("")
    }

    #[test]
    fn test_add_and_len() {
        let mut queue = Queue::new();
        assert!(queue.is_empty());

        queue.add(make_song("1"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.current_index(), Some(0));

        queue.add(make_song("2"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.total_duration(), 360);
    }

    #[test]
    fn test_replace() {
        let mut queue = Queue::new();
        queue.add(make_song("1"));

        queue.replace(songs(&["2", "3", "4"]), 1);
        assert_eq!(queue.len(), 3);
        assert_eq!(current_id(&queue), "3");

        queue.replace(songs(&["5"]), 9);
        assert_eq!(queue.current_index(), Some(0));

        queue.replace(Vec::new(), 0);
        assert_eq!(queue.current_index(), None);
    }

    #[test]
    fn test_advance() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3"]), 0);

        assert_eq!(current_id(&queue), "1");
        queue.advance(true);
        assert_eq!(current_id(&queue), "2");
        queue.advance(true);
        assert_eq!(current_id(&queue), "3");
        assert!(queue.advance(true).is_none()); // End of queue
        assert_eq!(current_id(&queue), "3");
    }

    #[test]
    fn repeat_all_wraps_both_ways() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2"]), 1);
        queue.set_repeat(RepeatMode::All);

        assert_eq!(queue.advance(true).map(|s| s.id.clone()), Some("1".into()));
        assert_eq!(queue.go_back().map(|s| s.id.clone()), Some("2".into()));
    }

    #[test]
    fn repeat_one_only_holds_on_automatic_advance() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2"]), 0);
        queue.set_repeat(RepeatMode::One);

        queue.advance(true);
        assert_eq!(current_id(&queue), "1");
        queue.advance(false);
        assert_eq!(current_id(&queue), "2");
        // Manual next at the end wraps under repeat-one, like repeat-all.
        queue.advance(false);
        assert_eq!(current_id(&queue), "1");
        // And so does manual previous at the start.
        queue.go_back();
        assert_eq!(current_id(&queue), "2");
    }

    #[test]
    fn previous_at_start_stops_without_repeat() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2"]), 0);
        assert!(queue.go_back().is_none());
        assert_eq!(current_id(&queue), "1");
    }

    #[test]
    fn test_remove() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3"]), 1);

        queue.remove(0);
        assert_eq!(queue.current_index(), Some(0));
        assert_eq!(current_id(&queue), "2");
    }

    #[test]
    fn removing_current_promotes_the_following_song() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3"]), 1);
        queue.remove(1);
        assert_eq!(current_id(&queue), "3");

        queue.remove(1);
        assert_eq!(current_id(&queue), "1");

        queue.remove(0);
        assert_eq!(queue.current_index(), None);
        assert!(queue.remove(0).is_none());
    }

    #[test]
    fn move_track_keeps_current_song() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3", "4"]), 1);

        queue.move_track(0, 3);
        assert_eq!(current_id(&queue), "2");
        assert_eq!(queue.current_index(), Some(0));

        queue.move_track(0, 2);
        assert_eq!(current_id(&queue), "2");
        assert_eq!(queue.current_index(), Some(2));

        queue.move_track(3, 0);
        assert_eq!(current_id(&queue), "2");
        let ids: Vec<_> = queue.songs().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["1", "3", "4", "2"]);
    }

    #[test]
    fn insert_next_plays_after_current() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3"]), 0);
        queue.insert_next(songs(&["a", "b"]));

        let ids: Vec<_> = queue.songs().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["1", "a", "b", "2", "3"]);
        assert_eq!(queue.peek_next().map(|s| s.id.as_str()), Some("a"));
    }

    #[test]
    fn insert_next_respects_shuffle_order() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3", "4"]), 2);
        queue.set_shuffle(true);
        queue.insert_next(songs(&["x"]));

        assert_eq!(current_id(&queue), "3");
        assert_eq!(queue.peek_next().map(|s| s.id.as_str()), Some("x"));
    }

    #[test]
    fn shuffle_visits_every_song_once_starting_from_current() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3", "4", "5", "6"]), 3);
        queue.set_shuffle(true);

        let mut seen = vec![queue.current_song().unwrap().id.clone()];
        assert_eq!(seen[0], "4");
        while let Some(s) = queue.advance(true) {
            seen.push(s.id.clone());
        }
        seen.sort();
        assert_eq!(seen, ["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn shuffle_order_survives_removal_and_append() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3", "4"]), 0);
        queue.set_shuffle(true);
        queue.remove(2);
        queue.add_many(songs(&["5", "6"]));

        let mut seen = vec![current_id(&queue).to_string()];
        while let Some(s) = queue.advance(true) {
            seen.push(s.id.clone());
        }
        seen.sort();
        assert_eq!(seen, ["1", "2", "4", "5", "6"]);
    }

    fn play_to_end(queue: &mut Queue) -> Vec<String> {
        let mut seen: Vec<String> = queue.current_song().map(|s| s.id.clone()).into_iter().collect();
        while let Some(s) = queue.advance(true) {
            seen.push(s.id.clone());
        }
        seen.sort();
        seen
    }

    #[test]
    fn shuffled_append_to_empty_queue_plays_everything() {
        for _ in 0..50 {
            let mut queue = Queue::new();
            queue.set_shuffle(true);
            queue.add_many(songs(&["1", "2", "3", "4", "5", "6"]));
            assert_eq!(play_to_end(&mut queue), ["1", "2", "3", "4", "5", "6"]);

            queue.clear();
            queue.add(make_song("7"));
            queue.add_many(songs(&["8", "9"]));
            assert_eq!(play_to_end(&mut queue), ["7", "8", "9"]);
        }
    }

    #[test]
    fn removing_current_under_shuffle_keeps_the_play_order() {
        for _ in 0..50 {
            let mut queue = Queue::new();
            queue.replace(songs(&["1", "2", "3", "4", "5", "6"]), 0);
            queue.set_shuffle(true);
            let expected_next = queue.peek_next().map(|s| s.id.clone());

            queue.remove(0);
            assert_eq!(queue.current_song().map(|s| s.id.clone()), expected_next);
            assert_eq!(play_to_end(&mut queue), ["2", "3", "4", "5", "6"]);
        }
    }

    #[test]
    fn removing_last_in_shuffle_order_falls_back_to_the_one_before() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "3"]), 0);
        queue.set_shuffle(true);
        queue.advance(true);
        queue.advance(true);
        let last = queue.current_index().unwrap();
        let before = queue.order()[1];
        let before_id = queue.songs()[before].id.clone();

        queue.remove(last);
        assert_eq!(current_id(&queue), before_id);
    }

    #[test]
    fn snapshot_round_trip_clamps_index() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2"]), 1);
        queue.set_repeat(RepeatMode::All);
        let mut snap = queue.snapshot();
        assert_eq!(snap.current_index, Some(1));

        let mut restored = Queue::new();
        restored.restore(snap.clone());
        assert_eq!(current_id(&restored), "2");
        assert_eq!(restored.repeat(), RepeatMode::All);

        snap.current_index = Some(10);
        restored.restore(snap);
        assert_eq!(restored.current_index(), Some(0));
    }

    #[test]
    fn test_clear() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2"]), 0);

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.current_index().is_none());
    }

    #[test]
    fn set_starred_marks_every_copy() {
        let mut queue = Queue::new();
        queue.replace(songs(&["1", "2", "1"]), 0);
        queue.set_starred("1", Some("2024-01-01".into()));
        let starred: Vec<bool> = queue.songs().iter().map(|s| s.is_starred()).collect();
        assert_eq!(starred, [true, false, true]);
    }
}
