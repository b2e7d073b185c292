//! Audio session state machine.
//!
//! [`Session`] owns the play queue and decides what should happen next; it
//! never touches mpv, the database or the network. Every input returns a list
//! of [`Effect`]s which the app executes in order.

use crate::queue::{Queue, QueueSnapshot, RepeatMode};
use crate::scrobble::ScrobbleTracker;
use crate::subsonic::models::Song;

/// `previous` restarts the current song instead of going back once this far in.
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;
/// Minimum playback progress between two position saves.
pub const PERSIST_INTERVAL_SECS: f64 = 5.0;
/// Consecutive load failures tolerated before playback stops.
const MAX_LOAD_ERRORS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

impl PlayState {
    pub fn label(self) -> &'static str {
        match self {
            PlayState::Idle => "Stopped",
            PlayState::Loading => "Loading",
            PlayState::Playing => "Playing",
            PlayState::Paused => "Paused",
            PlayState::Ended => "Ended",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            PlayState::Playing => "▶",
            PlayState::Paused => "⏸",
            PlayState::Loading => "…",
            PlayState::Idle | PlayState::Ended => "■",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Load {
        song: Song,
        start_at: f64,
        paused: bool,
    },
    Pause,
    Resume,
    Seek(f64),
    Stop,
    SetVolume(u8),
    NowPlaying(Song),
    Scrobble {
        song: Song,
        played_at: i64,
    },
    /// Save queue and position.
    Persist,
    /// Refresh the OS-facing now-playing surface.
    MediaSession,
}

#[derive(Debug, Clone)]
pub struct Session {
    queue: Queue,
    state: PlayState,
    tracker: ScrobbleTracker,
    position: f64,
    duration: f64,
    volume: u8,
    last_persisted: f64,
    load_errors: u32,
    started_at: Option<i64>,
    announced: bool,
    pending_paused: bool,
}

impl Session {
    pub fn new(volume: u8, threshold_percent: u8) -> Self {
        Self {
            queue: Queue::new(),
            state: PlayState::Idle,
            tracker: ScrobbleTracker::new(threshold_percent),
            position: 0.0,
            duration: 0.0,
            volume: volume.min(100),
            last_persisted: 0.0,
            load_errors: 0,
            started_at: None,
            announced: false,
            pending_paused: false,
        }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn current(&self) -> Option<&Song> {
        self.queue.current_song()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            PlayState::Loading | PlayState::Playing | PlayState::Paused
        )
    }

    /// What the app should save right now.
    pub fn snapshot(&self) -> (QueueSnapshot, f64) {
        (self.queue.snapshot(), self.position)
    }

    pub fn set_scrobble_threshold(&mut self, percent: u8) {
        self.tracker.set_threshold(percent);
    }

    /// Mirror a star change the server accepted onto queued songs.
    pub fn apply_star(&mut self, song_id: &str, starred: bool) {
        self.queue
            .set_starred(song_id, starred.then(|| "now".to_string()));
    }

    // ---- user input -------------------------------------------------------

    /// Replace the queue and start playing `songs[start]`.
    pub fn play_songs(&mut self, songs: Vec<Song>, start: usize) -> Vec<Effect> {
        self.queue.replace(songs, start);
        self.load_errors = 0;
        self.load_current(0.0, false)
    }

    pub fn play_index(&mut self, index: usize) -> Vec<Effect> {
        if index >= self.queue.len() {
            return Vec::new();
        }
        self.queue.set_current(index);
        self.load_errors = 0;
        self.load_current(0.0, false)
    }

    /// User skip. Repeat-one does not hold here.
    pub fn next(&mut self) -> Vec<Effect> {
        if self.queue.advance(false).is_none() {
            return Vec::new();
        }
        self.load_errors = 0;
        self.load_current(0.0, false)
    }

    pub fn previous(&mut self) -> Vec<Effect> {
        if self.current().is_none() {
            return Vec::new();
        }
        if self.position > RESTART_THRESHOLD_SECS || self.queue.go_back().is_none() {
            return self.seek(0.0);
        }
        self.load_errors = 0;
        self.load_current(0.0, false)
    }

    pub fn toggle_pause(&mut self) -> Vec<Effect> {
        match self.state {
            PlayState::Playing => {
                self.state = PlayState::Paused;
                self.mark_persisted();
                vec![Effect::Pause, Effect::Persist, Effect::MediaSession]
            }
            PlayState::Paused => {
                self.state = PlayState::Playing;
                let mut fx = vec![Effect::Resume];
                fx.extend(self.announce());
                fx.push(Effect::MediaSession);
                fx
            }
            PlayState::Loading => {
                self.pending_paused = !self.pending_paused;
                vec![if self.pending_paused {
                    Effect::Pause
                } else {
                    Effect::Resume
                }]
            }
            PlayState::Idle | PlayState::Ended => {
                if self.current().is_none() {
                    return Vec::new();
                }
                self.load_errors = 0;
                let start = if self.state == PlayState::Idle {
                    self.position
                } else {
                    0.0
                };
                self.load_current(start, false)
            }
        }
    }

    pub fn seek(&mut self, secs: f64) -> Vec<Effect> {
        if self.current().is_none() || self.state == PlayState::Idle {
            return Vec::new();
        }
        let mut target = secs.max(0.0);
        if self.duration > 0.0 {
            target = target.min(self.duration);
        }
        self.position = target;
        self.tracker.on_seek();
        self.mark_persisted();
        vec![Effect::Seek(target), Effect::Persist]
    }

    pub fn seek_relative(&mut self, delta: f64) -> Vec<Effect> {
        self.seek(self.position + delta)
    }

    pub fn set_volume(&mut self, volume: i32) -> Vec<Effect> {
        let v = volume.clamp(0, 100) as u8;
        if v == self.volume {
            return Vec::new();
        }
        self.volume = v;
        vec![Effect::SetVolume(v)]
    }

    pub fn stop(&mut self) -> Vec<Effect> {
        if self.state == PlayState::Idle {
            return Vec::new();
        }
        self.state = PlayState::Idle;
        self.pending_paused = false;
        self.mark_persisted();
        vec![Effect::Stop, Effect::Persist, Effect::MediaSession]
    }

    // ---- player reports ---------------------------------------------------

    /// The backend opened the file.
    pub fn on_loaded(&mut self) -> Vec<Effect> {
        if self.state != PlayState::Loading {
            return Vec::new();
        }
        self.load_errors = 0;
        if self.pending_paused {
            self.state = PlayState::Paused;
            return vec![Effect::MediaSession];
        }
        self.on_started()
    }

    /// Audio is actually coming out. Announces the song once per play.
    pub fn on_started(&mut self) -> Vec<Effect> {
        if self.current().is_none() {
            return Vec::new();
        }
        self.state = PlayState::Playing;
        self.pending_paused = false;
        let mut fx = self.announce();
        fx.push(Effect::MediaSession);
        fx
    }

    /// Pause state reported by the backend (including external changes).
    pub fn on_paused(&mut self, paused: bool) -> Vec<Effect> {
        match (self.state, paused) {
            (PlayState::Playing, true) => {
                self.state = PlayState::Paused;
                self.mark_persisted();
                vec![Effect::Persist, Effect::MediaSession]
            }
            (PlayState::Paused, false) => self.on_started(),
            _ => Vec::new(),
        }
    }

    pub fn on_position(&mut self, pos: f64) -> Vec<Effect> {
        if !self.is_active() || pos < 0.0 {
            return Vec::new();
        }
        self.position = pos;
        if self.state != PlayState::Playing {
            return Vec::new();
        }

        let mut fx = Vec::new();
        if self.tracker.on_position(pos)
            && let Some(song) = self.current()
        {
            let played_at = self
                .started_at
                .unwrap_or_else(|| time::OffsetDateTime::now_utc().unix_timestamp());
            fx.push(Effect::Scrobble {
                song: song.clone(),
                played_at,
            });
        }
        if (pos - self.last_persisted).abs() >= PERSIST_INTERVAL_SECS {
            self.last_persisted = pos;
            fx.push(Effect::Persist);
        }
        fx
    }

    pub fn on_duration(&mut self, duration: f64) {
        if duration > 0.0 {
            self.duration = duration;
            self.tracker.set_duration(duration);
        }
    }

    /// The current song played to the end.
    pub fn on_ended(&mut self) -> Vec<Effect> {
        if !self.is_active() {
            return Vec::new();
        }
        if self.queue.advance(true).is_some() {
            return self.load_current(0.0, false);
        }
        self.state = PlayState::Ended;
        self.position = 0.0;
        self.mark_persisted();
        vec![Effect::Persist, Effect::MediaSession]
    }

    /// The current song failed to load or play.
    pub fn on_error(&mut self) -> Vec<Effect> {
        if self.current().is_none() {
            return Vec::new();
        }
        self.load_errors += 1;
        if self.load_errors < MAX_LOAD_ERRORS && self.queue.advance(false).is_some() {
            return self.load_current(0.0, false);
        }
        self.load_errors = 0;
        self.state = PlayState::Idle;
        self.position = 0.0;
        self.mark_persisted();
        vec![Effect::Stop, Effect::Persist, Effect::MediaSession]
    }

    // ---- queue edits ------------------------------------------------------

    pub fn enqueue(&mut self, songs: Vec<Song>) -> Vec<Effect> {
        if songs.is_empty() {
            return Vec::new();
        }
        let was_empty = self.queue.is_empty();
        self.queue.add_many(songs);
        if was_empty {
            self.load_errors = 0;
            return self.load_current(0.0, false);
        }
        vec![Effect::Persist]
    }

    pub fn enqueue_next(&mut self, songs: Vec<Song>) -> Vec<Effect> {
        if songs.is_empty() {
            return Vec::new();
        }
        if self.queue.is_empty() {
            return self.enqueue(songs);
        }
        self.queue.insert_next(songs);
        vec![Effect::Persist]
    }

    /// Remove a queue entry. Removing the playing song moves on to the one
    /// that took its place.
    pub fn remove(&mut self, index: usize) -> Vec<Effect> {
        let was_current = self.queue.current_index() == Some(index);
        if self.queue.remove(index).is_none() {
            return Vec::new();
        }
        if !was_current {
            return vec![Effect::Persist];
        }
        if self.queue.is_empty() {
            return self.reset_idle();
        }
        if self.is_active() {
            return self.load_current(0.0, self.state == PlayState::Paused);
        }
        self.position = 0.0;
        vec![Effect::Persist, Effect::MediaSession]
    }

    pub fn move_track(&mut self, from: usize, to: usize) -> Vec<Effect> {
        if from >= self.queue.len() || to >= self.queue.len() || from == to {
            return Vec::new();
        }
        self.queue.move_track(from, to);
        vec![Effect::Persist]
    }

    pub fn clear_queue(&mut self) -> Vec<Effect> {
        if self.queue.is_empty() {
            return Vec::new();
        }
        self.queue.clear();
        self.reset_idle()
    }

    pub fn toggle_shuffle(&mut self) -> (bool, Vec<Effect>) {
        self.queue.toggle_shuffle();
        (self.queue.is_shuffle_enabled(), vec![Effect::Persist])
    }

    pub fn cycle_repeat(&mut self) -> (RepeatMode, Vec<Effect>) {
        (self.queue.cycle_repeat(), vec![Effect::Persist])
    }

    /// Bring back a saved queue. The saved song is loaded paused at `position`
    /// and is not announced until the user resumes.
    pub fn restore(&mut self, snapshot: QueueSnapshot, position: f64) -> Vec<Effect> {
        self.queue.restore(snapshot);
        if self.current().is_none() {
            return Vec::new();
        }
        self.load_current(position.max(0.0), true)
            .into_iter()
            .filter(|fx| !matches!(fx, Effect::Persist))
            .collect()
    }

    // ---- internals --------------------------------------------------------

    fn load_current(&mut self, start_at: f64, paused: bool) -> Vec<Effect> {
        let Some(song) = self.queue.current_song().cloned() else {
            return self.reset_idle();
        };
        let duration = song.duration.map(f64::from).unwrap_or(0.0);
        if duration > 0.0 && start_at >= duration {
            return self.load_current(0.0, paused);
        }

        self.state = PlayState::Loading;
        self.position = start_at;
        self.duration = duration;
        self.tracker.reset(duration);
        self.started_at = None;
        self.announced = false;
        self.pending_paused = paused;
        self.mark_persisted();

        tracing::debug!(song = %song.id, start_at, paused, "load");
        vec![
            Effect::Load {
                song,
                start_at,
                paused,
            },
            Effect::Persist,
            Effect::MediaSession,
        ]
    }

    fn announce(&mut self) -> Vec<Effect> {
        if self.announced {
            return Vec::new();
        }
        let Some(song) = self.current().cloned() else {
            return Vec::new();
        };
        self.announced = true;
        self.started_at = Some(time::OffsetDateTime::now_utc().unix_timestamp());
        vec![Effect::NowPlaying(song)]
    }

    fn reset_idle(&mut self) -> Vec<Effect> {
        self.state = PlayState::Idle;
        self.position = 0.0;
        self.duration = 0.0;
        self.pending_paused = false;
        self.announced = false;
        self.mark_persisted();
        vec![Effect::Stop, Effect::Persist, Effect::MediaSession]
    }

    fn mark_persisted(&mut self) {
        self.last_persisted = self.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::make_song;

    fn songs(ids: &[&str]) -> Vec<Song> {
        ids.iter().map(|id| make_song(id)).collect()
    }

    fn loaded_id(fx: &[Effect]) -> Option<&str> {
        fx.iter().find_map(|e| match e {
            Effect::Load { song, .. } => Some(song.id.as_str()),
            _ => None,
        })
    }

    fn playing(ids: &[&str], start: usize) -> Session {
        let mut s = Session::new(80, 50);
        s.play_songs(songs(ids), start);
        s.on_loaded();
        s
    }

    #[test]
    fn play_then_load_announces_once() {
        let mut s = Session::new(80, 50);
        let fx = s.play_songs(songs(&["1", "2"]), 1);
        assert_eq!(loaded_id(&fx), Some("2"));
        assert_eq!(s.state(), PlayState::Loading);

        let fx = s.on_loaded();
        assert_eq!(s.state(), PlayState::Playing);
        assert!(matches!(fx.first(), Some(Effect::NowPlaying(song)) if song.id == "2"));

        s.toggle_pause();
        let fx = s.toggle_pause();
        assert!(!fx.iter().any(|e| matches!(e, Effect::NowPlaying(_))));
    }

    #[test]
    fn ended_advances_and_stops_at_the_end() {
        let mut s = playing(&["1", "2"], 0);
        assert_eq!(loaded_id(&s.on_ended()), Some("2"));
        s.on_loaded();

        let fx = s.on_ended();
        assert_eq!(loaded_id(&fx), None);
        assert_eq!(s.state(), PlayState::Ended);
        assert_eq!(s.current().map(|x| x.id.as_str()), Some("2"));

        // Play again from the top of the last song.
        assert_eq!(loaded_id(&s.toggle_pause()), Some("2"));
    }

    #[test]
    fn repeat_one_replays_on_end_but_next_moves_on() {
        let mut s = playing(&["1", "2"], 0);
        s.cycle_repeat();
        s.cycle_repeat();
        assert_eq!(s.queue().repeat(), RepeatMode::One);

        assert_eq!(loaded_id(&s.on_ended()), Some("1"));
        s.on_loaded();
        assert_eq!(loaded_id(&s.next()), Some("2"));
    }

    #[test]
    fn previous_restarts_after_three_seconds() {
        let mut s = playing(&["1", "2"], 1);
        s.on_position(10.0);
        let fx = s.previous();
        assert_eq!(fx.first(), Some(&Effect::Seek(0.0)));
        assert_eq!(s.current().map(|x| x.id.as_str()), Some("2"));

        let fx = s.previous();
        assert_eq!(loaded_id(&fx), Some("1"));

        // First song with nothing before it restarts too.
        s.on_loaded();
        assert_eq!(s.previous().first(), Some(&Effect::Seek(0.0)));
    }

    #[test]
    fn position_is_persisted_every_five_seconds() {
        let mut s = playing(&["1"], 0);
        let persists = (1..=12)
            .flat_map(|t| s.on_position(f64::from(t)))
            .filter(|e| *e == Effect::Persist)
            .count();
        assert_eq!(persists, 2);
    }

    #[test]
    fn scrobbles_once_at_threshold() {
        let mut s = playing(&["1"], 0);
        let mut scrobbles = 0;
        let mut t = 0.0;
        while t <= 180.0 {
            scrobbles += s
                .on_position(t)
                .iter()
                .filter(|e| matches!(e, Effect::Scrobble { .. }))
                .count();
            t += 1.0;
        }
        assert_eq!(scrobbles, 1);
    }

    #[test]
    fn seeking_past_threshold_does_not_scrobble() {
        let mut s = playing(&["1"], 0);
        s.on_position(1.0);
        s.seek(170.0);
        let fx = s.on_position(171.0);
        assert!(!fx.iter().any(|e| matches!(e, Effect::Scrobble { .. })));
    }

    #[test]
    fn one_error_skips_two_stop() {
        let mut s = playing(&["1", "2", "3"], 0);
        assert_eq!(loaded_id(&s.on_error()), Some("2"));
        let fx = s.on_error();
        assert!(fx.contains(&Effect::Stop));
        assert_eq!(s.state(), PlayState::Idle);

        // A successful load resets the count.
        let mut s = playing(&["1", "2", "3"], 0);
        s.on_error();
        s.on_loaded();
        assert_eq!(loaded_id(&s.on_error()), Some("3"));
    }

    #[test]
    fn restore_loads_paused_without_announcing() {
        let mut source = playing(&["1", "2"], 1);
        source.on_position(42.0);
        let (snap, pos) = source.snapshot();

        let mut s = Session::new(80, 50);
        let fx = s.restore(snap, pos);
        assert_eq!(
            fx.first(),
            Some(&Effect::Load {
                song: make_song("2"),
                start_at: 42.0,
                paused: true
            })
        );
        assert!(!fx.contains(&Effect::Persist));

        let fx = s.on_loaded();
        assert_eq!(s.state(), PlayState::Paused);
        assert!(!fx.iter().any(|e| matches!(e, Effect::NowPlaying(_))));

        let fx = s.toggle_pause();
        assert!(fx.iter().any(|e| matches!(e, Effect::NowPlaying(_))));
    }

    #[test]
    fn removing_current_song_loads_the_next() {
        let mut s = playing(&["1", "2", "3"], 1);
        assert_eq!(loaded_id(&s.remove(1)), Some("3"));
        assert_eq!(s.remove(0), vec![Effect::Persist]);

        let fx = s.clear_queue();
        assert!(fx.contains(&Effect::Stop));
        assert_eq!(s.state(), PlayState::Idle);
        assert!(s.current().is_none());
    }

    #[test]
    fn enqueue_into_empty_queue_starts_playing() {
        let mut s = Session::new(80, 50);
        assert_eq!(loaded_id(&s.enqueue(songs(&["1"]))), Some("1"));
        assert_eq!(s.enqueue(songs(&["2"])), vec![Effect::Persist]);
        s.enqueue_next(songs(&["x"]));
        assert_eq!(
            s.queue().peek_next().map(|x| x.id.as_str()),
            Some("x")
        );
    }

    #[test]
    fn seek_and_volume_are_clamped() {
        let mut s = playing(&["1"], 0);
        assert_eq!(s.seek(500.0), vec![Effect::Seek(180.0), Effect::Persist]);
        assert_eq!(s.seek_relative(-1000.0).first(), Some(&Effect::Seek(0.0)));
        assert_eq!(s.set_volume(150), vec![Effect::SetVolume(100)]);
        assert!(s.set_volume(100).is_empty());
    }
}
