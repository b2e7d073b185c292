//! Decides when a play counts as a scrobble.
//!
//! A song qualifies once it has been *listened to* (not skipped over) for
//! the configured share of its length or four minutes, whichever comes
//! first. Songs shorter than 30 seconds never qualify.

const MIN_DURATION_SECS: f64 = 30.0;
const MAX_REQUIRED_SECS: f64 = 240.0;
/// Position jumps larger than this are seeks, not listening.
const MAX_STEP_SECS: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct ScrobbleTracker {
    threshold_percent: u8,
    duration: f64,
    listened: f64,
    last_pos: Option<f64>,
    done: bool,
}

impl ScrobbleTracker {
    pub fn new(threshold_percent: u8) -> Self {
        Self {
            threshold_percent: threshold_percent.clamp(1, 100),
            duration: 0.0,
            listened: 0.0,
            last_pos: None,
            done: false,
        }
    }

    /// Start tracking a new play.
    pub fn reset(&mut self, duration_secs: f64) {
        self.duration = duration_secs.max(0.0);
        self.listened = 0.0;
        self.last_pos = None;
        self.done = false;
    }

    /// The backend may only learn the real duration after loading.
    pub fn set_duration(&mut self, duration_secs: f64) {
        if duration_secs > 0.0 {
            self.duration = duration_secs;
        }
    }

    pub fn set_threshold(&mut self, threshold_percent: u8) {
        self.threshold_percent = threshold_percent.clamp(1, 100);
    }

    pub fn on_seek(&mut self) {
        self.last_pos = None;
    }

    /// Feed a position report. Returns true exactly once per play, when the
    /// listened time first reaches the target.
    pub fn on_position(&mut self, pos: f64) -> bool {
        if let Some(last) = self.last_pos {
            let step = pos - last;
            if step > 0.0 && step <= MAX_STEP_SECS {
                self.listened += step;
            }
        }
        self.last_pos = Some(pos);

        if self.done {
            return false;
        }
        match self.target() {
            Some(target) if self.listened >= target => {
                self.done = true;
                true
            }
            _ => false,
        }
    }

    pub fn target(&self) -> Option<f64> {
        if self.duration < MIN_DURATION_SECS {
            return None;
        }
        let share = self.duration * f64::from(self.threshold_percent) / 100.0;
        Some(share.min(MAX_REQUIRED_SECS))
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(t: &mut ScrobbleTracker, from: f64, to: f64) -> usize {
        let mut fired = 0;
        let mut pos = from;
        while pos <= to {
            if t.on_position(pos) {
                fired += 1;
            }
            pos += 0.5;
        }
        fired
    }

    #[test]
    fn fires_once_at_half_the_song() {
        let mut t = ScrobbleTracker::new(50);
        t.reset(200.0);
        assert_eq!(t.target(), Some(100.0));

        assert_eq!(play(&mut t, 0.0, 99.0), 0);
        assert_eq!(play(&mut t, 99.5, 150.0), 1);
        assert_eq!(play(&mut t, 150.5, 199.0), 0);
        // Replaying the song in the same play does not fire again.
        assert_eq!(play(&mut t, 0.0, 199.0), 0);
    }

    #[test]
    fn long_songs_cap_at_four_minutes() {
        let mut t = ScrobbleTracker::new(50);
        t.reset(1200.0);
        assert_eq!(t.target(), Some(240.0));
    }

    #[test]
    fn short_songs_never_fire() {
        let mut t = ScrobbleTracker::new(50);
        t.reset(25.0);
        assert_eq!(play(&mut t, 0.0, 25.0), 0);
    }

    #[test]
    fn seeking_ahead_does_not_count() {
        let mut t = ScrobbleTracker::new(50);
        t.reset(200.0);
        play(&mut t, 0.0, 10.0);
        // Jump straight to the end.
        assert!(!t.on_position(190.0));

        t.on_seek();
        assert!(!t.on_position(20.0));
        // Only ~10 s were heard before the jumps, so the 100 s target still
        // needs ~90 s of real listening.
        assert_eq!(play(&mut t, 20.5, 105.0), 0);
        assert_eq!(play(&mut t, 105.5, 115.0), 1);
    }

    #[test]
    fn late_duration_enables_scrobbling() {
        let mut t = ScrobbleTracker::new(50);
        t.reset(0.0);
        assert_eq!(t.target(), None);
        t.set_duration(60.0);
        assert_eq!(play(&mut t, 0.0, 31.0), 1);
    }
}
