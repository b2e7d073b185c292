pub mod browse;
pub mod help;
pub mod now_playing;
pub mod player_full;
pub mod queue;
pub mod root;
pub mod settings;
pub mod sidebar;

use crate::playback::{PlayState, Session};
use crate::tui::theme::Icons;

pub(crate) fn truncate_str(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    let char_count: usize = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        s.chars().take(max_len).collect()
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub(crate) fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub(crate) fn progress_bar(width: usize, ratio: f64, icons: &Icons) -> String {
    if width < 3 {
        return String::new();
    }

    let filled = ((width - 1) as f64 * ratio.clamp(0.0, 1.0)).round() as usize;
    let empty = width.saturating_sub(filled + 1);

    let mut bar = String::with_capacity(width * 3);
    for _ in 0..filled {
        bar.push_str(icons.progress_full);
    }
    bar.push_str(icons.progress_head);
    for _ in 0..empty {
        bar.push_str(icons.progress_empty);
    }
    bar
}

/// Terminal window title for the current session.
pub fn media_title(session: &Session) -> String {
    match (session.state(), session.current()) {
        (PlayState::Idle, _) | (_, None) => "mice".to_string(),
        (state, Some(song)) => {
            let artist = song.artist_name();
            if artist.is_empty() {
                format!("{} {}", state.icon(), song.title)
            } else {
                format!("{} {} - {}", state.icon(), song.title, artist)
            }
        }
    }
}
