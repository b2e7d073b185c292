//! Nerd Font icons for TUI display
//! Requires a Nerd Font to be installed (https://www.nerdfonts.com)

use crate::app::state::Screen;

#[derive(Debug, Clone)]
pub struct Icons {
    // Playback controls
    pub play: &'static str,
    pub pause: &'static str,
    pub next: &'static str,
    pub prev: &'static str,

    // Volume
    pub volume_mute: &'static str,
    pub volume_low: &'static str,
    pub volume_high: &'static str,

    // Repeat/Shuffle
    pub repeat: &'static str,
    pub repeat_one: &'static str,
    pub shuffle: &'static str,

    // Navigation
    pub search: &'static str,
    pub queue: &'static str,
    pub history: &'static str,
    pub settings: &'static str,
    pub help: &'static str,

    // Status
    pub success: &'static str,
    pub error: &'static str,
    pub server: &'static str,

    // Music
    pub music: &'static str,
    pub artist: &'static str,
    pub album: &'static str,
    pub playlist: &'static str,
    pub lyrics: &'static str,
    pub star: &'static str,

    // Selection
    pub selected: &'static str,
    pub unselected: &'static str,
    pub checked: &'static str,
    pub unchecked: &'static str,

    // Progress bar
    pub progress_full: &'static str,
    pub progress_empty: &'static str,
    pub progress_head: &'static str,

    pub cache: &'static str,
}

impl Icons {
    pub const fn nerd() -> Self {
        Self {
            play: "\u{f04b}",           // nf-fa-play
            pause: "\u{f04c}",          // nf-fa-pause
            next: "\u{f051}",           // nf-fa-step_forward
            prev: "\u{f048}",           // nf-fa-step_backward

            volume_mute: "\u{f026}",    // nf-fa-volume_off
            volume_low: "\u{f027}",     // nf-fa-volume_down
            volume_high: "\u{f028}",    // nf-fa-volume_up

            repeat: "\u{f456}",         // nf-md-repeat
            repeat_one: "\u{f458}",     // nf-md-repeat_once
            shuffle: "\u{f49d}",        // nf-md-shuffle

            search: "\u{f002}",         // nf-fa-search
            queue: "\u{f03a}",          // nf-fa-list
            history: "\u{f1da}",        // nf-fa-history
            settings: "\u{f013}",       // nf-fa-cog
            help: "\u{f059}",           // nf-fa-question_circle

            success: "\u{f00c}",        // nf-fa-check
            error: "\u{f00d}",          // nf-fa-times
            server: "\u{f233}",         // nf-fa-server

            music: "\u{f001}",          // nf-fa-music
            artist: "\u{f007}",         // nf-fa-user
            album: "\u{f51f}",          // nf-md-album
            playlist: "\u{f0cb}",       // nf-fa-list_ol
            lyrics: "\u{f15c}",         // nf-fa-file_text_o
            star: "\u{f005}",           // nf-fa-star

            selected: "\u{f054}",       // nf-fa-chevron_right
            unselected: " ",
            checked: "\u{f046}",        // nf-fa-check_square_o
            unchecked: "\u{f096}",      // nf-fa-square_o

            progress_full: "━",
            progress_empty: "─",
            progress_head: "●",

            cache: "\u{f1c0}",          // nf-fa-database
        }
    }

    pub fn screen(&self, screen: Screen) -> &'static str {
        match screen {
            Screen::Albums => self.album,
            Screen::Artists => self.artist,
            Screen::Playlists => self.playlist,
            Screen::Starred => self.star,
            Screen::Search => self.search,
            Screen::Queue => self.queue,
            Screen::History => self.history,
            Screen::Settings => self.settings,
            Screen::Help => self.help,
        }
    }
}

impl Default for Icons {
    fn default() -> Self {
        Self::nerd()
    }
}

/// Loading spinner frames
pub struct LoadingSpinner;

impl LoadingSpinner {
    /// Braille-based smooth spinner
    pub const BRAILLE: [&'static str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

    pub fn frame(tick: u64) -> &'static str {
        let idx = tick as usize % Self::BRAILLE.len();
        Self::BRAILLE[idx]
    }
}
