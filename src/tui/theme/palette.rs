use ratatui::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg_primary: Color,
    pub bg_highlight: Color,
    pub fg_primary: Color,
    pub fg_secondary: Color,
    pub accent: Color,
    pub accent_alt: Color,
    pub border: Color,
    pub playing: Color,
    pub error: Color,
}

impl Palette {
    /// Black, white and greys.
    pub const MONO: Self = Self {
        bg_primary: Color::Rgb(0, 0, 0),
        bg_highlight: Color::Rgb(48, 48, 48),
        fg_primary: Color::Rgb(255, 255, 255),
        fg_secondary: Color::Rgb(136, 136, 136),
        accent: Color::Rgb(255, 255, 255),
        accent_alt: Color::Rgb(200, 200, 200),
        border: Color::Rgb(64, 64, 64),
        playing: Color::Rgb(255, 255, 255),
        error: Color::Rgb(255, 255, 255),
    };

    pub const MIDNIGHT: Self = Self {
        bg_primary: Color::Rgb(13, 17, 33),       // #0d1121
        bg_highlight: Color::Rgb(36, 44, 74),     // #242c4a
        fg_primary: Color::Rgb(220, 226, 245),    // #dce2f5
        fg_secondary: Color::Rgb(120, 132, 170),  // #7884aa
        accent: Color::Rgb(122, 162, 247),        // #7aa2f7
        accent_alt: Color::Rgb(187, 154, 247),    // #bb9af7
        border: Color::Rgb(52, 60, 94),           // #343c5e
        playing: Color::Rgb(158, 206, 106),       // #9ece6a
        error: Color::Rgb(247, 118, 142),         // #f7768e
    };

    pub const NORD: Self = Self {
        bg_primary: Color::Rgb(46, 52, 64),       // #2e3440
        bg_highlight: Color::Rgb(67, 76, 94),     // #434c5e
        fg_primary: Color::Rgb(236, 239, 244),    // #eceff4
        fg_secondary: Color::Rgb(129, 161, 193),  // #81a1c1
        accent: Color::Rgb(136, 192, 208),        // #88c0d0
        accent_alt: Color::Rgb(143, 188, 187),    // #8fbcbb
        border: Color::Rgb(76, 86, 106),          // #4c566a
        playing: Color::Rgb(163, 190, 140),       // #a3be8c
        error: Color::Rgb(191, 97, 106),          // #bf616a
    };

    pub const GRUVBOX: Self = Self {
        bg_primary: Color::Rgb(40, 40, 40),       // #282828
        bg_highlight: Color::Rgb(80, 73, 69),     // #504945
        fg_primary: Color::Rgb(235, 219, 178),    // #ebdbb2
        fg_secondary: Color::Rgb(168, 153, 132),  // #a89984
        accent: Color::Rgb(250, 189, 47),         // #fabd2f
        accent_alt: Color::Rgb(254, 128, 25),     // #fe8019
        border: Color::Rgb(102, 92, 84),          // #665c54
        playing: Color::Rgb(184, 187, 38),        // #b8bb26
        error: Color::Rgb(251, 73, 52),           // #fb4934
    };
}

impl Default for Palette {
    fn default() -> Self {
        Self::MONO
    }
}
