//! Built-in colour themes. The icon set is shared by all of them.

pub mod icons;
pub mod palette;

pub use icons::{Icons, LoadingSpinner};
pub use palette::Palette;

use ratatui::symbols::border;

/// Names accepted in `[theme] name`.
pub const THEME_NAMES: [&str; 4] = ["mono", "midnight", "nord", "gruvbox"];

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub palette: Palette,
    pub icons: Icons,
}

impl Theme {
    pub fn border_set(&self) -> border::Set<'static> {
        border::ROUNDED
    }
}

impl Default for Theme {
    fn default() -> Self {
        get_theme(crate::config::defaults::THEME)
    }
}

/// Look up a theme by name. Unknown names fall back to `mono`.
pub fn get_theme(name: &str) -> Theme {
    let (name, palette) = match name.to_ascii_lowercase().as_str() {
        "midnight" => ("midnight", Palette::MIDNIGHT),
        "nord" => ("nord", Palette::NORD),
        "gruvbox" => ("gruvbox", Palette::GRUVBOX),
        _ => ("mono", Palette::MONO),
    };
    Theme {
        name,
        palette,
        icons: Icons::nerd(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_name_resolves_to_itself() {
        for name in THEME_NAMES {
            assert_eq!(get_theme(name).name, name);
        }
        assert_eq!(get_theme("NORD").name, "nord");
        assert_eq!(get_theme("solarized").name, "mono");
    }
}
