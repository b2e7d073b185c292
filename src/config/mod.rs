use crate::app::state::Screen;
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub theme: Theme,
    pub sidebar: SidebarConfig,
    pub input: InputConfig,
    pub paths: PathsConfig,
    pub player: PlayerConfig,
    pub scrobble: ScrobbleConfig,
    pub cache: CacheConfig,
    pub ui: UiConfig,
}

#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the Navidrome/Subsonic server, e.g. `https://music.example.com`.
    pub url: String,
    pub username: String,
    pub password: String,
}

// Keep the password out of logs and panics.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.username.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SidebarConfig {
    /// Screens in display order.
    pub items: Vec<Screen>,
    /// Screens left out of the sidebar. Settings and Help are always shown.
    pub hidden: Vec<Screen>,
}

impl SidebarConfig {
    /// Visible screens in configured order. Screens missing from `items`
    /// (older config files) are appended in default order.
    pub fn visible(&self) -> Vec<Screen> {
        let mut order: Vec<Screen> = Vec::with_capacity(Screen::ALL.len());
        for s in self.items.iter().chain(Screen::ALL.iter()) {
            if !order.contains(s) {
                order.push(*s);
            }
        }
        order
            .into_iter()
            .filter(|s| !self.is_hidden(*s))
            .collect()
    }

    pub fn is_hidden(&self, screen: Screen) -> bool {
        screen.is_hideable() && self.hidden.contains(&screen)
    }

    /// Flip visibility. Returns false when the screen cannot be hidden.
    pub fn toggle_hidden(&mut self, screen: Screen) -> bool {
        if !screen.is_hideable() {
            return false;
        }
        if let Some(pos) = self.hidden.iter().position(|s| *s == screen) {
            self.hidden.remove(pos);
        } else {
            self.hidden.push(screen);
        }
        true
    }

    /// Full order including hidden screens (what the settings editor shows).
    pub fn ordered(&self) -> Vec<Screen> {
        let mut order: Vec<Screen> = Vec::with_capacity(Screen::ALL.len());
        for s in self.items.iter().chain(Screen::ALL.iter()) {
            if !order.contains(s) {
                order.push(*s);
            }
        }
        order
    }

    /// Swap `screen` with its neighbour. `up` moves it towards the top.
    pub fn move_item(&mut self, screen: Screen, up: bool) {
        let mut order = self.ordered();
        let Some(pos) = order.iter().position(|s| *s == screen) else {
            return;
        };
        let target = if up {
            match pos.checked_sub(1) {
                Some(t) => t,
                None => return,
            }
        } else if pos + 1 < order.len() {
            pos + 1
        } else {
            return;
        };
        order.swap(pos, target);
        self.items = order;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub mouse: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// mpv audio device name (see `mpv --audio-device=help`)
    pub audio_device: Option<String>,
    /// Volume level (0-100)
    pub volume: u8,
    /// Transcode ceiling in kbps; 0 streams the original file.
    pub max_bit_rate: u32,
    /// Transcode target format (e.g. "opus"), server default when unset.
    pub format: Option<String>,
    /// Reload the last queue position on startup.
    pub restore_position: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrobbleConfig {
    /// Report plays to the server (which forwards to Last.fm/ListenBrainz if set up there).
    pub enabled: bool,
    /// Percentage of a song that must be heard before it counts as played.
    pub threshold_percent: u8,
    pub lastfm: LastfmConfig,
}

#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LastfmConfig {
    pub enabled: bool,
    pub api_key: String,
    pub api_secret: String,
    pub session_key: Option<String>,
    pub username: Option<String>,
}

impl std::fmt::Debug for LastfmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastfmConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key)
            .field("username", &self.username)
            .field("has_session", &self.session_key.is_some())
            .finish()
    }
}

impl LastfmConfig {
    pub fn is_ready(&self) -> bool {
        self.enabled
            && !self.api_key.is_empty()
            && !self.api_secret.is_empty()
            && self.session_key.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct UiConfig {
    /// Last visited screen (restored on startup)
    pub last_screen: Option<Screen>,
}

impl Default for Config {
    fn default() -> Self {
        defaults::defaults()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: defaults::THEME.to_string(),
        }
    }
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            items: Screen::ALL.to_vec(),
            hidden: Vec::new(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { mouse: true }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio_device: None,
            volume: defaults::VOLUME,
            max_bit_rate: 0,
            format: None,
            restore_position: true,
        }
    }
}

impl Default for ScrobbleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_percent: defaults::SCROBBLE_THRESHOLD_PERCENT,
            lastfm: LastfmConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::CACHE_TTL_SECS,
            max_entries: defaults::CACHE_MAX_ENTRIES,
        }
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    write_private(&path, cfg)
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "mice", "mice").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        write_private(&path, &cfg)?;
        tracing::info!(path = %path.display(), "wrote default config");
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn write_private(path: &Path, cfg: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    // The file holds the server password and the Last.fm session key.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}
