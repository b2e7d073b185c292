use super::*;

pub const THEME: &str = "midnight";
pub const VOLUME: u8 = 80;
pub const SCROBBLE_THRESHOLD_PERCENT: u8 = 50;
pub const CACHE_TTL_SECS: u64 = 300;
pub const CACHE_MAX_ENTRIES: usize = 500;

pub fn data_dir() -> PathBuf {
    ProjectDirs::from("dev", "mice", "mice")
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("mice"))
}

pub fn defaults() -> Config {
    Config {
        server: ServerConfig::default(),
        theme: Theme::default(),
        sidebar: SidebarConfig::default(),
        input: InputConfig::default(),
        paths: PathsConfig::default(),
        player: PlayerConfig::default(),
        scrobble: ScrobbleConfig::default(),
        cache: CacheConfig::default(),
        ui: UiConfig::default(),
    }
}
