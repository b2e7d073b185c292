mod app;
mod cache;
mod config;
mod http;
mod input;
mod lyrics;
mod playback;
mod player;
mod queue;
mod scrobble;
mod storage;
mod subsonic;
mod tui;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;
use subsonic::SubsonicClient;
use subsonic::models::{Album, AlbumListKind, Song};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mice", version, about = "Terminal music player for Navidrome/Subsonic servers")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the interactive TUI (default).
    Tui,
    /// Check that the configured server answers.
    Ping,
    /// Print an album list to stdout (headless).
    Albums {
        /// newest, recent, frequent, random, alphabeticalByName, highest, starred
        #[arg(long, default_value = "newest")]
        kind: String,
    },
    /// Search the library and print matches to stdout (headless).
    Search { query: String },
    /// List playlists (headless).
    Playlists,
    /// Print a playlist's songs (headless).
    Playlist { playlist_id: String },

    /// Save server credentials after checking them.
    Login {
        url: String,
        username: String,
        password: String,
    },

    /// Last.fm scrobbling session management.
    Lastfm {
        #[command(subcommand)]
        cmd: LastfmCommand,
    },

    /// Audio output device management (mpv).
    Audio {
        #[command(subcommand)]
        cmd: AudioCommand,
    },

    /// Local cache management.
    Cache {
        #[command(subcommand)]
        cmd: CacheCommand,
    },

    /// Local play history.
    History {
        #[command(subcommand)]
        cmd: HistoryCommand,
    },
}

#[derive(Debug, Subcommand)]
enum LastfmCommand {
    /// Exchange Last.fm credentials for a session key (api_key/api_secret must be set).
    Login { username: String, password: String },
    /// Forget the stored session key.
    Logout,
}

#[derive(Debug, Subcommand)]
enum AudioCommand {
    /// List mpv audio devices.
    List,
    /// Set mpv audio device (name as shown in list).
    Set { device: String },
    /// Clear mpv audio device override.
    Clear,
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Drop cached lyrics.
    Clear,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// Print recently played songs.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Forget the play history.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;
    let cfg_path = match cli.config.clone() {
        Some(p) => p,
        None => config::default_config_path().context("default config path")?,
    };

    let command = cli.command.unwrap_or(Command::Tui);
    // The TUI owns the terminal, so its logs go to a file.
    if matches!(command, Command::Tui) {
        init_file_logging(&cfg.paths.data_dir.join("mice.log"))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    }

    match command {
        Command::Tui => {
            let mut terminal = tui::TerminalGuard::enter(cfg.input.mouse).context("init terminal")?;
            let mut app = app::App::new(cfg, cfg_path)?;
            app.run(terminal.terminal_mut()).await?;
        }
        Command::Ping => {
            let client = make_client(&cfg)?;
            client.ping().await?;
            println!("OK: {} as {}", client.base_url(), client.username());
            let status = client.get_scan_status().await?;
            if status.scanning {
                println!("Library scan in progress ({} files)", status.count.unwrap_or(0));
            }
        }
        Command::Albums { kind } => {
            let kind = AlbumListKind::parse(&kind)
                .with_context(|| format!("unknown album list kind: {kind}"))?;
            let client = make_client(&cfg)?;
            let albums = client.get_album_list(kind, 100, 0).await?;
            print_albums(&albums);
        }
        Command::Search { query } => {
            let client = make_client(&cfg)?;
            let results = client.search(&query, 10, 20, 50).await?;
            if results.is_empty() {
                println!("No results for \"{query}\"");
            }
            for artist in &results.artist {
                println!("artist  {}  (id={})", artist.name, artist.id);
            }
            print_albums(&results.album);
            print_songs(&results.song);
        }
        Command::Playlists => {
            let client = make_client(&cfg)?;
            for p in client.get_playlists().await? {
                println!(
                    "{}  ({} songs, id={})",
                    p.name,
                    p.song_count.unwrap_or(0),
                    p.id
                );
            }
        }
        Command::Playlist { playlist_id } => {
            let client = make_client(&cfg)?;
            let playlist = client.get_playlist(&playlist_id).await?;
            println!("{}", playlist.name);
            print_songs(&playlist.entry);
        }
        Command::Login {
            url,
            username,
            password,
        } => {
            let mut cfg = cfg;
            cfg.server.url = url.trim_end_matches('/').to_string();
            cfg.server.username = username;
            cfg.server.password = password;
            let client = make_client(&cfg)?;
            client.ping().await.context("server rejected the login")?;
            config::save(&cfg, cli.config.as_deref()).context("save config")?;
            println!("Logged in to {} as {}.", client.base_url(), client.username());
        }
        Command::Lastfm { cmd } => {
            let mut cfg = cfg;
            match cmd {
                LastfmCommand::Login { username, password } => {
                    let lastfm = &cfg.scrobble.lastfm;
                    if lastfm.api_key.is_empty() || lastfm.api_secret.is_empty() {
                        anyhow::bail!(
                            "set scrobble.lastfm.api_key and api_secret in {} first",
                            cfg_path.display()
                        );
                    }
                    let client = scrobble::lastfm::LastfmClient::new(
                        lastfm.api_key.clone(),
                        lastfm.api_secret.clone(),
                    );
                    let session = client
                        .get_mobile_session(&username, &password)
                        .await
                        .context("Last.fm login")?;
                    cfg.scrobble.lastfm.session_key = Some(session.key);
                    cfg.scrobble.lastfm.username = Some(session.username.clone());
                    cfg.scrobble.lastfm.enabled = true;
                    println!("Last.fm scrobbling enabled for {}.", session.username);
                }
                LastfmCommand::Logout => {
                    cfg.scrobble.lastfm.session_key = None;
                    cfg.scrobble.lastfm.username = None;
                    cfg.scrobble.lastfm.enabled = false;
                    println!("Last.fm session removed.");
                }
            }
            config::save(&cfg, cli.config.as_deref()).context("save config")?;
        }
        Command::Audio { cmd } => match cmd {
            AudioCommand::List => {
                let current = cfg.player.audio_device.as_deref().unwrap_or("auto");
                for device in player::list_audio_devices().await? {
                    let mark = if device.name == current { "*" } else { " " };
                    println!("{mark} {}  ({})", device.name, device.description);
                }
            }
            AudioCommand::Set { device } => {
                let mut cfg = cfg;
                cfg.player.audio_device = Some(device);
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Updated audio device in config.");
            }
            AudioCommand::Clear => {
                let mut cfg = cfg;
                cfg.player.audio_device = None;
                config::save(&cfg, cli.config.as_deref()).context("save config")?;
                println!("Cleared audio device override.");
            }
        },
        Command::Cache { cmd } => match cmd {
            CacheCommand::Clear => {
                let storage = storage::StorageHandle::new(&cfg.paths.data_dir);
                let removed = storage.clear_lyrics()?;
                println!("Removed {removed} cached lyrics from {}.", storage.path().display());
            }
        },
        Command::History { cmd } => {
            let storage = storage::StorageHandle::new(&cfg.paths.data_dir);
            match cmd {
                HistoryCommand::List { limit } => print_songs(&storage.get_history(limit)?),
                HistoryCommand::Clear => {
                    storage.clear_history()?;
                    println!("Play history cleared.");
                }
            }
        }
    }

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_file_logging(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

fn make_client(cfg: &config::Config) -> anyhow::Result<SubsonicClient> {
    SubsonicClient::new(&cfg.server, &cfg.cache, &cfg.player)
        .context("server not configured (run `mice login <url> <user> <password>`)")
}

fn print_albums(albums: &[Album]) {
    for (i, a) in albums.iter().enumerate() {
        let artist = a
            .artist
            .as_deref()
            .map(|s| format!(" - {s}"))
            .unwrap_or_default();
        println!("{:02}. {}{}  (id={})", i + 1, a.name, artist, a.id);
    }
}

fn print_songs(songs: &[Song]) {
    for (i, s) in songs.iter().enumerate() {
        println!("{:02}. {}  (id={})", i + 1, s.display(), s.id);
    }
}
