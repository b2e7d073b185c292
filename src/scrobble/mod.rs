//! Play reporting.
//!
//! Two listeners receive every playback milestone: the Subsonic server's own
//! `scrobble` endpoint and, when a session key is configured, Last.fm
//! directly. [`ScrobbleHub`] fans each event out to all of them at once.

pub mod lastfm;
pub mod tracker;

use crate::config::ScrobbleConfig;
use crate::subsonic::SubsonicClient;
use crate::subsonic::models::Song;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;

pub use lastfm::LastfmClient;
pub use tracker::ScrobbleTracker;

#[async_trait]
pub trait ScrobbleSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn now_playing(&self, song: &Song) -> anyhow::Result<()>;
    async fn scrobble(&self, song: &Song, played_at: i64) -> anyhow::Result<()>;
}

/// Reports through the server (`scrobble` with `submission=false/true`).
pub struct NavidromeSink {
    client: SubsonicClient,
}

impl NavidromeSink {
    pub fn new(client: SubsonicClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScrobbleSink for NavidromeSink {
    fn name(&self) -> &'static str {
        "navidrome"
    }

    async fn now_playing(&self, song: &Song) -> anyhow::Result<()> {
        let now_ms = time::OffsetDateTime::now_utc().unix_timestamp() * 1000;
        self.client.scrobble(&song.id, now_ms, false).await?;
        Ok(())
    }

    async fn scrobble(&self, song: &Song, played_at: i64) -> anyhow::Result<()> {
        self.client.scrobble(&song.id, played_at * 1000, true).await?;
        Ok(())
    }
}

pub struct LastfmSink {
    client: LastfmClient,
    session_key: String,
}

impl LastfmSink {
    pub fn new(client: LastfmClient, session_key: impl Into<String>) -> Self {
        Self {
            client,
            session_key: session_key.into(),
        }
    }
}

#[async_trait]
impl ScrobbleSink for LastfmSink {
    fn name(&self) -> &'static str {
        "lastfm"
    }

    async fn now_playing(&self, song: &Song) -> anyhow::Result<()> {
        self.client.update_now_playing(&self.session_key, song).await
    }

    async fn scrobble(&self, song: &Song, played_at: i64) -> anyhow::Result<()> {
        self.client.scrobble(&self.session_key, song, played_at).await
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    NowPlaying,
    Scrobble { played_at: i64 },
}

#[derive(Clone, Default)]
pub struct ScrobbleHub {
    sinks: Vec<Arc<dyn ScrobbleSink>>,
}

impl ScrobbleHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub with every listener the configuration enables.
    pub fn from_config(cfg: &ScrobbleConfig, client: Option<&SubsonicClient>) -> Self {
        let mut hub = Self::new();
        if cfg.enabled
            && let Some(c) = client
        {
            hub.push(Arc::new(NavidromeSink::new(c.clone())));
        }
        if cfg.lastfm.is_ready()
            && let Some(sk) = &cfg.lastfm.session_key
        {
            let lf = LastfmClient::new(&cfg.lastfm.api_key, &cfg.lastfm.api_secret);
            hub.push(Arc::new(LastfmSink::new(lf, sk.clone())));
        }
        hub
    }

    pub fn push(&mut self, sink: Arc<dyn ScrobbleSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Report to every listener; returns how many failed.
    pub async fn now_playing(&self, song: &Song) -> usize {
        self.fan_out(song, Event::NowPlaying).await
    }

    pub async fn scrobble(&self, song: &Song, played_at: i64) -> usize {
        self.fan_out(song, Event::Scrobble { played_at }).await
    }

    /// Fire-and-forget variants used by the UI loop.
    pub fn spawn_now_playing(&self, song: Song) {
        if self.is_empty() {
            return;
        }
        let hub = self.clone();
        tokio::spawn(async move {
            hub.now_playing(&song).await;
        });
    }

    pub fn spawn_scrobble(&self, song: Song, played_at: i64) {
        if self.is_empty() {
            return;
        }
        let hub = self.clone();
        tokio::spawn(async move {
            hub.scrobble(&song, played_at).await;
        });
    }

    async fn fan_out(&self, song: &Song, event: Event) -> usize {
        let mut set = JoinSet::new();
        for sink in &self.sinks {
            let sink = Arc::clone(sink);
            let song = song.clone();
            set.spawn(async move {
                let res = match event {
                    Event::NowPlaying => sink.now_playing(&song).await,
                    Event::Scrobble { played_at } => sink.scrobble(&song, played_at).await,
                };
                (sink.name(), song.id, res)
            });
        }

        let mut failures = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, id, Ok(()))) => {
                    tracing::debug!(sink = name, song = %id, ?event, "reported");
                }
                Ok((name, id, Err(e))) => {
                    failures += 1;
                    tracing::warn!(sink = name, song = %id, ?event, error = %e, "report failed");
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = %e, "scrobble task panicked");
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::make_song;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ScrobbleSink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn now_playing(&self, song: &Song) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("np:{}", song.id));
            if self.fail {
                anyhow::bail!("offline");
            }
            Ok(())
        }

        async fn scrobble(&self, song: &Song, played_at: i64) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("scrobble:{}@{}", song.id, played_at));
            if self.fail {
                anyhow::bail!("offline");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_sink_gets_the_event_even_if_one_fails() {
        let ok = Arc::new(Recorder::default());
        let broken = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });

        let mut hub = ScrobbleHub::new();
        hub.push(ok.clone());
        hub.push(broken.clone());

        let song = make_song("7");
        assert_eq!(hub.now_playing(&song).await, 1);
        assert_eq!(hub.scrobble(&song, 42).await, 1);

        assert_eq!(*ok.calls.lock().unwrap(), ["np:7", "scrobble:7@42"]);
        assert_eq!(*broken.calls.lock().unwrap(), ["np:7", "scrobble:7@42"]);
    }

    #[test]
    fn config_selects_listeners() {
        let mut cfg = ScrobbleConfig::default();
        assert!(ScrobbleHub::from_config(&cfg, None).is_empty());

        cfg.lastfm.enabled = true;
        cfg.lastfm.api_key = "k".into();
        cfg.lastfm.api_secret = "s".into();
        assert!(ScrobbleHub::from_config(&cfg, None).is_empty());

        cfg.lastfm.session_key = Some("sk".into());
        assert_eq!(ScrobbleHub::from_config(&cfg, None).names(), ["lastfm"]);
    }
}
