//! Lyrics lookup and display model.
//!
//! Sources are tried in order: the server's structured lyrics, the server's
//! legacy endpoint, then LRCLIB. The local SQLite cache sits in front of all
//! of them and is handled by the caller.

pub mod lrclib;
pub mod parser;

use crate::subsonic::SubsonicClient;
use crate::subsonic::models::Song;

pub use lrclib::LrclibClient;
pub use parser::{LyricsSource, ParsedLyrics};

pub async fn fetch_lyrics(
    subsonic: Option<&SubsonicClient>,
    lrclib: &LrclibClient,
    song: &Song,
) -> anyhow::Result<Option<ParsedLyrics>> {
    if let Some(client) = subsonic {
        match from_server(client, song).await {
            Ok(Some(found)) => return Ok(Some(found)),
            Ok(None) => {}
            Err(e) => tracing::debug!(song = %song.id, error = %e, "server lyrics failed"),
        }
    }

    if song.artist_name().is_empty() {
        return Ok(None);
    }
    let result = lrclib
        .get_lyrics(
            &song.title,
            song.artist_name(),
            song.album.as_deref(),
            song.duration,
        )
        .await?;

    Ok(result
        .as_ref()
        .and_then(|r| r.best_text())
        .map(|text| ParsedLyrics::parse(text, LyricsSource::Lrclib))
        .filter(|l| !l.is_empty()))
}

async fn from_server(
    client: &SubsonicClient,
    song: &Song,
) -> anyhow::Result<Option<ParsedLyrics>> {
    let structured = client.get_lyrics_by_song_id(&song.id).await?;
    // Prefer a synced entry when the server offers several.
    let best = structured
        .iter()
        .find(|l| l.synced && !l.line.is_empty())
        .or_else(|| structured.iter().find(|l| !l.line.is_empty()));
    if let Some(lyrics) = best {
        let parsed = ParsedLyrics::from_structured(lyrics);
        if !parsed.is_empty() {
            return Ok(Some(parsed));
        }
    }

    if song.artist_name().is_empty() {
        return Ok(None);
    }
    let legacy = client.get_lyrics(song.artist_name(), &song.title).await?;
    Ok(legacy
        .map(|text| ParsedLyrics::parse(&text, LyricsSource::ServerLegacy))
        .filter(|l| !l.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, PlayerConfig, ServerConfig};
    use crate::queue::tests::make_song;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok(body: serde_json::Value) -> ResponseTemplate {
        let mut envelope = serde_json::json!({"status": "ok", "version": "1.16.1"});
        if let (Some(env), Some(extra)) = (envelope.as_object_mut(), body.as_object()) {
            env.extend(extra.clone());
        }
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "subsonic-response": envelope }))
    }

    async fn client(server: &MockServer) -> SubsonicClient {
        let cfg = ServerConfig {
            url: server.uri(),
            username: "u".into(),
            password: "p".into(),
        };
        SubsonicClient::new(&cfg, &CacheConfig::default(), &PlayerConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn falls_through_server_sources_to_lrclib() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getLyricsBySongId"))
            .respond_with(ok(serde_json::json!({"lyricsList": {"structuredLyrics": []}})))
            .mount(&server)
            .await;
        Mock::given(path("/rest/getLyrics"))
            .respond_with(ok(serde_json::json!({"lyrics": {}})))
            .mount(&server)
            .await;
        Mock::given(path("/api/get"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"syncedLyrics": "[00:01.00]from lrclib"})),
            )
            .mount(&server)
            .await;

        let subsonic = client(&server).await;
        let lrclib = LrclibClient::new().with_base_url(format!("{}/api", server.uri()));
        let found = fetch_lyrics(Some(&subsonic), &lrclib, &make_song("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.source, LyricsSource::Lrclib);
        assert_eq!(found.lines[0].text, "from lrclib");
    }

    #[tokio::test]
    async fn legacy_server_lyrics_win_over_lrclib() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getLyricsBySongId"))
            .respond_with(ok(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(path("/rest/getLyrics"))
            .respond_with(ok(serde_json::json!({"lyrics": {"value": "line one\nline two"}})))
            .mount(&server)
            .await;

        let subsonic = client(&server).await;
        let lrclib = LrclibClient::new().with_base_url(format!("{}/api", server.uri()));
        let found = fetch_lyrics(Some(&subsonic), &lrclib, &make_song("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.source, LyricsSource::ServerLegacy);
        assert!(!found.synced);
        assert_eq!(found.lines.len(), 2);
    }
}
