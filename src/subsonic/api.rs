use crate::cache::{CacheStats, TtlCache};
use crate::config::{CacheConfig, PlayerConfig, ServerConfig};
use crate::subsonic::auth::Credentials;
use crate::subsonic::error::SubsonicError;
use crate::subsonic::models::*;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Params = Vec<(&'static str, String)>;

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    base_url: String,
    creds: Credentials,
    max_bit_rate: u32,
    format: Option<String>,
    cache: Mutex<TtlCache<Value>>,
}

#[derive(Debug, Clone)]
pub struct SubsonicClient {
    inner: Arc<Inner>,
}

impl SubsonicClient {
    pub fn new(
        server: &ServerConfig,
        cache: &CacheConfig,
        player: &PlayerConfig,
    ) -> Result<Self, SubsonicError> {
        if !server.is_configured() {
            return Err(SubsonicError::NotConfigured);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("mice/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: server.url.trim_end_matches('/').to_string(),
                creds: Credentials::new(&server.username, &server.password),
                max_bit_rate: player.max_bit_rate,
                format: player.format.clone(),
                cache: Mutex::new(TtlCache::new(
                    cache.max_entries,
                    Duration::from_secs(cache.ttl_secs),
                )),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn username(&self) -> &str {
        &self.inner.creds.username
    }

    pub async fn ping(&self) -> Result<(), SubsonicError> {
        self.call("ping", Vec::new()).await?;
        Ok(())
    }

    pub async fn get_album_list(
        &self,
        kind: AlbumListKind,
        size: u32,
        offset: u32,
    ) -> Result<Vec<Album>, SubsonicError> {
        let v = self
            .cached(
                "getAlbumList2",
                vec![
                    ("type", kind.as_param().to_string()),
                    ("size", size.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        let list: AlbumList = payload_or_default(&v, "albumList2")?;
        Ok(list.album)
    }

    /// Album with its songs.
    pub async fn get_album(&self, id: &str) -> Result<Album, SubsonicError> {
        let v = self.cached("getAlbum", vec![("id", id.to_string())]).await?;
        payload(&v, "album")
    }

    pub async fn get_artists(&self) -> Result<Vec<Artist>, SubsonicError> {
        let v = self.cached("getArtists", Vec::new()).await?;
        let idx: ArtistIndexes = payload_or_default(&v, "artists")?;
        Ok(idx.index.into_iter().flat_map(|i| i.artist).collect())
    }

    /// Artist with its albums.
    pub async fn get_artist(&self, id: &str) -> Result<Artist, SubsonicError> {
        let v = self.cached("getArtist", vec![("id", id.to_string())]).await?;
        payload(&v, "artist")
    }

    pub async fn get_playlists(&self) -> Result<Vec<Playlist>, SubsonicError> {
        let v = self.cached("getPlaylists", Vec::new()).await?;
        let list: PlaylistList = payload_or_default(&v, "playlists")?;
        Ok(list.playlist)
    }

    /// Playlist with its entries.
    pub async fn get_playlist(&self, id: &str) -> Result<Playlist, SubsonicError> {
        let v = self.cached("getPlaylist", vec![("id", id.to_string())]).await?;
        payload(&v, "playlist")
    }

    pub async fn search(
        &self,
        query: &str,
        artist_count: u32,
        album_count: u32,
        song_count: u32,
    ) -> Result<SearchResults, SubsonicError> {
        let v = self
            .cached(
                "search3",
                vec![
                    ("query", query.to_string()),
                    ("artistCount", artist_count.to_string()),
                    ("albumCount", album_count.to_string()),
                    ("songCount", song_count.to_string()),
                ],
            )
            .await?;
        payload_or_default(&v, "searchResult3")
    }

    pub async fn get_starred(&self) -> Result<SearchResults, SubsonicError> {
        let v = self.cached("getStarred2", Vec::new()).await?;
        payload_or_default(&v, "starred2")
    }

    /// Never cached: every call should give a new selection.
    pub async fn get_random_songs(&self, size: u32) -> Result<Vec<Song>, SubsonicError> {
        let v = self
            .call("getRandomSongs", vec![("size", size.to_string())])
            .await?;
        let list: SongList = payload_or_default(&v, "randomSongs")?;
        Ok(list.song)
    }

    pub async fn star(&self, target: &StarTarget) -> Result<(), SubsonicError> {
        self.set_starred(target, true).await
    }

    pub async fn unstar(&self, target: &StarTarget) -> Result<(), SubsonicError> {
        self.set_starred(target, false).await
    }

    async fn set_starred(&self, target: &StarTarget, starred: bool) -> Result<(), SubsonicError> {
        let (key, id) = target.param();
        let endpoint = if starred { "star" } else { "unstar" };
        self.call(endpoint, vec![(key, id.to_string())]).await?;
        // Starred flags are embedded in every cached listing.
        self.clear_cache();
        Ok(())
    }

    /// `submission = false` updates "now playing"; `true` records a play.
    pub async fn scrobble(
        &self,
        id: &str,
        time_ms: i64,
        submission: bool,
    ) -> Result<(), SubsonicError> {
        self.call(
            "scrobble",
            vec![
                ("id", id.to_string()),
                ("time", time_ms.to_string()),
                ("submission", submission.to_string()),
            ],
        )
        .await?;
        // A recorded play changes recent/frequent lists and play counts.
        if submission {
            self.clear_cache();
        }
        Ok(())
    }

    /// OpenSubsonic structured lyrics. Servers without the extension answer
    /// with a "not found"/"unknown method" error, reported as an empty list.
    pub async fn get_lyrics_by_song_id(
        &self,
        id: &str,
    ) -> Result<Vec<StructuredLyrics>, SubsonicError> {
        match self
            .cached("getLyricsBySongId", vec![("id", id.to_string())])
            .await
        {
            Ok(v) => {
                let list: LyricsList = payload_or_default(&v, "lyricsList")?;
                Ok(list.structured_lyrics)
            }
            Err(SubsonicError::Status(status)) if status == reqwest::StatusCode::NOT_FOUND => {
                Ok(Vec::new())
            }
            Err(e @ SubsonicError::Api { .. }) if !e.is_auth() => {
                tracing::debug!(error = %e, "structured lyrics unavailable");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Legacy plain-text lyrics lookup by artist and title.
    pub async fn get_lyrics(
        &self,
        artist: &str,
        title: &str,
    ) -> Result<Option<String>, SubsonicError> {
        let v = match self
            .cached(
                "getLyrics",
                vec![("artist", artist.to_string()), ("title", title.to_string())],
            )
            .await
        {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let lyrics: PlainLyrics = payload_or_default(&v, "lyrics")?;
        Ok(lyrics.value.filter(|s| !s.trim().is_empty()))
    }

    pub async fn get_scan_status(&self) -> Result<ScanStatus, SubsonicError> {
        let v = self.call("getScanStatus", Vec::new()).await?;
        payload_or_default(&v, "scanStatus")
    }

    /// Authenticated stream URL handed to the audio backend.
    pub fn stream_url(&self, id: &str) -> String {
        let mut params: Params = vec![("id", id.to_string())];
        if self.inner.max_bit_rate > 0 {
            params.push(("maxBitRate", self.inner.max_bit_rate.to_string()));
        }
        if let Some(fmt) = &self.inner.format {
            params.push(("format", fmt.clone()));
        }
        self.url("stream", &params)
    }

    pub fn cache_stats(&self) -> CacheStats {
        match self.inner.cache.lock() {
            Ok(c) => c.stats(),
            Err(poisoned) => poisoned.into_inner().stats(),
        }
    }

    pub fn clear_cache(&self) {
        match self.inner.cache.lock() {
            Ok(mut c) => c.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn url(&self, endpoint: &str, params: &[(&'static str, String)]) -> String {
        let mut url = format!(
            "{}/rest/{}?{}",
            self.inner.base_url,
            endpoint,
            self.inner.creds.query()
        );
        for (k, v) in params {
            url.push('&');
            url.push_str(k);
            url.push('=');
            url.push_str(&urlencoding::encode(v));
        }
        url
    }

    async fn cached(&self, endpoint: &str, params: Params) -> Result<Value, SubsonicError> {
        let key = cache_key(endpoint, &params);
        let hit = self
            .inner
            .cache
            .lock()
            .ok()
            .and_then(|mut c| c.get(&key));
        if let Some(v) = hit {
            tracing::trace!(%key, "cache hit");
            return Ok(v);
        }

        let v = self.call(endpoint, params).await?;
        if let Ok(mut c) = self.inner.cache.lock() {
            c.insert(key, v.clone());
        }
        Ok(v)
    }

    /// GET an endpoint and unwrap the `subsonic-response` envelope.
    async fn call(&self, endpoint: &str, params: Params) -> Result<Value, SubsonicError> {
        let url = self.url(endpoint, &params);
        tracing::debug!(endpoint, "subsonic request");

        let resp = self.inner.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SubsonicError::Status(status));
        }
        let body: Value = resp.json().await?;
        unwrap_envelope(body).inspect_err(|e| {
            tracing::warn!(endpoint, error = %e, "subsonic call failed");
        })
    }
}

/// Authentication parameters change per request, so the key is built from
/// the endpoint and the remaining parameters only.
fn cache_key(endpoint: &str, params: &[(&'static str, String)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort();
    let mut key = endpoint.to_string();
    for (k, v) in sorted {
        key.push('|');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

fn unwrap_envelope(mut body: Value) -> Result<Value, SubsonicError> {
    let resp = body
        .get_mut("subsonic-response")
        .map(Value::take)
        .ok_or_else(|| SubsonicError::Decode("missing subsonic-response".into()))?;

    match resp.get("status").and_then(Value::as_str) {
        Some("ok") => Ok(resp),
        Some("failed") => {
            let err = resp.get("error");
            let code = err
                .and_then(|e| e.get("code"))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            let message = err
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(SubsonicError::Api { code, message })
        }
        other => Err(SubsonicError::Decode(format!("unexpected status {other:?}"))),
    }
}

fn payload<T: DeserializeOwned>(resp: &Value, key: &str) -> Result<T, SubsonicError> {
    let v = resp
        .get(key)
        .ok_or_else(|| SubsonicError::Decode(format!("missing `{key}`")))?;
    Ok(T::deserialize(v)?)
}

/// Servers omit list wrappers when they are empty.
fn payload_or_default<T: DeserializeOwned + Default>(
    resp: &Value,
    key: &str,
) -> Result<T, SubsonicError> {
    match resp.get(key) {
        Some(v) => Ok(T::deserialize(v)?),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SubsonicClient {
        let cfg = ServerConfig {
            url: format!("{}/", server.uri()),
            username: "alice".into(),
            password: "sesame".into(),
        };
        SubsonicClient::new(&cfg, &CacheConfig::default(), &PlayerConfig::default()).unwrap()
    }

    fn ok(body: Value) -> ResponseTemplate {
        let mut resp = json!({"status": "ok", "version": "1.16.1"});
        if let (Value::Object(r), Value::Object(b)) = (&mut resp, body) {
            r.extend(b);
        }
        ResponseTemplate::new(200).set_body_json(json!({ "subsonic-response": resp }))
    }

    #[test]
    fn unconfigured_server_is_rejected() {
        let err = SubsonicClient::new(
            &ServerConfig::default(),
            &CacheConfig::default(),
            &PlayerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SubsonicError::NotConfigured));
    }

    #[test]
    fn cache_key_ignores_parameter_order() {
        let a = cache_key("search3", &[("query", "x".into()), ("songCount", "5".into())]);
        let b = cache_key("search3", &[("songCount", "5".into()), ("query", "x".into())]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn ping_sends_token_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/ping"))
            .and(query_param("u", "alice"))
            .and(query_param("v", "1.16.1"))
            .and(query_param("c", "mice"))
            .and(query_param("f", "json"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).ping().await.unwrap();
    }

    #[tokio::test]
    async fn failed_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subsonic-response": {
                    "status": "failed",
                    "version": "1.16.1",
                    "error": {"code": 40, "message": "Wrong username or password"}
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).ping().await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "server error 40: Wrong username or password");
    }

    #[tokio::test]
    async fn http_failure_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/ping"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server).ping().await.unwrap_err();
        assert!(matches!(err, SubsonicError::Status(s) if s.as_u16() == 502));
    }

    #[tokio::test]
    async fn album_list_is_served_from_cache_on_repeat() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getAlbumList2"))
            .and(query_param("type", "newest"))
            .respond_with(ok(json!({
                "albumList2": {"album": [
                    {"id": "a1", "name": "First", "artist": "Band", "songCount": 9},
                    {"id": "a2", "name": "Second"}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let first = client.get_album_list(AlbumListKind::Newest, 50, 0).await.unwrap();
        let second = client.get_album_list(AlbumListKind::Newest, 50, 0).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(first[0].song_count, Some(9));

        let stats = client.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn empty_wrappers_decode_as_empty_lists() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getPlaylists"))
            .respond_with(ok(json!({"playlists": {}})))
            .mount(&server)
            .await;
        Mock::given(path("/rest/getStarred2"))
            .respond_with(ok(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.get_playlists().await.unwrap().is_empty());
        assert!(client.get_starred().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn artists_are_flattened_across_indexes() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getArtists"))
            .respond_with(ok(json!({
                "artists": {"index": [
                    {"name": "A", "artist": [{"id": "r1", "name": "Abba"}]},
                    {"name": "B", "artist": [{"id": "r2", "name": "Blur"}, {"id": "r3", "name": "Bjork"}]}
                ]}
            })))
            .mount(&server)
            .await;

        let artists = client_for(&server).get_artists().await.unwrap();
        let names: Vec<_> = artists.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Abba", "Blur", "Bjork"]);
    }

    #[tokio::test]
    async fn star_invalidates_cached_listings() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getStarred2"))
            .respond_with(ok(json!({"starred2": {"song": []}})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(path("/rest/star"))
            .and(query_param("albumId", "a1"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.get_starred().await.unwrap();
        client.star(&StarTarget::Album("a1".into())).await.unwrap();
        client.get_starred().await.unwrap();
    }

    #[tokio::test]
    async fn submitted_scrobble_invalidates_cached_listings() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getAlbumList2"))
            .and(query_param("type", "recent"))
            .respond_with(ok(json!({"albumList2": {"album": []}})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(path("/rest/scrobble"))
            .respond_with(ok(json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.get_album_list(AlbumListKind::Recent, 50, 0).await.unwrap();
        // Now-playing updates leave the cache alone.
        client.scrobble("s1", 1, false).await.unwrap();
        client.get_album_list(AlbumListKind::Recent, 50, 0).await.unwrap();
        assert_eq!(client.cache_stats().hits, 1);

        client.scrobble("s1", 2, true).await.unwrap();
        client.get_album_list(AlbumListKind::Recent, 50, 0).await.unwrap();
        client.get_album_list(AlbumListKind::Recent, 50, 0).await.unwrap();
    }

    #[tokio::test]
    async fn missing_legacy_lyrics_are_none() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getLyrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subsonic-response": {
                    "status": "failed",
                    "error": {"code": 70, "message": "Lyrics not found"}
                }
            })))
            .mount(&server)
            .await;

        let lyrics = client_for(&server).get_lyrics("Band", "Song").await.unwrap();
        assert_eq!(lyrics, None);
    }

    #[tokio::test]
    async fn structured_lyrics_fall_back_to_empty_when_unsupported() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getLyricsBySongId"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subsonic-response": {
                    "status": "failed",
                    "error": {"code": 0, "message": "Unknown method"}
                }
            })))
            .mount(&server)
            .await;

        let lyrics = client_for(&server).get_lyrics_by_song_id("s1").await.unwrap();
        assert!(lyrics.is_empty());
    }

    #[tokio::test]
    async fn structured_lyrics_decode() {
        let server = MockServer::start().await;
        Mock::given(path("/rest/getLyricsBySongId"))
            .and(query_param("id", "s1"))
            .respond_with(ok(json!({
                "lyricsList": {"structuredLyrics": [{
                    "lang": "eng",
                    "synced": true,
                    "line": [{"start": 1200, "value": "Hello"}, {"start": 3400, "value": "World"}]
                }]}
            })))
            .mount(&server)
            .await;

        let lyrics = client_for(&server).get_lyrics_by_song_id("s1").await.unwrap();
        assert_eq!(lyrics.len(), 1);
        assert!(lyrics[0].synced);
        assert_eq!(lyrics[0].line[1].start, Some(3400));
    }

    #[test]
    fn stream_url_carries_transcoding_options() {
        let server = ServerConfig {
            url: "http://music.local".into(),
            username: "alice".into(),
            password: "sesame".into(),
        };
        let player = PlayerConfig {
            max_bit_rate: 192,
            format: Some("opus".into()),
            ..PlayerConfig::default()
        };
        let client = SubsonicClient::new(&server, &CacheConfig::default(), &player).unwrap();
        let url = client.stream_url("song 1");
        assert!(url.starts_with("http://music.local/rest/stream?u=alice&t="));
        assert!(url.ends_with("&id=song%201&maxBitRate=192&format=opus"));
    }
}
