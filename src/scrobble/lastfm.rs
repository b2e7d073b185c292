//! Last.fm scrobbling API client
//!
//! API Documentation: https://www.last.fm/api/scrobbling
//!
//! Write calls are signed: `api_sig = md5(k1 v1 k2 v2 ... secret)` over the
//! parameters sorted by name, excluding `format`.

use crate::subsonic::models::Song;
use anyhow::Context;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

#[derive(Debug, Deserialize)]
struct ApiError {
    error: u32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: SessionInfo,
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    name: String,
    key: String,
}

/// Session obtained from `auth.getMobileSession`.
#[derive(Debug, Clone)]
pub struct LastfmSession {
    pub username: String,
    pub key: String,
}

#[derive(Clone)]
pub struct LastfmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for LastfmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastfmClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl LastfmClient {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            http: crate::http::HTTP.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exchange username/password for a session key.
    pub async fn get_mobile_session(
        &self,
        username: &str,
        password: &str,
    ) -> anyhow::Result<LastfmSession> {
        let body = self
            .post(vec![
                ("method", "auth.getMobileSession".to_string()),
                ("username", username.to_string()),
                ("password", password.to_string()),
            ])
            .await?;
        let resp: SessionResponse =
            serde_json::from_str(&body).context("parse auth.getMobileSession")?;
        Ok(LastfmSession {
            username: resp.session.name,
            key: resp.session.key,
        })
    }

    pub async fn update_now_playing(&self, session_key: &str, song: &Song) -> anyhow::Result<()> {
        let mut params = vec![
            ("method", "track.updateNowPlaying".to_string()),
            ("sk", session_key.to_string()),
        ];
        params.extend(track_params(song));
        self.post(params).await?;
        Ok(())
    }

    pub async fn scrobble(
        &self,
        session_key: &str,
        song: &Song,
        played_at: i64,
    ) -> anyhow::Result<()> {
        let mut params = vec![
            ("method", "track.scrobble".to_string()),
            ("sk", session_key.to_string()),
            ("timestamp", played_at.to_string()),
        ];
        params.extend(track_params(song));
        self.post(params).await?;
        Ok(())
    }

    async fn post(&self, mut params: Vec<(&'static str, String)>) -> anyhow::Result<String> {
        params.push(("api_key", self.api_key.clone()));
        let sig = sign(&params, &self.api_secret);
        params.push(("api_sig", sig));
        params.push(("format", "json".to_string()));

        let body = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .http
            .post(&self.base_url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .context("send last.fm request")?;

        let status = response.status();
        let text = response.text().await.context("read last.fm response")?;

        // Errors come back as {"error": N, "message": "..."}, sometimes with 200.
        if let Ok(err) = serde_json::from_str::<ApiError>(&text) {
            anyhow::bail!("last.fm error {}: {}", err.error, err.message);
        }
        if !status.is_success() {
            anyhow::bail!("last.fm HTTP {}", status);
        }
        Ok(text)
    }
}

fn track_params(song: &Song) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("artist", song.artist_name().to_string()),
        ("track", song.title.clone()),
    ];
    if let Some(album) = &song.album {
        params.push(("album", album.clone()));
    }
    if let Some(duration) = song.duration {
        params.push(("duration", duration.to_string()));
    }
    if let Some(n) = song.track {
        params.push(("trackNumber", n.to_string()));
    }
    params
}

/// Concatenation that gets hashed, exposed for tests.
fn signature_base(params: &[(&'static str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(k, _)| *k != "format").collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let mut base = String::new();
    for (k, v) in sorted {
        base.push_str(k);
        base.push_str(v);
    }
    base.push_str(secret);
    base
}

fn sign(params: &[(&'static str, String)], secret: &str) -> String {
    hex::encode(md5::compute(signature_base(params, secret)).0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::make_song;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn signature_sorts_params_and_skips_format() {
        let params = vec![
            ("track", "Song".to_string()),
            ("artist", "Band".to_string()),
            ("format", "json".to_string()),
            ("api_key", "KEY".to_string()),
        ];
        assert_eq!(signature_base(&params, "SECRET"), "api_keyKEYartistBandtrackSongSECRET");
        let sig = sign(&params, "SECRET");
        assert_eq!(sig.len(), 32);
        assert_eq!(sig, hex::encode(md5::compute("api_keyKEYartistBandtrackSongSECRET").0));
    }

    #[tokio::test]
    async fn scrobble_posts_signed_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("method=track.scrobble"))
            .and(body_string_contains("sk=SESSION"))
            .and(body_string_contains("timestamp=1700000000"))
            .and(body_string_contains("api_sig="))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"scrobbles":{}}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = LastfmClient::new("KEY", "SECRET").with_base_url(server.uri());
        client
            .scrobble("SESSION", &make_song("1"), 1_700_000_000)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_error_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"error":9,"message":"Invalid session key"}"#),
            )
            .mount(&server)
            .await;

        let client = LastfmClient::new("KEY", "SECRET").with_base_url(server.uri());
        let err = client
            .update_now_playing("BAD", &make_song("1"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid session key"));
    }

    #[tokio::test]
    async fn mobile_session_returns_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("method=auth.getMobileSession"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"session":{"name":"alice","key":"abc123","subscriber":0}}"#,
            ))
            .mount(&server)
            .await;

        let client = LastfmClient::new("KEY", "SECRET").with_base_url(server.uri());
        let session = client.get_mobile_session("alice", "pw").await.unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(session.key, "abc123");
    }
}
