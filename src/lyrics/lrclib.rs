//! LRCLIB API client
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LrclibResponse {
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
    #[serde(default)]
    pub instrumental: bool,
}

impl LrclibResponse {
    /// Synced text when available, plain text otherwise. Instrumentals have none.
    pub fn best_text(&self) -> Option<&str> {
        if self.instrumental {
            return None;
        }
        [&self.synced_lyrics, &self.plain_lyrics]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    const DEFAULT_BASE_URL: &'static str = "https://lrclib.net/api";

    pub fn new() -> Self {
        Self {
            client: crate::http::HTTP.clone(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exact lookup first, then a fuzzy search.
    pub async fn get_lyrics(
        &self,
        track_name: &str,
        artist_name: &str,
        album_name: Option<&str>,
        duration_secs: Option<u32>,
    ) -> anyhow::Result<Option<LrclibResponse>> {
        if let Some(lyrics) = self
            .get_exact(track_name, artist_name, album_name, duration_secs)
            .await?
        {
            return Ok(Some(lyrics));
        }
        self.search(track_name, artist_name).await
    }

    async fn get_exact(
        &self,
        track_name: &str,
        artist_name: &str,
        album_name: Option<&str>,
        duration_secs: Option<u32>,
    ) -> anyhow::Result<Option<LrclibResponse>> {
        let mut url = format!(
            "{}/get?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(track_name),
            urlencoding::encode(artist_name)
        );
        if let Some(album) = album_name {
            url.push_str(&format!("&album_name={}", urlencoding::encode(album)));
        }
        if let Some(duration) = duration_secs {
            url.push_str(&format!("&duration={}", duration));
        }

        let response = self.client.get(&url).send().await.context("lrclib get")?;
        match response.status() {
            s if s.is_success() => Ok(Some(response.json().await.context("decode lrclib get")?)),
            s if s == reqwest::StatusCode::NOT_FOUND => Ok(None),
            s => anyhow::bail!("LRCLIB API error: {}", s),
        }
    }

    async fn search(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> anyhow::Result<Option<LrclibResponse>> {
        let url = format!(
            "{}/search?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(track_name),
            urlencoding::encode(artist_name)
        );

        let response = self.client.get(&url).send().await.context("lrclib search")?;
        match response.status() {
            s if s.is_success() => {
                let results: Vec<LrclibResponse> =
                    response.json().await.context("decode lrclib search")?;
                let best = results
                    .iter()
                    .find(|r| r.synced_lyrics.is_some())
                    .or_else(|| results.iter().find(|r| r.best_text().is_some()));
                Ok(best.cloned())
            }
            s if s == reqwest::StatusCode::NOT_FOUND => Ok(None),
            s => anyhow::bail!("LRCLIB search error: {}", s),
        }
    }
}

impl Default for LrclibClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn falls_back_to_search_and_prefers_synced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("track_name", "Song 1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"plainLyrics": "plain only", "syncedLyrics": null},
                {"plainLyrics": "x", "syncedLyrics": "[00:01.00]x"}
            ])))
            .mount(&server)
            .await;

        let client = LrclibClient::new().with_base_url(server.uri());
        let found = client
            .get_lyrics("Song 1", "Artist", None, Some(180))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.best_text(), Some("[00:01.00]x"));
    }

    #[test]
    fn instrumentals_have_no_text() {
        let r: LrclibResponse = serde_json::from_value(serde_json::json!({
            "instrumental": true,
            "plainLyrics": "[instrumental]"
        }))
        .unwrap();
        assert_eq!(r.best_text(), None);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = LrclibClient::new().with_base_url(server.uri());
        assert!(client.get_lyrics("a", "b", None, None).await.is_err());
    }
}
