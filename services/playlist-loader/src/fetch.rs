//!
//! src/fetch.rs
//!
//! Defines the musicbrainz client used to enrich playlist rows and the
//! MetadataSource trait the import pipeline depends on
//!

use async_trait::async_trait;
use url::Url;
use reqwest::{Client, header, redirect, RequestBuilder};
use tracing::debug;

use crate::config::{HttpConfig, IdentityConfig, MusicBrainzConfig};
use crate::types::Metadata;
use crate::LoaderError;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder  {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

pub fn musicbrainz_client(http: &HttpConfig, id: &IdentityConfig) ->
    Result<Client, LoaderError> {

    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    h.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&id.user_agent)
            .map_err(|e| LoaderError::Config(
                format!("invalid mb user-agent {e}")
            ))?
    );
    client_helper(http)
        .default_headers(h)
        .build()
        .map_err(|e| LoaderError::Http(format!("build client: {e}")))
}

/// Anything that can resolve enrichment fields for a song.
///
/// Errors are returned rather than swallowed; deciding to fall back to
/// defaults is the caller's job.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, song_name: &str, artist_name: Option<&str>) ->
        Result<Metadata, LoaderError>;
}

#[derive(Debug, Clone)]
pub struct MusicBrainzClient {
    pub http: Client,
    pub base: Url,
    pub search_limit: u32
}

impl MusicBrainzClient {
    pub fn new(
        http_config: &HttpConfig,
        id: &IdentityConfig,
        cfg: &MusicBrainzConfig) -> Result<Self, LoaderError> {
        let http = musicbrainz_client(http_config, id)?;
        Ok( Self{
            http,
            base: cfg.base_url.clone(),
            search_limit: cfg.search_limit
        })
    }

    /// Free text query, song name then optional artist
    pub fn search_query(song_name: &str, artist_name: Option<&str>) -> String {
        match artist_name.map(str::trim).filter(|a| !a.is_empty()) {
            Some(artist) => format!("{} {artist}", song_name.trim()),
            None => song_name.trim().to_string()
        }
    }

    /// GET /ws/2/recording?query=...&fmt=json&limit=
    pub fn search_recording(&self, query: &str) -> Result<RequestBuilder, LoaderError> {
        let url = self.base.join("recording")
            .map_err(|e| LoaderError::Config(format!("recording url: {e}")))?;
        let limit = self.search_limit.to_string();
        Ok(self.http.get(url).query(&[
            ("query", query),
            ("fmt", "json"),
            ("limit", limit.as_str())
        ]))
    }
}

#[async_trait]
impl MetadataSource for MusicBrainzClient {
    async fn fetch(&self, song_name: &str, artist_name: Option<&str>) ->
        Result<Metadata, LoaderError> {
        let query = Self::search_query(song_name, artist_name);
        debug!(%query, "musicbrainz.search");

        let response = self.search_recording(&query)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::Http(
                format!("status {status} searching for '{song_name}'")
            ));
        }

        let value: serde_json::Value = response.json().await?;
        let recording = value.pointer("/recordings/0")
            .ok_or_else(|| LoaderError::NotFound(
                format!("no recording for '{song_name}'")
            ))?;

        Ok(Metadata::from_recording(recording))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> MusicBrainzClient {
        let cfg = MusicBrainzConfig {
            base_url: Url::parse(&format!("{}/ws/2/", server.uri())).unwrap(),
            search_limit: 1
        };
        let identity = IdentityConfig { user_agent: "playlist-loader-test/0.1".into() };
        MusicBrainzClient::new(&HttpConfig::default(), &identity, &cfg).unwrap()
    }

    #[test]
    fn query_appends_artist_only_when_given() {
        assert_eq!(MusicBrainzClient::search_query("Bohemian Rhapsody", None),
            "Bohemian Rhapsody");
        assert_eq!(MusicBrainzClient::search_query("Bohemian Rhapsody", Some("Queen")),
            "Bohemian Rhapsody Queen");
        assert_eq!(MusicBrainzClient::search_query("Yesterday ", Some("  ")),
            "Yesterday");
    }

    #[tokio::test]
    async fn fetch_maps_first_recording() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/2/recording"))
            .and(query_param("query", "Bohemian Rhapsody"))
            .and(query_param("fmt", "json"))
            .and(header("user-agent", "playlist-loader-test/0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "recordings": [
                    {
                        "length": 354000,
                        "artist-credit": [{ "name": "Queen" }],
                        "releases": [{ "title": "A Night at the Opera", "date": "1975-11-21" }]
                    },
                    {
                        "length": 1000,
                        "artist-credit": [{ "name": "Cover Band" }],
                        "releases": [{ "title": "Covers", "date": "2001" }]
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let metadata = client.fetch("Bohemian Rhapsody", None).await.unwrap();

        assert_eq!(metadata.album, "A Night at the Opera");
        assert_eq!(metadata.artist, "Queen");
        assert_eq!(metadata.release_date, "1975-11-21");
        assert_eq!(metadata.duration, "5:54");
    }

    #[tokio::test]
    async fn artist_is_part_of_query_when_supplied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/2/recording"))
            .and(query_param("query", "Yesterday The Beatles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "recordings": [{ "artist-credit": [{ "name": "The Beatles" }] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let metadata = client.fetch("Yesterday", Some("The Beatles")).await.unwrap();
        assert_eq!(metadata.artist, "The Beatles");
        assert_eq!(metadata.duration, "Unknown Duration");
    }

    #[tokio::test]
    async fn error_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/2/recording"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch("Bohemian Rhapsody", None).await.unwrap_err();
        assert!(matches!(err, LoaderError::Http(ref msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn empty_result_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/2/recording"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": "2025-01-01T00:00:00Z",
                "count": 0,
                "recordings": []
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch("zzzz no such song", None).await.unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/2/recording"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.fetch("Bohemian Rhapsody", None).await.is_err());
    }
}
