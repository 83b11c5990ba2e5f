use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::{Credential, MetadataSource, SourceMetadata};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Tokens are refreshed this long before Spotify says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Secondary provider backed by the Spotify Web API (client-credentials flow).
pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    credential: Credential,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    #[serde(default)]
    duration_ms: u64,
    album: Option<SpotifyAlbum>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build Spotify HTTP client")?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<Credential> {
        let guard = self.token.lock();
        guard
            .as_ref()
            .filter(|token| Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at)
            .map(|token| token.credential.clone())
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let basic = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));

        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Spotify token request failed")?
            .error_for_status()
            .context("Spotify rejected the client credentials")?
            .json()
            .await
            .context("Could not parse Spotify token response")?;

        Ok(CachedToken {
            credential: Credential {
                access_token: response.access_token,
            },
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        })
    }

    async fn api_get(&self, credential: &Credential, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&credential.access_token)
            .query(query)
            .send()
            .await
            .context("Spotify API request failed")?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked early; next authenticate() fetches a fresh one
            self.token.lock().take();
        }

        response
            .error_for_status()
            .context("Spotify API returned an error")
    }
}

#[async_trait]
impl MetadataSource for SpotifyClient {
    async fn authenticate(&self) -> Result<Option<Credential>> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Ok(None);
        }

        if let Some(credential) = self.cached_token() {
            return Ok(Some(credential));
        }

        let token = self.request_token().await?;
        info!("🔑 Spotify token refreshed");
        let credential = token.credential.clone();
        *self.token.lock() = Some(token);
        Ok(Some(credential))
    }

    async fn search(&self, credential: &Credential, query: &str) -> Result<Option<SourceMetadata>> {
        if let Some(track_id) = spotify_track_id(query) {
            debug!("🎧 Looking up Spotify track {}", track_id);
            let url = format!("{}/tracks/{}", API_BASE, track_id);
            let track: SpotifyTrack = self
                .api_get(credential, &url, &[])
                .await?
                .json()
                .await
                .context("Could not parse Spotify track")?;
            return Ok(Some(track_to_metadata(track)));
        }

        debug!("🔍 Searching Spotify: {}", query);
        let body = self
            .api_get(
                credential,
                &format!("{}/search", API_BASE),
                &[("q", query), ("type", "track"), ("limit", "1")],
            )
            .await?
            .text()
            .await
            .context("Could not read Spotify search response")?;

        let result = parse_search_response(&body)?;
        if result.is_none() {
            warn!("Spotify returned no tracks for {}", query);
        }
        Ok(result)
    }

    fn source_name(&self) -> &'static str {
        "Spotify"
    }
}

/// Track id of an `open.spotify.com/track/<id>` link (with or without locale prefix).
pub fn spotify_track_id(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    if parsed.host_str()? != "open.spotify.com" {
        return None;
    }

    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let position = segments.iter().position(|segment| *segment == "track")?;
    let id = segments.get(position + 1)?;

    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())).then(|| id.to_string())
}

fn parse_search_response(body: &str) -> Result<Option<SourceMetadata>> {
    let response: SearchResponse =
        serde_json::from_str(body).context("Could not parse Spotify search response")?;
    Ok(response.tracks.items.into_iter().next().map(track_to_metadata))
}

fn track_to_metadata(track: SpotifyTrack) -> SourceMetadata {
    SourceMetadata {
        title: track.name,
        artist: track.artists.into_iter().next().map(|artist| artist.name),
        duration_secs: track.duration_ms / 1000,
        thumbnail: track
            .album
            .and_then(|album| album.images.into_iter().next())
            .map(|image| image.url),
        url: track.external_urls.and_then(|urls| urls.spotify),
        stream_locator: None,
    }
}
