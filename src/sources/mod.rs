//! # Sources Module
//!
//! Metadata and stream providers, and the resolver that combines them.
//!
//! Two kinds of provider plug into the [`TrackResolver`]:
//!
//! - a **primary** [`MusicSource`] (YouTube) that knows how to find something
//!   playable and returns a stream locator alongside best-effort metadata;
//! - an optional **secondary** [`MetadataSource`] (Spotify) that returns clean
//!   metadata (title, artist, duration, artwork, canonical URL) but never a
//!   stream.
//!
//! Providers report failures through `anyhow::Result`. The resolver is the
//! boundary: it turns every provider error or timeout into "no result from
//! that provider" so nothing leaks into the queue.

pub mod resolver;
pub mod spotify;
pub mod track;
pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;

pub use resolver::TrackResolver;
pub use spotify::SpotifyClient;
pub use track::{Provenance, Track, UNKNOWN_ARTIST};
pub use youtube::YouTubeClient;

/// Metadata as reported by a single provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    pub title: String,
    pub artist: Option<String>,
    /// Whole seconds, 0 when unknown.
    pub duration_secs: u64,
    pub thumbnail: Option<String>,
    /// Canonical page for the item on this provider.
    pub url: Option<String>,
    /// Only primary providers fill this in.
    pub stream_locator: Option<String>,
}

/// Access token for a provider that requires authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
}

/// Provider that can find a playable stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MusicSource: Send + Sync {
    /// Best match for a free-text query.
    async fn search(&self, query: &str) -> Result<Option<SourceMetadata>>;

    /// Metadata for a direct link recognized by [`MusicSource::is_valid_url`].
    async fn get_track(&self, url: &str) -> Result<Option<SourceMetadata>>;

    /// Whether the query is a direct link this source understands.
    fn is_valid_url(&self, url: &str) -> bool;

    fn source_name(&self) -> &'static str;
}

/// Provider of high-quality metadata that never yields a stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// `Ok(None)` when no credentials are configured.
    async fn authenticate(&self) -> Result<Option<Credential>>;

    async fn search(&self, credential: &Credential, query: &str) -> Result<Option<SourceMetadata>>;

    fn source_name(&self) -> &'static str;
}
