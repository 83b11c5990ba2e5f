use serenity::model::id::UserId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{MetadataSource, MusicSource, Provenance, SourceMetadata, Track};
use crate::error::{MusicError, Result};

/// Default per-call provider timeout.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// Turns a free-text query or a link into a [`Track`].
///
/// Resolution always degrades: a provider that errors or times out counts as
/// having returned nothing, and the resolver moves on to the next strategy.
/// The only failure reported to callers is [`MusicError::NotFound`]. A
/// [`Provenance::MetadataOnly`] track is a successful resolution that cannot be
/// played; callers must check [`Track::is_playable`] before queueing it.
pub struct TrackResolver {
    primary: Arc<dyn MusicSource>,
    secondary: Option<Arc<dyn MetadataSource>>,
    provider_timeout: Duration,
}

impl TrackResolver {
    pub fn new(primary: Arc<dyn MusicSource>) -> Self {
        Self {
            primary,
            secondary: None,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn MetadataSource>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    pub async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MusicError::NotFound {
                query: String::new(),
            });
        }

        let primary_name = self.primary.source_name();

        if self.primary.is_valid_url(query) {
            info!("🔗 Direct {} link: {}", primary_name, query);
            let found = self
                .bounded(primary_name, "link lookup", self.primary.get_track(query))
                .await;
            return found
                .map(|meta| native_track(meta, requested_by))
                .ok_or_else(|| not_found(query));
        }

        if let Some(track) = self.resolve_through_secondary(query, requested_by).await {
            return Ok(track);
        }

        self.bounded(primary_name, "search", self.primary.search(query))
            .await
            .map(|meta| native_track(meta, requested_by))
            .ok_or_else(|| not_found(query))
    }

    /// `None` when the secondary provider is absent, unauthenticated or had no match.
    async fn resolve_through_secondary(&self, query: &str, requested_by: UserId) -> Option<Track> {
        let secondary = self.secondary.as_ref()?;
        let secondary_name = secondary.source_name();

        let Some(credential) = self
            .bounded(secondary_name, "authentication", secondary.authenticate())
            .await
        else {
            debug!("{} not available, skipping", secondary_name);
            return None;
        };

        let metadata = self
            .bounded(secondary_name, "search", secondary.search(&credential, query))
            .await?;

        let derived_query = match metadata.artist.as_deref() {
            Some(artist) => format!("{} {}", metadata.title, artist),
            None => metadata.title.clone(),
        };
        info!("🎼 {} matched, searching stream for: {}", secondary_name, derived_query);

        let primary_name = self.primary.source_name();
        let stream = self
            .bounded(primary_name, "derived search", self.primary.search(&derived_query))
            .await
            .filter(|meta| meta.stream_locator.is_some());

        Some(match stream {
            Some(stream) => {
                let note = format!("Found on {}, streaming from {}", secondary_name, primary_name);
                aggregated_track(metadata, stream, note, requested_by)
            }
            None => {
                warn!(
                    "⚠️ {} found `{}` but {} has no stream for it",
                    secondary_name, metadata.title, primary_name
                );
                metadata_only_track(metadata, secondary_name, requested_by)
            }
        })
    }

    /// Runs a provider call under the timeout, flattening failures into `None`.
    async fn bounded<T, F>(&self, provider: &str, what: &str, call: F) -> Option<T>
    where
        F: Future<Output = anyhow::Result<Option<T>>>,
    {
        match timeout(self.provider_timeout, call).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!("⚠️ {} {} failed: {:#}", provider, what, e);
                None
            }
            Err(_) => {
                warn!(
                    "⏰ {} {} timed out after {}",
                    provider,
                    what,
                    humantime::format_duration(self.provider_timeout)
                );
                None
            }
        }
    }
}

fn not_found(query: &str) -> MusicError {
    MusicError::NotFound {
        query: query.to_string(),
    }
}

fn native_track(meta: SourceMetadata, requested_by: UserId) -> Track {
    let mut track = Track::new(meta.title, Provenance::Native, requested_by)
        .with_duration_secs(meta.duration_secs)
        .with_thumbnail(meta.thumbnail);

    if let Some(artist) = meta.artist {
        track = track.with_artist(artist);
    }
    if let Some(url) = meta.url {
        track = track.with_url(url);
    }
    if let Some(locator) = meta.stream_locator {
        track = track.with_stream_locator(locator);
    }
    track
}

fn aggregated_track(
    metadata: SourceMetadata,
    stream: SourceMetadata,
    note: String,
    requested_by: UserId,
) -> Track {
    let duration_secs = if metadata.duration_secs > 0 {
        metadata.duration_secs
    } else {
        stream.duration_secs
    };

    let mut track = Track::new(metadata.title, Provenance::Aggregated, requested_by)
        .with_duration_secs(duration_secs)
        .with_thumbnail(metadata.thumbnail.or(stream.thumbnail))
        .with_secondary_url(metadata.url)
        .with_provenance_note(note);

    if let Some(artist) = metadata.artist {
        track = track.with_artist(artist);
    }
    if let Some(url) = stream.url {
        track = track.with_url(url);
    }
    if let Some(locator) = stream.stream_locator {
        track = track.with_stream_locator(locator);
    }
    track
}

fn metadata_only_track(metadata: SourceMetadata, secondary_name: &str, requested_by: UserId) -> Track {
    let mut track = Track::new(metadata.title, Provenance::MetadataOnly, requested_by)
        .with_duration_secs(metadata.duration_secs)
        .with_thumbnail(metadata.thumbnail)
        .with_secondary_url(metadata.url)
        .with_provenance_note(format!("Found on {} only, no stream available", secondary_name));

    if let Some(artist) = metadata.artist {
        track = track.with_artist(artist);
    }
    track
}
