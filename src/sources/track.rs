use serenity::model::id::UserId;
use std::fmt;
use std::time::Duration;

/// Artist used when no provider reported one.
pub const UNKNOWN_ARTIST: &str = "Unknown";

/// Which providers contributed a [`Track`]'s data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Metadata and stream both come from the primary provider.
    Native,
    /// Metadata from the secondary provider, stream from the primary one.
    Aggregated,
    /// Only the secondary provider matched. Cannot be played.
    MetadataOnly,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Native => "native",
            Provenance::Aggregated => "aggregated",
            Provenance::MetadataOnly => "metadata-only",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved audio item.
///
/// Built once by the resolver and never mutated afterwards; the queue moves it
/// around by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    title: String,
    artist: String,
    duration_secs: u64,
    stream_locator: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
    provenance: Provenance,
    secondary_url: Option<String>,
    provenance_note: Option<String>,
    requested_by: UserId,
}

impl Track {
    pub fn new(title: impl Into<String>, provenance: Provenance, requested_by: UserId) -> Self {
        Self {
            title: title.into(),
            artist: UNKNOWN_ARTIST.to_string(),
            duration_secs: 0,
            stream_locator: None,
            url: None,
            thumbnail: None,
            provenance,
            secondary_url: None,
            provenance_note: None,
            requested_by,
        }
    }

    // Getters
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn artist(&self) -> &str {
        &self.artist
    }
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }
    /// `None` when the duration is unknown (stored as 0).
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }
    pub fn stream_locator(&self) -> Option<&str> {
        self.stream_locator.as_deref()
    }
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
    pub fn secondary_url(&self) -> Option<&str> {
        self.secondary_url.as_deref()
    }
    pub fn provenance_note(&self) -> Option<&str> {
        self.provenance_note.as_deref()
    }
    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    /// A track can only be queued when a stream locator is present.
    pub fn is_playable(&self) -> bool {
        self.stream_locator.is_some()
    }

    // Builders
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        let artist = artist.into();
        if !artist.trim().is_empty() {
            self.artist = artist;
        }
        self
    }

    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_stream_locator(mut self, locator: impl Into<String>) -> Self {
        self.stream_locator = Some(locator.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn with_secondary_url(mut self, url: Option<String>) -> Self {
        self.secondary_url = url;
        self
    }

    pub fn with_provenance_note(mut self, note: impl Into<String>) -> Self {
        self.provenance_note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_means_unknown() {
        let track = Track::new("Live set", Provenance::Native, UserId::new(1));
        assert_eq!(track.duration_secs(), 0);
        assert_eq!(track.duration(), None);

        let track = track.with_duration_secs(180);
        assert_eq!(track.duration(), Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_blank_artist_keeps_unknown() {
        let track = Track::new("Song", Provenance::Native, UserId::new(1)).with_artist("  ");
        assert_eq!(track.artist(), UNKNOWN_ARTIST);
    }

    #[test]
    fn test_playable_requires_locator() {
        let track = Track::new("Song", Provenance::MetadataOnly, UserId::new(1));
        assert!(!track.is_playable());
        assert!(track
            .with_stream_locator("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .is_playable());
    }
}
