//! Error types for the music core.
//!
//! Provider and transport plumbing stays on `anyhow::Result`; everything that
//! crosses into the queue, the driver or the command layer is a [`MusicError`]
//! so callers can turn it into a user-facing reply.

use thiserror::Error;

/// Result alias used by the queue, driver and command layers.
pub type Result<T> = std::result::Result<T, MusicError>;

/// Errors surfaced by the music core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    /// No provider found a playable match.
    #[error("no results found for `{query}`")]
    NotFound { query: String },

    /// A match exists but there is no stream to play it from.
    #[error("found `{title}` by {artist} but could not find a playable stream for it")]
    MetadataOnly { title: String, artist: String },

    /// Transport or stream error on a track that was already queued.
    #[error("playback failed for `{title}`: {reason}")]
    PlaybackFailure { title: String, reason: String },

    /// Operation requested in a state where it makes no sense.
    #[error(transparent)]
    Precondition(#[from] Precondition),

    #[error("invalid loop mode `{0}` (expected off, one or all)")]
    InvalidLoopMode(String),

    #[error("the queue is full (max {max} tracks)")]
    QueueFull { max: usize },

    #[error("you need to be in a voice channel")]
    NotInVoiceChannel,

    #[error("not connected to a voice channel")]
    NotConnected,

    /// The voice transport refused to connect.
    #[error("voice connection failed: {0}")]
    Voice(String),

    #[error("you have no playlist named `{name}`")]
    PlaylistNotFound { name: String },

    #[error("you already have a playlist named `{name}`")]
    PlaylistExists { name: String },

    #[error("playlist `{name}` is empty")]
    PlaylistEmpty { name: String },

    #[error("playlist names must be 1 to {max} characters without spaces")]
    InvalidPlaylistName { max: usize },

    /// Playlists could not be written to disk. Nothing was changed.
    #[error("could not save playlists: {0}")]
    Storage(String),
}

/// Caller-visible precondition failures. State is never modified when one is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    #[error("nothing is playing")]
    NothingPlaying,

    #[error("need at least 2 tracks in the queue to shuffle (have {len})")]
    NotEnoughTracks { len: usize },

    #[error("playback is already paused")]
    AlreadyPaused,

    #[error("playback is not paused")]
    NotPaused,

    #[error("position {position} is out of range (queue has {len} tracks)")]
    IndexOutOfRange { position: usize, len: usize },
}

impl MusicError {
    /// Whether the error comes from the caller's request rather than the system.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MusicError::Precondition(_)
                | MusicError::InvalidLoopMode(_)
                | MusicError::QueueFull { .. }
                | MusicError::NotInVoiceChannel
                | MusicError::PlaylistNotFound { .. }
                | MusicError::PlaylistExists { .. }
                | MusicError::PlaylistEmpty { .. }
                | MusicError::InvalidPlaylistName { .. }
        )
    }
}
