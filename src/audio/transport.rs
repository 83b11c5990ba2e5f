//! Seam between the playback driver and whatever actually produces audio.
//!
//! The driver only ever talks to these traits. Production wires in
//! [`SongbirdTransport`](super::voice::SongbirdTransport); tests use a fake
//! that records plays and fires notifiers on demand.

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};

use super::events::EndNotifier;
use crate::sources::Track;

/// Opens voice connections.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Box<dyn VoiceConnection>>;
}

/// A live voice connection for one guild.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    fn channel_id(&self) -> ChannelId;

    /// Starts streaming `track`. The transport must eventually call exactly one
    /// of `notifier.finished()` or `notifier.failed(..)` unless the play is
    /// stopped first, in which case it may still do so.
    async fn play(&mut self, track: &Track, notifier: EndNotifier) -> Result<Box<dyn TrackControl>>;

    async fn disconnect(&mut self);
}

/// Control over one playing track.
pub trait TrackControl: Send + Sync {
    fn pause(&self) -> Result<()>;
    fn resume(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
}
