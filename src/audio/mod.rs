//! # Audio Module
//!
//! Per-guild queue state and the playback driver that keeps it in step with
//! the voice connection.
//!
//! ## Architecture
//!
//! ### [`queue`] - Playback State Machine
//! - Pure `MusicQueue`: pending tracks, current track, status, loop mode
//! - Every transition is a method; invariants are checked after each one
//! - Each time a track becomes current it gets a fresh [`queue::PlayId`]
//!
//! ### [`session`] / [`store`] - Guild Sessions
//! - `QueueSession` bundles a queue with its voice connection and track handle
//! - `GuildQueueStore` maps guilds to sessions, one async mutex per guild
//!
//! ### [`player`] - Playback Driver
//! - Applies commands to sessions and starts tracks through the transport
//! - Consumes [`events::TrackEnded`] on a single dispatcher task
//! - Ignores end events whose play id is no longer current
//!
//! ### [`transport`] / [`voice`] - Voice Seam
//! - `VoiceTransport` / `VoiceConnection` / `TrackControl` traits
//! - `SongbirdTransport` implements them on top of songbird
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use guild_music::audio::{player::AudioPlayer, store::GuildQueueStore, voice::SongbirdTransport};
//! use serenity::all::{ChannelId, GuildId};
//! use songbird::Songbird;
//! use std::sync::Arc;
//!
//! # async fn example(track: guild_music::sources::Track) -> anyhow::Result<()> {
//! let store = Arc::new(GuildQueueStore::new(1000));
//! let transport = Arc::new(SongbirdTransport::new(Songbird::serenity(), "yt-dlp"));
//! let (player, events) = AudioPlayer::new(store, transport);
//! let player = Arc::new(player);
//!
//! let dispatcher = player.clone();
//! tokio::spawn(async move { dispatcher.run(events).await });
//!
//! let guild_id = GuildId::new(123456789);
//! player.connect(guild_id, ChannelId::new(42)).await?;
//! player.enqueue(guild_id, track).await?;
//! player.skip(guild_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod player;
pub mod queue;
pub mod session;
pub mod store;
pub mod transport;
pub mod voice;

pub use events::{EndNotifier, NowPlaying, PlayerNotice, TrackEnded, TrackOutcome};
pub use player::{AudioPlayer, Enqueued, Skipped};
pub use queue::{LoopMode, MusicQueue, PlayId, PlaybackStatus, QueueInfo, QueuePage};
pub use store::GuildQueueStore;
