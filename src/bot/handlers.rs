use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::commands::{Command, PlaylistCommand};
use crate::audio::{AudioPlayer, LoopMode, NowPlaying, PlaybackStatus, QueuePage};
use crate::error::{MusicError, Precondition, Result};
use crate::sources::{Track, TrackResolver};
use crate::storage::{Playlist, PlaylistEntry, PlaylistStore};

/// What the command surface needs from the rest of the bot.
pub struct MusicService {
    pub player: Arc<AudioPlayer>,
    pub resolver: Arc<TrackResolver>,
    pub playlists: Arc<PlaylistStore>,
    pub queue_page_size: usize,
}

/// Who issued a command and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    pub guild_id: GuildId,
    pub author: UserId,
    /// Voice channel the author is sitting in, if any.
    pub author_channel: Option<ChannelId>,
}

/// Structured result of a command, rendered by `ui::embeds`.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Queued {
        track: Track,
        position: usize,
        started: bool,
    },
    Skipped {
        skipped: Track,
        now_playing: Option<Track>,
    },
    Paused(Track),
    Resumed(Track),
    Queue(QueueListing),
    Stopped { dropped: usize },
    Shuffled { count: usize },
    LoopSet(LoopMode),
    NowPlaying(Option<NowPlaying>),
    Removed { track: Track, position: usize },
    Cleared { count: usize },
    Joined(ChannelId),
    Left { dropped: usize },
    Help,
    PlaylistCreated(Playlist),
    Playlists(Vec<Playlist>),
    PlaylistShown(Playlist),
    PlaylistSongAdded {
        playlist: String,
        entry: PlaylistEntry,
        len: usize,
    },
    PlaylistSongRemoved {
        playlist: String,
        entry: PlaylistEntry,
        position: usize,
    },
    PlaylistDeleted(Playlist),
    /// `skipped` songs did not fit in the queue.
    PlaylistQueued {
        playlist: String,
        queued: usize,
        skipped: usize,
        started: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueListing {
    pub current: Option<Track>,
    pub status: PlaybackStatus,
    pub loop_mode: LoopMode,
    pub total_duration: Duration,
    pub page: QueuePage,
}

/// Executes one parsed command against the guild's playback state.
pub async fn handle_command(
    service: &MusicService,
    ctx: &CommandContext,
    command: Command,
) -> Result<CommandOutcome> {
    info!("📝 Command {} from {} in guild {}", command.name(), ctx.author, ctx.guild_id);

    let player = &service.player;
    let guild_id = ctx.guild_id;

    let outcome = match command {
        Command::Play(query) => handle_play(service, ctx, &query).await?,
        Command::Skip => {
            let skipped = player.skip(guild_id).await?;
            CommandOutcome::Skipped {
                skipped: skipped.skipped,
                now_playing: skipped.now_playing,
            }
        }
        Command::Pause => CommandOutcome::Paused(player.pause(guild_id).await?),
        Command::Resume => CommandOutcome::Resumed(player.resume(guild_id).await?),
        Command::Queue { page } => {
            let info = player.queue_info(guild_id).await;
            CommandOutcome::Queue(QueueListing {
                page: info.get_page(page, service.queue_page_size),
                current: info.current,
                status: info.status,
                loop_mode: info.loop_mode,
                total_duration: info.total_duration,
            })
        }
        Command::Stop => CommandOutcome::Stopped {
            dropped: player.stop(guild_id).await,
        },
        Command::Shuffle => CommandOutcome::Shuffled {
            count: player.shuffle(guild_id).await?,
        },
        Command::Loop(mode) => {
            player.set_loop(guild_id, mode).await;
            CommandOutcome::LoopSet(mode)
        }
        Command::NowPlaying => CommandOutcome::NowPlaying(player.now_playing(guild_id).await),
        Command::Remove(position) => CommandOutcome::Removed {
            track: player.remove(guild_id, position).await?,
            position,
        },
        Command::Clear => CommandOutcome::Cleared {
            count: player.clear(guild_id).await,
        },
        Command::Join => {
            let channel_id = ctx.author_channel.ok_or(MusicError::NotInVoiceChannel)?;
            player.connect(guild_id, channel_id).await?;
            CommandOutcome::Joined(channel_id)
        }
        Command::Leave => CommandOutcome::Left {
            dropped: player.disconnect(guild_id).await?,
        },
        Command::Help => CommandOutcome::Help,
        Command::Playlist(command) => handle_playlist(service, ctx, command).await?,
    };

    Ok(outcome)
}

/// Resolves the query, joins the author's channel if needed and queues the track.
async fn handle_play(service: &MusicService, ctx: &CommandContext, query: &str) -> Result<CommandOutcome> {
    let player = &service.player;
    let channel_id = ctx.author_channel.ok_or(MusicError::NotInVoiceChannel)?;

    let track = resolve_playable(service, ctx, query).await?;

    player.ensure_capacity(ctx.guild_id).await?;
    if !player.is_connected(ctx.guild_id).await {
        player.connect(ctx.guild_id, channel_id).await?;
    }

    let enqueued = player.enqueue(ctx.guild_id, track.clone()).await?;
    Ok(CommandOutcome::Queued {
        track,
        position: enqueued.position,
        started: enqueued.started,
    })
}

async fn resolve_playable(service: &MusicService, ctx: &CommandContext, query: &str) -> Result<Track> {
    let track = service.resolver.resolve(query, ctx.author).await?;
    if !track.is_playable() {
        return Err(MusicError::MetadataOnly {
            title: track.title().to_string(),
            artist: track.artist().to_string(),
        });
    }
    Ok(track)
}

async fn handle_playlist(
    service: &MusicService,
    ctx: &CommandContext,
    command: PlaylistCommand,
) -> Result<CommandOutcome> {
    let playlists = &service.playlists;
    let owner = ctx.author;

    let outcome = match command {
        PlaylistCommand::Create(name) => CommandOutcome::PlaylistCreated(playlists.create(owner, &name).await?),
        PlaylistCommand::List => CommandOutcome::Playlists(playlists.list(owner).await),
        PlaylistCommand::Show(name) => CommandOutcome::PlaylistShown(playlists.get(owner, &name).await?),
        PlaylistCommand::Add { name, query } => {
            // Fail on a bad name before spending a search on it
            let playlist = playlists.get(owner, &name).await?;
            let track = match query {
                Some(query) => resolve_playable(service, ctx, &query).await?,
                None => {
                    service
                        .player
                        .now_playing(ctx.guild_id)
                        .await
                        .ok_or(Precondition::NothingPlaying)?
                        .track
                }
            };
            let entry = PlaylistEntry::from_track(&track).ok_or_else(|| MusicError::MetadataOnly {
                title: track.title().to_string(),
                artist: track.artist().to_string(),
            })?;

            let len = playlists.add(owner, &playlist.name, entry.clone()).await?;
            CommandOutcome::PlaylistSongAdded {
                playlist: playlist.name,
                entry,
                len,
            }
        }
        PlaylistCommand::Remove { name, position } => {
            let entry = playlists.remove_song(owner, &name, position).await?;
            CommandOutcome::PlaylistSongRemoved {
                playlist: name,
                entry,
                position,
            }
        }
        PlaylistCommand::Delete(name) => CommandOutcome::PlaylistDeleted(playlists.delete(owner, &name).await?),
        PlaylistCommand::Play(name) => play_playlist(service, ctx, &name).await?,
    };

    Ok(outcome)
}

/// Queues a saved playlist in order, stopping once the queue is full.
async fn play_playlist(service: &MusicService, ctx: &CommandContext, name: &str) -> Result<CommandOutcome> {
    let player = &service.player;
    let playlist = service.playlists.get(ctx.author, name).await?;
    if playlist.songs.is_empty() {
        return Err(MusicError::PlaylistEmpty { name: playlist.name });
    }
    let channel_id = ctx.author_channel.ok_or(MusicError::NotInVoiceChannel)?;

    player.ensure_capacity(ctx.guild_id).await?;
    if !player.is_connected(ctx.guild_id).await {
        player.connect(ctx.guild_id, channel_id).await?;
    }

    let mut queued = 0;
    let mut started = false;
    for entry in &playlist.songs {
        match player.enqueue(ctx.guild_id, entry.to_track(ctx.author)).await {
            Ok(enqueued) => {
                queued += 1;
                started |= enqueued.started;
            }
            Err(MusicError::QueueFull { max }) => {
                warn!("⚠️ Queue full at {} tracks, playlist {} cut short", max, playlist.name);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    info!("📋 Queued {} songs from playlist {}", queued, playlist.name);
    Ok(CommandOutcome::PlaylistQueued {
        skipped: playlist.songs.len() - queued,
        playlist: playlist.name,
        queued,
        started,
    })
}
