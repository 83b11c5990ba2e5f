//! # Bot Module
//!
//! Discord-facing side of the music bot.
//!
//! This module contains:
//! - Text command parsing ([`commands`])
//! - Command execution against the playback driver ([`handlers`])
//! - The serenity [`EventHandler`] that ties them to Discord
//!
//! ## Architecture
//!
//! [`MusicBot`] receives every guild message, parses the ones that start with
//! the configured prefix, runs them through [`handlers::handle_command`] and
//! replies with an embed built by [`crate::ui::embeds`].
//!
//! Playback notices (now playing, skipped on error, queue finished) arrive
//! from the driver on a channel. A forwarder task started on `ready` posts
//! each one to the text channel where that guild last issued a command.

use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Http, Message, Ready, UserId, VoiceState},
    async_trait,
    builder::{CreateEmbed, CreateMessage},
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::PlayerNotice,
    config::Config,
    ui::embeds::{command_error_embed, error_embed, notice_embed, outcome_embed},
};
use commands::Command;
use handlers::{handle_command, CommandContext, MusicService};

/// Serenity event handler for the music bot.
pub struct MusicBot {
    config: Arc<Config>,
    service: MusicService,
    /// Text channel each guild last used for a command
    announce_channels: Arc<DashMap<GuildId, ChannelId>>,
    /// Taken by the first `ready` event
    notices: Mutex<Option<UnboundedReceiver<PlayerNotice>>>,
}

impl MusicBot {
    pub fn new(
        config: Arc<Config>,
        service: MusicService,
        notices: UnboundedReceiver<PlayerNotice>,
    ) -> Self {
        Self {
            config,
            service,
            announce_channels: Arc::new(DashMap::new()),
            notices: Mutex::new(Some(notices)),
        }
    }

    async fn reply_to(&self, ctx: &Context, guild_id: GuildId, msg: &Message, parsed: Result<Command, commands::CommandError>) -> CreateEmbed {
        let prefix = &self.config.command_prefix;

        let command = match parsed {
            Ok(command) => command,
            Err(e) => return command_error_embed(&e, prefix),
        };

        let command_ctx = CommandContext {
            guild_id,
            author: msg.author.id,
            author_channel: author_voice_channel(ctx, guild_id, msg.author.id),
        };

        match handle_command(&self.service, &command_ctx, command).await {
            Ok(outcome) => outcome_embed(&outcome, prefix),
            Err(e) => {
                if e.is_precondition() {
                    debug!("Command rejected in guild {}: {}", guild_id, e);
                } else {
                    warn!("⚠️ Command failed in guild {}: {}", guild_id, e);
                }
                error_embed(&e)
            }
        }
    }
}

#[async_trait]
impl EventHandler for MusicBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());

        // Reconnects fire ready again; only the first one starts the forwarder
        let receiver = self.notices.lock().take();
        if let Some(receiver) = receiver {
            let http = ctx.http.clone();
            let channels = self.announce_channels.clone();
            tokio::spawn(async move {
                forward_notices(http, channels, receiver).await;
            });
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(parsed) = Command::parse(&msg.content, &self.config.command_prefix) else {
            return;
        };

        self.announce_channels.insert(guild_id, msg.channel_id);

        let reply = self.reply_to(&ctx, guild_id, &msg, parsed).await;
        let message = CreateMessage::new().embed(reply);
        if let Err(e) = msg.channel_id.send_message(&ctx.http, message).await {
            error!("Error sending reply in guild {}: {:?}", guild_id, e);
        }
    }

    /// Resets the guild when the bot is disconnected from voice by someone else.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() {
            return;
        }
        let (Some(guild_id), Some(left)) = (new.guild_id, old.and_then(|state| state.channel_id)) else {
            return;
        };

        // A channel move leaves the old channel after the new connection exists
        if self.service.player.connected_channel(guild_id).await == Some(left) {
            info!("🔌 Disconnected from voice in guild {}", guild_id);
            self.service.player.stop(guild_id).await;
        }
    }
}

fn author_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

async fn forward_notices(
    http: Arc<Http>,
    channels: Arc<DashMap<GuildId, ChannelId>>,
    mut notices: UnboundedReceiver<PlayerNotice>,
) {
    while let Some(notice) = notices.recv().await {
        let guild_id = notice.guild_id();
        let Some(channel_id) = channels.get(&guild_id).map(|entry| *entry.value()) else {
            debug!("No announce channel for guild {}", guild_id);
            continue;
        };

        let message = CreateMessage::new().embed(notice_embed(&notice));
        if let Err(e) = channel_id.send_message(&http, message).await {
            warn!("⚠️ Could not post notice in guild {}: {:?}", guild_id, e);
        }
    }
}
