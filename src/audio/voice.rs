//! Songbird implementation of the voice transport.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::events::EndNotifier;
use super::transport::{TrackControl, VoiceConnection, VoiceTransport};
use crate::sources::{Track, YouTubeClient};

pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    ytdlp_program: &'static str,
}

impl SongbirdTransport {
    /// `ytdlp_path` is the program songbird spawns for YouTube streams.
    pub fn new(manager: Arc<Songbird>, ytdlp_path: impl Into<String>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            // Songbird keeps the program name for the life of every input
            ytdlp_program: Box::leak(ytdlp_path.into().into_boxed_str()),
        }
    }

    pub fn ytdlp_program(&self) -> &'static str {
        self.ytdlp_program
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Box<dyn VoiceConnection>> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .with_context(|| format!("Failed to join voice channel {}", channel_id))?;

        Ok(Box::new(SongbirdConnection {
            manager: self.manager.clone(),
            http: self.http.clone(),
            ytdlp_program: self.ytdlp_program,
            guild_id,
            channel_id,
            call,
        }))
    }
}

struct SongbirdConnection {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    ytdlp_program: &'static str,
    guild_id: GuildId,
    channel_id: ChannelId,
    call: Arc<Mutex<Call>>,
}

impl SongbirdConnection {
    /// YouTube pages go through the configured yt-dlp, anything else is fetched directly.
    fn input_for(&self, locator: &str) -> Input {
        if YouTubeClient::is_youtube_url(locator) {
            YoutubeDl::new_ytdl_like(self.ytdlp_program, self.http.clone(), locator.to_string()).into()
        } else {
            HttpRequest::new(self.http.clone(), locator.to_string()).into()
        }
    }
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn play(&mut self, track: &Track, notifier: EndNotifier) -> Result<Box<dyn TrackControl>> {
        let locator = track
            .stream_locator()
            .with_context(|| format!("{} has no stream locator", track.title()))?;

        let input = self.input_for(locator);
        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        let handler = TrackEndHandler {
            notifier: Arc::new(SyncMutex::new(Some(notifier))),
        };

        let registered = handle
            .add_event(Event::Track(TrackEvent::End), handler.clone())
            .and_then(|_| handle.add_event(Event::Track(TrackEvent::Error), handler));

        if let Err(e) = registered {
            let _ = handle.stop();
            return Err(e).context("Failed to register track end handler");
        }

        Ok(Box::new(SongbirdTrack { handle }))
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("⚠️ Error leaving voice in guild {}: {:?}", self.guild_id, e);
        }
    }
}

struct SongbirdTrack {
    handle: TrackHandle,
}

impl TrackControl for SongbirdTrack {
    fn pause(&self) -> Result<()> {
        self.handle.pause().context("Failed to pause track")
    }

    fn resume(&self) -> Result<()> {
        self.handle.play().context("Failed to resume track")
    }

    fn stop(&self) -> Result<()> {
        self.handle.stop().context("Failed to stop track")
    }
}

/// Registered for both `End` and `Error`; whichever fires first consumes the notifier.
#[derive(Clone)]
struct TrackEndHandler {
    notifier: Arc<SyncMutex<Option<EndNotifier>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let failure = match ctx {
            EventContext::Track(&[(state, _)]) => match &state.playing {
                PlayMode::Errored(e) => Some(format!("{:?}", e)),
                _ => None,
            },
            _ => None,
        };

        let notifier = self.notifier.lock().take();
        if let Some(notifier) = notifier {
            debug!("Track event for play {}", notifier.play_id());
            match failure {
                Some(reason) => notifier.failed(reason),
                None => notifier.finished(),
            }
        }

        Some(Event::Cancel)
    }
}
