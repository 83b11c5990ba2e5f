use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::events::{EndNotifier, NowPlaying, PlayerNotice, TrackEnded, TrackOutcome};
use super::queue::{Advance, LoopMode, QueueInfo};
use super::session::QueueSession;
use super::store::GuildQueueStore;
use super::transport::{TrackControl, VoiceTransport};
use crate::error::{MusicError, Precondition, Result};
use crate::sources::Track;

/// Result of [`AudioPlayer::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    /// 1-based position the track took in the pending list.
    pub position: usize,
    /// Playback went from idle to playing because of this call.
    pub started: bool,
}

/// Result of [`AudioPlayer::skip`].
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub skipped: Track,
    pub now_playing: Option<Track>,
}

/// Drives every guild's queue against the voice transport.
///
/// All queue transitions happen under the session mutex, including the
/// transport calls that start a track, so a guild never sees two transitions
/// at once. Joining voice is the one transport call made without it.
/// Track ends arrive as [`TrackEnded`] events on the channel returned by
/// [`AudioPlayer::new`] and are applied one at a time by [`AudioPlayer::run`].
pub struct AudioPlayer {
    store: Arc<GuildQueueStore>,
    transport: Arc<dyn VoiceTransport>,
    events: UnboundedSender<TrackEnded>,
    notices: Option<UnboundedSender<PlayerNotice>>,
}

impl AudioPlayer {
    pub fn new(
        store: Arc<GuildQueueStore>,
        transport: Arc<dyn VoiceTransport>,
    ) -> (Self, UnboundedReceiver<TrackEnded>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let player = Self {
            store,
            transport,
            events,
            notices: None,
        };
        (player, receiver)
    }

    /// Sends now-playing, skipped and finished notices to `notices`.
    pub fn with_notices(mut self, notices: UnboundedSender<PlayerNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn store(&self) -> &Arc<GuildQueueStore> {
        &self.store
    }

    /// Joins `channel_id`, replacing any connection to another channel.
    /// Starts playback when tracks were queued while disconnected.
    ///
    /// The session lock is released while the transport joins, so end events
    /// for this guild (and the dispatcher queued behind them) keep flowing.
    pub async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        let session = self.store.get_or_create(guild_id);

        let previous = {
            let mut session = session.lock().await;
            if session.connection().map(|c| c.channel_id()) == Some(channel_id) {
                debug!("Already connected to {} in guild {}", channel_id, guild_id);
                return Ok(());
            }

            let previous = session.take_connection();
            if previous.is_some() {
                session.queue.interrupt();
                session.stop_player();
            }
            previous
        };

        if let Some(mut old) = previous {
            info!("🔄 Moving guild {} from {} to {}", guild_id, old.channel_id(), channel_id);
            old.disconnect().await;
        }

        let connection = self
            .transport
            .connect(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::Voice(format!("{:#}", e)))?;
        info!("🔊 Connected to {} in guild {}", channel_id, guild_id);

        let mut session = session.lock().await;
        if let Some(replaced) = session.install_connection(connection) {
            // A concurrent connect won the race; the transport already moved the call
            debug!("Dropping connection to {} in guild {}", replaced.channel_id(), guild_id);
        }

        if session.queue.needs_start() {
            let advance = session.queue.advance();
            self.start_from(guild_id, &mut session, advance).await;
        }
        Ok(())
    }

    /// Leaves voice. Same as [`AudioPlayer::stop`] but fails when not connected.
    pub async fn disconnect(&self, guild_id: GuildId) -> Result<usize> {
        if !self.is_connected(guild_id).await {
            return Err(MusicError::NotConnected);
        }
        Ok(self.stop(guild_id).await)
    }

    pub async fn is_connected(&self, guild_id: GuildId) -> bool {
        match self.store.get(guild_id) {
            Some(session) => session.lock().await.is_connected(),
            None => false,
        }
    }

    pub async fn connected_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let session = self.store.get(guild_id)?;
        let session = session.lock().await;
        session.connection().map(|c| c.channel_id())
    }

    /// `QueueFull` when the guild's queue cannot take another track.
    pub async fn ensure_capacity(&self, guild_id: GuildId) -> Result<()> {
        match self.store.get(guild_id) {
            Some(session) => session.lock().await.queue.ensure_room(),
            None => Ok(()),
        }
    }

    /// Queues a resolved track and starts it if the guild is idle and connected.
    pub async fn enqueue(&self, guild_id: GuildId, track: Track) -> Result<Enqueued> {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;

        let position = session.queue.enqueue(track)?;

        let started = if session.queue.needs_start() && session.is_connected() {
            let advance = session.queue.advance();
            self.start_from(guild_id, &mut session, advance).await;
            !session.queue.is_idle()
        } else {
            false
        };

        Ok(Enqueued { position, started })
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Skipped> {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;

        // Transition before stopping so the old handle's end event is stale
        let (skipped, advance) = session.queue.skip()?;
        session.stop_player();
        self.start_from(guild_id, &mut session, advance).await;

        Ok(Skipped {
            skipped,
            now_playing: session.queue.current().cloned(),
        })
    }

    /// Pauses the live track. The queue only records the pause once the
    /// transport has accepted it.
    pub async fn pause(&self, guild_id: GuildId) -> Result<Track> {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;

        session.queue.can_pause()?;
        let track = current_of(&session)?;
        control_current(&session, &track, |control| control.pause())?;
        session.queue.pause()?;
        Ok(track)
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<Track> {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;

        session.queue.can_resume()?;
        let track = current_of(&session)?;
        control_current(&session, &track, |control| control.resume())?;
        session.queue.resume()?;
        Ok(track)
    }

    /// Stops playback, empties the queue and leaves voice. Valid in every state.
    /// Returns how many tracks were dropped.
    pub async fn stop(&self, guild_id: GuildId) -> usize {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;

        let dropped = session.queue.stop();
        session.stop_player();
        if let Some(mut connection) = session.take_connection() {
            connection.disconnect().await;
            info!("👋 Left voice in guild {}", guild_id);
        }
        dropped
    }

    /// Shuffles the pending tracks, returning how many were shuffled.
    pub async fn shuffle(&self, guild_id: GuildId) -> Result<usize> {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;
        session.queue.shuffle()?;
        Ok(session.queue.len())
    }

    pub async fn set_loop(&self, guild_id: GuildId, mode: LoopMode) {
        let session = self.store.get_or_create(guild_id);
        session.lock().await.queue.set_loop_mode(mode);
    }

    pub async fn remove(&self, guild_id: GuildId, position: usize) -> Result<Track> {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;
        session.queue.remove(position)
    }

    pub async fn clear(&self, guild_id: GuildId) -> usize {
        let session = self.store.get_or_create(guild_id);
        let mut session = session.lock().await;
        session.queue.clear()
    }

    pub async fn queue_info(&self, guild_id: GuildId) -> QueueInfo {
        let session = self.store.get_or_create(guild_id);
        let session = session.lock().await;
        session.queue.info()
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<NowPlaying> {
        let session = self.store.get(guild_id)?;
        let session = session.lock().await;
        let track = session.queue.current()?.clone();
        Some(NowPlaying {
            track,
            status: session.queue.status(),
            loop_mode: session.queue.loop_mode(),
        })
    }

    /// Applies one end-of-track event. Stale events are dropped.
    pub async fn handle_event(&self, event: TrackEnded) {
        let TrackEnded {
            guild_id,
            play_id,
            outcome,
        } = event;

        let Some(session) = self.store.get(guild_id) else {
            debug!("End event for unknown guild {}", guild_id);
            return;
        };
        let mut session = session.lock().await;

        let advance = match outcome {
            TrackOutcome::Finished => session.queue.finish(play_id),
            TrackOutcome::Failed(reason) => session.queue.fail(play_id).map(|(track, advance)| {
                warn!("❌ Playback of {} failed in guild {}: {}", track.title(), guild_id, reason);
                self.notify(PlayerNotice::SkippedOnError {
                    guild_id,
                    track,
                    reason,
                });
                advance
            }),
        };

        let Some(advance) = advance else {
            return;
        };

        session.clear_player();
        self.start_from(guild_id, &mut session, advance).await;
    }

    /// Dispatcher loop: applies end events serially until every sender is gone.
    pub async fn run(&self, mut events: UnboundedReceiver<TrackEnded>) {
        info!("🎧 Playback dispatcher started");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("🛑 Playback dispatcher stopped");
    }

    /// Hands the current track to the transport. A track the transport cannot
    /// start is dropped and the next one tried, until one plays or the queue
    /// is exhausted.
    async fn start_from(&self, guild_id: GuildId, session: &mut QueueSession, mut advance: Advance) {
        loop {
            let (play_id, track) = match advance {
                Advance::Started { play_id, track } => (play_id, track),
                Advance::Idle => {
                    self.notify(PlayerNotice::QueueFinished { guild_id });
                    return;
                }
            };

            let Some(connection) = session.connection_mut() else {
                debug!("No voice connection in guild {}, waiting to start", guild_id);
                session.queue.interrupt();
                return;
            };

            let notifier = EndNotifier::new(guild_id, play_id, self.events.clone());
            match connection.play(&track, notifier).await {
                Ok(control) => {
                    session.set_player(control);
                    info!("🎵 Playing {} in guild {}", track.title(), guild_id);
                    self.notify(PlayerNotice::NowPlaying { guild_id, track });
                    return;
                }
                Err(e) => {
                    let reason = format!("{:#}", e);
                    warn!("❌ Could not start {} in guild {}: {}", track.title(), guild_id, reason);

                    let Some((failed, next)) = session.queue.fail(play_id) else {
                        return;
                    };
                    self.notify(PlayerNotice::SkippedOnError {
                        guild_id,
                        track: failed,
                        reason,
                    });
                    advance = next;
                }
            }
        }
    }

    fn notify(&self, notice: PlayerNotice) {
        if let Some(notices) = &self.notices {
            if notices.send(notice).is_err() {
                debug!("Notice receiver dropped");
            }
        }
    }
}

/// Runs `action` on the live track handle, reporting a refusal or a missing
/// handle as a playback failure of `track`.
fn control_current<F>(session: &QueueSession, track: &Track, action: F) -> Result<()>
where
    F: FnOnce(&dyn TrackControl) -> anyhow::Result<()>,
{
    let failure = |reason: String| MusicError::PlaybackFailure {
        title: track.title().to_string(),
        reason,
    };

    let control = session
        .player()
        .ok_or_else(|| failure("no active track handle".to_string()))?;
    action(control).map_err(|e| {
        warn!("⚠️ Transport refused control of {}: {:#}", track.title(), e);
        failure(format!("{:#}", e))
    })
}

fn current_of(session: &QueueSession) -> Result<Track> {
    session
        .queue
        .current()
        .cloned()
        .ok_or_else(|| Precondition::NothingPlaying.into())
}
