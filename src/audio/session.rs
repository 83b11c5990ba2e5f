use tracing::warn;

use super::queue::MusicQueue;
use super::transport::{TrackControl, VoiceConnection};

/// Reserved; playback always runs at unity gain.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Everything one guild's playback needs: the queue state plus the handles
/// that make sound. Only accessed under the store's per-guild mutex.
pub struct QueueSession {
    pub queue: MusicQueue,
    pub volume: f32,
    connection: Option<Box<dyn VoiceConnection>>,
    player: Option<Box<dyn TrackControl>>,
}

impl QueueSession {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            queue: MusicQueue::new(max_queue_size),
            volume: DEFAULT_VOLUME,
            connection: None,
            player: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connection(&self) -> Option<&dyn VoiceConnection> {
        self.connection.as_deref()
    }

    pub fn connection_mut(&mut self) -> Option<&mut (dyn VoiceConnection + 'static)> {
        self.connection.as_deref_mut()
    }

    /// Installs a new connection and hands back the one it replaced, if any.
    pub fn install_connection(
        &mut self,
        connection: Box<dyn VoiceConnection>,
    ) -> Option<Box<dyn VoiceConnection>> {
        self.connection.replace(connection)
    }

    pub fn take_connection(&mut self) -> Option<Box<dyn VoiceConnection>> {
        self.connection.take()
    }

    pub fn player(&self) -> Option<&dyn TrackControl> {
        self.player.as_deref()
    }

    pub fn set_player(&mut self, player: Box<dyn TrackControl>) {
        self.player = Some(player);
    }

    /// Stops and forgets the current track handle, if any.
    pub fn stop_player(&mut self) {
        if let Some(player) = self.player.take() {
            if let Err(e) = player.stop() {
                warn!("⚠️ Could not stop track handle: {:#}", e);
            }
        }
    }

    /// Forgets the current track handle without stopping it. Used once the
    /// transport has already reported the end of the play.
    pub fn clear_player(&mut self) {
        self.player = None;
    }
}
