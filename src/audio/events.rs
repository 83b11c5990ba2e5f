use serenity::model::id::GuildId;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::queue::{LoopMode, PlayId, PlaybackStatus};
use crate::sources::Track;

/// How a play ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Finished,
    Failed(String),
}

/// Sent by the transport when a play is over. Consumed by `AudioPlayer::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEnded {
    pub guild_id: GuildId,
    pub play_id: PlayId,
    pub outcome: TrackOutcome,
}

/// One-shot completion callback handed to the transport with each play.
///
/// Both methods consume the notifier, so a play reports either its end or its
/// error, never both and never twice.
#[derive(Debug)]
pub struct EndNotifier {
    guild_id: GuildId,
    play_id: PlayId,
    events: UnboundedSender<TrackEnded>,
}

impl EndNotifier {
    pub fn new(guild_id: GuildId, play_id: PlayId, events: UnboundedSender<TrackEnded>) -> Self {
        Self {
            guild_id,
            play_id,
            events,
        }
    }

    pub fn play_id(&self) -> PlayId {
        self.play_id
    }

    pub fn finished(self) {
        self.send(TrackOutcome::Finished);
    }

    pub fn failed(self, reason: impl Into<String>) {
        self.send(TrackOutcome::Failed(reason.into()));
    }

    fn send(self, outcome: TrackOutcome) {
        let event = TrackEnded {
            guild_id: self.guild_id,
            play_id: self.play_id,
            outcome,
        };
        if self.events.send(event).is_err() {
            debug!("Dispatcher gone, dropping end event for play {}", self.play_id);
        }
    }
}

/// Something the bot should tell the guild about.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotice {
    NowPlaying { guild_id: GuildId, track: Track },
    SkippedOnError { guild_id: GuildId, track: Track, reason: String },
    QueueFinished { guild_id: GuildId },
}

impl PlayerNotice {
    pub fn guild_id(&self) -> GuildId {
        match self {
            PlayerNotice::NowPlaying { guild_id, .. }
            | PlayerNotice::SkippedOnError { guild_id, .. }
            | PlayerNotice::QueueFinished { guild_id } => *guild_id,
        }
    }
}

/// Read model for the `nowplaying` command.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    pub status: PlaybackStatus,
    pub loop_mode: LoopMode,
}
