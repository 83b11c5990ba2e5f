use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{MusicError, Precondition, Result};
use crate::sources::Track;

/// Identifies one "track became current" event.
///
/// Every end or error notification carries the id of the play it belongs to;
/// anything that does not match the queue's current id is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayId(u64);

impl fmt::Display for PlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    One,
    All,
}

impl LoopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::One => "one",
            LoopMode::All => "all",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopMode {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(LoopMode::Off),
            "one" | "track" => Ok(LoopMode::One),
            "all" | "queue" => Ok(LoopMode::All),
            _ => Err(MusicError::InvalidLoopMode(s.trim().to_string())),
        }
    }
}

/// Result of moving the cursor forward.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// A track became current; hand it to the transport under this id.
    Started { play_id: PlayId, track: Track },
    /// Nothing left to play.
    Idle,
}

/// Per-guild playback state machine.
///
/// Pure data: no I/O, no handles, no clock. The driver owns one per guild and
/// applies every transition through these methods, which keep the invariants
/// below and check them in debug builds:
///
/// - a current track exists exactly when the status is not `Idle`;
/// - a play id exists exactly when a current track exists;
/// - the current track is never also in `pending`.
#[derive(Debug)]
pub struct MusicQueue {
    pending: VecDeque<Track>,
    current: Option<Track>,
    status: PlaybackStatus,
    loop_mode: LoopMode,
    max_size: usize,
    play_id: Option<PlayId>,
    next_play_id: u64,
}

impl MusicQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            current: None,
            status: PlaybackStatus::Idle,
            loop_mode: LoopMode::Off,
            max_size,
            play_id: None,
            next_play_id: 1,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn play_id(&self) -> Option<PlayId> {
        self.play_id
    }

    pub fn pending(&self) -> impl ExactSizeIterator<Item = &Track> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        self.status == PlaybackStatus::Idle
    }

    /// Whether `play_id` belongs to the track that is current right now.
    pub fn is_current(&self, play_id: PlayId) -> bool {
        self.play_id == Some(play_id)
    }

    /// Appends a playable track, returning its 1-based position in `pending`.
    pub fn enqueue(&mut self, track: Track) -> Result<usize> {
        if !track.is_playable() {
            return Err(MusicError::MetadataOnly {
                title: track.title().to_string(),
                artist: track.artist().to_string(),
            });
        }
        self.ensure_room()?;

        info!("➕ Queued: {}", track.title());
        self.pending.push_back(track);
        self.check_invariants();
        Ok(self.pending.len())
    }

    /// `QueueFull` when one more track would not fit.
    pub fn ensure_room(&self) -> Result<()> {
        if self.pending.len() >= self.max_size {
            return Err(MusicError::QueueFull { max: self.max_size });
        }
        Ok(())
    }

    /// Idle with something waiting: the caller should `advance()`.
    pub fn needs_start(&self) -> bool {
        self.is_idle() && !self.pending.is_empty()
    }

    /// Moves the head of `pending` into `current`, or goes idle when empty.
    pub fn advance(&mut self) -> Advance {
        let outcome = match self.pending.pop_front() {
            Some(track) => {
                let play_id = self.fresh_play_id();
                info!("▶️ Now current {}: {}", play_id, track.title());
                self.current = Some(track.clone());
                self.status = PlaybackStatus::Playing;
                self.play_id = Some(play_id);
                Advance::Started { play_id, track }
            }
            None => {
                if !self.is_idle() {
                    info!("📭 Queue finished");
                }
                self.go_idle();
                Advance::Idle
            }
        };

        self.check_invariants();
        outcome
    }

    /// Natural end of the current track. `None` when `play_id` is stale.
    pub fn finish(&mut self, play_id: PlayId) -> Option<Advance> {
        if !self.is_current(play_id) {
            debug!("🕰️ Ignoring stale end for play {}", play_id);
            return None;
        }

        let finished = self.take_current()?;
        self.requeue(finished);
        Some(self.advance())
    }

    /// The current track could not be played. The track is dropped whatever the
    /// loop mode says. `None` when `play_id` is stale.
    pub fn fail(&mut self, play_id: PlayId) -> Option<(Track, Advance)> {
        if !self.is_current(play_id) {
            debug!("🕰️ Ignoring stale error for play {}", play_id);
            return None;
        }

        let failed = self.take_current()?;
        Some((failed, self.advance()))
    }

    /// Ends the current track early. Loop policy applies as for a natural end.
    pub fn skip(&mut self) -> Result<(Track, Advance)> {
        let skipped = self.take_current().ok_or(Precondition::NothingPlaying)?;
        info!("⏭️ Skipped: {}", skipped.title());

        let returned = skipped.clone();
        self.requeue(skipped);
        Ok((returned, self.advance()))
    }

    /// The error `pause` would return, without changing anything.
    pub fn can_pause(&self) -> Result<()> {
        match self.status {
            PlaybackStatus::Idle => Err(Precondition::NothingPlaying.into()),
            PlaybackStatus::Paused => Err(Precondition::AlreadyPaused.into()),
            PlaybackStatus::Playing => Ok(()),
        }
    }

    /// The error `resume` would return, without changing anything.
    pub fn can_resume(&self) -> Result<()> {
        match self.status {
            PlaybackStatus::Idle => Err(Precondition::NothingPlaying.into()),
            PlaybackStatus::Playing => Err(Precondition::NotPaused.into()),
            PlaybackStatus::Paused => Ok(()),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        self.can_pause()?;
        self.status = PlaybackStatus::Paused;
        info!("⏸️ Paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.can_resume()?;
        self.status = PlaybackStatus::Playing;
        info!("▶️ Resumed");
        Ok(())
    }

    /// Puts the current track back at the head of `pending` and goes idle, so
    /// the next `advance` replays it under a fresh play id. Used when the voice
    /// connection is replaced under a playing track.
    pub fn interrupt(&mut self) -> bool {
        let Some(track) = self.take_current() else {
            return false;
        };

        debug!("↩️ Interrupted: {}", track.title());
        self.pending.push_front(track);
        self.go_idle();
        self.check_invariants();
        true
    }

    /// Drops everything and goes idle. Returns how many tracks were dropped.
    pub fn stop(&mut self) -> usize {
        let dropped = self.pending.len() + usize::from(self.current.is_some());
        self.pending.clear();
        self.go_idle();

        info!("⏹️ Stopped, {} tracks dropped", dropped);
        self.check_invariants();
        dropped
    }

    pub fn shuffle(&mut self) -> Result<()> {
        self.shuffle_with(&mut rand::thread_rng())
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let len = self.pending.len();
        if len < 2 {
            return Err(Precondition::NotEnoughTracks { len }.into());
        }

        self.pending.make_contiguous().shuffle(rng);
        info!("🔀 Shuffled {} tracks", len);
        self.check_invariants();
        Ok(())
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
        match mode {
            LoopMode::Off => info!("➡️ Loop disabled"),
            LoopMode::One => info!("🔂 Looping current track"),
            LoopMode::All => info!("🔁 Looping queue"),
        }
    }

    /// Removes the pending track at 1-based `position`.
    pub fn remove(&mut self, position: usize) -> Result<Track> {
        let len = self.pending.len();
        let removed = position
            .checked_sub(1)
            .and_then(|index| self.pending.remove(index))
            .ok_or(Precondition::IndexOutOfRange { position, len })?;

        debug!("❌ Removed {} at position {}", removed.title(), position);
        self.check_invariants();
        Ok(removed)
    }

    /// Empties `pending`, leaving the current track alone.
    pub fn clear(&mut self) -> usize {
        let cleared = self.pending.len();
        self.pending.clear();
        info!("🗑️ Cleared {} pending tracks", cleared);
        cleared
    }

    pub fn info(&self) -> QueueInfo {
        QueueInfo {
            current: self.current.clone(),
            status: self.status,
            items: self.pending.iter().cloned().collect(),
            total_items: self.pending.len(),
            loop_mode: self.loop_mode,
            total_duration: self.calculate_total_duration(),
        }
    }

    fn fresh_play_id(&mut self) -> PlayId {
        let id = PlayId(self.next_play_id);
        self.next_play_id += 1;
        id
    }

    /// Detaches the current track. The status is left for `advance` to set.
    fn take_current(&mut self) -> Option<Track> {
        self.play_id = None;
        self.current.take()
    }

    /// Puts a track that left `current` back according to the loop mode.
    fn requeue(&mut self, track: Track) {
        match self.loop_mode {
            LoopMode::Off => {}
            LoopMode::One => {
                debug!("🔂 Repeating: {}", track.title());
                self.pending.push_front(track);
            }
            LoopMode::All => {
                debug!("🔁 Back to the end of the queue: {}", track.title());
                self.pending.push_back(track);
            }
        }
    }

    fn go_idle(&mut self) {
        self.current = None;
        self.play_id = None;
        self.status = PlaybackStatus::Idle;
    }

    fn calculate_total_duration(&self) -> Duration {
        self.current
            .iter()
            .chain(self.pending.iter())
            .filter_map(Track::duration)
            .sum()
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.current.is_some(),
            self.status != PlaybackStatus::Idle,
            "current track must exist exactly when not idle"
        );
        debug_assert_eq!(
            self.play_id.is_some(),
            self.current.is_some(),
            "play id must exist exactly when a track is current"
        );
    }
}

/// Snapshot of a queue for display.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueInfo {
    pub current: Option<Track>,
    pub status: PlaybackStatus,
    pub items: Vec<Track>,
    pub total_items: usize,
    pub loop_mode: LoopMode,
    /// Sum of known durations, current track included.
    pub total_duration: Duration,
}

impl QueueInfo {
    /// One page of pending tracks. Pages are 1-based; 0 is treated as 1.
    pub fn get_page(&self, page: usize, items_per_page: usize) -> QueuePage {
        let per_page = items_per_page.max(1);
        let total_pages = self.total_items.div_ceil(per_page).max(1);
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * per_page;
        let end = (start + per_page).min(self.items.len());

        QueuePage {
            items: self.items.get(start..end).map(<[Track]>::to_vec).unwrap_or_default(),
            first_position: start + 1,
            current_page,
            total_pages,
            total_items: self.total_items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuePage {
    pub items: Vec<Track>,
    /// 1-based queue position of `items[0]`.
    pub first_position: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}
