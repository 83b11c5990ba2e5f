#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use guild_music::audio::transport::{TrackControl, VoiceConnection, VoiceTransport};
use guild_music::audio::{
    AudioPlayer, EndNotifier, GuildQueueStore, PlayerNotice, TrackEnded,
};
use guild_music::sources::{Credential, MetadataSource, MusicSource, Provenance, SourceMetadata, Track};
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Notify;

pub const GUILD: GuildId = GuildId::new(1);
pub const OTHER_GUILD: GuildId = GuildId::new(2);
pub const VOICE: ChannelId = ChannelId::new(10);
pub const OTHER_VOICE: ChannelId = ChannelId::new(11);
pub const USER: UserId = UserId::new(100);

pub fn track(title: &str) -> Track {
    Track::new(title, Provenance::Native, USER)
        .with_duration_secs(180)
        .with_stream_locator(format!("https://www.youtube.com/watch?v={}", title))
}

/// One `VoiceConnection::play` call as seen by the fake.
pub struct PlayRecord {
    pub title: String,
    pub channel_id: ChannelId,
    pub notifier: Option<EndNotifier>,
}

#[derive(Default)]
pub struct FakeState {
    pub connects: Vec<ChannelId>,
    pub disconnects: Vec<ChannelId>,
    pub plays: Vec<PlayRecord>,
    pub stops: usize,
    pub pauses: usize,
    pub resumes: usize,
    /// Titles whose `play` call fails
    pub broken: HashSet<String>,
    pub refuse_connect: bool,
    /// Pause and resume fail, as with a dead driver
    pub refuse_controls: bool,
    /// Joins to these channels wait until the gate is notified
    pub held_joins: HashMap<ChannelId, Arc<Notify>>,
}

/// Voice transport that records everything and never produces sound.
#[derive(Clone, Default)]
pub struct FakeTransport {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn break_track(&self, title: &str) {
        self.state.lock().broken.insert(title.to_string());
    }

    pub fn played_titles(&self) -> Vec<String> {
        self.state.lock().plays.iter().map(|p| p.title.clone()).collect()
    }

    /// Holds every join to `channel_id` until the returned gate is notified.
    pub fn hold_joins(&self, channel_id: ChannelId) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().held_joins.insert(channel_id, gate.clone());
        gate
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().plays.len()
    }

    /// Notifier of the n-th successful or failed play call.
    pub fn take_notifier(&self, index: usize) -> EndNotifier {
        self.state.lock().plays[index]
            .notifier
            .take()
            .expect("notifier already used")
    }

    pub fn finish_latest(&self) {
        let index = self.play_count() - 1;
        self.take_notifier(index).finished();
    }

    pub fn fail_latest(&self, reason: &str) {
        let index = self.play_count() - 1;
        self.take_notifier(index).failed(reason);
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(&self, _guild_id: GuildId, channel_id: ChannelId) -> Result<Box<dyn VoiceConnection>> {
        let gate = self.state.lock().held_joins.get(&channel_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        if state.refuse_connect {
            return Err(anyhow!("missing permissions"));
        }
        state.connects.push(channel_id);
        Ok(Box::new(FakeConnection {
            channel_id,
            state: self.state.clone(),
        }))
    }
}

struct FakeConnection {
    channel_id: ChannelId,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn play(&mut self, track: &Track, notifier: EndNotifier) -> Result<Box<dyn TrackControl>> {
        let mut state = self.state.lock();
        let broken = state.broken.contains(track.title());
        state.plays.push(PlayRecord {
            title: track.title().to_string(),
            channel_id: self.channel_id,
            notifier: (!broken).then_some(notifier),
        });

        if broken {
            return Err(anyhow!("HTTP 403 while opening stream"));
        }
        Ok(Box::new(FakeTrack {
            state: self.state.clone(),
        }))
    }

    async fn disconnect(&mut self) {
        self.state.lock().disconnects.push(self.channel_id);
    }
}

struct FakeTrack {
    state: Arc<Mutex<FakeState>>,
}

impl TrackControl for FakeTrack {
    fn pause(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.refuse_controls {
            return Err(anyhow!("driver gone"));
        }
        state.pauses += 1;
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.refuse_controls {
            return Err(anyhow!("driver gone"));
        }
        state.resumes += 1;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.state.lock().stops += 1;
        Ok(())
    }
}

/// A player wired to a fake transport, with both of its channels exposed.
pub struct Harness {
    pub player: Arc<AudioPlayer>,
    pub transport: FakeTransport,
    pub events: UnboundedReceiver<TrackEnded>,
    pub notices: UnboundedReceiver<PlayerNotice>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_max_queue(100)
    }

    pub fn with_max_queue(max_queue_size: usize) -> Self {
        let transport = FakeTransport::default();
        let store = Arc::new(GuildQueueStore::new(max_queue_size));
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let (player, events) = AudioPlayer::new(store, Arc::new(transport.clone()));

        Self {
            player: Arc::new(player.with_notices(notice_tx)),
            transport,
            events,
            notices,
        }
    }

    /// Applies the next end event, as the dispatcher would.
    pub async fn dispatch_next(&mut self) {
        let event = tokio::time::timeout(Duration::from_secs(1), self.events.recv())
            .await
            .expect("no end event was sent")
            .expect("event channel closed");
        self.player.handle_event(event).await;
    }

    pub fn drain_notices(&mut self) -> Vec<PlayerNotice> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            drained.push(notice);
        }
        drained
    }

    pub async fn current_title(&self) -> Option<String> {
        self.player
            .now_playing(GUILD)
            .await
            .map(|now| now.track.title().to_string())
    }
}

/// Primary provider backed by a fixed catalog of search results.
#[derive(Default)]
pub struct FakeYouTube {
    pub searches: HashMap<String, SourceMetadata>,
    pub links: HashMap<String, SourceMetadata>,
}

impl FakeYouTube {
    pub fn with_song(mut self, query: &str, title: &str, secs: u64) -> Self {
        let link = format!("https://www.youtube.com/watch?v={}", title.replace(' ', "_"));
        let meta = SourceMetadata {
            title: title.to_string(),
            artist: Some("Uploader".to_string()),
            duration_secs: secs,
            thumbnail: None,
            url: Some(link.clone()),
            stream_locator: Some(link.clone()),
        };
        self.links.insert(link, meta.clone());
        self.searches.insert(query.to_string(), meta);
        self
    }
}

#[async_trait]
impl MusicSource for FakeYouTube {
    async fn search(&self, query: &str) -> Result<Option<SourceMetadata>> {
        Ok(self.searches.get(query).cloned())
    }

    async fn get_track(&self, url: &str) -> Result<Option<SourceMetadata>> {
        Ok(self.links.get(url).cloned())
    }

    fn is_valid_url(&self, url: &str) -> bool {
        url.starts_with("https://www.youtube.com/")
    }

    fn source_name(&self) -> &'static str {
        "YouTube"
    }
}

/// Secondary provider that knows songs by name but never has a stream.
#[derive(Default)]
pub struct FakeSpotify {
    pub searches: HashMap<String, SourceMetadata>,
}

impl FakeSpotify {
    pub fn with_song(mut self, query: &str, title: &str, artist: &str) -> Self {
        self.searches.insert(
            query.to_string(),
            SourceMetadata {
                title: title.to_string(),
                artist: Some(artist.to_string()),
                duration_secs: 200,
                thumbnail: None,
                url: Some(format!("https://open.spotify.com/track/{}", title.replace(' ', ""))),
                stream_locator: None,
            },
        );
        self
    }
}

#[async_trait]
impl MetadataSource for FakeSpotify {
    async fn authenticate(&self) -> Result<Option<Credential>> {
        Ok(Some(Credential {
            access_token: "token".to_string(),
        }))
    }

    async fn search(&self, _credential: &Credential, query: &str) -> Result<Option<SourceMetadata>> {
        Ok(self.searches.get(query).cloned())
    }

    fn source_name(&self) -> &'static str {
        "Spotify"
    }
}
