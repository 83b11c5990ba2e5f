//! Per-user playlists, persisted as a single JSON file.
//!
//! Every change is applied to a copy of the playlists, written to disk, and
//! only then committed in memory. A failed write leaves both untouched.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{MusicError, Precondition, Result};
use crate::sources::{Provenance, Track};

pub const MAX_PLAYLIST_NAME_LEN: usize = 32;

/// A saved song. Only playable tracks are stored, so every entry has a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub duration_secs: u64,
    pub stream_locator: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl PlaylistEntry {
    /// `None` for a track without a stream.
    pub fn from_track(track: &Track) -> Option<Self> {
        Some(Self {
            title: track.title().to_string(),
            artist: track.artist().to_string(),
            duration_secs: track.duration_secs(),
            stream_locator: track.stream_locator()?.to_string(),
            url: track.url().map(str::to_string),
        })
    }

    pub fn to_track(&self, requested_by: UserId) -> Track {
        let track = Track::new(&self.title, Provenance::Native, requested_by)
            .with_artist(&self.artist)
            .with_duration_secs(self.duration_secs)
            .with_stream_locator(&self.stream_locator);

        match &self.url {
            Some(url) => track.with_url(url),
            None => track,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner: u64,
    #[serde(default)]
    pub songs: Vec<PlaylistEntry>,
    /// RFC 3339, seconds precision.
    pub created_at: String,
}

impl Playlist {
    fn is(&self, owner: UserId, name: &str) -> bool {
        self.owner == owner.get() && self.name.eq_ignore_ascii_case(name)
    }
}

pub struct PlaylistStore {
    /// `None` keeps playlists in memory only.
    path: Option<PathBuf>,
    playlists: Mutex<HashMap<String, Playlist>>,
}

impl PlaylistStore {
    /// Loads playlists from `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();

        let playlists = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<HashMap<String, Playlist>>(&content)
                .with_context(|| format!("Could not parse playlists in {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read {}", path.display()));
            }
        };

        info!("📂 Loaded {} playlists from {}", playlists.len(), path.display());
        Ok(Self {
            path: Some(path),
            playlists: Mutex::new(playlists),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            playlists: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self, owner: UserId, name: &str) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty()
            || name.chars().count() > MAX_PLAYLIST_NAME_LEN
            || name.chars().any(char::is_whitespace)
        {
            return Err(MusicError::InvalidPlaylistName {
                max: MAX_PLAYLIST_NAME_LEN,
            });
        }

        self.update(|playlists| {
            if playlists.values().any(|p| p.is(owner, name)) {
                return Err(MusicError::PlaylistExists {
                    name: name.to_string(),
                });
            }

            let id = fresh_id(playlists, owner);
            let playlist = Playlist {
                id: id.clone(),
                name: name.to_string(),
                owner: owner.get(),
                songs: Vec::new(),
                created_at: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
            };
            playlists.insert(id, playlist.clone());
            info!("📋 Created playlist {} for {}", name, owner);
            Ok(playlist)
        })
        .await
    }

    /// `owner`'s playlists, sorted by name.
    pub async fn list(&self, owner: UserId) -> Vec<Playlist> {
        let playlists = self.playlists.lock().await;
        let mut owned: Vec<Playlist> = playlists
            .values()
            .filter(|p| p.owner == owner.get())
            .cloned()
            .collect();
        owned.sort_by_key(|p| p.name.to_lowercase());
        owned
    }

    pub async fn get(&self, owner: UserId, name: &str) -> Result<Playlist> {
        let playlists = self.playlists.lock().await;
        playlists
            .values()
            .find(|p| p.is(owner, name))
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    /// Appends `entry`, returning the playlist's new length.
    pub async fn add(&self, owner: UserId, name: &str, entry: PlaylistEntry) -> Result<usize> {
        self.update(|playlists| {
            let playlist = find_mut(playlists, owner, name)?;
            debug!("➕ {} added to playlist {}", entry.title, playlist.name);
            playlist.songs.push(entry);
            Ok(playlist.songs.len())
        })
        .await
    }

    /// Removes the song at 1-based `position`.
    pub async fn remove_song(&self, owner: UserId, name: &str, position: usize) -> Result<PlaylistEntry> {
        self.update(|playlists| {
            let playlist = find_mut(playlists, owner, name)?;
            let len = playlist.songs.len();
            if position == 0 || position > len {
                return Err(Precondition::IndexOutOfRange { position, len }.into());
            }
            Ok(playlist.songs.remove(position - 1))
        })
        .await
    }

    pub async fn delete(&self, owner: UserId, name: &str) -> Result<Playlist> {
        self.update(|playlists| {
            let id = playlists
                .values()
                .find(|p| p.is(owner, name))
                .map(|p| p.id.clone())
                .ok_or_else(|| not_found(name))?;
            let removed = playlists.remove(&id).ok_or_else(|| not_found(name))?;
            info!("🗑️ Deleted playlist {} of {}", removed.name, owner);
            Ok(removed)
        })
        .await
    }

    /// Applies `change` to a copy, saves it, then commits it.
    async fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut HashMap<String, Playlist>) -> Result<T>,
    {
        let mut playlists = self.playlists.lock().await;
        let mut updated = playlists.clone();
        let value = change(&mut updated)?;

        if let Some(path) = &self.path {
            if let Err(e) = save(path, &updated).await {
                error!("❌ Error saving playlists: {:#}", e);
                return Err(MusicError::Storage(format!("{:#}", e)));
            }
        }

        *playlists = updated;
        Ok(value)
    }
}

/// Writes through a temporary file so a crash never leaves half a file behind.
async fn save(path: &Path, playlists: &HashMap<String, Playlist>) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Could not create {}", dir.display()))?;
    }

    let content = serde_json::to_string_pretty(playlists)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)
        .await
        .with_context(|| format!("Could not write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Could not replace {}", path.display()))?;
    Ok(())
}

fn find_mut<'a>(
    playlists: &'a mut HashMap<String, Playlist>,
    owner: UserId,
    name: &str,
) -> Result<&'a mut Playlist> {
    playlists
        .values_mut()
        .find(|p| p.is(owner, name))
        .ok_or_else(|| not_found(name))
}

/// `<owner>_<unix millis>`, bumped until unused.
fn fresh_id(playlists: &HashMap<String, Playlist>, owner: UserId) -> String {
    let mut millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    loop {
        let id = format!("{}_{}", owner, millis);
        if !playlists.contains_key(&id) {
            return id;
        }
        millis += 1;
    }
}

fn not_found(name: &str) -> MusicError {
    MusicError::PlaylistNotFound {
        name: name.to_string(),
    }
}
