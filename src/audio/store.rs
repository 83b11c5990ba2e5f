use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::session::QueueSession;

/// Every guild's [`QueueSession`], keyed by guild.
///
/// Sessions are created on first reference and live for the rest of the
/// process; the driver resets them rather than removing them. Each session has
/// its own async mutex, so guilds never contend with one another.
pub struct GuildQueueStore {
    sessions: DashMap<GuildId, Arc<Mutex<QueueSession>>>,
    max_queue_size: usize,
}

impl GuildQueueStore {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_queue_size,
        }
    }

    /// The guild's session, created empty if this is the first reference.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Mutex<QueueSession>> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("🆕 New session for guild {}", guild_id);
                Arc::new(Mutex::new(QueueSession::new(self.max_queue_size)))
            })
            .clone()
    }

    /// The guild's session, without creating one.
    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Mutex<QueueSession>>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
