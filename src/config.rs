use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Secondary metadata provider (optional)
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,

    // Queue
    pub max_queue_size: usize,
    pub queue_page_size: usize,

    // Resolution
    pub resolver_timeout: Duration,
    pub ytdlp_path: String,

    // Storage
    pub data_dir: PathBuf,
}

impl Config {
    /// Loads `.env` (if present) and the process environment, then validates.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Builds a config from an arbitrary variable source. Does not validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            command_prefix: var("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()),

            spotify_client_id: var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: var("SPOTIFY_CLIENT_SECRET"),

            max_queue_size: parse_or(var("MAX_QUEUE_SIZE"), "MAX_QUEUE_SIZE", 1000)?,
            queue_page_size: parse_or(var("QUEUE_PAGE_SIZE"), "QUEUE_PAGE_SIZE", 10)?,

            resolver_timeout: match var("RESOLVER_TIMEOUT") {
                Some(value) => humantime::parse_duration(value.trim())
                    .with_context(|| format!("RESOLVER_TIMEOUT is not a duration: {}", value))?,
                None => Duration::from_secs(8),
            },
            ytdlp_path: var("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),

            data_dir: var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The command prefix must not contain whitespace
    /// - Queue size and page size must be greater than 0
    /// - The resolver timeout must be greater than 0
    /// - Spotify credentials come in pairs
    pub fn validate(&self) -> Result<()> {
        if self.command_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("Command prefix cannot contain whitespace, got: {:?}", self.command_prefix);
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.queue_page_size == 0 {
            anyhow::bail!("Queue page size must be greater than 0");
        }

        if self.resolver_timeout.is_zero() {
            anyhow::bail!("Resolver timeout must be greater than 0");
        }

        if self.spotify_client_id.is_some() != self.spotify_client_secret.is_some() {
            anyhow::bail!("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set together");
        }

        Ok(())
    }

    /// Both Spotify credentials, when configured.
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        }
    }

    pub fn playlists_path(&self) -> PathBuf {
        self.data_dir.join("playlists.json")
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Never includes the Discord token or the Spotify secret.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: prefix {:?}\n  \
            Queue: {} max tracks, {} per page\n  \
            Resolver: {} timeout, yt-dlp at {}, Spotify {}\n  \
            Storage: playlists in {}",
            self.command_prefix,
            self.max_queue_size,
            self.queue_page_size,
            humantime::format_duration(self.resolver_timeout),
            self.ytdlp_path,
            if self.spotify_credentials().is_some() {
                "enabled"
            } else {
                "disabled"
            },
            self.playlists_path().display(),
        )
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("command_prefix", &self.command_prefix)
            .field("spotify_client_id", &self.spotify_client_id)
            .field("spotify_client_secret", &self.spotify_client_secret.as_ref().map(|_| "<redacted>"))
            .field("max_queue_size", &self.max_queue_size)
            .field("queue_page_size", &self.queue_page_size)
            .field("resolver_timeout", &self.resolver_timeout)
            .field("ytdlp_path", &self.ytdlp_path)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        None => Ok(default),
    }
}
