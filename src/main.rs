use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use guild_music::audio::{player::AudioPlayer, store::GuildQueueStore, voice::SongbirdTransport};
use guild_music::bot::{handlers::MusicService, MusicBot};
use guild_music::config::Config;
use guild_music::sources::{SpotifyClient, TrackResolver, YouTubeClient};
use guild_music::storage::PlaylistStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting guild-music v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::load()?);

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    // Track resolution
    let youtube = Arc::new(YouTubeClient::new(config.ytdlp_path.clone())?);
    let mut resolver = TrackResolver::new(youtube).with_timeout(config.resolver_timeout);
    match config.spotify_credentials() {
        Some((client_id, client_secret)) => {
            resolver = resolver.with_secondary(Arc::new(SpotifyClient::new(client_id, client_secret)?));
            info!("🎧 Spotify metadata enabled");
        }
        None => info!("Spotify credentials not set, searching YouTube only"),
    }

    // Playback
    let songbird = Songbird::serenity();
    let store = Arc::new(GuildQueueStore::new(config.max_queue_size));
    let transport = Arc::new(SongbirdTransport::new(songbird.clone(), config.ytdlp_path.clone()));
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let (player, events) = AudioPlayer::new(store, transport);
    let player = Arc::new(player.with_notices(notice_tx));

    let dispatcher = player.clone();
    tokio::spawn(async move {
        dispatcher.run(events).await;
        warn!("Playback dispatcher exited");
    });

    let playlists = Arc::new(PlaylistStore::open(config.playlists_path()).await?);

    let service = MusicService {
        player,
        resolver: Arc::new(resolver),
        playlists,
        queue_page_size: config.queue_page_size,
    };
    let handler = MusicBot::new(config.clone(), service, notice_rx);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error waiting for Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Shutdown signal received, closing...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK yt-dlp {}", String::from_utf8_lossy(&yt_dlp.stdout).trim());
        Ok(())
    } else {
        anyhow::bail!("yt-dlp is not working: {}", String::from_utf8_lossy(&yt_dlp.stderr).trim());
    }
}
