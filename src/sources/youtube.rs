use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::{MusicSource, SourceMetadata};

const YOUTUBE_HOSTS: [&str; 4] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

static RESULT_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoId":"([a-zA-Z0-9_-]{11})""#).expect("video id regex is valid")
});

static WATCH_LINK_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/watch\?v=([a-zA-Z0-9_-]{11})").expect("watch link regex is valid")
});

/// Primary provider: finds playable YouTube videos.
///
/// Search scrapes the public results page first and falls back to
/// `yt-dlp ytsearch1:` when the page layout yields nothing. Metadata always
/// comes from `yt-dlp --dump-json`; the stream locator is the watch URL, which
/// the voice layer hands to yt-dlp again at play time.
pub struct YouTubeClient {
    http: reqwest::Client,
    ytdlp_path: String,
    // Caps concurrent yt-dlp processes
    rate_limiter: Semaphore,
}

/// Subset of `yt-dlp --dump-json` output.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: String,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    is_live: Option<bool>,
}

impl YouTubeClient {
    pub fn new(ytdlp_path: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .context("Failed to build YouTube HTTP client")?;

        Ok(Self {
            http,
            ytdlp_path: ytdlp_path.into(),
            rate_limiter: Semaphore::new(3),
        })
    }

    /// Checks that a link points at a single YouTube video.
    pub fn is_youtube_url(link: &str) -> bool {
        extract_video_id(link).is_some()
    }

    /// First video id on the results page, without spawning yt-dlp.
    async fn scrape_first_video_id(&self, query: &str) -> Result<Option<String>> {
        let search_url = format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query)
        );

        let html = self
            .http
            .get(&search_url)
            .send()
            .await
            .context("YouTube results request failed")?
            .error_for_status()
            .context("YouTube results request rejected")?
            .text()
            .await
            .context("Could not read YouTube results page")?;

        Ok(first_video_id(&html))
    }

    async fn run_ytdlp(&self, target: &str) -> Result<Option<SourceMetadata>> {
        let _permit = self.rate_limiter.acquire().await?;

        let output = Command::new(&self.ytdlp_path)
            .args(["--dump-json", "--no-playlist", "--no-warnings", target])
            .output()
            .await
            .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().find(|line| !line.trim().is_empty()) {
            Some(line) => parse_ytdlp_line(line).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MusicSource for YouTubeClient {
    async fn search(&self, query: &str) -> Result<Option<SourceMetadata>> {
        info!("🔍 Searching YouTube: {}", query);

        match self.scrape_first_video_id(query).await {
            Ok(Some(video_id)) => {
                debug!("⚡ Results page matched video {}", video_id);
                return self.get_track(&watch_url(&video_id)).await;
            }
            Ok(None) => debug!("Results page had no video ids, falling back to yt-dlp search"),
            Err(e) => warn!("⚠️ Results page scrape failed ({:#}), falling back to yt-dlp search", e),
        }

        self.run_ytdlp(&format!("ytsearch1:{}", query)).await
    }

    async fn get_track(&self, url: &str) -> Result<Option<SourceMetadata>> {
        let target = extract_video_id(url)
            .map(|id| watch_url(&id))
            .unwrap_or_else(|| url.to_string());

        debug!("📊 Fetching YouTube metadata for {}", target);
        self.run_ytdlp(&target).await
    }

    fn is_valid_url(&self, url: &str) -> bool {
        Self::is_youtube_url(url)
    }

    fn source_name(&self) -> &'static str {
        "YouTube"
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Video id of a watch, short, embed or youtu.be link.
pub fn extract_video_id(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    let host = parsed.host_str()?;

    let candidate = if host == "youtu.be" {
        parsed.path_segments()?.next()?.to_string()
    } else if YOUTUBE_HOSTS.contains(&host) {
        let mut segments = parsed.path_segments()?;
        match segments.next()? {
            "watch" => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?,
            "shorts" | "embed" | "live" => segments.next()?.to_string(),
            _ => return None,
        }
    } else {
        return None;
    };

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// First video id in a results page, trying the JSON payload before plain links.
fn first_video_id(html: &str) -> Option<String> {
    RESULT_VIDEO_ID
        .captures(html)
        .or_else(|| WATCH_LINK_VIDEO_ID.captures(html))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_ytdlp_line(line: &str) -> Result<SourceMetadata> {
    let info: YtDlpInfo =
        serde_json::from_str(line).context("Could not parse yt-dlp output")?;

    if info.is_live.unwrap_or(false) {
        debug!("🔴 {} is a live stream, duration unknown", info.id);
    }

    let page = info.webpage_url.unwrap_or_else(|| watch_url(&info.id));

    Ok(SourceMetadata {
        title: info.title,
        artist: info.uploader.or(info.channel),
        duration_secs: info.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
        thumbnail: info.thumbnail,
        url: Some(page.clone()),
        stream_locator: Some(page),
    })
}
