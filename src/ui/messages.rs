//! Short text pieces shared by the embeds.

use std::fmt::Write as _;
use std::time::Duration;

use crate::audio::PlaybackStatus;
use crate::bot::commands::CommandError;
use crate::error::MusicError;
use crate::sources::Track;

/// Formats a duration as `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// `**Title** - Artist [3:00]`
pub fn track_line(track: &Track) -> String {
    let mut line = format!("**{}** - {}", track.title(), track.artist());
    if let Some(duration) = track.duration() {
        let _ = write!(line, " `[{}]`", format_duration(duration));
    }
    line
}

pub fn render_error(error: &MusicError) -> String {
    match error {
        MusicError::NotFound { query } => format!("🔍 No results found for **{}**", query),
        MusicError::MetadataOnly { title, artist } => format!(
            "⚠️ Found **{}** by {} but there is no playable stream for it",
            title, artist
        ),
        MusicError::Voice(_) => "❌ Could not connect to the voice channel".to_string(),
        other => format!("❌ {}", capitalize(&other.to_string())),
    }
}

pub fn render_command_error(error: &CommandError, prefix: &str) -> String {
    match error {
        CommandError::Unknown(name) => format!(
            "❓ Unknown command `{}{}`. Try `{}help`.",
            prefix, name, prefix
        ),
        CommandError::MissingArgument { usage } => format!("❌ Usage: `{}{}`", prefix, usage),
        CommandError::InvalidArgument { value, usage } => {
            format!("❌ `{}` is not valid here. Usage: `{}{}`", value, prefix, usage)
        }
        CommandError::Music(error) => render_error(error),
    }
}

pub fn status_emoji(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Playing => "▶️",
        PlaybackStatus::Paused => "⏸️",
        PlaybackStatus::Idle => "⏹️",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
