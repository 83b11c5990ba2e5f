use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::fmt::Write as _;
use std::time::Duration;

use super::messages::{format_duration, render_command_error, render_error, status_emoji, track_line};
use crate::audio::{LoopMode, NowPlaying, PlayerNotice};
use crate::bot::commands::{CommandError, HELP_ENTRIES};
use crate::bot::handlers::{CommandOutcome, QueueListing};
use crate::error::MusicError;
use crate::sources::Track;
use crate::storage::{Playlist, PlaylistEntry};

/// Colour palette shared by every reply.
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

const STANDARD_FOOTER: &str = "🎵 guild-music";

/// Embed field values are capped by Discord.
const FIELD_LIMIT: usize = 1024;

pub fn outcome_embed(outcome: &CommandOutcome, prefix: &str) -> CreateEmbed {
    match outcome {
        CommandOutcome::Queued {
            track,
            position,
            started,
        } => track_added_embed(track, *position, *started),
        CommandOutcome::Skipped {
            skipped,
            now_playing,
        } => {
            let description = match now_playing {
                Some(next) => format!("Skipped **{}**\nNow playing: {}", skipped.title(), track_line(next)),
                None => format!("Skipped **{}**\nThe queue is now empty.", skipped.title()),
            };
            simple("⏭️ Skipped", description, colors::MUSIC_PURPLE)
        }
        CommandOutcome::Paused(track) => simple("⏸️ Paused", format!("**{}**", track.title()), colors::WARNING_ORANGE),
        CommandOutcome::Resumed(track) => simple("▶️ Resumed", format!("**{}**", track.title()), colors::SUCCESS_GREEN),
        CommandOutcome::Queue(listing) => queue_embed(listing, prefix),
        CommandOutcome::Stopped { dropped } => simple(
            "⏹️ Stopped",
            format!("Stopped playback and cleared {} tracks", dropped),
            colors::NEUTRAL_GRAY,
        ),
        CommandOutcome::Shuffled { count } => {
            simple("🔀 Shuffled", format!("Shuffled {} tracks", count), colors::MUSIC_PURPLE)
        }
        CommandOutcome::LoopSet(mode) => {
            let (title, description) = match mode {
                LoopMode::Off => ("➡️ Loop disabled", "Tracks play once"),
                LoopMode::One => ("🔂 Loop one", "Looping the current track"),
                LoopMode::All => ("🔁 Loop all", "Looping the whole queue"),
            };
            simple(title, description, colors::INFO_BLUE)
        }
        CommandOutcome::NowPlaying(None) => simple("😴 Nothing playing", "The queue is empty", colors::NEUTRAL_GRAY),
        CommandOutcome::NowPlaying(Some(now)) => now_playing_embed(now),
        CommandOutcome::Removed { track, position } => simple(
            "❌ Removed",
            format!("Removed **{}** from position {}", track.title(), position),
            colors::NEUTRAL_GRAY,
        ),
        CommandOutcome::Cleared { count } => {
            simple("🗑️ Cleared", format!("Cleared {} upcoming tracks", count), colors::NEUTRAL_GRAY)
        }
        CommandOutcome::Joined(channel_id) => {
            simple("🔊 Joined", format!("Joined <#{}>", channel_id), colors::SUCCESS_GREEN)
        }
        CommandOutcome::Left { dropped } => {
            let description = if *dropped > 0 {
                format!("Left the voice channel and cleared {} tracks", dropped)
            } else {
                "Left the voice channel".to_string()
            };
            simple("👋 Left", description, colors::NEUTRAL_GRAY)
        }
        CommandOutcome::Help => help_embed(prefix),
        CommandOutcome::PlaylistCreated(playlist) => simple(
            "📋 Playlist created",
            format!(
                "Created **{}**. Add songs with `{}playlist add {} <song>`",
                playlist.name, prefix, playlist.name
            ),
            colors::SUCCESS_GREEN,
        ),
        CommandOutcome::Playlists(playlists) => playlists_embed(playlists, prefix),
        CommandOutcome::PlaylistShown(playlist) => playlist_embed(playlist),
        CommandOutcome::PlaylistSongAdded { playlist, entry, len } => simple(
            "💾 Saved to playlist",
            format!(
                "{} added to **{}** ({} songs)",
                entry_line(entry),
                playlist,
                len
            ),
            colors::SUCCESS_GREEN,
        ),
        CommandOutcome::PlaylistSongRemoved {
            playlist,
            entry,
            position,
        } => simple(
            "❌ Removed from playlist",
            format!("Removed **{}** from position {} of **{}**", entry.title, position, playlist),
            colors::NEUTRAL_GRAY,
        ),
        CommandOutcome::PlaylistDeleted(playlist) => simple(
            "🗑️ Playlist deleted",
            format!("Deleted **{}** and its {} songs", playlist.name, playlist.songs.len()),
            colors::NEUTRAL_GRAY,
        ),
        CommandOutcome::PlaylistQueued {
            playlist,
            queued,
            skipped,
            started,
        } => {
            let mut description = format!("Queued {} songs from **{}**", queued, playlist);
            if *started {
                description.push_str(", starting playback");
            }
            if *skipped > 0 {
                let _ = write!(description, "\n⚠️ {} songs did not fit in the queue", skipped);
            }
            simple("📋 Playlist queued", description, colors::MUSIC_PURPLE)
        }
    }
}

pub fn track_added_embed(track: &Track, position: usize, started: bool) -> CreateEmbed {
    let title = if started {
        "🎵 Starting playback"
    } else {
        "➕ Added to queue"
    };

    let mut embed = track_embed(track, title, colors::SUCCESS_GREEN);
    if !started {
        embed = embed.field("📍 Position", position.to_string(), true);
    }
    if let Some(note) = track.provenance_note() {
        embed = embed.field("🔗 Source", note, false);
    }
    embed
}

pub fn now_playing_embed(now: &NowPlaying) -> CreateEmbed {
    let title = format!("{} Now playing", status_emoji(now.status));
    track_embed(&now.track, &title, colors::SUCCESS_GREEN).field("🔁 Loop", now.loop_mode.to_string(), true)
}

pub fn queue_embed(listing: &QueueListing, prefix: &str) -> CreateEmbed {
    let page = &listing.page;
    let embed = CreateEmbed::new().title("📋 Queue").color(colors::INFO_BLUE);

    if listing.current.is_none() && page.total_items == 0 {
        return embed
            .description(format!(
                "😴 **The queue is empty**\n\n💡 Use `{}play <song>` to add music",
                prefix
            ))
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    let mut embed = embed;
    if let Some(current) = &listing.current {
        embed = embed.field(
            format!("{} Now playing", status_emoji(listing.status)),
            track_line(current),
            false,
        );
    }

    if !page.items.is_empty() {
        let mut upcoming = String::new();
        for (offset, track) in page.items.iter().enumerate() {
            let _ = writeln!(upcoming, "**{}**. {}", page.first_position + offset, track_line(track));
        }
        embed = embed.field("Up next", truncate(upcoming), false);
    }

    let mut info = format!("**Total:** {} tracks", page.total_items);
    if listing.total_duration > Duration::ZERO {
        let _ = write!(info, " • **Duration:** {}", format_duration(listing.total_duration));
    }
    match listing.loop_mode {
        LoopMode::Off => {}
        LoopMode::One => info.push_str(" • 🔂"),
        LoopMode::All => info.push_str(" • 🔁"),
    }
    embed = embed.field("Info", info, false);

    let footer = if page.total_pages > 1 {
        format!("Page {} of {} • {}", page.current_page, page.total_pages, STANDARD_FOOTER)
    } else {
        STANDARD_FOOTER.to_string()
    };

    embed.footer(CreateEmbedFooter::new(footer)).timestamp(Timestamp::now())
}

pub fn help_embed(prefix: &str) -> CreateEmbed {
    let mut music = String::new();
    let mut playlists = String::new();
    for (usage, description) in HELP_ENTRIES {
        let section = if usage.starts_with("playlist") {
            &mut playlists
        } else {
            &mut music
        };
        let _ = writeln!(section, "`{}{}` - {}", prefix, usage, description);
    }

    CreateEmbed::new()
        .title("🎵 Music commands")
        .color(colors::INFO_BLUE)
        .field("🎵 Playback", music, false)
        .field("💾 Playlists", playlists, false)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

pub fn error_embed(error: &MusicError) -> CreateEmbed {
    let (title, colour) = match error {
        MusicError::NotFound { .. } => ("🔍 No results", colors::WARNING_ORANGE),
        MusicError::MetadataOnly { .. } => ("⚠️ No playable stream", colors::WARNING_ORANGE),
        e if e.is_precondition() => ("⚠️ Cannot do that", colors::WARNING_ORANGE),
        _ => ("❌ Error", colors::ERROR_RED),
    };
    simple(title, render_error(error), colour)
}

pub fn command_error_embed(error: &CommandError, prefix: &str) -> CreateEmbed {
    match error {
        CommandError::Music(error) => error_embed(error),
        other => simple("❓ Invalid command", render_command_error(other, prefix), colors::ERROR_RED),
    }
}

pub fn notice_embed(notice: &PlayerNotice) -> CreateEmbed {
    match notice {
        PlayerNotice::NowPlaying { track, .. } => track_embed(track, "🎵 Now playing", colors::SUCCESS_GREEN),
        PlayerNotice::SkippedOnError { track, .. } => simple(
            "⚠️ Playback failed",
            format!("Could not play **{}**, skipping", track.title()),
            colors::WARNING_ORANGE,
        ),
        PlayerNotice::QueueFinished { .. } => {
            simple("📭 Queue finished", "Nothing left to play", colors::NEUTRAL_GRAY)
        }
    }
}

fn playlists_embed(playlists: &[Playlist], prefix: &str) -> CreateEmbed {
    if playlists.is_empty() {
        return simple(
            "📋 Your playlists",
            format!("You have no playlists yet. Create one with `{}playlist create <name>`", prefix),
            colors::NEUTRAL_GRAY,
        );
    }

    let mut description = String::new();
    for playlist in playlists {
        let _ = writeln!(description, "**{}** • {} songs", playlist.name, playlist.songs.len());
    }
    simple("📋 Your playlists", description, colors::MUSIC_PURPLE)
}

fn playlist_embed(playlist: &Playlist) -> CreateEmbed {
    let description = if playlist.songs.is_empty() {
        "😴 This playlist is empty".to_string()
    } else {
        let mut songs = String::new();
        for (index, entry) in playlist.songs.iter().enumerate() {
            let _ = writeln!(songs, "**{}**. {}", index + 1, entry_line(entry));
        }
        songs
    };

    let total: u64 = playlist.songs.iter().map(|entry| entry.duration_secs).sum();
    let mut embed = simple(&format!("📋 {}", playlist.name), description, colors::MUSIC_PURPLE)
        .field("🎶 Songs", playlist.songs.len().to_string(), true);
    if total > 0 {
        embed = embed.field("⏱️ Duration", format_duration(Duration::from_secs(total)), true);
    }
    embed.field("📅 Created", playlist.created_at.as_str(), true)
}

fn track_embed(track: &Track, title: &str, colour: serenity::all::Colour) -> CreateEmbed {
    let duration = match track.duration() {
        Some(duration) => format_duration(duration),
        None => "🔴 Live".to_string(),
    };

    let mut embed = CreateEmbed::new()
        .title(title)
        .description(format!("**{}**", track.title()))
        .color(colour)
        .field("🎤 Artist", track.artist(), true)
        .field("⏱️ Duration", duration, true)
        .field("👤 Requested by", format!("<@{}>", track.requested_by()), true);

    if let Some(thumbnail) = track.thumbnail() {
        embed = embed.thumbnail(thumbnail);
    }
    if let Some(url) = track.url() {
        embed = embed.url(url);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn simple(title: &str, description: impl Into<String>, colour: serenity::all::Colour) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(description)
        .color(colour)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn entry_line(entry: &PlaylistEntry) -> String {
    let mut line = format!("**{}** - {}", entry.title, entry.artist);
    if entry.duration_secs > 0 {
        let _ = write!(line, " `[{}]`", format_duration(Duration::from_secs(entry.duration_secs)));
    }
    line
}

fn truncate(mut value: String) -> String {
    if value.len() > FIELD_LIMIT {
        let mut end = FIELD_LIMIT - 1;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value.truncate(end);
        value.push('…');
    }
    value
}
