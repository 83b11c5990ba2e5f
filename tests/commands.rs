mod common;

use common::{track, FakeSpotify, FakeYouTube, Harness, GUILD, USER, VOICE};
use guild_music::audio::LoopMode;
use guild_music::bot::commands::Command;
use guild_music::bot::handlers::{handle_command, CommandContext, CommandOutcome, MusicService};
use guild_music::error::{MusicError, Precondition};
use guild_music::sources::{Provenance, TrackResolver};
use guild_music::storage::PlaylistStore;
use guild_music::ui::embeds::outcome_embed;
use guild_music::ui::messages::render_error;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const LINK: &str = "https://www.youtube.com/watch?v=Three_Minutes";

fn catalog() -> FakeYouTube {
    FakeYouTube::default()
        .with_song("lofi beats", "Lofi Beats", 3600)
        .with_song("three minutes", "Three Minutes", 180)
        .with_song("song b", "Song B", 200)
        .with_song("song c", "Song C", 220)
}

fn service(h: &Harness) -> MusicService {
    MusicService {
        player: h.player.clone(),
        resolver: Arc::new(TrackResolver::new(Arc::new(catalog()))),
        playlists: Arc::new(PlaylistStore::in_memory()),
        queue_page_size: 2,
    }
}

fn in_voice() -> CommandContext {
    CommandContext {
        guild_id: GUILD,
        author: USER,
        author_channel: Some(VOICE),
    }
}

fn not_in_voice() -> CommandContext {
    CommandContext {
        author_channel: None,
        ..in_voice()
    }
}

async fn run(service: &MusicService, ctx: &CommandContext, content: &str) -> guild_music::Result<CommandOutcome> {
    let command = Command::parse(content, "!")
        .expect("not a command")
        .expect("command did not parse");
    handle_command(service, ctx, command).await
}

#[tokio::test]
async fn test_play_requires_voice_channel() {
    let h = Harness::new();
    let service = service(&h);

    assert_eq!(
        run(&service, &not_in_voice(), "!play lofi beats").await.unwrap_err(),
        MusicError::NotInVoiceChannel
    );
    assert_eq!(h.transport.play_count(), 0);
}

#[tokio::test]
async fn test_play_joins_and_starts() {
    let h = Harness::new();
    let service = service(&h);

    let outcome = run(&service, &in_voice(), &format!("!play {}", LINK)).await.unwrap();
    let CommandOutcome::Queued { track, started, .. } = &outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert!(*started);
    assert_eq!(track.provenance(), Provenance::Native);
    assert_eq!(track.duration_secs(), 180);
    assert_eq!(track.requested_by(), USER);

    assert_eq!(h.transport.state.lock().connects, vec![VOICE]);
    assert_eq!(h.transport.played_titles(), vec!["Three Minutes"]);

    let embed = serde_json::to_value(outcome_embed(&outcome, "!")).unwrap();
    assert_eq!(embed["title"], "🎵 Starting playback");
    assert_eq!(embed["description"], "**Three Minutes**");
    assert_eq!(embed["url"], LINK);
}

#[tokio::test]
async fn test_play_metadata_only_match_never_joins() {
    let h = Harness::new();
    let resolver = TrackResolver::new(Arc::new(catalog()))
        .with_secondary(Arc::new(FakeSpotify::default().with_song("song x", "Song X", "Artist Y")));
    let service = MusicService {
        resolver: Arc::new(resolver),
        ..service(&h)
    };

    assert_eq!(
        run(&service, &in_voice(), "!play song x").await.unwrap_err(),
        MusicError::MetadataOnly {
            title: "Song X".to_string(),
            artist: "Artist Y".to_string(),
        }
    );
    assert!(h.transport.state.lock().connects.is_empty());

    let info = h.player.queue_info(GUILD).await;
    assert_eq!(info.total_items, 0);
    assert_eq!(info.current, None);
}

#[tokio::test]
async fn test_play_into_full_queue_never_joins() {
    let h = Harness::with_max_queue(1);
    let service = service(&h);
    h.player.enqueue(GUILD, track("A")).await.unwrap();

    assert_eq!(
        run(&service, &in_voice(), "!play song b").await.unwrap_err(),
        MusicError::QueueFull { max: 1 }
    );
    assert!(h.transport.state.lock().connects.is_empty());
    assert!(!h.player.is_connected(GUILD).await);
}

#[tokio::test]
async fn test_play_unknown_song_is_not_found() {
    let h = Harness::new();
    let service = service(&h);

    let err = run(&service, &in_voice(), "!play nothing like this").await.unwrap_err();
    assert_eq!(
        err,
        MusicError::NotFound {
            query: "nothing like this".to_string()
        }
    );
    assert_eq!(render_error(&err), "🔍 No results found for **nothing like this**");
    assert!(!h.player.is_connected(GUILD).await);
}

#[tokio::test]
async fn test_queue_listing_pages() {
    let h = Harness::new();
    let service = service(&h);
    for query in ["lofi beats", "three minutes", "song b", "song c"] {
        run(&service, &in_voice(), &format!("!play {}", query)).await.unwrap();
    }

    let CommandOutcome::Queue(listing) = run(&service, &in_voice(), "!queue 2").await.unwrap() else {
        panic!("expected a queue listing");
    };
    assert_eq!(listing.current.as_ref().map(|t| t.title()), Some("Lofi Beats"));
    assert_eq!(listing.page.total_items, 3);
    assert_eq!(listing.page.total_pages, 2);
    assert_eq!(listing.page.first_position, 3);
    assert_eq!(
        listing.page.items.iter().map(|t| t.title()).collect::<Vec<_>>(),
        vec!["Song C"]
    );
}

#[tokio::test]
async fn test_controls_round_trip_through_commands() {
    let h = Harness::new();
    let service = service(&h);
    let ctx = in_voice();

    run(&service, &ctx, "!play lofi beats").await.unwrap();
    run(&service, &ctx, "!play song b").await.unwrap();

    assert_eq!(
        run(&service, &ctx, "!shuffle").await.unwrap_err(),
        MusicError::Precondition(Precondition::NotEnoughTracks { len: 1 })
    );
    assert_eq!(
        run(&service, &ctx, "!loop all").await.unwrap(),
        CommandOutcome::LoopSet(LoopMode::All)
    );

    let CommandOutcome::NowPlaying(Some(now)) = run(&service, &ctx, "!np").await.unwrap() else {
        panic!("expected something playing");
    };
    assert_eq!(now.track.title(), "Lofi Beats");
    assert_eq!(now.loop_mode, LoopMode::All);

    let CommandOutcome::Skipped { skipped, now_playing } = run(&service, &ctx, "!skip").await.unwrap() else {
        panic!("expected a skip");
    };
    assert_eq!(skipped.title(), "Lofi Beats");
    assert_eq!(now_playing.map(|t| t.title().to_string()).as_deref(), Some("Song B"));

    // Loop all sent the skipped track to the back of the queue
    let CommandOutcome::Removed { track, position } = run(&service, &ctx, "!remove 1").await.unwrap() else {
        panic!("expected a removal");
    };
    assert_eq!((track.title(), position), ("Lofi Beats", 1));
    assert_eq!(
        run(&service, &ctx, "!remove 1").await.unwrap_err(),
        MusicError::Precondition(Precondition::IndexOutOfRange { position: 1, len: 0 })
    );
}

#[tokio::test]
async fn test_join_and_leave() {
    let h = Harness::new();
    let service = service(&h);

    assert_eq!(
        run(&service, &in_voice(), "!leave").await.unwrap_err(),
        MusicError::NotConnected
    );
    assert_eq!(
        run(&service, &not_in_voice(), "!join").await.unwrap_err(),
        MusicError::NotInVoiceChannel
    );
    assert_eq!(
        run(&service, &in_voice(), "!join").await.unwrap(),
        CommandOutcome::Joined(VOICE)
    );

    run(&service, &in_voice(), "!play song b").await.unwrap();
    run(&service, &in_voice(), "!play song c").await.unwrap();

    assert_eq!(
        run(&service, &in_voice(), "!leave").await.unwrap(),
        CommandOutcome::Left { dropped: 2 }
    );
    assert!(!h.player.is_connected(GUILD).await);
    assert_eq!(run(&service, &in_voice(), "!np").await.unwrap(), CommandOutcome::NowPlaying(None));
}

#[tokio::test]
async fn test_playlist_save_and_play() {
    let h = Harness::new();
    let service = service(&h);
    let ctx = in_voice();

    let CommandOutcome::PlaylistCreated(created) = run(&service, &ctx, "!playlist create mix").await.unwrap() else {
        panic!("expected a new playlist");
    };
    assert_eq!((created.name.as_str(), created.owner), ("mix", USER.get()));

    // Saving the current song needs something playing
    assert_eq!(
        run(&service, &ctx, "!pl add mix").await.unwrap_err(),
        MusicError::Precondition(Precondition::NothingPlaying)
    );
    assert_eq!(
        run(&service, &ctx, "!pl add mix nothing like this").await.unwrap_err(),
        MusicError::NotFound {
            query: "nothing like this".to_string()
        }
    );
    assert!(h.transport.state.lock().connects.is_empty());

    let CommandOutcome::PlaylistSongAdded { entry, len, .. } =
        run(&service, &ctx, "!pl add mix song b").await.unwrap()
    else {
        panic!("expected a saved song");
    };
    assert_eq!((entry.title.as_str(), len), ("Song B", 1));

    run(&service, &ctx, "!play song c").await.unwrap();
    let CommandOutcome::PlaylistSongAdded { entry, len, .. } = run(&service, &ctx, "!pl add MIX").await.unwrap() else {
        panic!("expected the current song to be saved");
    };
    assert_eq!((entry.title.as_str(), len), ("Song C", 2));

    run(&service, &ctx, "!stop").await.unwrap();
    assert_eq!(
        run(&service, &ctx, "!pl play mix").await.unwrap(),
        CommandOutcome::PlaylistQueued {
            playlist: "mix".to_string(),
            queued: 2,
            skipped: 0,
            started: true,
        }
    );
    assert_eq!(h.transport.played_titles(), vec!["Song C", "Song B"]);
    assert_eq!(h.current_title().await.as_deref(), Some("Song B"));
    assert_eq!(h.player.queue_info(GUILD).await.items.len(), 1);
}

#[tokio::test]
async fn test_playlist_play_stops_at_queue_limit() {
    let h = Harness::with_max_queue(1);
    let service = service(&h);
    let ctx = in_voice();

    run(&service, &ctx, "!pl create road").await.unwrap();
    for query in ["song b", "song c", "lofi beats"] {
        run(&service, &ctx, &format!("!pl add road {}", query)).await.unwrap();
    }

    // The first song starts right away, so two fit
    assert_eq!(
        run(&service, &ctx, "!pl play road").await.unwrap(),
        CommandOutcome::PlaylistQueued {
            playlist: "road".to_string(),
            queued: 2,
            skipped: 1,
            started: true,
        }
    );
    assert_eq!(h.current_title().await.as_deref(), Some("Song B"));
}

#[tokio::test]
async fn test_playlist_errors() {
    let h = Harness::new();
    let service = service(&h);
    let ctx = in_voice();

    assert_eq!(
        run(&service, &ctx, "!pl show nope").await.unwrap_err(),
        MusicError::PlaylistNotFound {
            name: "nope".to_string()
        }
    );

    run(&service, &ctx, "!pl create empty").await.unwrap();
    assert_eq!(
        run(&service, &ctx, "!pl create Empty").await.unwrap_err(),
        MusicError::PlaylistExists {
            name: "Empty".to_string()
        }
    );
    assert_eq!(
        run(&service, &ctx, "!pl play empty").await.unwrap_err(),
        MusicError::PlaylistEmpty {
            name: "empty".to_string()
        }
    );
    assert!(!h.player.is_connected(GUILD).await);

    run(&service, &ctx, "!pl add empty song b").await.unwrap();
    assert_eq!(
        run(&service, &not_in_voice(), "!pl play empty").await.unwrap_err(),
        MusicError::NotInVoiceChannel
    );

    let CommandOutcome::PlaylistSongRemoved { entry, position, .. } =
        run(&service, &ctx, "!pl remove empty 1").await.unwrap()
    else {
        panic!("expected a removal");
    };
    assert_eq!((entry.title.as_str(), position), ("Song B", 1));

    let CommandOutcome::PlaylistDeleted(deleted) = run(&service, &ctx, "!pl delete empty").await.unwrap() else {
        panic!("expected a deletion");
    };
    assert_eq!(deleted.name, "empty");
    assert_eq!(run(&service, &ctx, "!pl list").await.unwrap(), CommandOutcome::Playlists(Vec::new()));
}
