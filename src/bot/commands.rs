use std::str::FromStr;
use thiserror::Error;

use crate::audio::LoopMode;
use crate::error::MusicError;

/// A parsed text command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Skip,
    Pause,
    Resume,
    Queue { page: usize },
    Stop,
    Shuffle,
    Loop(LoopMode),
    NowPlaying,
    Remove(usize),
    Clear,
    Join,
    Leave,
    Help,
    Playlist(PlaylistCommand),
}

/// `playlist <subcommand>`; names are always a single word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistCommand {
    Create(String),
    List,
    Show(String),
    /// Without a query the current song is saved.
    Add { name: String, query: Option<String> },
    Remove { name: String, position: usize },
    Delete(String),
    Play(String),
}

const PLAYLIST_USAGE: &str = "playlist <create|list|show|add|remove|delete|play>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("missing argument, usage: `{usage}`")]
    MissingArgument { usage: &'static str },

    #[error("invalid argument `{value}`, usage: `{usage}`")]
    InvalidArgument { value: String, usage: &'static str },

    #[error(transparent)]
    Music(#[from] MusicError),
}

impl Command {
    /// Parses `content` if it starts with `prefix`.
    ///
    /// Returns `None` for messages that are not commands at all, so ordinary
    /// chat never produces an error reply.
    pub fn parse(content: &str, prefix: &str) -> Option<Result<Command, CommandError>> {
        let body = content.trim_start().strip_prefix(prefix)?;
        let body = body.trim();
        if body.is_empty() {
            return None;
        }

        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };

        Some(Self::from_parts(&name.to_ascii_lowercase(), args))
    }

    fn from_parts(name: &str, args: &str) -> Result<Command, CommandError> {
        let command = match name {
            "play" | "p" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        usage: "play <song name or link>",
                    });
                }
                Command::Play(args.to_string())
            }
            "skip" | "s" => Command::Skip,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "queue" | "q" => Command::Queue {
                page: parse_number(args, "queue [page]")?.unwrap_or(1),
            },
            "stop" => Command::Stop,
            "shuffle" => Command::Shuffle,
            "loop" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        usage: "loop <off|one|all>",
                    });
                }
                Command::Loop(LoopMode::from_str(args)?)
            }
            "nowplaying" | "np" => Command::NowPlaying,
            "remove" => Command::Remove(parse_number(args, "remove <position>")?.ok_or(
                CommandError::MissingArgument {
                    usage: "remove <position>",
                },
            )?),
            "clear" => Command::Clear,
            "join" => Command::Join,
            "leave" | "disconnect" => Command::Leave,
            "help" => Command::Help,
            "playlist" | "pl" => Command::Playlist(PlaylistCommand::from_args(args)?),
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Play(_) => "play",
            Command::Skip => "skip",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Queue { .. } => "queue",
            Command::Stop => "stop",
            Command::Shuffle => "shuffle",
            Command::Loop(_) => "loop",
            Command::NowPlaying => "nowplaying",
            Command::Remove(_) => "remove",
            Command::Clear => "clear",
            Command::Join => "join",
            Command::Leave => "leave",
            Command::Help => "help",
            Command::Playlist(_) => "playlist",
        }
    }
}

impl PlaylistCommand {
    fn from_args(args: &str) -> Result<PlaylistCommand, CommandError> {
        let mut words = args.split_whitespace();
        let Some(sub) = words.next() else {
            return Err(CommandError::MissingArgument {
                usage: PLAYLIST_USAGE,
            });
        };

        let sub = sub.to_ascii_lowercase();
        let name = |usage: &'static str, words: &mut std::str::SplitWhitespace<'_>| {
            words
                .next()
                .map(str::to_string)
                .ok_or(CommandError::MissingArgument { usage })
        };

        let command = match sub.as_str() {
            "create" | "new" => PlaylistCommand::Create(name("playlist create <name>", &mut words)?),
            "list" | "ls" => PlaylistCommand::List,
            "show" => PlaylistCommand::Show(name("playlist show <name>", &mut words)?),
            "add" => {
                let name = name("playlist add <name> [query]", &mut words)?;
                let query = words.collect::<Vec<_>>().join(" ");
                PlaylistCommand::Add {
                    name,
                    query: (!query.is_empty()).then_some(query),
                }
            }
            "remove" | "rm" => {
                const USAGE: &str = "playlist remove <name> <position>";
                let name = name(USAGE, &mut words)?;
                let position = parse_number(words.next().unwrap_or_default(), USAGE)?
                    .ok_or(CommandError::MissingArgument { usage: USAGE })?;
                PlaylistCommand::Remove { name, position }
            }
            "delete" => PlaylistCommand::Delete(name("playlist delete <name>", &mut words)?),
            "play" | "load" => PlaylistCommand::Play(name("playlist play <name>", &mut words)?),
            _ => {
                return Err(CommandError::InvalidArgument {
                    value: sub.clone(),
                    usage: PLAYLIST_USAGE,
                })
            }
        };

        Ok(command)
    }
}

fn parse_number(args: &str, usage: &'static str) -> Result<Option<usize>, CommandError> {
    if args.is_empty() {
        return Ok(None);
    }

    args.parse()
        .map(Some)
        .map_err(|_| CommandError::InvalidArgument {
            value: args.to_string(),
            usage,
        })
}

/// Every command with a one-line description, in help order.
pub const HELP_ENTRIES: &[(&str, &str)] = &[
    ("play <query>", "Search or link a song and add it to the queue"),
    ("skip", "Skip the current song"),
    ("pause", "Pause playback"),
    ("resume", "Resume playback"),
    ("queue [page]", "Show the queue"),
    ("nowplaying", "Show the current song"),
    ("shuffle", "Shuffle the upcoming songs"),
    ("loop <off|one|all>", "Set the loop mode"),
    ("remove <position>", "Remove a song from the queue"),
    ("clear", "Remove every upcoming song"),
    ("stop", "Stop playback, clear the queue and leave"),
    ("join", "Join your voice channel"),
    ("leave", "Leave the voice channel"),
    ("playlist create <name>", "Create one of your playlists"),
    ("playlist list", "List your playlists"),
    ("playlist show <name>", "Show the songs in a playlist"),
    ("playlist add <name> [query]", "Save a song, or the current one, to a playlist"),
    ("playlist remove <name> <position>", "Remove a song from a playlist"),
    ("playlist delete <name>", "Delete a playlist"),
    ("playlist play <name>", "Queue every song in a playlist"),
    ("help", "Show this message"),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Option<Result<Command, CommandError>> {
        Command::parse(content, "!")
    }

    #[test]
    fn test_parse_play_keeps_full_query() {
        assert_eq!(
            parse("!play  never gonna give you up "),
            Some(Ok(Command::Play("never gonna give you up".to_string())))
        );
        assert_eq!(
            parse("!PLAY https://youtu.be/dQw4w9WgXcQ"),
            Some(Ok(Command::Play("https://youtu.be/dQw4w9WgXcQ".to_string())))
        );
        assert_eq!(
            parse("!play"),
            Some(Err(CommandError::MissingArgument {
                usage: "play <song name or link>"
            }))
        );
    }

    #[test]
    fn test_non_commands_are_ignored() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("!"), None);
        assert_eq!(Command::parse("!skip", "?"), None);
    }

    #[test]
    fn test_parse_queue_page() {
        assert_eq!(parse("!queue"), Some(Ok(Command::Queue { page: 1 })));
        assert_eq!(parse("!q 3"), Some(Ok(Command::Queue { page: 3 })));
        assert!(matches!(
            parse("!queue two"),
            Some(Err(CommandError::InvalidArgument { .. }))
        ));
    }

    #[test]
    fn test_parse_loop() {
        assert_eq!(parse("!loop one"), Some(Ok(Command::Loop(LoopMode::One))));
        assert_eq!(parse("!loop QUEUE"), Some(Ok(Command::Loop(LoopMode::All))));
        assert_eq!(
            parse("!loop sometimes"),
            Some(Err(CommandError::Music(MusicError::InvalidLoopMode(
                "sometimes".to_string()
            ))))
        );
        assert!(matches!(
            parse("!loop"),
            Some(Err(CommandError::MissingArgument { .. }))
        ));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("!np"), Some(Ok(Command::NowPlaying)));
        assert_eq!(parse("  !skip"), Some(Ok(Command::Skip)));
        assert_eq!(parse("!remove 2"), Some(Ok(Command::Remove(2))));
        assert_eq!(parse("!leave"), Some(Ok(Command::Leave)));
        assert_eq!(
            parse("!dance"),
            Some(Err(CommandError::Unknown("dance".to_string())))
        );
    }

    #[test]
    fn test_parse_playlist() {
        assert_eq!(
            parse("!playlist create roadtrip"),
            Some(Ok(Command::Playlist(PlaylistCommand::Create("roadtrip".to_string()))))
        );
        assert_eq!(parse("!pl ls"), Some(Ok(Command::Playlist(PlaylistCommand::List))));
        assert_eq!(
            parse("!pl add roadtrip  never gonna give you up"),
            Some(Ok(Command::Playlist(PlaylistCommand::Add {
                name: "roadtrip".to_string(),
                query: Some("never gonna give you up".to_string()),
            })))
        );
        assert_eq!(
            parse("!pl add roadtrip"),
            Some(Ok(Command::Playlist(PlaylistCommand::Add {
                name: "roadtrip".to_string(),
                query: None,
            })))
        );
        assert_eq!(
            parse("!pl remove roadtrip 2"),
            Some(Ok(Command::Playlist(PlaylistCommand::Remove {
                name: "roadtrip".to_string(),
                position: 2,
            })))
        );
        assert_eq!(
            parse("!pl PLAY roadtrip"),
            Some(Ok(Command::Playlist(PlaylistCommand::Play("roadtrip".to_string()))))
        );
    }

    #[test]
    fn test_parse_playlist_errors() {
        assert_eq!(
            parse("!playlist"),
            Some(Err(CommandError::MissingArgument { usage: PLAYLIST_USAGE }))
        );
        assert_eq!(
            parse("!pl rename a b"),
            Some(Err(CommandError::InvalidArgument {
                value: "rename".to_string(),
                usage: PLAYLIST_USAGE,
            }))
        );
        assert_eq!(
            parse("!pl remove roadtrip"),
            Some(Err(CommandError::MissingArgument {
                usage: "playlist remove <name> <position>"
            }))
        );
        assert!(matches!(
            parse("!pl remove roadtrip first"),
            Some(Err(CommandError::InvalidArgument { .. }))
        ));
        assert!(matches!(
            parse("!pl delete"),
            Some(Err(CommandError::MissingArgument { .. }))
        ));
    }

    #[test]
    fn test_multi_character_prefix() {
        assert_eq!(Command::parse("m!stop", "m!"), Some(Ok(Command::Stop)));
    }
}
