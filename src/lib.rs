//! Per-guild music queue and playback manager for Discord.
//!
//! - [`sources`] resolves queries into [`sources::Track`]s
//! - [`audio`] keeps each guild's queue and drives playback
//! - [`storage`] keeps each user's saved playlists
//! - [`bot`] exposes it all as prefix text commands
//! - [`ui`] renders replies and notices

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod storage;
pub mod ui;

pub use error::{MusicError, Precondition, Result};
