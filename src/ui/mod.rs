//! User-facing replies and playback notices, sent as embeds.

pub mod embeds;
pub mod messages;
