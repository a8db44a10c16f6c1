//! Voice control for a video player.
//!
//! Speech is turned into lower-cased text by a [`source::TranscriptSource`],
//! matched to a player action by [`commands::CommandResolver`], and carried
//! out by [`dispatch::CommandDispatcher`].  [`session::SessionController`]
//! owns the recognition lifecycle and publishes its state; [`app::CommandLoop`]
//! connects the two ends.

pub mod app;
pub mod audio;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod session;
pub mod source;
pub mod store;
