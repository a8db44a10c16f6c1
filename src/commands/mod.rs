//! Voice command vocabulary and resolution.
//!
//! This module provides:
//! * [`ActionId`] / [`PlaybackSpeed`]: the fixed set of player commands.
//! * [`PHRASE_TABLE`] / [`Locale`]: built-in trigger phrases per locale.
//! * [`CustomOverrides`]: user-defined trigger phrases, persisted as JSON.
//! * [`CommandResolver`]: transcript → action by substring matching.
//!
//! # Quick start
//!
//! ```rust
//! use voice_player::commands::{ActionId, CommandResolver, CustomOverrides};
//!
//! let resolver = CommandResolver::new();
//! let mut overrides = CustomOverrides::new();
//! overrides.set(ActionId::Bookmark, "remember this");
//!
//! assert_eq!(resolver.resolve("Play the video", &overrides), Some(ActionId::Play));
//! assert_eq!(resolver.resolve("please remember this", &overrides), Some(ActionId::Bookmark));
//! assert_eq!(resolver.resolve("hello there", &overrides), None);
//! ```

pub mod action;
pub mod overrides;
pub mod phrases;
pub mod resolver;

pub use action::{ActionId, PlaybackSpeed, UnknownAction};
pub use overrides::{CustomOverrides, CUSTOM_COMMANDS_KEY};
pub use phrases::{Locale, Phrase, PhraseEntry, PHRASE_TABLE};
pub use resolver::{normalize, CommandResolver};
