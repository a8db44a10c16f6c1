//! The player-control capability set the dispatcher drives.
//!
//! The player itself (decoding, rendering, transport) lives outside this
//! crate; it is reached only through [`PlayerControls`].

use thiserror::Error;

use crate::commands::PlaybackSpeed;

/// A player call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("player call failed: {0}")]
pub struct PlayerError(pub String);

/// Externally owned player controls.
///
/// Implementors must be `Send + Sync` so the same controls can be shared
/// between the UI and the command loop.
pub trait PlayerControls: Send + Sync {
    /// URI of the loaded media, `None` when nothing is loaded.
    fn uri(&self) -> Option<String>;

    /// Current volume in `[0.0, 1.0]`.
    fn volume(&self) -> f32;

    /// Whether a player instance exists.
    fn has_player(&self) -> bool;

    fn play(&self) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn stop(&self) -> Result<(), PlayerError>;

    /// Seek relative to the current position.
    fn seek(&self, delta_secs: f64) -> Result<(), PlayerError>;

    fn set_volume(&self, volume: f32) -> Result<(), PlayerError>;
    fn set_speed(&self, speed: PlaybackSpeed) -> Result<(), PlayerError>;
    fn toggle_fullscreen(&self) -> Result<(), PlayerError>;
    fn add_bookmark(&self) -> Result<(), PlayerError>;
    fn toggle_favorite(&self) -> Result<(), PlayerError>;
}

// ---------------------------------------------------------------------------
// MockPlayer (test double)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{MockPlayer, PlayerCall};

#[cfg(test)]
mod mock {
    use std::sync::Mutex;

    use super::*;

    /// One recorded call on [`MockPlayer`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum PlayerCall {
        Play,
        Pause,
        Stop,
        Seek(f64),
        SetVolume(f32),
        SetSpeed(PlaybackSpeed),
        ToggleFullscreen,
        AddBookmark,
        ToggleFavorite,
    }

    /// Player that records every call and tracks volume.
    pub struct MockPlayer {
        uri: Mutex<Option<String>>,
        volume: Mutex<f32>,
        has_player: bool,
        fail: bool,
        calls: Mutex<Vec<PlayerCall>>,
    }

    impl MockPlayer {
        /// A player with media loaded at full volume.
        pub fn loaded() -> Self {
            Self {
                uri: Mutex::new(Some("file:///movies/demo.mp4".into())),
                volume: Mutex::new(1.0),
                has_player: true,
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// A player with nothing loaded.
        pub fn empty() -> Self {
            let p = Self::loaded();
            *p.uri.lock().unwrap() = None;
            p
        }

        /// Media loaded but no player instance behind it.
        pub fn without_player() -> Self {
            Self {
                has_player: false,
                ..Self::loaded()
            }
        }

        /// Every call fails with a [`PlayerError`].
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::loaded()
            }
        }

        pub fn with_volume(self, volume: f32) -> Self {
            *self.volume.lock().unwrap() = volume;
            self
        }

        pub fn calls(&self) -> Vec<PlayerCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: PlayerCall) -> Result<(), PlayerError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(PlayerError("decoder crashed".into()))
            } else {
                Ok(())
            }
        }
    }

    impl PlayerControls for MockPlayer {
        fn uri(&self) -> Option<String> {
            self.uri.lock().unwrap().clone()
        }

        fn volume(&self) -> f32 {
            *self.volume.lock().unwrap()
        }

        fn has_player(&self) -> bool {
            self.has_player
        }

        fn play(&self) -> Result<(), PlayerError> {
            self.record(PlayerCall::Play)
        }

        fn pause(&self) -> Result<(), PlayerError> {
            self.record(PlayerCall::Pause)
        }

        fn stop(&self) -> Result<(), PlayerError> {
            self.record(PlayerCall::Stop)
        }

        fn seek(&self, delta_secs: f64) -> Result<(), PlayerError> {
            self.record(PlayerCall::Seek(delta_secs))
        }

        fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
            self.record(PlayerCall::SetVolume(volume))?;
            *self.volume.lock().unwrap() = volume;
            Ok(())
        }

        fn set_speed(&self, speed: PlaybackSpeed) -> Result<(), PlayerError> {
            self.record(PlayerCall::SetSpeed(speed))
        }

        fn toggle_fullscreen(&self) -> Result<(), PlayerError> {
            self.record(PlayerCall::ToggleFullscreen)
        }

        fn add_bookmark(&self) -> Result<(), PlayerError> {
            self.record(PlayerCall::AddBookmark)
        }

        fn toggle_favorite(&self) -> Result<(), PlayerError> {
            self.record(PlayerCall::ToggleFavorite)
        }
    }
}
