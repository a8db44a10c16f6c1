//! Action → player call.
//!
//! [`CommandDispatcher`] turns a resolved [`ActionId`] into exactly one call
//! on the external [`PlayerControls`].  Dispatch is refused before any call
//! is made when no player exists or no media is loaded; a failing player call
//! is reported as [`DispatchError::Player`] and never propagates further.

pub mod feedback;
pub mod player;

pub use feedback::{feedback_for, Feedback, LogFeedback, NoFeedback};
pub use player::{PlayerControls, PlayerError};

#[cfg(test)]
pub use player::{MockPlayer, PlayerCall};

use thiserror::Error;

use crate::commands::ActionId;

/// Relative volume step for `volumeUp` / `volumeDown`.
pub const VOLUME_STEP: f32 = 0.1;

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Why a dispatch did not reach (or failed inside) the player.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no player available")]
    PlayerUnavailable,

    #[error("no media loaded")]
    NoMedia,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Player(#[from] PlayerError),
}

// ---------------------------------------------------------------------------
// CommandDispatcher
// ---------------------------------------------------------------------------

/// Maps actions to player calls.
///
/// The dispatcher is stateful only for mute: it remembers the volume in
/// effect when `mute` was issued so `unmute` can restore it.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    pre_mute_volume: Option<f32>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch an action given by its string id.
    ///
    /// Ids outside the known set fail closed without touching the player.
    pub fn dispatch_id(
        &mut self,
        id: &str,
        controls: &dyn PlayerControls,
    ) -> Result<(), DispatchError> {
        let action = id
            .parse::<ActionId>()
            .map_err(|_| DispatchError::UnknownAction(id.to_string()))?;
        self.dispatch(action, controls)
    }

    /// Issue the single player call `action` stands for.
    pub fn dispatch(
        &mut self,
        action: ActionId,
        controls: &dyn PlayerControls,
    ) -> Result<(), DispatchError> {
        if !controls.has_player() {
            return Err(DispatchError::PlayerUnavailable);
        }
        if controls.uri().map_or(true, |u| u.is_empty()) {
            return Err(DispatchError::NoMedia);
        }

        if let Some(delta) = action.seek_delta() {
            controls.seek(delta)?;
            return Ok(());
        }
        if let Some(speed) = action.speed() {
            controls.set_speed(speed)?;
            return Ok(());
        }

        match action {
            ActionId::Play => controls.play()?,
            ActionId::Pause => controls.pause()?,
            ActionId::Stop => controls.stop()?,
            ActionId::VolumeUp => {
                controls.set_volume((controls.volume() + VOLUME_STEP).clamp(0.0, 1.0))?
            }
            ActionId::VolumeDown => {
                controls.set_volume((controls.volume() - VOLUME_STEP).clamp(0.0, 1.0))?
            }
            ActionId::Mute => {
                let current = controls.volume();
                controls.set_volume(0.0)?;
                if current > 0.0 {
                    self.pre_mute_volume = Some(current);
                }
            }
            ActionId::Unmute => {
                let current = controls.volume();
                let fallback = if current > 0.0 { current } else { 1.0 };
                let target = self
                    .pre_mute_volume
                    .filter(|v| *v > 0.0)
                    .unwrap_or(fallback)
                    .clamp(0.0, 1.0);
                controls.set_volume(target)?;
                self.pre_mute_volume = None;
            }
            ActionId::Fullscreen | ActionId::ExitFullscreen => controls.toggle_fullscreen()?,
            ActionId::Bookmark => controls.add_bookmark()?,
            ActionId::Favorite => controls.toggle_favorite()?,
            // Seek and speed actions returned above.
            _ => return Err(DispatchError::UnknownAction(action.to_string())),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
