//! Enumerated player actions and playback speeds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// PlaybackSpeed
// ---------------------------------------------------------------------------

/// The playback rates the player supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    Half,
    ThreeQuarters,
    Normal,
    OneAndQuarter,
    OneAndHalf,
    Double,
}

impl PlaybackSpeed {
    /// Rate multiplier handed to the player (`1.0` = normal).
    pub fn rate(self) -> f32 {
        match self {
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::ThreeQuarters => 0.75,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::OneAndQuarter => 1.25,
            PlaybackSpeed::OneAndHalf => 1.5,
            PlaybackSpeed::Double => 2.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionId
// ---------------------------------------------------------------------------

/// Fixed set of commands a transcript can resolve to.
///
/// The string identifiers (`"play"`, `"forward10"`, `"speed15"` …) are the
/// keys used in the persisted custom-command object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ActionId {
    Play,
    Pause,
    Stop,
    Forward5,
    Forward10,
    Forward30,
    Forward60,
    Backward5,
    Backward10,
    Backward30,
    Backward60,
    VolumeUp,
    VolumeDown,
    Mute,
    Unmute,
    Speed05,
    Speed075,
    Speed1,
    Speed125,
    Speed15,
    Speed2,
    Fullscreen,
    ExitFullscreen,
    Bookmark,
    Favorite,
}

impl ActionId {
    /// Every action, in declaration order.
    pub const ALL: [ActionId; 25] = [
        ActionId::Play,
        ActionId::Pause,
        ActionId::Stop,
        ActionId::Forward5,
        ActionId::Forward10,
        ActionId::Forward30,
        ActionId::Forward60,
        ActionId::Backward5,
        ActionId::Backward10,
        ActionId::Backward30,
        ActionId::Backward60,
        ActionId::VolumeUp,
        ActionId::VolumeDown,
        ActionId::Mute,
        ActionId::Unmute,
        ActionId::Speed05,
        ActionId::Speed075,
        ActionId::Speed1,
        ActionId::Speed125,
        ActionId::Speed15,
        ActionId::Speed2,
        ActionId::Fullscreen,
        ActionId::ExitFullscreen,
        ActionId::Bookmark,
        ActionId::Favorite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionId::Play => "play",
            ActionId::Pause => "pause",
            ActionId::Stop => "stop",
            ActionId::Forward5 => "forward5",
            ActionId::Forward10 => "forward10",
            ActionId::Forward30 => "forward30",
            ActionId::Forward60 => "forward60",
            ActionId::Backward5 => "backward5",
            ActionId::Backward10 => "backward10",
            ActionId::Backward30 => "backward30",
            ActionId::Backward60 => "backward60",
            ActionId::VolumeUp => "volumeUp",
            ActionId::VolumeDown => "volumeDown",
            ActionId::Mute => "mute",
            ActionId::Unmute => "unmute",
            ActionId::Speed05 => "speed05",
            ActionId::Speed075 => "speed075",
            ActionId::Speed1 => "speed1",
            ActionId::Speed125 => "speed125",
            ActionId::Speed15 => "speed15",
            ActionId::Speed2 => "speed2",
            ActionId::Fullscreen => "fullscreen",
            ActionId::ExitFullscreen => "exitFullscreen",
            ActionId::Bookmark => "bookmark",
            ActionId::Favorite => "favorite",
        }
    }

    /// Signed seek offset in seconds for the seek actions.
    pub fn seek_delta(self) -> Option<f64> {
        match self {
            ActionId::Forward5 => Some(5.0),
            ActionId::Forward10 => Some(10.0),
            ActionId::Forward30 => Some(30.0),
            ActionId::Forward60 => Some(60.0),
            ActionId::Backward5 => Some(-5.0),
            ActionId::Backward10 => Some(-10.0),
            ActionId::Backward30 => Some(-30.0),
            ActionId::Backward60 => Some(-60.0),
            _ => None,
        }
    }

    /// Target rate for the speed actions.
    pub fn speed(self) -> Option<PlaybackSpeed> {
        match self {
            ActionId::Speed05 => Some(PlaybackSpeed::Half),
            ActionId::Speed075 => Some(PlaybackSpeed::ThreeQuarters),
            ActionId::Speed1 => Some(PlaybackSpeed::Normal),
            ActionId::Speed125 => Some(PlaybackSpeed::OneAndQuarter),
            ActionId::Speed15 => Some(PlaybackSpeed::OneAndHalf),
            ActionId::Speed2 => Some(PlaybackSpeed::Double),
            _ => None,
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identifier is not one of the known actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action id: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionId {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionId::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl From<ActionId> for String {
    fn from(a: ActionId) -> Self {
        a.as_str().to_string()
    }
}

impl TryFrom<String> for ActionId {
    type Error = UnknownAction;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_back() {
        for action in ActionId::ALL {
            assert_eq!(action.as_str().parse::<ActionId>(), Ok(action));
        }
    }

    #[test]
    fn unknown_id_is_rejected() {
        assert_eq!(
            "rewindForever".parse::<ActionId>(),
            Err(UnknownAction("rewindForever".into()))
        );
        // ids are case-sensitive
        assert!("VolumeUp".parse::<ActionId>().is_err());
    }

    #[test]
    fn seek_deltas_are_signed() {
        assert_eq!(ActionId::Forward10.seek_delta(), Some(10.0));
        assert_eq!(ActionId::Backward30.seek_delta(), Some(-30.0));
        assert_eq!(ActionId::Play.seek_delta(), None);
    }

    #[test]
    fn speed_actions_map_to_rates() {
        assert_eq!(ActionId::Speed15.speed().map(PlaybackSpeed::rate), Some(1.5));
        assert_eq!(ActionId::Speed075.speed().map(PlaybackSpeed::rate), Some(0.75));
        assert_eq!(ActionId::Mute.speed(), None);
    }

    #[test]
    fn serde_uses_string_ids() {
        let json = serde_json::to_string(&ActionId::VolumeUp).unwrap();
        assert_eq!(json, "\"volumeUp\"");
        let back: ActionId = serde_json::from_str("\"speed125\"").unwrap();
        assert_eq!(back, ActionId::Speed125);
    }
}
