//! Observable session state.
//!
//! [`SessionState`] is the single source of truth for everything a UI needs
//! about voice control.  The controller owns it inside a `watch` channel and
//! mutates it with `send_modify`, so every subscriber sees whole snapshots.

use std::time::SystemTime;

use crate::commands::normalize;

// ---------------------------------------------------------------------------
// RecognitionMode / SessionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Push-to-talk: record, then transcribe once.
    OneShot,
    /// Hands-free: listen until explicitly stopped.
    Persistent,
}

/// Lifecycle of the current recognition session.
///
/// ```text
/// Idle ──start──▶ Starting ──ready──▶ Listening
/// Listening ──final result──▶ Listening      (persistent)
/// Listening ──stop──▶ Stopping ──▶ Processing ──result──▶ Idle  (one-shot)
/// Listening / Starting ──fatal error──▶ Error
/// any ──stop──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Starting,
    Listening,
    Stopping,
    Processing,
    Error,
}

impl SessionStatus {
    /// Short label for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Starting => "Starting",
            SessionStatus::Listening => "Listening",
            SessionStatus::Stopping => "Stopping",
            SessionStatus::Processing => "Processing",
            SessionStatus::Error => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// A captured command utterance.
///
/// `id` increases with every transcript a controller records, so a consumer
/// can tell a repeated phrase from the same transcript seen twice.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub id: u64,
    /// Lower-cased and trimmed.
    pub text: String,
    pub captured_at: SystemTime,
}

impl Transcript {
    pub fn new(id: u64, raw: &str) -> Self {
        Self {
            id,
            text: normalize(raw),
            captured_at: SystemTime::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// A one-shot recording is capturing audio.
    pub is_recording: bool,
    /// A transcript is being produced or acted on.
    pub is_processing: bool,
    /// The persistent recognizer is live.
    pub is_listening: bool,
    pub is_persistent_mode: bool,
    pub status: SessionStatus,
    pub last_command: Option<Transcript>,
    /// Human-readable; never a raw error code.
    pub error: Option<String>,
}
