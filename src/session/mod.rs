//! Voice-session lifecycle.
//!
//! [`SessionController`] owns both recognition modes, classifies recognizer
//! errors, restarts persistent listening after recoverable failures, and
//! publishes a [`SessionState`] snapshot on a `watch` channel.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_player::config::{AppConfig, AudioConfig};
//! use voice_player::dispatch::NoFeedback;
//! use voice_player::session::{Collaborators, SessionController};
//! use voice_player::source::{ContinuousSource, CpalMicrophone, HttpTranscriber, UploadSource};
//! use voice_player::store::MemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let transcriber = Arc::new(HttpTranscriber::from_config(&config.transcription));
//! let controller = SessionController::new(
//!     config.voice.clone(),
//!     Collaborators {
//!         persistent: Arc::new(ContinuousSource::new(config.audio.clone(), transcriber.clone())),
//!         one_shot: Arc::new(UploadSource::new(config.audio.clone(), transcriber)),
//!         microphone: Arc::new(CpalMicrophone),
//!         store: Arc::new(MemoryStore::new()),
//!         feedback: Arc::new(NoFeedback),
//!     },
//! );
//!
//! let mut state = controller.subscribe();
//! controller.toggle_persistent_mode().await?;
//! state.changed().await?;
//! println!("listening: {}", state.borrow().is_listening);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod state;

pub use controller::{Collaborators, SessionController};
pub use state::{RecognitionMode, SessionState, SessionStatus, Transcript};

use thiserror::Error;

use crate::source::SourceError;
use crate::store::StoreError;

/// Controller operations that were refused or failed.
///
/// Every variant is also reflected in [`SessionState::error`] when it is
/// something the user should see.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("one-shot recording is unavailable while persistent listening is on")]
    PersistentModeActive,

    #[error("a voice command is still being processed")]
    Busy,

    #[error("microphone access denied: {0}")]
    Microphone(#[source] SourceError),

    #[error("could not start voice recognition: {0}")]
    Start(#[source] SourceError),

    #[error("failed to save custom command: {0}")]
    Store(#[from] StoreError),
}
