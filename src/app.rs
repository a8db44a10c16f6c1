//! The command loop: turns captured transcripts into player calls.
//!
//! # Flow
//!
//! ```text
//! SessionController::transcripts (broadcast) ──▶ process_voice_command
//!                                                  │
//!                                                  ▼
//!                                         PlayerControls call
//!                                                  │
//!                     display window elapsed ──────┘──▶ clear_last_command(id)
//! ```
//!
//! Every transcript is handled exactly once and in order, whether or not it
//! resolves to an action; two arriving back to back are both dispatched.
//! `last_command` is cleared after the display window unless a newer
//! transcript has replaced it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::dispatch::PlayerControls;
use crate::session::{SessionController, Transcript};

/// Consumer side of the session: resolves and dispatches transcripts.
pub struct CommandLoop {
    controller: SessionController,
    controls: Arc<dyn PlayerControls>,
    display_window: Duration,
    transcripts: broadcast::Receiver<Transcript>,
}

impl CommandLoop {
    /// Subscribes immediately, so transcripts recorded before the loop first
    /// runs are not missed.
    pub fn new(
        controller: SessionController,
        controls: Arc<dyn PlayerControls>,
        display_window: Duration,
    ) -> Self {
        let transcripts = controller.transcripts();
        Self {
            controller,
            controls,
            display_window,
            transcripts,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until the controller is dropped.
    pub async fn run(mut self) {
        loop {
            let transcript = match self.transcripts.recv().await {
                Ok(transcript) => transcript,
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("command loop: fell behind, {missed} transcripts skipped");
                    continue;
                }
                Err(RecvError::Closed) => {
                    log::debug!("command loop: controller gone");
                    return;
                }
            };

            let ok = self
                .controller
                .process_voice_command(&transcript.text, self.controls.as_ref());
            log::debug!("command loop: {:?} handled (ok = {ok})", transcript.text);
            self.schedule_clear(transcript.id);
        }
    }

    fn schedule_clear(&self, id: u64) {
        let controller = self.controller.clone();
        let window = self.display_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            controller.clear_last_command(id);
        });
    }
}
