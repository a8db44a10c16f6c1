//! Fire-and-forget user feedback after a voice command.

use std::fmt;
use std::sync::Arc;

use crate::config::Platform;

/// Haptic / notification feedback sink.
///
/// Calls must return immediately; failures are swallowed by the
/// implementation.
pub trait Feedback: fmt::Debug + Send + Sync {
    fn success(&self);
    fn failure(&self);
}

/// Feedback that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn success(&self) {}
    fn failure(&self) {}
}

/// Feedback that only logs.  Used by the desktop binary, which has no
/// vibration motor to drive.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
    fn success(&self) {
        log::info!("feedback: command succeeded");
    }

    fn failure(&self) {
        log::info!("feedback: command failed");
    }
}

/// Pick the feedback sink for `platform`.
///
/// The mobile-web shell never gets feedback, whatever `enabled` says.
pub fn feedback_for(platform: Platform, enabled: bool) -> Arc<dyn Feedback> {
    match (platform, enabled) {
        (Platform::Native, true) => Arc::new(LogFeedback),
        _ => Arc::new(NoFeedback),
    }
}
