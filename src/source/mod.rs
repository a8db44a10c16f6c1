//! Transcript sources: where lower-cased command text comes from.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 TranscriptSource (trait)                    │
//! │                                                             │
//! │  ┌──────────────────────┐      ┌────────────────────────┐   │
//! │  │ ContinuousSource     │      │ UploadSource           │   │
//! │  │ cpal → VAD segments  │      │ cpal → buffer          │   │
//! │  │ → Transcriber / utt. │      │ stop → WAV → upload    │   │
//! │  └──────────┬───────────┘      └───────────┬────────────┘   │
//! │             └──────────┬───────────────────┘                │
//! │                        ▼                                    │
//! │     ActiveRecognition { events: mpsc<RecognitionEvent>,     │
//! │                         stop: StopHandle,                   │
//! │                         released: Released }                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A source is started once per session.  Everything it observes arrives as
//! [`RecognitionEvent`]s; the session ends when the event channel closes,
//! which always happens after an [`RecognitionEvent::Ended`].  Stopping (or
//! dropping) the [`StopHandle`] asks the source to wind down and release the
//! microphone; [`Released`] resolves once it has.

pub mod continuous;
pub mod microphone;
pub mod transcriber;
pub mod upload;

pub use continuous::ContinuousSource;
pub use microphone::{CpalMicrophone, MicrophoneAccess};
pub use transcriber::{HttpTranscriber, TranscribeError, Transcriber};
pub use upload::UploadSource;

#[cfg(test)]
pub use fake::{FakeMicrophone, FakeSession, FakeSource, FakeTranscriber};

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::audio::{AudioCapture, CaptureError, CaptureEvent, CaptureHandle};

/// Event channel depth per session.
pub(crate) const EVENT_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Error codes a recognition session can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// Nothing was said before the recognizer gave up.
    NoSpeech,
    /// The session was cancelled.
    Aborted,
    /// The transcription service could not be reached.
    Network,
    /// The microphone failed or disappeared.
    AudioCapture,
    /// Microphone permission was refused.
    NotAllowed,
    /// Anything else, carried verbatim.
    Other(String),
}

/// How the session controller reacts to an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Not an error from the user's point of view.
    Ignored,
    /// Retry after the network backoff.
    Recoverable,
    /// Ends persistent mode.
    Fatal,
    /// Shown to the user; listening stops but the mode survives.
    Surfaced,
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::Network => "network",
            Self::AudioCapture => "audio-capture",
            Self::NotAllowed => "not-allowed",
            Self::Other(code) => code,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoSpeech | Self::Aborted => ErrorClass::Ignored,
            Self::Network => ErrorClass::Recoverable,
            Self::AudioCapture | Self::NotAllowed => ErrorClass::Fatal,
            Self::Other(_) => ErrorClass::Surfaced,
        }
    }

    /// Human-readable message for the observable error field.
    pub fn message(&self) -> String {
        match self {
            Self::NoSpeech => "No speech detected".into(),
            Self::Aborted => "Voice recognition was cancelled".into(),
            Self::Network => "Network error during voice recognition".into(),
            Self::AudioCapture => "Microphone is not available".into(),
            Self::NotAllowed => "Microphone permission denied".into(),
            Self::Other(code) => format!("Voice recognition error: {code}"),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RecognitionEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Capture is live.
    Ready,
    /// Recognized text.  Only final results are acted on.
    Result { text: String, is_final: bool },
    /// Capture is closed and audio is being transcribed.
    Processing,
    Error(ErrorCode),
    /// The session is over; no further events follow.
    Ended,
}

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Failures to start a session (as opposed to errors reported during one).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio capture failed: {0}")]
    Capture(#[source] CaptureError),

    #[error("speech source unavailable: {0}")]
    Unavailable(String),
}

impl From<CaptureError> for SourceError {
    fn from(e: CaptureError) -> Self {
        if e.is_permission_denied() {
            SourceError::PermissionDenied
        } else {
            SourceError::Capture(e)
        }
    }
}

impl SourceError {
    /// The [`ErrorCode`] a failed start corresponds to.
    pub fn code(&self) -> ErrorCode {
        match self {
            SourceError::PermissionDenied => ErrorCode::NotAllowed,
            SourceError::Capture(_) => ErrorCode::AudioCapture,
            SourceError::Unavailable(reason) => ErrorCode::Other(reason.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// StopHandle / ActiveRecognition
// ---------------------------------------------------------------------------

/// Asks a running session to stop.  Dropping it has the same effect.
#[derive(Debug)]
pub struct StopHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl StopHandle {
    /// A handle plus the receiver the source task waits on.
    pub fn pair() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Request the stop.  Later calls do nothing.
    pub fn stop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A started session: its event stream and the means to stop it.
#[derive(Debug)]
pub struct ActiveRecognition {
    pub events: mpsc::Receiver<RecognitionEvent>,
    pub stop: StopHandle,
    pub released: Released,
}

/// Resolves once a session has let go of the microphone.
#[derive(Debug, Clone)]
pub struct Released(watch::Receiver<()>);

impl Released {
    pub async fn wait(mut self) {
        // Nothing is ever sent; the sender is dropped on release.
        while self.0.changed().await.is_ok() {}
    }
}

/// The capture device held by a running session.
///
/// Dropping a lease only signals the capture thread; [`CaptureLease::release`]
/// also waits for the device to close before waking [`Released`] waiters.
pub(crate) struct CaptureLease {
    guard: Option<CaptureHandle>,
    released: watch::Sender<()>,
}

impl CaptureLease {
    pub(crate) fn new(guard: Option<CaptureHandle>) -> (Self, Released) {
        let (released, rx) = watch::channel(());
        (Self { guard, released }, Released(rx))
    }

    pub(crate) async fn release(self) {
        if let Some(guard) = self.guard {
            if let Err(e) = tokio::task::spawn_blocking(move || guard.stop()).await {
                log::warn!("capture: release failed: {e}");
            }
        }
        drop(self.released);
    }
}

/// Open the default microphone without blocking the runtime.
pub(crate) async fn open_capture(
) -> Result<(CaptureHandle, mpsc::UnboundedReceiver<CaptureEvent>), SourceError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::task::spawn_blocking(move || AudioCapture::start(tx))
        .await
        .map_err(|e| SourceError::Unavailable(e.to_string()))??;
    Ok((handle, rx))
}

// ---------------------------------------------------------------------------
// TranscriptSource
// ---------------------------------------------------------------------------

/// A restartable producer of recognition sessions.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Start a session for the given BCP-47 locale tag.
    async fn start(&self, locale: &str) -> Result<ActiveRecognition, SourceError>;

    /// Live input level for the listening animation, if the source has one.
    fn levels(&self) -> Option<watch::Receiver<f32>> {
        None
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[cfg(test)]
mod fake {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Test-side end of one fake session.
    pub struct FakeSession {
        pub events: mpsc::Sender<RecognitionEvent>,
        pub stopped: oneshot::Receiver<()>,
        lease: Option<CaptureLease>,
    }

    impl FakeSession {
        /// Let go of the (pretend) microphone.
        pub async fn release_capture(&mut self) {
            if let Some(lease) = self.lease.take() {
                lease.release().await;
            }
        }

        pub async fn send(&self, event: RecognitionEvent) {
            self.events.send(event).await.unwrap();
        }

        pub async fn final_result(&self, text: &str) {
            self.send(RecognitionEvent::Result {
                text: text.into(),
                is_final: true,
            })
            .await;
        }

        /// Whether the controller has asked this session to stop.
        pub fn stop_requested(&mut self) -> bool {
            !matches!(
                self.stopped.try_recv(),
                Err(oneshot::error::TryRecvError::Empty)
            )
        }
    }

    /// Source whose sessions are driven by the test through [`FakeSession`]s.
    #[derive(Default)]
    pub struct FakeSource {
        starts: AtomicUsize,
        holds_capture: AtomicBool,
        sessions: Mutex<VecDeque<FakeSession>>,
        start_errors: Mutex<VecDeque<SourceError>>,
    }

    impl FakeSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        /// Sessions started from now on hold the microphone until
        /// [`FakeSession::release_capture`].
        pub fn hold_capture(&self) {
            self.holds_capture.store(true, Ordering::SeqCst);
        }

        /// Make the next `start` fail with `err`.
        pub fn fail_next_start(&self, err: SourceError) {
            self.start_errors.lock().unwrap().push_back(err);
        }

        /// The oldest started session not yet taken.
        pub fn take_session(&self) -> FakeSession {
            self.sessions
                .lock()
                .unwrap()
                .pop_front()
                .expect("no session was started")
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn start(&self, _locale: &str) -> Result<ActiveRecognition, SourceError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.start_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
            let (stop, stopped) = StopHandle::pair();
            let (lease, released) = CaptureLease::new(None);
            let lease = self.holds_capture.load(Ordering::SeqCst).then_some(lease);
            self.sessions.lock().unwrap().push_back(FakeSession {
                events: tx,
                stopped,
                lease,
            });
            Ok(ActiveRecognition {
                events: rx,
                stop,
                released,
            })
        }
    }

    /// Microphone that grants or refuses access on demand.
    pub struct FakeMicrophone {
        granted: AtomicBool,
        pub requests: AtomicUsize,
    }

    impl FakeMicrophone {
        pub fn granted() -> Self {
            Self {
                granted: AtomicBool::new(true),
                requests: AtomicUsize::new(0),
            }
        }

        pub fn denied() -> Self {
            Self {
                granted: AtomicBool::new(false),
                requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MicrophoneAccess for FakeMicrophone {
        async fn request(&self) -> Result<(), SourceError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.granted.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(SourceError::PermissionDenied)
            }
        }
    }

    /// Transcriber returning a canned response and recording payload sizes.
    pub struct FakeTranscriber {
        response: Mutex<Result<String, TranscribeError>>,
        delay: Option<Duration>,
        pub payloads: Mutex<Vec<usize>>,
    }

    impl FakeTranscriber {
        pub fn returning(text: &str) -> Self {
            Self {
                response: Mutex::new(Ok(text.into())),
                delay: None,
                payloads: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(err: TranscribeError) -> Self {
            Self {
                response: Mutex::new(Err(err)),
                delay: None,
                payloads: Mutex::new(Vec::new()),
            }
        }

        /// Answer only after `delay`, like a slow service.
        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, wav: Vec<u8>, _locale: &str) -> Result<String, TranscribeError> {
            self.payloads.lock().unwrap().push(wav.len());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.response.lock().unwrap().clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_round_trip_through_strings() {
        for code in [
            ErrorCode::NoSpeech,
            ErrorCode::Aborted,
            ErrorCode::Network,
            ErrorCode::AudioCapture,
            ErrorCode::NotAllowed,
            ErrorCode::Other("service-not-allowed".into()),
        ] {
            assert_eq!(ErrorCode::parse(code.as_str()), code);
        }
    }

    #[test]
    fn classification() {
        assert_eq!(ErrorCode::NoSpeech.class(), ErrorClass::Ignored);
        assert_eq!(ErrorCode::Aborted.class(), ErrorClass::Ignored);
        assert_eq!(ErrorCode::Network.class(), ErrorClass::Recoverable);
        assert_eq!(ErrorCode::AudioCapture.class(), ErrorClass::Fatal);
        assert_eq!(ErrorCode::NotAllowed.class(), ErrorClass::Fatal);
        assert_eq!(
            ErrorCode::Other("language-not-supported".into()).class(),
            ErrorClass::Surfaced
        );
    }

    #[test]
    fn start_failures_map_to_codes() {
        assert_eq!(SourceError::PermissionDenied.code(), ErrorCode::NotAllowed);
        assert_eq!(
            SourceError::Capture(CaptureError::NoDevice).code(),
            ErrorCode::AudioCapture
        );
        let denied: SourceError = CaptureError::Thread("permission denied".into()).into();
        assert!(matches!(denied, SourceError::PermissionDenied));
    }

    #[tokio::test]
    async fn dropping_stop_handle_signals_stop() {
        let (handle, mut rx) = StopHandle::pair();
        drop(handle);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn release_wakes_every_waiter() {
        let (lease, released) = CaptureLease::new(None);
        let waiter = tokio::spawn(released.clone().wait());
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        lease.release().await;
        waiter.await.unwrap();
        released.wait().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (mut handle, rx) = StopHandle::pair();
        handle.stop();
        handle.stop();
        assert!(rx.await.is_ok());
    }
}
