//! The session controller.
//!
//! # Persistent mode
//!
//! A driver task loops over recognition sessions.  When a session ends by
//! itself it is restarted after [`VoiceConfig::restart_delay`]; after a
//! `network` error, after [`VoiceConfig::network_retry`].  Fatal errors end
//! the mode.  Every start bumps a generation counter and explicit stops abort
//! the driver, so a restart timer that outlives its mode is a no-op.
//!
//! # One-shot mode
//!
//! A pump task forwards one session's events into the state.  Stopping asks
//! the source to close capture and then waits for the pump, which covers the
//! upload and the final transcript.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;

use super::state::{RecognitionMode, SessionState, SessionStatus, Transcript};
use super::SessionError;
use crate::commands::{normalize, ActionId, CommandResolver, CustomOverrides};
use crate::config::VoiceConfig;
use crate::dispatch::{CommandDispatcher, Feedback, PlayerControls};
use crate::source::{
    ActiveRecognition, ErrorClass, ErrorCode, MicrophoneAccess, RecognitionEvent, Released,
    TranscriptSource,
};
use crate::store::KeyValueStore;

/// Transcripts buffered for slow [`SessionController::transcripts`] readers.
const TRANSCRIPT_BACKLOG: usize = 16;

/// Everything the controller talks to.
pub struct Collaborators {
    /// Source for hands-free listening.
    pub persistent: Arc<dyn TranscriptSource>,
    /// Source for push-to-talk recording.
    pub one_shot: Arc<dyn TranscriptSource>,
    pub microphone: Arc<dyn MicrophoneAccess>,
    pub store: Arc<dyn KeyValueStore>,
    pub feedback: Arc<dyn Feedback>,
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Owns the recognition lifecycle and the observable [`SessionState`].
///
/// Cheap to clone; clones share one controller.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<SessionState>,
    transcripts: broadcast::Sender<Transcript>,
    parts: Collaborators,
    config: VoiceConfig,
    resolver: CommandResolver,
    overrides: Mutex<CustomOverrides>,
    dispatcher: Mutex<CommandDispatcher>,
    generation: AtomicU64,
    next_transcript: AtomicU64,
    driver: Mutex<Option<JoinHandle<()>>>,
    /// Release signal of the latest persistent session.
    capture: Mutex<Option<Released>>,
    recording: Mutex<Option<OneShot>>,
}

/// A running one-shot session.
struct OneShot {
    stop: oneshot::Sender<()>,
    pump: JoinHandle<()>,
}

/// How a persistent session ended.
enum SessionEnd {
    /// Ended on its own; restart after the short delay.
    Restart,
    /// Recoverable failure; restart after the retry delay.
    Retry,
    /// Persistent mode is over.
    Finished,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionController {
    /// Build a controller.  Custom overrides are loaded from the store once,
    /// here; a store that cannot be read starts with none.
    pub fn new(config: VoiceConfig, parts: Collaborators) -> Self {
        let overrides = CustomOverrides::load(parts.store.as_ref()).unwrap_or_else(|e| {
            log::warn!("session: could not load custom commands: {e}");
            CustomOverrides::default()
        });
        let resolver = CommandResolver::for_locale_tag(&config.locale, config.restrict_to_locale);
        let (state, _) = watch::channel(SessionState::default());
        let (transcripts, _) = broadcast::channel(TRANSCRIPT_BACKLOG);

        Self {
            inner: Arc::new(Inner {
                state,
                transcripts,
                parts,
                config,
                resolver,
                overrides: Mutex::new(overrides),
                dispatcher: Mutex::new(CommandDispatcher::new()),
                generation: AtomicU64::new(0),
                next_transcript: AtomicU64::new(1),
                driver: Mutex::new(None),
                capture: Mutex::new(None),
                recording: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Every accepted transcript, in order.
    ///
    /// `last_command` in the state only shows the newest one; a reader that
    /// must act on each transcript subscribes here instead.
    pub fn transcripts(&self) -> broadcast::Receiver<Transcript> {
        self.inner.transcripts.subscribe()
    }

    /// Input level of the given mode's source, for the listening animation.
    pub fn levels(&self, mode: RecognitionMode) -> Option<watch::Receiver<f32>> {
        match mode {
            RecognitionMode::Persistent => self.inner.parts.persistent.levels(),
            RecognitionMode::OneShot => self.inner.parts.one_shot.levels(),
        }
    }

    // -- persistent mode ----------------------------------------------------

    /// Stop persistent listening if it is on, start it otherwise.
    pub async fn toggle_persistent_mode(&self) -> Result<(), SessionError> {
        if self.inner.state.borrow().is_persistent_mode {
            self.stop_persistent().await;
            Ok(())
        } else {
            self.start_persistent().await
        }
    }

    /// Check microphone access, then start listening hands-free.
    pub async fn start_persistent(&self) -> Result<(), SessionError> {
        {
            let state = self.inner.state.borrow();
            if state.is_persistent_mode {
                return Ok(());
            }
            if state.is_recording || state.is_processing {
                return Err(SessionError::Busy);
            }
        }

        if let Err(e) = self.inner.parts.microphone.request().await {
            log::warn!("session: microphone unavailable: {e}");
            let message = e.code().message();
            self.inner.state.send_modify(|s| {
                s.status = SessionStatus::Error;
                s.error = Some(message);
            });
            return Err(SessionError::Microphone(e));
        }

        let mut refused = None;
        let started = self.inner.state.send_if_modified(|s| {
            if s.is_persistent_mode {
                return false;
            }
            if s.is_recording || s.is_processing {
                refused = Some(SessionError::Busy);
                return false;
            }
            s.is_persistent_mode = true;
            s.is_listening = false;
            s.status = SessionStatus::Starting;
            s.error = None;
            true
        });
        if let Some(e) = refused {
            return Err(e);
        }
        if !started {
            return Ok(());
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_driver().await;
        let driver = tokio::spawn(run_persistent(self.inner.clone(), generation));
        *lock(&self.inner.driver) = Some(driver);
        log::info!("session: persistent listening on ({})", self.inner.config.locale);
        Ok(())
    }

    /// Stop persistent listening.  Pending restarts are cancelled and the
    /// microphone is released before this returns.
    pub async fn stop_persistent(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_driver().await;

        let changed = self.inner.state.send_if_modified(|s| {
            if !s.is_persistent_mode && !s.is_listening {
                return false;
            }
            s.is_persistent_mode = false;
            s.is_listening = false;
            s.status = SessionStatus::Idle;
            true
        });
        if changed {
            log::info!("session: persistent listening off");
        }
    }

    async fn abort_driver(&self) {
        let driver = lock(&self.inner.driver).take();
        if let Some(driver) = driver {
            driver.abort();
            let _ = driver.await;
        }
        // The aborted driver dropped its session, which is now closing the
        // device on its own task.
        let released = lock(&self.inner.capture).take();
        if let Some(released) = released {
            released.wait().await;
        }
    }

    // -- one-shot mode ------------------------------------------------------

    /// Start recording when idle, stop when recording.  Refused while
    /// persistent mode is on.
    pub async fn toggle_recording(&self) -> Result<(), SessionError> {
        let (persistent, recording) = {
            let s = self.inner.state.borrow();
            (s.is_persistent_mode, s.is_recording)
        };
        if persistent {
            log::debug!("session: recording refused while persistent mode is on");
            return Err(SessionError::PersistentModeActive);
        }
        if recording {
            self.stop_recording().await;
            Ok(())
        } else {
            self.start_recording().await
        }
    }

    pub async fn start_recording(&self) -> Result<(), SessionError> {
        let mut refused = None;
        let started = self.inner.state.send_if_modified(|s| {
            if s.is_persistent_mode {
                refused = Some(SessionError::PersistentModeActive);
                return false;
            }
            if s.is_recording {
                return false;
            }
            if s.is_processing {
                refused = Some(SessionError::Busy);
                return false;
            }
            s.is_recording = true;
            s.status = SessionStatus::Starting;
            s.error = None;
            true
        });
        if let Some(e) = refused {
            return Err(e);
        }
        if !started {
            return Ok(());
        }

        // A previous session that finished by itself.
        let stale = lock(&self.inner.recording).take();
        if let Some(stale) = stale {
            drop(stale.stop);
            let _ = stale.pump.await;
        }

        match self.inner.parts.one_shot.start(&self.inner.config.locale).await {
            Ok(active) => {
                let (stop, stop_rx) = oneshot::channel();
                let pump = tokio::spawn(run_one_shot(self.inner.clone(), active, stop_rx));
                *lock(&self.inner.recording) = Some(OneShot { stop, pump });
                log::info!("session: recording");
                Ok(())
            }
            Err(e) => {
                log::warn!("session: recording failed to start: {e}");
                let message = e.code().message();
                self.inner.state.send_modify(|s| {
                    s.is_recording = false;
                    s.status = SessionStatus::Error;
                    s.error = Some(message);
                });
                Err(SessionError::Start(e))
            }
        }
    }

    /// Stop recording and wait for the transcript (or its failure).
    ///
    /// With no session active this only clears `is_processing`.
    pub async fn stop_recording(&self) {
        let session = lock(&self.inner.recording).take();
        match session {
            Some(OneShot { stop, pump }) => {
                let _ = stop.send(());
                let _ = pump.await;
            }
            None => {
                self.inner.state.send_if_modified(|s| {
                    let was = s.is_processing;
                    s.is_processing = false;
                    was
                });
            }
        }
    }

    /// Stop whatever is running.  A no-op on an idle controller.
    pub async fn stop(&self) {
        self.stop_persistent().await;
        let recording = self.inner.state.borrow().is_recording;
        if recording || lock(&self.inner.recording).is_some() {
            self.stop_recording().await;
        }
    }

    // -- commands -----------------------------------------------------------

    /// Resolve `text` and dispatch the action to `controls`.
    ///
    /// Returns `true` only when an action matched and the player call
    /// succeeded.  Neither outcome touches the error field.
    pub fn process_voice_command(&self, text: &str, controls: &dyn PlayerControls) -> bool {
        let text = normalize(text);
        if text.is_empty() {
            return false;
        }

        let marked = self.inner.state.send_if_modified(|s| {
            let was = s.is_processing;
            s.is_processing = true;
            !was
        });

        let action = {
            let overrides = lock(&self.inner.overrides);
            self.inner.resolver.resolve(&text, &overrides)
        };
        let ok = match action {
            None => {
                log::info!("session: no command matches {text:?}");
                false
            }
            Some(action) => match lock(&self.inner.dispatcher).dispatch(action, controls) {
                Ok(()) => {
                    log::info!("session: {text:?} -> {action}");
                    true
                }
                Err(e) => {
                    log::warn!("session: {action} failed: {e}");
                    false
                }
            },
        };

        if ok {
            self.inner.parts.feedback.success();
        } else {
            self.inner.parts.feedback.failure();
        }
        if marked {
            self.inner.state.send_modify(|s| s.is_processing = false);
        }
        ok
    }

    /// Set (or, with an empty phrase, remove) the custom phrase for `action`
    /// and persist the whole override table.
    pub fn save_custom_command(&self, action: ActionId, phrase: &str) -> Result<(), SessionError> {
        let mut overrides = lock(&self.inner.overrides);
        let mut updated = overrides.clone();
        updated.set(action, phrase);
        updated.save(self.inner.parts.store.as_ref())?;
        *overrides = updated;
        log::info!("session: custom phrase for {action} saved");
        Ok(())
    }

    pub fn custom_commands(&self) -> CustomOverrides {
        lock(&self.inner.overrides).clone()
    }

    /// Clear `last_command` if it is still transcript `id`.
    pub fn clear_last_command(&self, id: u64) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.last_command.as_ref().is_some_and(|t| t.id == id) {
                s.last_command = None;
                true
            } else {
                false
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Inner helpers
// ---------------------------------------------------------------------------

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn transcript(&self, text: &str) -> Option<Transcript> {
        let id = self.next_transcript.fetch_add(1, Ordering::SeqCst);
        let transcript = Transcript::new(id, text);
        (!transcript.text.is_empty()).then_some(transcript)
    }

    fn publish(&self, transcript: Transcript) {
        // No subscribers is fine.
        let _ = self.transcripts.send(transcript);
    }

    fn fail_persistent(&self, code: &ErrorCode) {
        log::error!("session: persistent listening stopped: {code}");
        let message = code.message();
        self.state.send_modify(|s| {
            s.is_persistent_mode = false;
            s.is_listening = false;
            s.status = SessionStatus::Error;
            s.error = Some(message);
        });
    }
}

// ---------------------------------------------------------------------------
// Persistent driver
// ---------------------------------------------------------------------------

async fn run_persistent(inner: Arc<Inner>, generation: u64) {
    loop {
        if !inner.is_current(generation) {
            return;
        }
        inner.state.send_modify(|s| s.status = SessionStatus::Starting);

        let active = match inner.parts.persistent.start(&inner.config.locale).await {
            Ok(active) => active,
            Err(e) => {
                log::warn!("session: recognizer failed to start: {e}");
                inner.fail_persistent(&e.code());
                return;
            }
        };

        let released = active.released.clone();
        *lock(&inner.capture) = Some(released.clone());
        let end = pump_persistent(&inner, generation, active).await;
        released.wait().await;

        let delay = match end {
            SessionEnd::Restart => inner.config.restart_delay(),
            SessionEnd::Retry => inner.config.network_retry(),
            SessionEnd::Finished => return,
        };
        log::debug!("session: restarting in {delay:?}");
        tokio::time::sleep(delay).await;
    }
}

/// Forward one persistent session's events into the state.  The session is
/// dropped, which asks it to release its capture, when this returns.
async fn pump_persistent(inner: &Inner, generation: u64, mut active: ActiveRecognition) -> SessionEnd {
    let mut end = SessionEnd::Restart;

    while let Some(event) = active.events.recv().await {
        if !inner.is_current(generation) {
            return SessionEnd::Finished;
        }
        match event {
            RecognitionEvent::Ready => inner.state.send_modify(|s| {
                s.is_listening = true;
                s.status = SessionStatus::Listening;
                s.error = None;
            }),
            RecognitionEvent::Result {
                text,
                is_final: true,
            } => accept_persistent(inner, &text),
            RecognitionEvent::Result { .. } | RecognitionEvent::Processing => {}
            RecognitionEvent::Error(code) => match code.class() {
                ErrorClass::Ignored => log::debug!("session: ignoring {code}"),
                ErrorClass::Recoverable => {
                    log::warn!("session: {code}; retrying");
                    end = SessionEnd::Retry;
                    break;
                }
                ErrorClass::Fatal => {
                    inner.fail_persistent(&code);
                    return SessionEnd::Finished;
                }
                ErrorClass::Surfaced => {
                    log::warn!("session: recognizer error: {code}");
                    let message = code.message();
                    inner.state.send_modify(|s| {
                        s.is_listening = false;
                        s.error = Some(message);
                    });
                }
            },
            RecognitionEvent::Ended => break,
        }
    }

    inner.state.send_modify(|s| {
        s.is_listening = false;
        s.status = SessionStatus::Starting;
    });
    end
}

fn accept_persistent(inner: &Inner, text: &str) {
    let Some(transcript) = inner.transcript(text) else {
        return;
    };
    let accepted = inner.state.send_if_modified(|s| {
        if s.is_processing {
            log::debug!("session: dropping {:?} while a command is processing", transcript.text);
            return false;
        }
        log::debug!("session: heard {:?}", transcript.text);
        s.last_command = Some(transcript.clone());
        true
    });
    if accepted {
        inner.publish(transcript);
    }
}

// ---------------------------------------------------------------------------
// One-shot pump
// ---------------------------------------------------------------------------

async fn run_one_shot(
    inner: Arc<Inner>,
    mut active: ActiveRecognition,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut stop_requested = false;

    loop {
        let event = tokio::select! {
            _ = &mut stop_rx, if !stop_requested => {
                stop_requested = true;
                active.stop.stop();
                inner.state.send_modify(|s| {
                    if s.is_recording {
                        s.status = SessionStatus::Stopping;
                    }
                });
                continue;
            }
            event = active.events.recv() => event,
        };
        let Some(event) = event else {
            break;
        };

        match event {
            RecognitionEvent::Ready => inner.state.send_modify(|s| {
                s.status = SessionStatus::Listening;
            }),
            RecognitionEvent::Result {
                text,
                is_final: true,
            } => {
                let transcript = inner.transcript(&text);
                inner.state.send_modify(|s| {
                    if let Some(transcript) = &transcript {
                        log::debug!("session: heard {:?}", transcript.text);
                        s.last_command = Some(transcript.clone());
                    }
                    s.is_recording = false;
                    s.is_processing = false;
                    s.status = SessionStatus::Idle;
                });
                if let Some(transcript) = transcript {
                    inner.publish(transcript);
                }
                active.stop.stop();
            }
            RecognitionEvent::Result { .. } => {}
            RecognitionEvent::Processing => inner.state.send_modify(|s| {
                s.is_recording = false;
                s.is_processing = true;
                s.status = SessionStatus::Processing;
            }),
            RecognitionEvent::Error(code) => match code.class() {
                ErrorClass::Ignored => log::debug!("session: ignoring {code}"),
                _ => {
                    log::warn!("session: recording failed: {code}");
                    let message = code.message();
                    inner.state.send_modify(|s| {
                        s.is_recording = false;
                        s.is_processing = false;
                        s.status = SessionStatus::Error;
                        s.error = Some(message);
                    });
                }
            },
            RecognitionEvent::Ended => break,
        }
    }

    let released = active.released.clone();
    drop(active);
    released.wait().await;

    inner.state.send_if_modified(|s| {
        let changed = s.is_recording
            || s.is_processing
            || !matches!(s.status, SessionStatus::Idle | SessionStatus::Error);
        s.is_recording = false;
        s.is_processing = false;
        if s.status != SessionStatus::Error {
            s.status = SessionStatus::Idle;
        }
        changed
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
