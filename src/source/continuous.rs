//! Continuous recognizer: listens until stopped, uploading each utterance as
//! soon as a pause closes it.
//!
//! A session mirrors a platform streaming recognizer: it reports
//! `no-speech` when nobody talks for a while, and it ends by itself after
//! [`AudioConfig::session_limit_secs`] so the controller has to restart it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

use super::{
    open_capture, ActiveRecognition, CaptureLease, ErrorCode, RecognitionEvent, SourceError,
    StopHandle, TranscribeError, TranscriptSource, Transcriber, EVENT_CAPACITY,
};
use crate::audio::{
    encode_wav, normalize_chunk, CaptureEvent, CaptureHandle, LevelMeter, SegmentEvent,
    UtteranceSegmenter,
};
use crate::config::AudioConfig;

pub struct ContinuousSource {
    audio: AudioConfig,
    transcriber: Arc<dyn Transcriber>,
    levels: Arc<watch::Sender<f32>>,
}

impl ContinuousSource {
    pub fn new(audio: AudioConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        let (levels, _) = watch::channel(0.0);
        Self {
            audio,
            transcriber,
            levels: Arc::new(levels),
        }
    }

    /// Run a session over an already-open capture stream.  `guard` is
    /// stopped when the session ends, before [`RecognitionEvent::Ended`].
    fn spawn_session(
        &self,
        locale: &str,
        capture: mpsc::UnboundedReceiver<CaptureEvent>,
        guard: Option<CaptureHandle>,
    ) -> ActiveRecognition {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let (stop, stop_rx) = StopHandle::pair();
        let (lease, released) = CaptureLease::new(guard);

        let session = Session {
            segmenter: UtteranceSegmenter::new(
                self.audio.vad_threshold,
                self.audio.sample_rate,
                self.audio.silence_ms,
                self.audio.min_utterance_ms,
                self.audio.max_utterance_secs,
            ),
            meter: LevelMeter::attached(self.levels.clone()),
            audio: self.audio.clone(),
            transcriber: self.transcriber.clone(),
            locale: locale.to_string(),
            events: tx,
        };
        tokio::spawn(session.run(capture, stop_rx, lease));

        ActiveRecognition {
            events: rx,
            stop,
            released,
        }
    }
}

#[async_trait]
impl TranscriptSource for ContinuousSource {
    async fn start(&self, locale: &str) -> Result<ActiveRecognition, SourceError> {
        let (handle, capture) = open_capture().await?;
        log::info!("continuous: session started ({locale})");
        Ok(self.spawn_session(locale, capture, Some(handle)))
    }

    fn levels(&self) -> Option<watch::Receiver<f32>> {
        Some(self.levels.subscribe())
    }
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

struct Session {
    audio: AudioConfig,
    transcriber: Arc<dyn Transcriber>,
    locale: String,
    segmenter: UtteranceSegmenter,
    meter: LevelMeter,
    events: mpsc::Sender<RecognitionEvent>,
}

impl Session {
    async fn run(
        mut self,
        mut capture: mpsc::UnboundedReceiver<CaptureEvent>,
        mut stop: oneshot::Receiver<()>,
        lease: CaptureLease,
    ) {
        if self.events.send(RecognitionEvent::Ready).await.is_ok() {
            self.listen(&mut capture, &mut stop).await;
        }

        drop(capture);
        lease.release().await;
        self.meter.reset();
        let _ = self.events.send(RecognitionEvent::Ended).await;
    }

    async fn listen(
        &mut self,
        capture: &mut mpsc::UnboundedReceiver<CaptureEvent>,
        stop: &mut oneshot::Receiver<()>,
    ) {
        let no_speech = tokio::time::sleep(Duration::from_secs(self.audio.no_speech_timeout_secs));
        let limit = tokio::time::sleep(Duration::from_secs(self.audio.session_limit_secs));
        tokio::pin!(no_speech, limit);
        let mut heard_speech = false;

        loop {
            tokio::select! {
                _ = &mut *stop => {
                    log::debug!("continuous: stop requested");
                    break;
                }
                _ = &mut limit => {
                    log::debug!("continuous: session limit reached");
                    break;
                }
                _ = &mut no_speech, if !heard_speech => {
                    let _ = self.events.send(RecognitionEvent::Error(ErrorCode::NoSpeech)).await;
                    break;
                }
                event = capture.recv() => match event {
                    Some(CaptureEvent::Chunk(chunk)) => {
                        let mono = normalize_chunk(&chunk, self.audio.sample_rate);
                        self.meter.push(&mono);
                        let segments = self.segmenter.push(&mono);
                        if segments.iter().any(|s| *s == SegmentEvent::SpeechStarted) {
                            heard_speech = true;
                        }
                        if !self.handle_segments(segments, stop).await {
                            break;
                        }
                    }
                    Some(CaptureEvent::Failed(reason)) => {
                        log::warn!("continuous: capture failed: {reason}");
                        let _ = self.events.send(RecognitionEvent::Error(ErrorCode::AudioCapture)).await;
                        break;
                    }
                    None => {
                        let _ = self.events.send(RecognitionEvent::Error(ErrorCode::AudioCapture)).await;
                        break;
                    }
                },
            }
        }
    }

    /// Upload finished utterances.  Returns `false` when the session must end,
    /// including when a stop arrives mid-upload.
    async fn handle_segments(
        &mut self,
        segments: Vec<SegmentEvent>,
        stop: &mut oneshot::Receiver<()>,
    ) -> bool {
        for segment in segments {
            let SegmentEvent::Utterance(samples) = segment else {
                continue;
            };
            let outcome = tokio::select! {
                _ = &mut *stop => {
                    log::debug!("continuous: stop requested during transcription");
                    return false;
                }
                outcome = self.transcribe(&samples) => outcome,
            };
            match outcome {
                Ok(text) if text.trim().is_empty() => {}
                Ok(text) => {
                    let result = RecognitionEvent::Result {
                        text,
                        is_final: true,
                    };
                    if self.events.send(result).await.is_err() {
                        return false;
                    }
                }
                Err(e) => {
                    log::warn!("continuous: transcription failed: {e}");
                    let _ = self.events.send(RecognitionEvent::Error(e.code())).await;
                    return false;
                }
            }
        }
        true
    }

    async fn transcribe(&self, samples: &[f32]) -> Result<String, TranscribeError> {
        let wav = encode_wav(samples, self.audio.sample_rate)?;
        self.transcriber.transcribe(wav, &self.locale).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
