//! Record-and-upload recognizer for one-shot commands.
//!
//! Audio is buffered until the session is stopped (or hits the session
//! limit).  The microphone is then released, silence is trimmed, and the
//! remaining audio is posted to the transcriber as one WAV file.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

use super::{
    open_capture, ActiveRecognition, CaptureLease, ErrorCode, RecognitionEvent, SourceError,
    StopHandle, TranscribeError, TranscriptSource, Transcriber, EVENT_CAPACITY,
};
use crate::audio::{encode_wav, normalize_chunk, CaptureEvent, CaptureHandle, LevelMeter, VadDetector};
use crate::config::AudioConfig;

pub struct UploadSource {
    audio: AudioConfig,
    transcriber: Arc<dyn Transcriber>,
    levels: Arc<watch::Sender<f32>>,
}

impl UploadSource {
    pub fn new(audio: AudioConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        let (levels, _) = watch::channel(0.0);
        Self {
            audio,
            transcriber,
            levels: Arc::new(levels),
        }
    }

    fn spawn_session(
        &self,
        locale: &str,
        capture: mpsc::UnboundedReceiver<CaptureEvent>,
        guard: Option<CaptureHandle>,
    ) -> ActiveRecognition {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let (stop, stop_rx) = StopHandle::pair();
        let (lease, released) = CaptureLease::new(guard);

        let recording = Recording {
            audio: self.audio.clone(),
            transcriber: self.transcriber.clone(),
            locale: locale.to_string(),
            meter: LevelMeter::attached(self.levels.clone()),
            events: tx,
        };
        tokio::spawn(recording.run(capture, stop_rx, lease));

        ActiveRecognition {
            events: rx,
            stop,
            released,
        }
    }
}

#[async_trait]
impl TranscriptSource for UploadSource {
    async fn start(&self, locale: &str) -> Result<ActiveRecognition, SourceError> {
        let (handle, capture) = open_capture().await?;
        log::info!("upload: recording started ({locale})");
        Ok(self.spawn_session(locale, capture, Some(handle)))
    }

    fn levels(&self) -> Option<watch::Receiver<f32>> {
        Some(self.levels.subscribe())
    }
}

// ---------------------------------------------------------------------------
// Recording task
// ---------------------------------------------------------------------------

struct Recording {
    audio: AudioConfig,
    transcriber: Arc<dyn Transcriber>,
    locale: String,
    meter: LevelMeter,
    events: mpsc::Sender<RecognitionEvent>,
}

impl Recording {
    async fn run(
        mut self,
        mut capture: mpsc::UnboundedReceiver<CaptureEvent>,
        mut stop: oneshot::Receiver<()>,
        lease: CaptureLease,
    ) {
        if self.events.send(RecognitionEvent::Ready).await.is_err() {
            lease.release().await;
            return;
        }

        let limit = tokio::time::sleep(Duration::from_secs(self.audio.session_limit_secs));
        tokio::pin!(limit);
        let mut buffer: Vec<f32> = Vec::new();

        let captured = loop {
            tokio::select! {
                _ = &mut stop => break true,
                _ = &mut limit => {
                    log::debug!("upload: recording limit reached");
                    break true;
                }
                event = capture.recv() => match event {
                    Some(CaptureEvent::Chunk(chunk)) => {
                        let mono = normalize_chunk(&chunk, self.audio.sample_rate);
                        self.meter.push(&mono);
                        buffer.extend_from_slice(&mono);
                    }
                    Some(CaptureEvent::Failed(reason)) => {
                        log::warn!("upload: capture failed: {reason}");
                        break false;
                    }
                    None => break false,
                },
            }
        };

        // Keep whatever the device delivered before the stop.
        if captured {
            while let Ok(event) = capture.try_recv() {
                if let CaptureEvent::Chunk(chunk) = event {
                    buffer.extend(normalize_chunk(&chunk, self.audio.sample_rate));
                }
            }
        }

        // Release the microphone before the upload.
        drop(capture);
        lease.release().await;
        self.meter.reset();

        if captured {
            let outcome = self.finish(&buffer).await;
            let _ = self.events.send(outcome).await;
        } else {
            let _ = self
                .events
                .send(RecognitionEvent::Error(ErrorCode::AudioCapture))
                .await;
        }
        let _ = self.events.send(RecognitionEvent::Ended).await;
    }

    /// Transcribe the recording; returns the final result or error event.
    async fn finish(&self, buffer: &[f32]) -> RecognitionEvent {
        let _ = self.events.send(RecognitionEvent::Processing).await;

        let vad = VadDetector::with_frame_size(
            self.audio.vad_threshold,
            (self.audio.sample_rate as usize * 30 / 1000).max(1),
        );
        let speech = vad.trim_silence(buffer);
        if speech.is_empty() {
            log::debug!("upload: recording was silent");
            return RecognitionEvent::Error(ErrorCode::NoSpeech);
        }
        log::info!(
            "upload: transcribing {:.2}s of audio",
            speech.len() as f32 / self.audio.sample_rate as f32
        );

        match self.upload(speech).await {
            Ok(text) if text.trim().is_empty() => RecognitionEvent::Error(ErrorCode::NoSpeech),
            Ok(text) => RecognitionEvent::Result {
                text,
                is_final: true,
            },
            Err(e) => {
                log::warn!("upload: transcription failed: {e}");
                RecognitionEvent::Error(e.code())
            }
        }
    }

    async fn upload(&self, speech: &[f32]) -> Result<String, TranscribeError> {
        let wav = encode_wav(speech, self.audio.sample_rate)?;
        self.transcriber.transcribe(wav, &self.locale).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use crate::source::{FakeTranscriber, TranscribeError};

    fn chunk(value: f32, len: usize) -> CaptureEvent {
        CaptureEvent::Chunk(AudioChunk {
            samples: vec![value; len],
            sample_rate: 16_000,
            channels: 1,
        })
    }

    async fn collect(mut active: ActiveRecognition) -> Vec<RecognitionEvent> {
        let mut events = Vec::new();
        while let Some(event) = active.events.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn stop_uploads_trimmed_audio() {
        let transcriber = Arc::new(FakeTranscriber::returning("音量調高"));
        let source = UploadSource::new(AudioConfig::default(), transcriber.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut active = source.spawn_session("zh-TW", rx, None);
        assert_eq!(active.events.recv().await, Some(RecognitionEvent::Ready));

        tx.send(chunk(0.0, 4_800)).unwrap();
        tx.send(chunk(0.5, 4_800)).unwrap();
        tx.send(chunk(0.0, 4_800)).unwrap();
        active.stop.stop();

        let events = collect(active).await;
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Processing,
                RecognitionEvent::Result {
                    text: "音量調高".into(),
                    is_final: true
                },
                RecognitionEvent::Ended,
            ]
        );
        // Only the voiced 300 ms is uploaded: 44-byte header + 4800 × 2 bytes.
        assert_eq!(*transcriber.payloads.lock().unwrap(), vec![44 + 4_800 * 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn microphone_is_released_before_the_upload() {
        let slow = FakeTranscriber::returning("play").delayed(Duration::from_secs(15));
        let source = UploadSource::new(AudioConfig::default(), Arc::new(slow));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut active = source.spawn_session("en-US", rx, None);
        assert_eq!(active.events.recv().await, Some(RecognitionEvent::Ready));
        tx.send(chunk(0.5, 4_800)).unwrap();

        let started = tokio::time::Instant::now();
        active.stop.stop();
        active.released.clone().wait().await;
        assert!(tx.is_closed());
        assert!(started.elapsed() < Duration::from_secs(1));

        let events = collect(active).await;
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Processing,
                RecognitionEvent::Result {
                    text: "play".into(),
                    is_final: true
                },
                RecognitionEvent::Ended,
            ]
        );
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test]
    async fn silent_recording_reports_no_speech_without_upload() {
        let transcriber = Arc::new(FakeTranscriber::returning("unused"));
        let source = UploadSource::new(AudioConfig::default(), transcriber.clone());
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut active = source.spawn_session("en-US", rx, None);
        assert_eq!(active.events.recv().await, Some(RecognitionEvent::Ready));
        active.stop.stop();

        let events = collect(active).await;
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Processing,
                RecognitionEvent::Error(ErrorCode::NoSpeech),
                RecognitionEvent::Ended,
            ]
        );
        assert!(transcriber.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn service_error_is_reported() {
        let transcriber = Arc::new(FakeTranscriber::failing(TranscribeError::Status(500)));
        let source = UploadSource::new(AudioConfig::default(), transcriber);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut active = source.spawn_session("en-US", rx, None);
        assert_eq!(active.events.recv().await, Some(RecognitionEvent::Ready));
        tx.send(chunk(0.5, 4_800)).unwrap();
        active.stop.stop();

        let events = collect(active).await;
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Processing,
                RecognitionEvent::Error(ErrorCode::Other("transcription-failed".into())),
                RecognitionEvent::Ended,
            ]
        );
    }

    #[tokio::test]
    async fn capture_failure_skips_upload() {
        let transcriber = Arc::new(FakeTranscriber::returning("unused"));
        let source = UploadSource::new(AudioConfig::default(), transcriber.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let active = source.spawn_session("en-US", rx, None);
        tx.send(CaptureEvent::Failed("device lost".into())).unwrap();

        let events = collect(active).await;
        assert_eq!(
            events,
            vec![
                RecognitionEvent::Ready,
                RecognitionEvent::Error(ErrorCode::AudioCapture),
                RecognitionEvent::Ended,
            ]
        );
        assert!(transcriber.payloads.lock().unwrap().is_empty());
    }
}
