//! Audio plumbing for the speech sources: microphone capture → downmix /
//! resample → utterance segmentation → WAV payload, plus the level meter that
//! drives the listening animation.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → CaptureEvent (tokio mpsc) → normalize_chunk
//!           → UtteranceSegmenter → encode_wav → transcription upload
//!                             ↘ LevelMeter → watch<f32>
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use voice_player::audio::{AudioCapture, CaptureEvent};
//!
//! # async fn run() {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let _handle = AudioCapture::start(tx).unwrap(); // drop handle → stops stream
//!
//! while let Some(CaptureEvent::Chunk(chunk)) = rx.recv().await {
//!     println!("received {} samples @ {}Hz", chunk.samples.len(), chunk.sample_rate);
//! }
//! # }
//! ```

pub mod capture;
pub mod level;
pub mod resample;
pub mod vad;
pub mod wav;

pub use capture::{AudioCapture, AudioChunk, CaptureError, CaptureEvent, CaptureHandle};
pub use level::LevelMeter;
pub use resample::{downmix, normalize_chunk, resample};
pub use vad::{rms, SegmentEvent, UtteranceSegmenter, VadDetector};
pub use wav::encode_wav;
