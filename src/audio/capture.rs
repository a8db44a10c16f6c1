//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin streaming [`CaptureEvent`]s over a tokio
//! channel.  `cpal::Stream` is not `Send`, so the stream is built on and owned
//! by a dedicated `audio-capture` thread; the returned [`CaptureHandle`] is a
//! RAII guard. Dropping it tells that thread to drop the stream, which
//! releases the device.

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// AudioChunk / CaptureEvent
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

/// What the capture thread reports.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Chunk(AudioChunk),
    /// The stream failed after it started (device unplugged, driver error).
    Failed(String),
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("capture thread failed: {0}")]
    Thread(String),
}

impl CaptureError {
    /// The OS refused access to the device rather than the device missing or
    /// misbehaving.
    pub fn is_permission_denied(&self) -> bool {
        let text = self.to_string().to_lowercase();
        text.contains("permission") || text.contains("not allowed") || text.contains("denied")
    }
}

// ---------------------------------------------------------------------------
// CaptureHandle
// ---------------------------------------------------------------------------

/// RAII guard for a running capture.
///
/// Dropping it stops the stream; [`CaptureHandle::stop`] does the same and
/// also waits for the capture thread to exit.
pub struct CaptureHandle {
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Stop the stream and wait until the device is released.  Blocks; call
    /// it from `spawn_blocking` inside the runtime.
    pub fn stop(mut self) {
        self.signal_stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn signal_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// ```rust,no_run
/// use tokio::sync::mpsc;
/// use voice_player::audio::AudioCapture;
///
/// let (tx, _rx) = mpsc::unbounded_channel();
/// let handle = AudioCapture::start(tx).unwrap();
/// // `handle` keeps the stream alive; drop it to stop recording.
/// handle.stop();
/// ```
pub struct AudioCapture;

impl AudioCapture {
    /// Check that a default input device exists and reports a usable config.
    ///
    /// This is the closest cpal offers to a permission prompt: on platforms
    /// that gate the microphone the query fails when access is refused.
    pub fn probe() -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
        device.default_input_config()?;
        Ok(())
    }

    /// Start recording from the default input device and send
    /// [`CaptureEvent`]s to `tx`.
    ///
    /// Blocks only until the stream is playing (or failed to start).  Send
    /// errors (receiver dropped) are ignored so the audio thread never panics.
    pub fn start(tx: mpsc::UnboundedSender<CaptureEvent>) -> Result<CaptureHandle, CaptureError> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(u32, u16), CaptureError>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let stream = match build_stream(tx) {
                    Ok((stream, rate, channels)) => {
                        let _ = ready_tx.send(Ok((rate, channels)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Park until the handle is stopped or dropped.
                let _ = stop_rx.recv();
                drop(stream);
                log::debug!("capture: stream released");
            })
            .map_err(|e| CaptureError::Thread(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok((sample_rate, channels))) => {
                log::info!("capture: started ({sample_rate} Hz, {channels} ch)");
                Ok(CaptureHandle {
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(CaptureError::Thread("capture thread exited early".into())),
        }
    }
}

fn build_stream(
    tx: mpsc::UnboundedSender<CaptureEvent>,
) -> Result<(cpal::Stream, u32, u16), CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

    let supported = device.default_input_config()?;
    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_input::<f32>(&device, &config, tx)?,
        cpal::SampleFormat::I16 => build_input::<i16>(&device, &config, tx)?,
        cpal::SampleFormat::U16 => build_input::<u16>(&device, &config, tx)?,
        other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
    };

    stream.play()?;
    Ok((stream, sample_rate, channels))
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: mpsc::UnboundedSender<CaptureEvent>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let err_tx = tx.clone();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let chunk = AudioChunk {
                samples: to_f32(data),
                sample_rate,
                channels,
            };
            let _ = tx.send(CaptureEvent::Chunk(chunk));
        },
        move |err: cpal::StreamError| {
            log::error!("capture: cpal stream error: {err}");
            let _ = err_tx.send(CaptureEvent::Failed(err.to_string()));
        },
        None,
    )?;
    Ok(stream)
}

/// Convert device samples of any supported format to `f32` in `[-1.0, 1.0]`.
fn to_f32<T>(data: &[T]) -> Vec<f32>
where
    T: Sample,
    f32: FromSample<T>,
{
    data.iter().map(|&s| s.to_sample::<f32>()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
