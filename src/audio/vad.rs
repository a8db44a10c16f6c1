//! Energy-based voice activity detection.
//!
//! [`VadDetector`] classifies fixed-size frames by RMS amplitude and trims
//! silence from a finished recording.  [`UtteranceSegmenter`] applies the
//! same classification incrementally to a live stream and cuts it into
//! utterances at pauses, which is how the continuous recognizer decides
//! what to upload.

/// Frame length used at 16 kHz: 480 samples = 30 ms.
pub const DEFAULT_FRAME_SIZE: usize = 480;

// ---------------------------------------------------------------------------
// VadDetector
// ---------------------------------------------------------------------------

/// Energy-based frame classifier and silence trimmer.
///
/// ```rust
/// use voice_player::audio::VadDetector;
///
/// let vad = VadDetector::new(0.01);
///
/// let mut audio = vec![0.0_f32; 480];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// assert_eq!(vad.trim_silence(&audio).len(), 480);
/// ```
#[derive(Debug, Clone)]
pub struct VadDetector {
    rms_threshold: f32,
    frame_size: usize,
}

impl VadDetector {
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    /// Detector with a custom frame size, for rates other than 16 kHz.
    pub fn with_frame_size(rms_threshold: f32, frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame_size must be > 0");
        Self {
            rms_threshold,
            frame_size,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Returns `true` when the frame's RMS exceeds the threshold.
    pub fn is_voice(&self, frame: &[f32]) -> bool {
        !frame.is_empty() && rms(frame) > self.rms_threshold
    }

    /// Trim leading and trailing silence.
    ///
    /// Returns a sub-slice of `audio`; an all-silent signal yields an empty
    /// slice.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let frames: Vec<&[f32]> = audio.chunks(self.frame_size).collect();

        let Some(first) = frames.iter().position(|f| self.is_voice(f)) else {
            return &audio[0..0];
        };
        let last = frames
            .iter()
            .rposition(|f| self.is_voice(f))
            .unwrap_or(first);

        let start = first * self.frame_size;
        let end = ((last + 1) * self.frame_size).min(audio.len());
        &audio[start..end]
    }
}

/// Root-mean-square amplitude of `samples` (0.0 for an empty slice).
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// UtteranceSegmenter
// ---------------------------------------------------------------------------

/// Output of [`UtteranceSegmenter::push`].
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// The first voice frame of a new utterance.
    SpeechStarted,
    /// A complete utterance (mono samples, leading silence excluded).
    Utterance(Vec<f32>),
}

/// Incremental utterance detector.
///
/// An utterance opens on the first voice frame and closes after
/// `silence_frames` consecutive silent frames, or when it reaches
/// `max_samples`.  Utterances with fewer than `min_voice_frames` voice frames
/// are dropped as noise.
#[derive(Debug)]
pub struct UtteranceSegmenter {
    vad: VadDetector,
    silence_frames: usize,
    min_voice_frames: usize,
    max_samples: usize,

    pending: Vec<f32>,
    current: Vec<f32>,
    in_speech: bool,
    voice_frames: usize,
    trailing_silence: usize,
}

impl UtteranceSegmenter {
    /// Build a segmenter for `sample_rate` audio.
    pub fn new(
        vad_threshold: f32,
        sample_rate: u32,
        silence_ms: u64,
        min_utterance_ms: u64,
        max_utterance_secs: f32,
    ) -> Self {
        let frame_size = (sample_rate as usize * 30 / 1000).max(1);
        let frames_for = |ms: u64| ((ms as usize) / 30).max(1);

        Self {
            vad: VadDetector::with_frame_size(vad_threshold, frame_size),
            silence_frames: frames_for(silence_ms),
            min_voice_frames: frames_for(min_utterance_ms),
            max_samples: (max_utterance_secs.max(0.1) * sample_rate as f32) as usize,
            pending: Vec::new(),
            current: Vec::new(),
            in_speech: false,
            voice_frames: 0,
            trailing_silence: 0,
        }
    }

    /// Whether an utterance is currently open.
    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Feed mono samples; returns the events they complete.
    pub fn push(&mut self, samples: &[f32]) -> Vec<SegmentEvent> {
        self.pending.extend_from_slice(samples);
        let frame_size = self.vad.frame_size();
        let mut events = Vec::new();

        while self.pending.len() >= frame_size {
            let frame: Vec<f32> = self.pending.drain(..frame_size).collect();
            let voice = self.vad.is_voice(&frame);

            if !self.in_speech {
                if voice {
                    self.in_speech = true;
                    self.voice_frames = 1;
                    self.trailing_silence = 0;
                    self.current = frame;
                    events.push(SegmentEvent::SpeechStarted);
                }
                continue;
            }

            self.current.extend_from_slice(&frame);
            if voice {
                self.voice_frames += 1;
                self.trailing_silence = 0;
            } else {
                self.trailing_silence += 1;
            }

            if self.trailing_silence >= self.silence_frames || self.current.len() >= self.max_samples
            {
                if let Some(utterance) = self.close() {
                    events.push(SegmentEvent::Utterance(utterance));
                }
            }
        }
        events
    }

    /// Close any open utterance (end of stream).
    pub fn flush(&mut self) -> Option<Vec<f32>> {
        self.pending.clear();
        if self.in_speech {
            self.close()
        } else {
            None
        }
    }

    fn close(&mut self) -> Option<Vec<f32>> {
        self.in_speech = false;
        self.trailing_silence = 0;
        let utterance = std::mem::take(&mut self.current);
        let voice_frames = std::mem::take(&mut self.voice_frames);
        (voice_frames >= self.min_voice_frames).then_some(utterance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
