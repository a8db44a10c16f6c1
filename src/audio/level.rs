//! Audio level sampling for the ambient screen-edge animation.
//!
//! The animation only needs a smoothed "how loud is it right now" value in
//! `[0.0, 1.0]`.  [`LevelMeter`] turns captured samples into that value with
//! a fast-attack / slow-release envelope and publishes it on a `watch`
//! channel the UI can poll each frame without ever blocking capture.

use std::sync::Arc;

use tokio::sync::watch;

use super::vad::rms;

/// RMS amplitude treated as full scale.  Speech rarely exceeds ~0.3 RMS, so
/// scaling from raw RMS would leave the animation nearly flat.
const FULL_SCALE_RMS: f32 = 0.3;
const ATTACK: f32 = 0.6;
const RELEASE: f32 = 0.15;

/// Smoothed level meter.
#[derive(Debug)]
pub struct LevelMeter {
    level: f32,
    tx: Arc<watch::Sender<f32>>,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelMeter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self::attached(Arc::new(tx))
    }

    /// Meter publishing on an existing channel, so subscribers survive
    /// across capture sessions.
    pub fn attached(tx: Arc<watch::Sender<f32>>) -> Self {
        Self { level: 0.0, tx }
    }

    /// Receiver the animation reads the level from.
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.tx.subscribe()
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Fold a block of mono samples into the envelope and publish it.
    pub fn push(&mut self, samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return self.level;
        }
        let target = (rms(samples) / FULL_SCALE_RMS).clamp(0.0, 1.0);
        let coeff = if target > self.level { ATTACK } else { RELEASE };
        self.level += (target - self.level) * coeff;
        self.tx.send_replace(self.level);
        self.level
    }

    /// Drop the level to zero, e.g. when capture stops.
    pub fn reset(&mut self) {
        self.level = 0.0;
        self.tx.send_replace(0.0);
    }

    /// Split `samples` into `num_bars` equal chunks and return each chunk's
    /// scaled RMS, padded with `0.0` when there are fewer samples than bars.
    pub fn bars(samples: &[f32], num_bars: usize) -> Vec<f32> {
        if num_bars == 0 {
            return Vec::new();
        }
        if samples.is_empty() {
            return vec![0.0; num_bars];
        }

        let chunk_size = (samples.len() / num_bars).max(1);
        let mut bars: Vec<f32> = samples
            .chunks(chunk_size)
            .take(num_bars)
            .map(|c| (rms(c) / FULL_SCALE_RMS).min(1.0))
            .collect();
        bars.resize(num_bars, 0.0);
        bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_stays_at_zero() {
        let mut meter = LevelMeter::new();
        assert_eq!(meter.push(&[0.0; 480]), 0.0);
    }

    #[test]
    fn loud_input_rises_fast_and_falls_slowly() {
        let mut meter = LevelMeter::new();
        let up = meter.push(&[0.5; 480]);
        assert!(up > 0.5, "attack too slow: {up}");

        let down = meter.push(&[0.0; 480]);
        assert!(down < up && down > up * 0.5, "release too fast: {down}");
    }

    #[test]
    fn level_is_published() {
        let mut meter = LevelMeter::new();
        let rx = meter.subscribe();
        let level = meter.push(&[0.3; 480]);
        assert_eq!(*rx.borrow(), level);

        meter.reset();
        assert_eq!(*rx.borrow(), 0.0);
    }

    #[test]
    fn attached_meters_share_a_channel() {
        let (tx, rx) = watch::channel(0.0);
        let tx = Arc::new(tx);

        LevelMeter::attached(tx.clone()).push(&[0.3; 480]);
        assert!(*rx.borrow() > 0.0);

        LevelMeter::attached(tx).reset();
        assert_eq!(*rx.borrow(), 0.0);
    }

    #[test]
    fn bars_are_clamped_and_padded() {
        let bars = LevelMeter::bars(&[0.9; 4], 8);
        assert_eq!(bars.len(), 8);
        assert_eq!(bars[0], 1.0);
        assert_eq!(bars[7], 0.0);
        assert!(LevelMeter::bars(&[0.1; 10], 0).is_empty());
    }
}
