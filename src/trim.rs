// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::time::Duration;

use tracing::debug;

use crate::buffer::{RawBuffer, WaveformBuffer};

/// Default amplitude at or below which a frame counts as silent.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 1e-3;

/// Default audio kept after the last audible frame.
pub const DEFAULT_TAIL: Duration = Duration::from_millis(100);

/// Settings for silence trimming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimSettings {
    /// Frames with an amplitude at or below this are silent.
    pub threshold: f32,
    /// Extra audio kept after the detected end to preserve the release.
    pub tail: Duration,
}

impl Default for TrimSettings {
    fn default() -> Self {
        TrimSettings {
            threshold: DEFAULT_SILENCE_THRESHOLD,
            tail: DEFAULT_TAIL,
        }
    }
}

impl TrimSettings {
    /// The number of tail frames at the given sample rate, rounded down.
    pub fn tail_samples(&self, sample_rate: u32) -> usize {
        (self.tail.as_secs_f64() * f64::from(sample_rate)).floor() as usize
    }
}

/// Detected onset and offset of a buffer, in frames. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimBounds {
    pub start: usize,
    pub end: usize,
}

/// Finds the audible region of the buffer.
///
/// The end is one past the last frame louder than the threshold. If no frame is, the end
/// falls back to the last frame index so that nearly the whole buffer is kept. The start is
/// the first loud frame before the end, or 0.
pub fn bounds(buffer: &WaveformBuffer, threshold: f32) -> TrimBounds {
    let amplitudes: Vec<f32> = buffer.frame_amplitudes().collect();

    let end = amplitudes
        .iter()
        .rposition(|amplitude| *amplitude > threshold)
        .map(|index| index + 1)
        .unwrap_or_else(|| amplitudes.len().saturating_sub(1));

    let start = amplitudes[..end]
        .iter()
        .position(|amplitude| *amplitude > threshold)
        .unwrap_or(0);

    TrimBounds { start, end }
}

/// Trims leading and trailing silence, keeping `settings.tail` worth of frames after the
/// detected end. The result never extends past the input.
pub fn trim(buffer: &WaveformBuffer, settings: &TrimSettings, sample_rate: u32) -> WaveformBuffer {
    let TrimBounds { start, end } = bounds(buffer, settings.threshold);
    let tail_samples = settings.tail_samples(sample_rate);

    debug!(
        frames = buffer.frames(),
        start, end, tail_samples, "Trimming silence"
    );

    buffer.slice_frames(start, end.saturating_add(tail_samples))
}

/// Normalizes a raw instrument buffer and trims it.
pub fn trim_raw(buffer: RawBuffer, settings: &TrimSettings, sample_rate: u32) -> WaveformBuffer {
    trim(&buffer.normalize(), settings, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Layout;

    const SAMPLE_RATE: u32 = 1000;

    fn settings(tail_ms: u64) -> TrimSettings {
        TrimSettings {
            threshold: DEFAULT_SILENCE_THRESHOLD,
            tail: Duration::from_millis(tail_ms),
        }
    }

    /// A mono buffer that is silent except for the frames in `loud`.
    fn impulse(frames: usize, loud: std::ops::RangeInclusive<usize>) -> WaveformBuffer {
        let samples = (0..frames)
            .map(|i| if loud.contains(&i) { 0.5 } else { 0.0 })
            .collect();
        WaveformBuffer::from_interleaved(samples, 1)
    }

    #[test]
    fn test_tail_samples() {
        assert_eq!(TrimSettings::default().tail_samples(44100), 4410);
        assert_eq!(settings(5).tail_samples(SAMPLE_RATE), 5);
        assert_eq!(settings(0).tail_samples(SAMPLE_RATE), 0);
    }

    #[test]
    fn test_trims_to_onset_and_tail() {
        let buffer = impulse(100, 10..=20);
        let trimmed = trim(&buffer, &settings(5), SAMPLE_RATE);
        assert_eq!(bounds(&buffer, DEFAULT_SILENCE_THRESHOLD), TrimBounds { start: 10, end: 21 });
        // Frames 10 through 25 inclusive.
        assert_eq!(trimmed, buffer.slice_frames(10, 26));
        assert_eq!(trimmed.frames(), 16);
    }

    #[test]
    fn test_tail_is_clamped() {
        let buffer = impulse(24, 10..=20);
        let trimmed = trim(&buffer, &settings(5), SAMPLE_RATE);
        assert_eq!(trimmed, buffer.slice_frames(10, 24));
    }

    #[test]
    fn test_all_silent_keeps_buffer() {
        let buffer = impulse(50, 1..=0);
        assert_eq!(bounds(&buffer, DEFAULT_SILENCE_THRESHOLD), TrimBounds { start: 0, end: 49 });

        // Any tail at all restores the final frame.
        let trimmed = trim(&buffer, &settings(5), SAMPLE_RATE);
        assert_eq!(trimmed, buffer);

        // Without one the last frame is dropped.
        let trimmed = trim(&buffer, &settings(0), SAMPLE_RATE);
        assert_eq!(trimmed, buffer.slice_frames(0, 49));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let samples = vec![0.0, DEFAULT_SILENCE_THRESHOLD, 0.5, DEFAULT_SILENCE_THRESHOLD, 0.0];
        let buffer = WaveformBuffer::from_interleaved(samples, 1);
        assert_eq!(bounds(&buffer, DEFAULT_SILENCE_THRESHOLD), TrimBounds { start: 2, end: 3 });
    }

    #[test]
    fn test_amplitude_spans_channels() {
        // Only the right channel is audible, at frames 3 and 4.
        let mut samples = vec![0.0; 20];
        samples[7] = -0.4;
        samples[9] = 0.4;
        let buffer = WaveformBuffer::from_interleaved(samples, 2);
        let trimmed = trim(&buffer, &settings(1), SAMPLE_RATE);
        assert_eq!(trimmed.channels(), 2);
        assert_eq!(trimmed.samples(), &[0.0, -0.4, 0.0, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn test_trim_raw_transposes_first() {
        let raw = RawBuffer::Matrix {
            layout: Layout::ChannelsByFrames,
            rows: vec![vec![0.0, 0.0, 0.3, 0.0], vec![0.0, 0.2, 0.0, 0.0]],
        };
        let trimmed = trim_raw(raw, &settings(0), SAMPLE_RATE);
        assert_eq!(trimmed.samples(), &[0.0, 0.2, 0.3, 0.0]);
    }

    #[test]
    fn test_empty_buffer() {
        let trimmed = trim(&WaveformBuffer::empty(2), &settings(5), SAMPLE_RATE);
        assert!(trimmed.is_empty());
        assert_eq!(trimmed.channels(), 2);
    }

    #[test]
    fn test_retrimming_audible_buffer_is_stable() {
        let once = trim(&impulse(100, 10..=20), &settings(5), SAMPLE_RATE);
        let twice = trim(&once, &settings(5), SAMPLE_RATE);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_retrimming_silent_buffer_is_not_idempotent() {
        // The all-silent fallback drops the last frame on every pass when there is no tail.
        let silent = impulse(10, 1..=0);
        let once = trim(&silent, &settings(0), SAMPLE_RATE);
        let twice = trim(&once, &settings(0), SAMPLE_RATE);
        assert_eq!(once.frames(), 9);
        assert_eq!(twice.frames(), 8);
        assert_ne!(once, twice);
    }
}
