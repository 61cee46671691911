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

//! Waveform buffers.
//!
//! Instruments hand back a [`RawBuffer`] in whatever layout they produce. Everything
//! downstream works on a [`WaveformBuffer`], which is always frames x channels.

/// Declares how the rows of a raw sample matrix are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Each row is a frame holding one sample per channel.
    FramesByChannels,
    /// Each row is a channel holding every frame of that channel.
    ChannelsByFrames,
    /// The layout is unknown and is guessed from the shape: exactly two rows are taken as
    /// channels x frames, anything else as frames x channels. This is a compatibility
    /// fallback and misreads a genuine two frame buffer as two channels.
    Inferred,
}

/// A sample buffer as produced by an instrument, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBuffer {
    /// A single channel.
    Mono(Vec<f32>),
    /// A two dimensional sample matrix.
    Matrix { layout: Layout, rows: Vec<Vec<f32>> },
}

impl RawBuffer {
    /// Converts the buffer into frames x channels. Ragged rows are cut to the shortest row
    /// so that channels stay sample aligned.
    pub fn normalize(self) -> WaveformBuffer {
        match self {
            RawBuffer::Mono(samples) => WaveformBuffer::from_interleaved(samples, 1),
            RawBuffer::Matrix { layout, rows } => {
                let layout = match layout {
                    Layout::Inferred if rows.len() == 2 => Layout::ChannelsByFrames,
                    Layout::Inferred => Layout::FramesByChannels,
                    layout => layout,
                };
                let shortest = rows.iter().map(Vec::len).min().unwrap_or(0);

                match layout {
                    Layout::ChannelsByFrames => {
                        let channels = rows.len();
                        if channels == 0 {
                            return WaveformBuffer::empty(1);
                        }
                        let mut data = Vec::with_capacity(channels * shortest);
                        for frame in 0..shortest {
                            data.extend(rows.iter().map(|row| row[frame]));
                        }
                        WaveformBuffer::from_interleaved(data, channels)
                    }
                    _ => {
                        if shortest == 0 {
                            return WaveformBuffer::empty(1);
                        }
                        let mut data = Vec::with_capacity(rows.len() * shortest);
                        for row in rows.iter() {
                            data.extend_from_slice(&row[..shortest]);
                        }
                        WaveformBuffer::from_interleaved(data, shortest)
                    }
                }
            }
        }
    }
}

/// A frames x channels sample buffer, stored interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformBuffer {
    data: Vec<f32>,
    channels: usize,
}

impl WaveformBuffer {
    /// Creates a buffer from interleaved samples. The channel count is at least one and any
    /// trailing partial frame is dropped.
    pub fn from_interleaved(mut data: Vec<f32>, channels: usize) -> WaveformBuffer {
        let channels = channels.max(1);
        data.truncate(data.len() - data.len() % channels);
        WaveformBuffer { data, channels }
    }

    /// Creates an empty buffer with the given channel count.
    pub fn empty(channels: usize) -> WaveformBuffer {
        WaveformBuffer::from_interleaved(Vec::new(), channels)
    }

    pub fn frames(&self) -> usize {
        self.data.len() / self.channels
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Returns the samples of a single frame.
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.channels)?;
        self.data.get(start..start.checked_add(self.channels)?)
    }

    /// Per frame amplitude: the loudest absolute sample across all channels.
    pub fn frame_amplitudes(&self) -> impl Iterator<Item = f32> + '_ {
        self.data
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().fold(0.0_f32, |max, s| max.max(s.abs())))
    }

    /// The loudest absolute sample in the buffer, 0 for an empty buffer.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0_f32, |max, s| max.max(s.abs()))
    }

    /// Copies frames `start..end`. Both ends are clamped to the buffer, so an end past the
    /// last frame simply stops at the last frame.
    pub fn slice_frames(&self, start: usize, end: usize) -> WaveformBuffer {
        let frames = self.frames();
        let end = end.min(frames);
        let start = start.min(end);
        WaveformBuffer {
            data: self.data[start * self.channels..end * self.channels].to_vec(),
            channels: self.channels,
        }
    }

    /// Returns a two channel copy. Mono is duplicated into both channels and anything wider
    /// keeps its first two channels.
    pub fn to_stereo(&self) -> WaveformBuffer {
        if self.channels == 2 {
            return self.clone();
        }

        let mut data = Vec::with_capacity(self.frames() * 2);
        for frame in self.data.chunks_exact(self.channels) {
            let left = frame[0];
            let right = frame.get(1).copied().unwrap_or(left);
            data.push(left);
            data.push(right);
        }
        WaveformBuffer { data, channels: 2 }
    }
}
