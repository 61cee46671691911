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
use std::{borrow::Cow, path::Path};

use hound::{WavSpec, WavWriter};
use tracing::debug;

use crate::buffer::WaveformBuffer;

mod format;

pub use format::{OutputFormat, SampleFormat};

/// Written files are always stereo.
pub const OUTPUT_CHANNELS: u16 = 2;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Unsupported output format: {0} at {1} bits")]
    UnsupportedFormat(SampleFormat, u16),

    #[error("Cannot write {1} channel audio as {0} channels")]
    UnsupportedChannels(u16, usize),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Writes rendered buffers to disk. Existing files are overwritten.
pub trait FileWriter {
    fn write(
        &mut self,
        path: &Path,
        sample_rate: u32,
        channel_count: u16,
        buffer: &WaveformBuffer,
    ) -> Result<(), WriteError>;
}

/// Writes WAV files through hound.
pub struct WavFileWriter {
    format: OutputFormat,
}

impl WavFileWriter {
    pub fn new(format: OutputFormat) -> WavFileWriter {
        WavFileWriter { format }
    }
}

impl FileWriter for WavFileWriter {
    fn write(
        &mut self,
        path: &Path,
        sample_rate: u32,
        channel_count: u16,
        buffer: &WaveformBuffer,
    ) -> Result<(), WriteError> {
        // Mono (or wider) renders are adapted to the stereo output.
        let buffer = match (channel_count, buffer.channels()) {
            (channels, actual) if usize::from(channels) == actual => Cow::Borrowed(buffer),
            (2, _) => Cow::Owned(buffer.to_stereo()),
            (channels, actual) => return Err(WriteError::UnsupportedChannels(channels, actual)),
        };

        let spec = WavSpec {
            channels: channel_count,
            sample_rate,
            bits_per_sample: self.format.bits_per_sample(),
            sample_format: match self.format.sample_format() {
                SampleFormat::Float => hound::SampleFormat::Float,
                SampleFormat::Int => hound::SampleFormat::Int,
            },
        };
        debug!(path = ?path, frames = buffer.frames(), ?spec, "Writing WAV file");

        let mut writer = WavWriter::create(path, spec)?;
        match self.format.sample_format() {
            SampleFormat::Float => {
                for sample in buffer.samples() {
                    writer.write_sample(*sample)?;
                }
            }
            SampleFormat::Int => {
                let scale = self.format.int_scale();
                for sample in buffer.samples() {
                    let scaled = (f64::from(sample.clamp(-1.0, 1.0)) * scale).round();
                    writer.write_sample(scaled as i32)?;
                }
            }
        }
        writer.finalize()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hound::WavReader;

    fn stereo() -> WaveformBuffer {
        WaveformBuffer::from_interleaved(vec![0.5, -0.5, 0.25, -0.25], 2)
    }

    #[test]
    fn test_writes_float() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("float.wav");
        let mut writer = WavFileWriter::new(OutputFormat::default());
        writer
            .write(&path, 44100, OUTPUT_CHANNELS, &stereo())
            .expect("write");

        let mut reader = WavReader::open(&path).expect("open");
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.expect("sample")).collect();
        assert_eq!(samples, vec![0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn test_writes_int() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("int.wav");
        let format = OutputFormat::new(SampleFormat::Int, 16).expect("format");
        let buffer = WaveformBuffer::from_interleaved(vec![1.0, -1.0, 2.0, 0.0], 2);
        WavFileWriter::new(format)
            .write(&path, 48000, OUTPUT_CHANNELS, &buffer)
            .expect("write");

        let mut reader = WavReader::open(&path).expect("open");
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i32> = reader.samples::<i32>().map(|s| s.expect("sample")).collect();
        // Out of range samples are clamped.
        assert_eq!(samples, vec![32767, -32767, 32767, 0]);
    }

    #[test]
    fn test_upmixes_mono() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mono.wav");
        let mono = WaveformBuffer::from_interleaved(vec![0.5, 0.25], 1);
        WavFileWriter::new(OutputFormat::default())
            .write(&path, 44100, OUTPUT_CHANNELS, &mono)
            .expect("write");

        let mut reader = WavReader::open(&path).expect("open");
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.expect("sample")).collect();
        assert_eq!(samples, vec![0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("again.wav");
        let mut writer = WavFileWriter::new(OutputFormat::default());
        writer
            .write(&path, 44100, OUTPUT_CHANNELS, &stereo())
            .expect("write");
        writer
            .write(&path, 44100, OUTPUT_CHANNELS, &stereo().slice_frames(0, 1))
            .expect("rewrite");

        let reader = WavReader::open(&path).expect("open");
        assert_eq!(reader.duration(), 1);
    }

    #[test]
    fn test_rejects_channel_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mismatch.wav");
        let result = WavFileWriter::new(OutputFormat::default()).write(&path, 44100, 1, &stereo());
        assert!(matches!(result, Err(WriteError::UnsupportedChannels(1, 2))));
    }
}
