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

use std::fmt;

use serde::Deserialize;

use super::WriteError;

/// Sample format of written files, as named in a render profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Int,
    Float,
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleFormat::Float => "float",
            SampleFormat::Int => "int",
        })
    }
}

/// A sample format and bit depth that hound can write. Only constructed through
/// [`OutputFormat::new`], so the bit depth is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    sample_format: SampleFormat,
    bits_per_sample: u16,
}

impl OutputFormat {
    /// Float output must be 32 bit; int output may be 16, 24 or 32 bit.
    pub fn new(sample_format: SampleFormat, bits_per_sample: u16) -> Result<Self, WriteError> {
        let supported = match sample_format {
            SampleFormat::Float => bits_per_sample == 32,
            SampleFormat::Int => matches!(bits_per_sample, 16 | 24 | 32),
        };
        if !supported {
            return Err(WriteError::UnsupportedFormat(sample_format, bits_per_sample));
        }

        Ok(OutputFormat {
            sample_format,
            bits_per_sample,
        })
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Full scale for integer samples, e.g. 32767 at 16 bits.
    pub(super) fn int_scale(&self) -> f64 {
        ((1i64 << (self.bits_per_sample - 1)) - 1) as f64
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat {
            sample_format: SampleFormat::Float,
            bits_per_sample: 32,
        }
    }
}
