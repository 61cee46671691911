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

//! Render profiles.
//!
//! A profile is an optional YAML file holding render defaults. Command line flags are
//! applied on top of it through [`Overrides`] to produce the final [`RenderSettings`].

use std::{path::Path, path::PathBuf, time::Duration};

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::debug;

use crate::{
    render::{RenderPolicy, DEFAULT_MAX_ATTEMPTS},
    trim::{DEFAULT_SILENCE_THRESHOLD, DEFAULT_TAIL},
    writer::{OutputFormat, SampleFormat},
};

mod error;

pub use error::ConfigError;

const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(12);
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_BITS_PER_SAMPLE: u16 = 32;
const DEFAULT_OUTPUT_ROOT: &str = "samples";

/// A YAML representation of a render profile.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Profile {
    /// Total length of each render (default: 12s).
    max_duration: Option<String>,

    /// How long each note is held (default: the full render length).
    note_duration: Option<String>,

    /// Audio kept after the last audible frame when trimming (default: 100ms).
    tail: Option<String>,

    /// Render sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Maximum number of attempts if output is silent (default: 3).
    max_attempts: Option<usize>,

    /// Peak amplitude at or below which a render is silent (default: 0.001).
    silence_threshold: Option<f32>,

    /// Skips silence trimming (default: false).
    keep_silence: Option<bool>,

    /// Written sample format (default: float).
    sample_format: Option<SampleFormat>,

    /// Written bits per sample (default: 32).
    bits_per_sample: Option<u16>,

    /// Directory that output subfolders are created in (default: samples).
    output_root: Option<String>,
}

impl Profile {
    /// Loads a profile from a YAML file.
    pub fn load(path: &Path) -> Result<Profile, ConfigError> {
        debug!(path = ?path, "Loading render profile");
        Ok(Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .build()?
            .try_deserialize()?)
    }

    /// Parses a profile from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Profile, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?)
    }

    /// Resolves the profile into concrete settings, preferring any overrides.
    pub fn resolve(&self, overrides: &Overrides) -> Result<RenderSettings, ConfigError> {
        let max_duration = match overrides.max_duration {
            Some(seconds) => seconds_to_duration("max_duration", seconds)?,
            None => parse_duration("max_duration", &self.max_duration)?
                .unwrap_or(DEFAULT_MAX_DURATION),
        };
        let note_duration = match overrides.note_duration {
            Some(seconds) => seconds_to_duration("note_duration", seconds)?,
            None => parse_duration("note_duration", &self.note_duration)?.unwrap_or(max_duration),
        };
        let tail = parse_duration("tail", &self.tail)?.unwrap_or(DEFAULT_TAIL);

        let sample_rate = overrides
            .sample_rate
            .or(self.sample_rate)
            .unwrap_or(DEFAULT_SAMPLE_RATE);
        if sample_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be greater than 0".to_string(),
            });
        }

        let silence_threshold = self.silence_threshold.unwrap_or(DEFAULT_SILENCE_THRESHOLD);
        if !silence_threshold.is_finite() || silence_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "silence_threshold",
                reason: format!("{} is not a non-negative amplitude", silence_threshold),
            });
        }

        let mut policy = RenderPolicy::new(
            overrides
                .max_attempts
                .or(self.max_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            overrides.keep_silence || self.keep_silence.unwrap_or(false),
        );
        policy.silence_threshold = silence_threshold;
        policy.trim.threshold = silence_threshold;
        policy.trim.tail = tail;

        let output_format = OutputFormat::new(
            self.sample_format.unwrap_or(SampleFormat::Float),
            self.bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE),
        )?;

        Ok(RenderSettings {
            max_duration,
            note_duration,
            sample_rate,
            policy,
            output_format,
            output_root: PathBuf::from(
                self.output_root.as_deref().unwrap_or(DEFAULT_OUTPUT_ROOT),
            ),
        })
    }
}

/// Values given on the command line, which win over the profile.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    /// Seconds.
    pub max_duration: Option<f64>,
    /// Seconds.
    pub note_duration: Option<f64>,
    pub sample_rate: Option<u32>,
    pub max_attempts: Option<usize>,
    pub keep_silence: bool,
}

/// Fully resolved render settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub max_duration: Duration,
    pub note_duration: Duration,
    pub sample_rate: u32,
    pub policy: RenderPolicy,
    pub output_format: OutputFormat,
    pub output_root: PathBuf,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            max_duration: DEFAULT_MAX_DURATION,
            note_duration: DEFAULT_MAX_DURATION,
            sample_rate: DEFAULT_SAMPLE_RATE,
            policy: RenderPolicy::default(),
            output_format: OutputFormat::default(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
        }
    }
}

fn parse_duration(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    value
        .as_ref()
        .map(|value| {
            DurationString::from_string(value.clone())
                .map(Duration::from)
                .map_err(|e| ConfigError::Duration {
                    field,
                    reason: e.to_string(),
                })
        })
        .transpose()
}

fn seconds_to_duration(field: &'static str, seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds).map_err(|e| ConfigError::Duration {
        field,
        reason: e.to_string(),
    })
}
