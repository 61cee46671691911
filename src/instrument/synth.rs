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

//! A small offline synthesizer used as a stand-in instrument.

use std::{f64::consts::TAU, fmt, str::FromStr, time::Duration};

use crossbeam_channel::Receiver;
use midly::{live::LiveEvent, MidiMessage};
use tracing::debug;

use super::{InstrumentError, TimedEvent};
use crate::buffer::{Layout, RawBuffer};

const ATTACK: Duration = Duration::from_millis(5);
const RELEASE: Duration = Duration::from_millis(250);
const OUTPUT_GAIN: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
}

impl FromStr for Waveform {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sine" => Ok(Waveform::Sine),
            "saw" => Ok(Waveform::Saw),
            "square" => Ok(Waveform::Square),
            _ => Err(InstrumentError::UnknownWaveform(s.to_string())),
        }
    }
}

impl Waveform {
    /// Evaluates the waveform at the given phase, in cycles.
    fn sample(self, phase: f64) -> f64 {
        let phase = phase.fract();
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// A note pulled out of the event list.
#[derive(Debug, Clone, Copy)]
struct Voice {
    key: u8,
    velocity: u8,
    on: Duration,
    off: Option<Duration>,
}

impl Voice {
    fn frequency(&self) -> f64 {
        440.0 * 2f64.powf((f64::from(self.key) - 69.0) / 12.0)
    }

    /// Linear attack, full sustain, linear release after note-off.
    fn envelope(&self, t: f64) -> f64 {
        let on = self.on.as_secs_f64();
        if t < on {
            return 0.0;
        }

        let attack = ((t - on) / ATTACK.as_secs_f64()).min(1.0);
        match self.off {
            Some(off) if t >= off.as_secs_f64() => {
                let released = (t - off.as_secs_f64()) / RELEASE.as_secs_f64();
                attack * (1.0 - released).max(0.0)
            }
            _ => attack,
        }
    }
}

/// A monophonic oscillator with an attack/release envelope. It has no editor.
pub struct Synth {
    name: String,
    waveform: Waveform,
}

impl Synth {
    pub fn new(name: &str, waveform: Waveform) -> Synth {
        Synth {
            name: name.to_string(),
            waveform,
        }
    }

    fn voices(events: &[TimedEvent]) -> Vec<Voice> {
        let mut voices: Vec<Voice> = Vec::new();
        for event in events {
            let LiveEvent::Midi { message, .. } = event.event else {
                continue;
            };
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => voices.push(Voice {
                    key: key.as_int(),
                    velocity: vel.as_int(),
                    on: event.time,
                    off: None,
                }),
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    if let Some(voice) = voices
                        .iter_mut()
                        .find(|voice| voice.key == key.as_int() && voice.off.is_none())
                    {
                        voice.off = Some(event.time);
                    }
                }
                _ => {}
            }
        }
        voices
    }
}

impl super::Instrument for Synth {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_instrument(&self) -> bool {
        true
    }

    fn render(
        &mut self,
        events: &[TimedEvent],
        duration: Duration,
        sample_rate: u32,
    ) -> Result<RawBuffer, InstrumentError> {
        if sample_rate == 0 {
            return Err(InstrumentError::Render(
                "sample rate must be greater than 0".to_string(),
            ));
        }

        let voices = Self::voices(events);
        let rate = f64::from(sample_rate);
        let frames = (duration.as_secs_f64() * rate) as usize;
        debug!(
            instrument = self.name,
            voices = voices.len(),
            frames,
            "Synthesizing."
        );

        let channel: Vec<f32> = (0..frames)
            .map(|frame| {
                let t = frame as f64 / rate;
                let sample: f64 = voices
                    .iter()
                    .map(|voice| {
                        let gain = f64::from(voice.velocity) / 127.0 * OUTPUT_GAIN;
                        let phase = (t - voice.on.as_secs_f64()) * voice.frequency();
                        self.waveform.sample(phase.max(0.0)) * voice.envelope(t) * gain
                    })
                    .sum();
                sample.clamp(-1.0, 1.0) as f32
            })
            .collect();

        Ok(RawBuffer::Matrix {
            layout: Layout::ChannelsByFrames,
            rows: vec![channel.clone(), channel],
        })
    }

    fn has_editor(&self) -> bool {
        false
    }

    fn show_editor(&mut self, _closed: Receiver<()>) -> Result<(), InstrumentError> {
        Ok(())
    }
}

impl fmt::Display for Synth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (builtin {:?})", self.name, self.waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{note_messages, Instrument};
    use crate::notes::Note;
    use crate::trim::{trim, TrimSettings};

    #[test]
    fn test_waveforms() {
        assert_eq!(Waveform::Saw.sample(0.0), -1.0);
        assert_eq!(Waveform::Square.sample(0.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
        assert!(Waveform::Sine.sample(0.25) > 0.999);
        assert!("organ".parse::<Waveform>().is_err());
    }

    #[test]
    fn test_release_decays_to_silence() {
        let mut synth = Synth::new("test", Waveform::Sine);
        let events = note_messages(Note::new(69).expect("note"), 100, Duration::from_millis(100));
        let buffer = synth
            .render(&events, Duration::from_millis(1000), 8000)
            .expect("render")
            .normalize();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 8000);
        assert!(buffer.peak() > 0.3);
        assert!(buffer.peak() <= OUTPUT_GAIN as f32);

        // Sound stops once the release has run out at 350ms.
        let trimmed = trim(&buffer, &TrimSettings::default(), 8000);
        assert!(trimmed.frames() < 8000 / 2);
        assert!(trimmed.frames() > 8000 * 30 / 100);
    }

    #[test]
    fn test_zero_sample_rate() {
        let mut synth = Synth::new("test", Waveform::Saw);
        assert!(synth.render(&[], Duration::from_secs(1), 0).is_err());
    }
}
