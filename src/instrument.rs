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
use std::{fmt, path::Path, time::Duration};

use crossbeam_channel::Receiver;
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};

use crate::{buffer::RawBuffer, notes::Note};

pub mod mock;
mod synth;

/// The velocity every note is rendered with.
pub const NOTE_VELOCITY: u8 = 100;

/// Prefix selecting one of the built in synthesizers, e.g. `builtin:sine`.
const BUILTIN_PREFIX: &str = "builtin:";

#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error("Unsupported plugin {0}: only mock and builtin: instruments can be hosted")]
    Unsupported(String),

    #[error("Unknown builtin waveform {0}")]
    UnknownWaveform(String),

    #[error("Render failed: {0}")]
    Render(String),
}

/// A MIDI event scheduled relative to the start of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub time: Duration,
    pub event: LiveEvent<'static>,
}

/// Builds the note-on/note-off pair for a single note. The note-on is at 0 and the
/// note-off at `hold`, both on the first MIDI channel.
pub fn note_messages(note: Note, velocity: u8, hold: Duration) -> Vec<TimedEvent> {
    let channel = u4::from(0u8);
    let key = u7::from(note.number());
    vec![
        TimedEvent {
            time: Duration::ZERO,
            event: LiveEvent::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::from(velocity),
                },
            },
        },
        TimedEvent {
            time: hold,
            event: LiveEvent::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::from(0u8),
                },
            },
        },
    ]
}

/// A device that turns MIDI events into audio. Render state is not reentrant, so an
/// instrument must only ever be driven from one place at a time.
pub trait Instrument: fmt::Display + std::marker::Send {
    /// Returns the name of the instrument.
    fn name(&self) -> &str;

    /// Returns true if the plugin can generate audio from MIDI.
    fn is_instrument(&self) -> bool;

    /// Renders `duration` worth of audio for the given events. Output may be in any
    /// layout and may be spuriously silent.
    fn render(
        &mut self,
        events: &[TimedEvent],
        duration: Duration,
        sample_rate: u32,
    ) -> Result<RawBuffer, InstrumentError>;

    /// Returns true if the instrument has an editor for [`Instrument::show_editor`] to
    /// wait on.
    fn has_editor(&self) -> bool;

    /// Presents the instrument's editor and blocks until `closed` fires. Instruments
    /// without an editor return immediately.
    fn show_editor(&mut self, closed: Receiver<()>) -> Result<(), InstrumentError>;
}

/// Loads the instrument at the given path.
pub fn load(path: &str, plugin_name: Option<&str>) -> Result<Box<dyn Instrument>, InstrumentError> {
    let label = plugin_label(path, plugin_name);
    if path.starts_with("mock") {
        return Ok(Box::new(mock::Instrument::get(&label)));
    }

    if let Some(waveform) = path.strip_prefix(BUILTIN_PREFIX) {
        return Ok(Box::new(synth::Synth::new(&label, waveform.parse()?)));
    }

    Err(InstrumentError::Unsupported(path.to_string()))
}

/// The label used for output names: the plugin name when given, otherwise the file name
/// of the plugin without its extension.
pub fn plugin_label(path: &str, plugin_name: Option<&str>) -> String {
    if let Some(plugin_name) = plugin_name {
        return plugin_name.to_string();
    }

    let path = path.strip_prefix(BUILTIN_PREFIX).unwrap_or(path);
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_messages() {
        let note = Note::new(60).expect("note");
        let messages = note_messages(note, NOTE_VELOCITY, Duration::from_secs(2));
        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0].time, Duration::ZERO);
        assert_eq!(
            messages[0].event,
            LiveEvent::Midi {
                channel: u4::from(0u8),
                message: MidiMessage::NoteOn {
                    key: u7::from(60u8),
                    vel: u7::from(100u8),
                },
            }
        );

        assert_eq!(messages[1].time, Duration::from_secs(2));
        assert_eq!(
            messages[1].event,
            LiveEvent::Midi {
                channel: u4::from(0u8),
                message: MidiMessage::NoteOff {
                    key: u7::from(60u8),
                    vel: u7::from(0u8),
                },
            }
        );
    }

    #[test]
    fn test_plugin_label() {
        assert_eq!(plugin_label("/plugins/Piano.vst3", None), "Piano");
        assert_eq!(plugin_label("/plugins/Piano.vst3", Some("Grand")), "Grand");
        assert_eq!(plugin_label("builtin:sine", None), "sine");
        assert_eq!(plugin_label("mock", None), "mock");
    }

    #[test]
    fn test_load() {
        let instrument = load("mock-piano", None).expect("mock");
        assert_eq!(instrument.name(), "mock-piano");
        assert!(instrument.is_instrument());

        assert!(instrument.has_editor());

        let instrument = load("builtin:saw", Some("Lead")).expect("builtin");
        assert_eq!(instrument.name(), "Lead");
        assert!(!instrument.has_editor());

        assert!(matches!(
            load("builtin:organ", None),
            Err(InstrumentError::UnknownWaveform(_))
        ));
        assert!(matches!(
            load("/plugins/Piano.vst3", None),
            Err(InstrumentError::Unsupported(_))
        ));
    }
}
