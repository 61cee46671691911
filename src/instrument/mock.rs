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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crossbeam_channel::Receiver;
use midly::{live::LiveEvent, MidiMessage};
use tracing::{info, span, Level};

use super::{InstrumentError, TimedEvent};
use crate::buffer::{Layout, RawBuffer};

/// Amplitude of the mock's audible output.
const MOCK_LEVEL: f32 = 0.5;

/// A record of a single render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub note: Option<u8>,
    /// Time of the note-off, if there was one.
    pub hold: Option<Duration>,
    pub duration: Duration,
    pub sample_rate: u32,
}

/// A mock instrument. Renders a flat tone while the note is held, and can be told to come
/// back silent for a number of attempts. Clones share their state so a test can keep a
/// handle after giving the instrument away.
#[derive(Clone)]
pub struct Instrument {
    name: String,
    is_instrument: bool,
    /// Number of renders that come back silent before audio is produced. `None` means
    /// every render is silent.
    silent_renders: Option<usize>,
    layout: Layout,
    /// Extra frames added to each successive render.
    growth: usize,
    renders: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<RenderCall>>>,
    editor_shown: Arc<AtomicBool>,
}

impl Instrument {
    /// Gets the given mock instrument. Names containing "silent" never produce audio and
    /// names containing "effect" are not instruments.
    pub fn get(name: &str) -> Instrument {
        Instrument {
            name: name.to_string(),
            is_instrument: !name.contains("effect"),
            silent_renders: if name.contains("silent") { None } else { Some(0) },
            layout: Layout::ChannelsByFrames,
            growth: 0,
            renders: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            editor_shown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Comes back silent for the first `count` renders, then produces audio.
    pub fn silent_for(mut self, count: usize) -> Instrument {
        self.silent_renders = Some(count);
        self
    }

    /// Never produces audio.
    pub fn always_silent(mut self) -> Instrument {
        self.silent_renders = None;
        self
    }

    /// Changes the layout reported alongside rendered buffers.
    pub fn with_layout(mut self, layout: Layout) -> Instrument {
        self.layout = layout;
        self
    }

    /// Makes each render `frames` longer than the one before, so renders can be told apart.
    pub fn growing_by(mut self, frames: usize) -> Instrument {
        self.growth = frames;
        self
    }

    /// Returns every render call so far.
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().expect("unable to get calls lock").clone()
    }

    /// Returns true once the editor has been shown and closed.
    pub fn editor_shown(&self) -> bool {
        self.editor_shown.load(Ordering::Relaxed)
    }

    fn is_silent(&self, render: usize) -> bool {
        match self.silent_renders {
            Some(count) => render < count,
            None => true,
        }
    }
}

impl super::Instrument for Instrument {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_instrument(&self) -> bool {
        self.is_instrument
    }

    fn render(
        &mut self,
        events: &[TimedEvent],
        duration: Duration,
        sample_rate: u32,
    ) -> Result<RawBuffer, InstrumentError> {
        let span = span!(Level::DEBUG, "render (mock)");
        let _enter = span.enter();

        let note = events.iter().find_map(|event| match event.event {
            LiveEvent::Midi {
                message: MidiMessage::NoteOn { key, .. },
                ..
            } => Some(key.as_int()),
            _ => None,
        });
        let note_off = events
            .iter()
            .find(|event| {
                matches!(
                    event.event,
                    LiveEvent::Midi {
                        message: MidiMessage::NoteOff { .. },
                        ..
                    }
                )
            })
            .map(|event| event.time);
        let hold = note_off.unwrap_or(duration);

        self.calls
            .lock()
            .expect("unable to get calls lock")
            .push(RenderCall {
                note,
                hold: note_off,
                duration,
                sample_rate,
            });

        let render = self.renders.fetch_add(1, Ordering::Relaxed);
        let frames = (duration.as_secs_f64() * f64::from(sample_rate)) as usize
            + render * self.growth;
        let hold_frames = (hold.as_secs_f64() * f64::from(sample_rate)) as usize;
        let level = if self.is_silent(render) { 0.0 } else { MOCK_LEVEL };

        // A short lead-in so trimming has something to remove.
        let onset = frames / 10;
        let channel: Vec<f32> = (0..frames)
            .map(|frame| {
                if (onset..hold_frames).contains(&frame) {
                    level
                } else {
                    0.0
                }
            })
            .collect();

        info!(
            instrument = self.name,
            note,
            render,
            silent = self.is_silent(render),
            "Rendered."
        );

        Ok(match self.layout {
            Layout::ChannelsByFrames => RawBuffer::Matrix {
                layout: Layout::ChannelsByFrames,
                rows: vec![channel.clone(), channel],
            },
            layout => RawBuffer::Matrix {
                layout,
                rows: channel.into_iter().map(|sample| vec![sample, sample]).collect(),
            },
        })
    }

    fn has_editor(&self) -> bool {
        true
    }

    fn show_editor(&mut self, closed: Receiver<()>) -> Result<(), InstrumentError> {
        // A disconnected sender counts as closing the editor.
        let _ = closed.recv();
        self.editor_shown.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
