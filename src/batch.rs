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

//! Batch rendering of every requested note.
//!
//! Notes are rendered one at a time in ascending order. The batch owns the instrument for
//! its whole lifetime and never renders two notes at once.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crossbeam_channel::Receiver;
use tracing::{info, span, Level};

use crate::{
    config::RenderSettings,
    instrument::Instrument,
    notes::Note,
    render::{render_note_with_retry, RenderRequest},
    writer::{FileWriter, OUTPUT_CHANNELS},
};

mod error;

pub use error::BatchError;

/// Where and how a batch writes its samples.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    label: String,
    output_dir: PathBuf,
    settings: RenderSettings,
}

impl BatchConfig {
    /// Creates a batch config. Samples go to `<output root>/<subfolder>`, where the
    /// subfolder defaults to the instrument label.
    pub fn new(label: &str, output_subfolder: Option<&str>, settings: RenderSettings) -> Self {
        let output_dir = settings
            .output_root
            .join(output_subfolder.unwrap_or(label));
        BatchConfig {
            label: label.to_string(),
            output_dir,
            settings,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// The output file for a note, e.g. `samples/Piano/Piano - 60 C4.wav`.
    pub fn output_path(&self, note: Note) -> PathBuf {
        self.output_dir
            .join(format!("{} - {} {}.wav", self.label, note, note.name()))
    }
}

/// The outcome of a single written note.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteReport {
    pub note: Note,
    pub path: PathBuf,
    pub attempts: usize,
    /// False if every attempt was silent. The silent sample is still written.
    pub succeeded: bool,
}

/// Checks every note in the filter, failing on the first one out of range.
pub fn validate_filter(filter: &BTreeSet<i64>) -> Result<BTreeSet<Note>, BatchError> {
    Ok(filter
        .iter()
        .map(|note| Note::new(*note))
        .collect::<Result<BTreeSet<Note>, _>>()?)
}

/// Renders notes from an instrument and writes them out.
pub struct Batch<W: FileWriter> {
    instrument: Box<dyn Instrument>,
    writer: W,
    config: BatchConfig,
}

impl<W: FileWriter> Batch<W> {
    /// Creates a batch, taking ownership of the instrument. Fails if the plugin can't
    /// generate audio.
    pub fn new(
        instrument: Box<dyn Instrument>,
        writer: W,
        config: BatchConfig,
    ) -> Result<Self, BatchError> {
        if !instrument.is_instrument() {
            return Err(BatchError::NotAnInstrument(instrument.name().to_string()));
        }

        Ok(Batch {
            instrument,
            writer,
            config,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Returns true if [`Batch::edit`] will wait for the editor to be closed.
    pub fn has_editor(&self) -> bool {
        self.instrument.has_editor()
    }

    /// Shows the instrument's editor and waits until `closed` fires. Does nothing for an
    /// instrument without an editor.
    pub fn edit(&mut self, closed: Receiver<()>) -> Result<(), BatchError> {
        if !self.has_editor() {
            return Ok(());
        }

        info!(
            instrument = %self.instrument,
            "Opening instrument plugin. Edit settings, then close to continue."
        );
        Ok(self.instrument.show_editor(closed)?)
    }

    /// Renders every note in the filter (or every note if there is none) and returns the
    /// written paths in ascending note order.
    pub fn render_all(
        &mut self,
        filter: Option<&BTreeSet<i64>>,
    ) -> Result<Vec<PathBuf>, BatchError> {
        Ok(self
            .render_all_with_reports(filter)?
            .into_iter()
            .map(|report| report.path)
            .collect())
    }

    /// Like [`Batch::render_all`], returning what happened to each note. The filter is
    /// validated in full before anything is rendered.
    pub fn render_all_with_reports(
        &mut self,
        filter: Option<&BTreeSet<i64>>,
    ) -> Result<Vec<NoteReport>, BatchError> {
        let filter = filter.map(validate_filter).transpose()?;

        let output_dir = self.config.output_dir().to_path_buf();
        fs::create_dir_all(&output_dir).map_err(|source| BatchError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let mut reports = Vec::new();
        for note in Note::all() {
            if filter.as_ref().is_some_and(|filter| !filter.contains(&note)) {
                continue;
            }
            reports.push(self.render_note(note)?);
        }

        let silent = reports.iter().filter(|report| !report.succeeded).count();
        info!(
            instrument = self.config.label(),
            notes = reports.len(),
            silent,
            "Batch finished."
        );
        Ok(reports)
    }

    fn render_note(&mut self, note: Note) -> Result<NoteReport, BatchError> {
        let span = span!(Level::INFO, "note", note = note.number());
        let _enter = span.enter();

        let settings = &self.config.settings;
        let request = RenderRequest::new(
            note,
            settings.note_duration,
            settings.max_duration,
            settings.sample_rate,
        );
        let result = render_note_with_retry(self.instrument.as_mut(), &request, &settings.policy)?;

        let path = self.config.output_path(note);
        self.writer.write(
            &path,
            settings.sample_rate,
            OUTPUT_CHANNELS,
            &result.buffer,
        )?;
        info!("Saved {}", path.display());

        Ok(NoteReport {
            note,
            path,
            attempts: result.attempts,
            succeeded: result.succeeded,
        })
    }
}
