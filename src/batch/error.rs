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
use std::path::PathBuf;

use crate::{instrument::InstrumentError, notes::NoteError, writer::WriteError};

/// Errors that stop a batch. Silent renders are not errors.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    InvalidNote(#[from] NoteError),

    #[error("The provided plugin {0} is not an instrument.")]
    NotAnInstrument(String),

    #[error("Instrument error: {0}")]
    Instrument(#[from] InstrumentError),

    #[error("Unable to write sample: {0}")]
    Write(#[from] WriteError),

    #[error("Unable to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
