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
use std::{collections::BTreeSet, fmt};

/// Pitch class names, sharp spelling.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The highest valid MIDI note number.
pub const MAX_NOTE: u8 = 127;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("Invalid note number {0}. Must be between 0 and 127.")]
    OutOfRange(i64),

    #[error("Unable to parse note number {0:?}")]
    Parse(String),

    #[error("The note list is empty")]
    Empty,
}

/// A MIDI note number in the range 0-127.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Note(u8);

impl Note {
    /// Creates a note, rejecting anything outside of 0-127.
    pub fn new(value: i64) -> Result<Note, NoteError> {
        u8::try_from(value)
            .ok()
            .filter(|value| *value <= MAX_NOTE)
            .map(Note)
            .ok_or(NoteError::OutOfRange(value))
    }

    /// Every MIDI note in ascending order.
    pub fn all() -> impl Iterator<Item = Note> {
        (0..=MAX_NOTE).map(Note)
    }

    /// The raw note number.
    pub fn number(&self) -> u8 {
        self.0
    }

    /// The human readable name of the note, e.g. C4 for note 60.
    pub fn name(&self) -> NoteName {
        NoteName {
            pitch_class: NOTE_NAMES[usize::from(self.0 % 12)],
            octave: i8::try_from(self.0 / 12).unwrap_or(i8::MAX) - 1,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pitch class and octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteName {
    pitch_class: &'static str,
    octave: i8,
}

impl NoteName {
    pub fn pitch_class(&self) -> &'static str {
        self.pitch_class
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

/// Returns the name of the given note as a string.
pub fn name_of(note: Note) -> String {
    note.name().to_string()
}

/// Parses a comma separated list of note numbers. Entries are parsed as signed integers
/// first so that out of range values are reported as such rather than as parse failures.
/// A list without any entries is an error.
pub fn parse_note_list(list: &str) -> Result<BTreeSet<i64>, NoteError> {
    let notes = list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<i64>()
                .map_err(|_| NoteError::Parse(entry.to_string()))
        })
        .collect::<Result<BTreeSet<i64>, _>>()?;

    if notes.is_empty() {
        return Err(NoteError::Empty);
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(value: i64) -> Note {
        Note::new(value).expect("valid note")
    }

    #[test]
    fn test_reference_names() {
        assert_eq!(name_of(note(60)), "C4");
        assert_eq!(name_of(note(21)), "A0");
        assert_eq!(name_of(note(127)), "G9");
        assert_eq!(name_of(note(0)), "C-1");
    }

    #[test]
    fn test_sharps() {
        assert_eq!(name_of(note(61)), "C#4");
        assert_eq!(name_of(note(70)), "A#4");
        let name = note(66).name();
        assert_eq!(name.pitch_class(), "F#");
        assert_eq!(name.octave(), 4);
    }

    #[test]
    fn test_range() {
        assert_eq!(Note::new(-1), Err(NoteError::OutOfRange(-1)));
        assert_eq!(Note::new(128), Err(NoteError::OutOfRange(128)));
        assert_eq!(Note::new(200), Err(NoteError::OutOfRange(200)));
        assert_eq!(note(127).number(), 127);
    }

    #[test]
    fn test_all_is_ascending() {
        let all: Vec<u8> = Note::all().map(|note| note.number()).collect();
        assert_eq!(all.len(), 128);
        assert_eq!(all.first(), Some(&0));
        assert_eq!(all.last(), Some(&127));
        assert!(all.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_parse_note_list() {
        let notes = parse_note_list(" 41, 40 ,41").expect("parse");
        assert_eq!(notes.into_iter().collect::<Vec<_>>(), vec![40, 41]);

        // Range checking happens later, so negative numbers parse.
        let notes = parse_note_list("-1,200").expect("parse");
        assert!(notes.contains(&-1));
        assert!(notes.contains(&200));

        assert_eq!(
            parse_note_list("40,abc"),
            Err(NoteError::Parse("abc".to_string()))
        );
    }

    #[test]
    fn test_parse_empty_note_list() {
        assert_eq!(parse_note_list(""), Err(NoteError::Empty));
        assert_eq!(parse_note_list(" , ,"), Err(NoteError::Empty));
        assert_eq!(parse_note_list("40,,41").expect("parse").len(), 2);
    }
}
