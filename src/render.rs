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

//! Rendering a single note, retrying when the instrument comes back silent.

use std::time::Duration;

use tracing::{debug, span, warn, Level};

use crate::{
    buffer::WaveformBuffer,
    instrument::{note_messages, Instrument, InstrumentError, NOTE_VELOCITY},
    notes::Note,
    trim::{self, TrimSettings, DEFAULT_SILENCE_THRESHOLD},
};

/// Default number of render attempts per note.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Everything needed to render one note. A hold longer than the total duration is passed
/// through to the instrument as is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub note: Note,
    pub velocity: u8,
    pub hold: Duration,
    pub total: Duration,
    pub sample_rate: u32,
}

impl RenderRequest {
    pub fn new(note: Note, hold: Duration, total: Duration, sample_rate: u32) -> RenderRequest {
        RenderRequest {
            note,
            velocity: NOTE_VELOCITY,
            hold,
            total,
            sample_rate,
        }
    }
}

/// How renders are retried and post-processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPolicy {
    max_attempts: usize,
    pub silence_threshold: f32,
    pub keep_silence: bool,
    pub trim: TrimSettings,
}

impl RenderPolicy {
    /// Creates a policy. At least one attempt is always made.
    pub fn new(max_attempts: usize, keep_silence: bool) -> RenderPolicy {
        RenderPolicy {
            max_attempts: max_attempts.max(1),
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            keep_silence,
            trim: TrimSettings::default(),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

impl Default for RenderPolicy {
    fn default() -> Self {
        RenderPolicy::new(DEFAULT_MAX_ATTEMPTS, false)
    }
}

/// The result of a single render attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub buffer: WaveformBuffer,
    pub peak: f32,
    pub is_silent: bool,
}

impl AttemptOutcome {
    fn new(buffer: WaveformBuffer, silence_threshold: f32) -> AttemptOutcome {
        let peak = buffer.peak();
        AttemptOutcome {
            buffer,
            peak,
            is_silent: peak <= silence_threshold,
        }
    }
}

/// The final result for a note. When `succeeded` is false every attempt came back silent
/// and `buffer` holds the last of them.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub note: Note,
    pub buffer: WaveformBuffer,
    pub attempts: usize,
    pub succeeded: bool,
}

/// Renders a note, retrying up to the policy's attempt limit while the output is silent.
/// Instrument errors are not retried.
pub fn render_note_with_retry(
    instrument: &mut dyn Instrument,
    request: &RenderRequest,
    policy: &RenderPolicy,
) -> Result<RenderResult, InstrumentError> {
    let note = request.note;
    let name = note.name();
    let span = span!(Level::INFO, "render note", note = note.number(), note_name = %name);
    let _enter = span.enter();

    let messages = note_messages(note, request.velocity, request.hold);
    let max_attempts = policy.max_attempts();

    let mut attempt = 1;
    loop {
        let raw = instrument.render(&messages, request.total, request.sample_rate)?;
        let buffer = if policy.keep_silence {
            raw.normalize()
        } else {
            trim::trim_raw(raw, &policy.trim, request.sample_rate)
        };

        let outcome = AttemptOutcome::new(buffer, policy.silence_threshold);
        debug!(
            attempt,
            peak = outcome.peak,
            frames = outcome.buffer.frames(),
            "Render attempt finished."
        );

        if !outcome.is_silent {
            return Ok(RenderResult {
                note,
                buffer: outcome.buffer,
                attempts: attempt,
                succeeded: true,
            });
        }

        warn!(
            "Attempt {}/{}: Note {} ({}) was silent, retrying...",
            attempt, max_attempts, note, name
        );
        if attempt == max_attempts {
            warn!(
                "Note {} ({}) was silent after {} attempts",
                note, name, max_attempts
            );
            return Ok(RenderResult {
                note,
                buffer: outcome.buffer,
                attempts: max_attempts,
                succeeded: false,
            });
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::mock;

    const SAMPLE_RATE: u32 = 1000;

    fn request(note: i64) -> RenderRequest {
        RenderRequest::new(
            Note::new(note).expect("note"),
            Duration::from_millis(500),
            Duration::from_secs(1),
            SAMPLE_RATE,
        )
    }

    #[test]
    fn test_policy_clamps_attempts() {
        assert_eq!(RenderPolicy::new(0, false).max_attempts(), 1);
        assert_eq!(RenderPolicy::default().max_attempts(), 3);
    }

    #[test]
    fn test_request_uses_fixed_velocity() {
        assert_eq!(request(60).velocity, 100);
    }

    #[test]
    fn test_first_attempt_succeeds() {
        let mut instrument = mock::Instrument::get("mock");
        let result = render_note_with_retry(&mut instrument, &request(60), &RenderPolicy::default())
            .expect("render");
        assert!(result.succeeded);
        assert_eq!(result.attempts, 1);
        assert_eq!(instrument.calls().len(), 1);
    }

    #[test]
    fn test_succeeds_on_last_attempt() {
        let mut instrument = mock::Instrument::get("mock").silent_for(2);
        let policy = RenderPolicy::new(3, false);
        let result =
            render_note_with_retry(&mut instrument, &request(60), &policy).expect("render");
        assert!(result.succeeded);
        assert_eq!(result.attempts, 3);
        assert!(result.buffer.peak() > policy.silence_threshold);
    }

    #[test]
    fn test_exhausted_returns_last_buffer() {
        // Renders are 1000, 1010 and 1020 frames long.
        let mut instrument = mock::Instrument::get("mock")
            .always_silent()
            .growing_by(10);
        let policy = RenderPolicy::new(3, false);
        let result =
            render_note_with_retry(&mut instrument, &request(60), &policy).expect("render");
        assert!(!result.succeeded);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.buffer.frames(), 1020);
        assert_eq!(result.buffer.peak(), 0.0);
        assert_eq!(instrument.calls().len(), 3);
    }

    #[test]
    fn test_trims_unless_keeping_silence() {
        let policy = RenderPolicy::new(1, false);
        let mut instrument = mock::Instrument::get("mock");
        let trimmed = render_note_with_retry(&mut instrument, &request(60), &policy)
            .expect("render")
            .buffer;
        // Audible from 100ms to 500ms, plus a 100ms tail.
        assert_eq!(trimmed.frames(), 500);
        assert_eq!(trimmed.channels(), 2);

        let policy = RenderPolicy::new(1, true);
        let raw = render_note_with_retry(&mut instrument, &request(60), &policy)
            .expect("render")
            .buffer;
        assert_eq!(raw.frames(), 1000);
    }

    #[test]
    fn test_render_arguments() {
        let mut instrument = mock::Instrument::get("mock");
        render_note_with_retry(&mut instrument, &request(42), &RenderPolicy::default())
            .expect("render");
        assert_eq!(
            instrument.calls(),
            vec![mock::RenderCall {
                note: Some(42),
                hold: Some(Duration::from_millis(500)),
                duration: Duration::from_secs(1),
                sample_rate: SAMPLE_RATE,
            }]
        );
    }

    #[test]
    fn test_long_hold_is_passed_through() {
        let mut instrument = mock::Instrument::get("mock").always_silent();
        let request = RenderRequest::new(
            Note::new(60).expect("note"),
            Duration::from_secs(5),
            Duration::from_secs(1),
            SAMPLE_RATE,
        );
        let result = render_note_with_retry(&mut instrument, &request, &RenderPolicy::default())
            .expect("render");
        assert_eq!(result.attempts, 3);

        let calls = instrument.calls();
        assert_eq!(calls.len(), 3);
        for call in calls {
            assert_eq!(call.hold, Some(Duration::from_secs(5)));
            assert_eq!(call.duration, Duration::from_secs(1));
        }
    }
}
