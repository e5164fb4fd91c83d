//! Validation errors for malformed bar content.

use thiserror::Error;

use super::BarKind;

/// Bar content that cannot be compiled without corrupting musical timing.
///
/// Never recovered by clamping or wrapping: the triggering compile fails and
/// the arrangement keeps its previous events.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("drum row {row} has {len} steps, expected {expected}")]
    RowLength {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("drum velocity {value} at row {row}, step {step} is outside 0.0..=1.0")]
    DrumVelocity { row: usize, step: usize, value: f32 },

    #[error("note {index}: pitch {pitch} is outside 0..=127")]
    Pitch { index: usize, pitch: i32 },

    #[error("note {index}: start step {start} is outside the bar")]
    StartStep { index: usize, start: i32 },

    #[error("note {index}: start {start} is not before end {end}")]
    EmptyNote { index: usize, start: i32, end: i32 },

    #[error("note {index}: ends at step {end}, past the end of the bar")]
    NoteOverrun { index: usize, end: i32 },

    #[error("note {index}: velocity {velocity} is outside 0.0..=1.0")]
    NoteVelocity { index: usize, velocity: f32 },

    #[error("trigger array has {len} steps, expected {expected}")]
    TrigLength { len: usize, expected: usize },

    #[error("trigger value {value} at step {step} is neither 0 nor 1")]
    TrigValue { step: usize, value: f32 },

    #[error("sample range {index}: start {start} is not before end {end}")]
    EmptyRange { index: usize, start: u32, end: u32 },

    #[error("sample range {index}: {start}..{end} lies outside the bar")]
    RangeOutOfBar { index: usize, start: u32, end: u32 },

    #[error("{ranges} trigger ranges but only {samples} sample references")]
    MissingSample { ranges: usize, samples: usize },

    #[error("threshold {0} is outside 0.0..=1.0")]
    Threshold(f32),

    #[error("{found} bar cannot join a {expected} arrangement")]
    Kind { expected: BarKind, found: BarKind },

    #[error("{0} arrangements have no velocity threshold")]
    NoThreshold(BarKind),
}

/// A backend payload that could not be turned into bars.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed bar payload: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("backend reported failure")]
    NotOk,

    #[error("bar {index}: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },
}
