//! Bass and melody bars as lists of pitched notes.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::event::{ScheduledEvent, STEPS_PER_BAR};

/// One note as sent by the generator: `[pitch, startStep, lengthSteps, velocity]`.
///
/// Fields stay signed so malformed input reaches validation instead of failing
/// deserialization with an unhelpful message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i32, i32, i32, f32)", into = "(i32, i32, i32, f32)")]
pub struct Note {
    pub pitch: i32,
    pub start: i32,
    pub length: i32,
    pub velocity: f32,
}

impl From<(i32, i32, i32, f32)> for Note {
    fn from((pitch, start, length, velocity): (i32, i32, i32, f32)) -> Self {
        Self {
            pitch,
            start,
            length,
            velocity,
        }
    }
}

impl From<Note> for (i32, i32, i32, f32) {
    fn from(n: Note) -> Self {
        (n.pitch, n.start, n.length, n.velocity)
    }
}

impl Note {
    pub fn new(pitch: i32, start: i32, length: i32, velocity: f32) -> Self {
        Self {
            pitch,
            start,
            length,
            velocity,
        }
    }

    fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let steps = STEPS_PER_BAR as i32;
        if !(0..=127).contains(&self.pitch) {
            return Err(ValidationError::Pitch {
                index,
                pitch: self.pitch,
            });
        }
        if !(0..steps).contains(&self.start) {
            return Err(ValidationError::StartStep {
                index,
                start: self.start,
            });
        }
        let end = self.start.saturating_add(self.length);
        if end <= self.start {
            return Err(ValidationError::EmptyNote {
                index,
                start: self.start,
                end,
            });
        }
        if end > steps {
            return Err(ValidationError::NoteOverrun { index, end });
        }
        if !(0.0..=1.0).contains(&self.velocity) {
            return Err(ValidationError::NoteVelocity {
                index,
                velocity: self.velocity,
            });
        }
        Ok(())
    }
}

/// Ordered notes of one bar.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteList {
    pub notes: Vec<Note>,
}

impl NoteList {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.notes
            .iter()
            .enumerate()
            .try_for_each(|(i, n)| n.validate(i))
    }

    /// One event per note, ordered by start step (stable for equal starts).
    pub fn compile(&self, slot: usize) -> Result<Vec<ScheduledEvent>, ValidationError> {
        self.validate()?;
        let mut events: Vec<ScheduledEvent> = self
            .notes
            .iter()
            .map(|n| {
                ScheduledEvent::note(
                    slot,
                    n.start as u32,
                    n.pitch as u8,
                    n.length as u32,
                    n.velocity,
                )
            })
            .collect();
        events.sort_by_key(|e| e.step);
        Ok(events)
    }
}
