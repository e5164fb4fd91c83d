//! The compiled event, consumed by playback and MIDI export.
//!
//! A [`ScheduledEvent`] is addressed by slot and step, never by wall-clock time.
//! The transport resolves it to audio time when it fires.

use super::beat::{Beat, MusicalTime, STEPS_PER_BAR};

/// What the event triggers.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// A drum hit on the given instrument row of the grid.
    Drum { instrument: usize },
    /// A pitched note (MIDI note number, before any track pitch offset).
    Note { pitch: u8 },
    /// A sample playback, by full sample reference.
    Sample { sample: String },
}

/// One compiled event of an arrangement.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    /// Arrangement slot the owning bar sits in.
    pub slot: usize,
    /// Step within the bar, `0..16`.
    pub step: u32,
    pub trigger: Trigger,
    /// Length in steps.
    pub duration_steps: u32,
    /// Velocity in the range 0.0–1.0.
    pub velocity: f32,
}

impl ScheduledEvent {
    pub fn drum(slot: usize, step: u32, instrument: usize, velocity: f32) -> Self {
        Self {
            slot,
            step,
            trigger: Trigger::Drum { instrument },
            duration_steps: 1,
            velocity,
        }
    }

    pub fn note(slot: usize, step: u32, pitch: u8, length: u32, velocity: f32) -> Self {
        Self {
            slot,
            step,
            trigger: Trigger::Note { pitch },
            duration_steps: length,
            velocity,
        }
    }

    pub fn sample(slot: usize, step: u32, sample: impl Into<String>, length: u32) -> Self {
        Self {
            slot,
            step,
            trigger: Trigger::Sample {
                sample: sample.into(),
            },
            duration_steps: length,
            velocity: 1.0,
        }
    }

    /// Musical position: `(slot, step div 4, step mod 4)`.
    pub fn time(&self) -> MusicalTime {
        MusicalTime::at_step(self.slot, self.step)
    }

    /// Length in transport notation, e.g. `0:0:2` for two steps.
    pub fn duration(&self) -> MusicalTime {
        MusicalTime::from_steps(self.duration_steps)
    }

    /// Absolute position from the start of the loop.
    pub fn start(&self) -> Beat {
        Beat::from_steps(self.slot as u64 * STEPS_PER_BAR as u64 + self.step as u64)
    }

    /// Absolute end position (start + duration).
    pub fn end(&self) -> Beat {
        self.start() + Beat::from_steps(self.duration_steps as u64)
    }
}
