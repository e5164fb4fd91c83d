//! Bars — one generated 16-step fragment of a single track type.
//!
//! A [`Bar`] is immutable once created. Its symbolic content is expanded into
//! [`ScheduledEvent`]s relative to the slot it occupies; the drum threshold is
//! the only outside parameter and arrives through [`CompileContext`].

pub mod drum;
pub mod error;
pub mod input;
pub mod note;
pub mod pitch;
pub mod sample;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use drum::DrumGrid;
pub use error::{InputError, ValidationError};
pub use note::{Note, NoteList};
pub use sample::{SampleRange, SampleRanges};

use crate::event::ScheduledEvent;

/// Default drum velocity gate.
pub const DEFAULT_THRESHOLD: f32 = 0.2;

/// Which variant a bar (or an arrangement) holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarKind {
    Drum,
    Note,
    Sample,
}

impl fmt::Display for BarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarKind::Drum => write!(f, "drum"),
            BarKind::Note => write!(f, "note"),
            BarKind::Sample => write!(f, "sample"),
        }
    }
}

/// Variant payload of a bar.
#[derive(Debug, Clone, PartialEq)]
pub enum BarContent {
    Drum(DrumGrid),
    Note(NoteList),
    Sample(SampleRanges),
}

/// Arrangement-wide parameters that shape compilation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileContext {
    /// Drum entries below this velocity are gated out.
    pub threshold: f32,
}

impl Default for CompileContext {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// One generated fragment plus its identity metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub content: BarContent,
    /// Backend regeneration handle, used to request variations.
    pub seed: Option<u64>,
    /// Display hue in degrees. Cosmetic only.
    pub hue: Option<f32>,
}

impl Bar {
    pub fn new(content: BarContent) -> Self {
        Self {
            content,
            seed: None,
            hue: None,
        }
    }

    pub fn drum(grid: DrumGrid) -> Self {
        Self::new(BarContent::Drum(grid))
    }

    pub fn note(notes: NoteList) -> Self {
        Self::new(BarContent::Note(notes))
    }

    pub fn sample(ranges: SampleRanges) -> Self {
        Self::new(BarContent::Sample(ranges))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_hue(mut self, hue: f32) -> Self {
        self.hue = Some(hue);
        self
    }

    pub fn kind(&self) -> BarKind {
        match self.content {
            BarContent::Drum(_) => BarKind::Drum,
            BarContent::Note(_) => BarKind::Note,
            BarContent::Sample(_) => BarKind::Sample,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.content {
            BarContent::Drum(grid) => grid.validate(),
            BarContent::Note(notes) => notes.validate(),
            BarContent::Sample(ranges) => ranges.validate(),
        }
    }

    /// Expand into events positioned in `slot`.
    pub fn compile(
        &self,
        slot: usize,
        ctx: &CompileContext,
    ) -> Result<Vec<ScheduledEvent>, ValidationError> {
        match &self.content {
            BarContent::Drum(grid) => grid.compile(slot, ctx.threshold),
            BarContent::Note(notes) => notes.compile(slot),
            BarContent::Sample(ranges) => ranges.compile(slot),
        }
    }
}

/// Check a threshold lies in `[0, 1]`.
pub fn validate_threshold(threshold: f32) -> Result<f32, ValidationError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ValidationError::Threshold(threshold))
    }
}
