//! Musical time representation using integer transport ticks.
//!
//! Uses 192 PPQN, so one sixteenth-note step is exactly 48 ticks and every
//! grid position converts without rounding. Conversion to sample offsets happens
//! only at the playback boundary.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Transport ticks per quarter note.
pub const TRANSPORT_PPQN: u64 = 192;

/// Steps (sixteenth notes) per quarter note.
pub const STEPS_PER_QUARTER: u32 = 4;

/// Quarter notes per bar. The engine only deals in 4/4.
pub const QUARTERS_PER_BAR: u32 = 4;

/// Steps per bar: the fixed grid resolution of every generated fragment.
pub const STEPS_PER_BAR: u32 = STEPS_PER_QUARTER * QUARTERS_PER_BAR;

/// Transport ticks per step.
pub const TICKS_PER_STEP: u64 = TRANSPORT_PPQN / STEPS_PER_QUARTER as u64;

/// Musical time measured in integer ticks at [`TRANSPORT_PPQN`] resolution.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct Beat {
    ticks: u64,
}

impl Beat {
    /// Start of the loop.
    pub const ZERO: Beat = Beat { ticks: 0 };

    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Create a `Beat` from whole quarter notes.
    pub fn from_beats(beats: u32) -> Self {
        Self {
            ticks: beats as u64 * TRANSPORT_PPQN,
        }
    }

    /// Create a `Beat` from whole 4/4 bars.
    pub fn from_bars(bars: u32) -> Self {
        Self::from_beats(bars * QUARTERS_PER_BAR)
    }

    /// Create a `Beat` from an absolute step count (sixteenths from the loop start).
    pub fn from_steps(steps: u64) -> Self {
        Self {
            ticks: steps * TICKS_PER_STEP,
        }
    }

    /// Return the raw tick count.
    pub fn ticks(self) -> u64 {
        self.ticks
    }

    /// Rescale to another tick resolution, rounding down.
    ///
    /// `floor(ppqn * ticks / TRANSPORT_PPQN)`, computed in integers.
    pub fn rescale(self, ppqn: u64) -> u64 {
        self.ticks * ppqn / TRANSPORT_PPQN
    }

    /// Convert this position to a sample offset given BPM and sample rate.
    pub fn to_sample_offset(self, bpm: f64, sample_rate: u32) -> u64 {
        let numerator = self.ticks as f64 * 60.0 * sample_rate as f64;
        let denominator = TRANSPORT_PPQN as f64 * bpm;
        (numerator / denominator).round() as u64
    }
}

impl Ord for Beat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

impl PartialOrd for Beat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Beat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks + rhs.ticks,
        }
    }
}

impl Sub for Beat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks.saturating_sub(rhs.ticks),
        }
    }
}

/// A position in bars/quarters/sixteenths, the transport's own notation.
///
/// Used both for event positions (`bar` = slot index) and for lengths
/// (a two-step note is `0:0:2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MusicalTime {
    pub bar: u32,
    pub quarter: u32,
    pub sixteenth: u32,
}

impl MusicalTime {
    pub fn new(bar: u32, quarter: u32, sixteenth: u32) -> Self {
        Self {
            bar,
            quarter,
            sixteenth,
        }
    }

    /// Split an absolute step count into bars, quarters and sixteenths.
    pub fn from_steps(steps: u32) -> Self {
        Self {
            bar: steps / STEPS_PER_BAR,
            quarter: (steps % STEPS_PER_BAR) / STEPS_PER_QUARTER,
            sixteenth: steps % STEPS_PER_QUARTER,
        }
    }

    /// The position of `step` within bar `slot`.
    pub fn at_step(slot: usize, step: u32) -> Self {
        Self {
            bar: slot as u32,
            quarter: step / STEPS_PER_QUARTER,
            sixteenth: step % STEPS_PER_QUARTER,
        }
    }

    /// Total steps from zero.
    pub fn to_steps(self) -> u64 {
        (self.bar as u64 * QUARTERS_PER_BAR as u64 + self.quarter as u64)
            * STEPS_PER_QUARTER as u64
            + self.sixteenth as u64
    }

    pub fn to_beat(self) -> Beat {
        Beat::from_steps(self.to_steps())
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.bar, self.quarter, self.sixteenth)
    }
}
