//! Drum bars — a velocity grid of `instrument × 16 steps`.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::event::{ScheduledEvent, STEPS_PER_BAR};

/// `velocity[instrument][step]`, each value in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrumGrid {
    pub rows: Vec<Vec<f32>>,
}

impl DrumGrid {
    pub fn new(rows: Vec<Vec<f32>>) -> Self {
        Self { rows }
    }

    /// Number of instrument rows.
    pub fn instruments(&self) -> usize {
        self.rows.len()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let expected = STEPS_PER_BAR as usize;
        for (row, values) in self.rows.iter().enumerate() {
            if values.len() != expected {
                return Err(ValidationError::RowLength {
                    row,
                    len: values.len(),
                    expected,
                });
            }
            for (step, &value) in values.iter().enumerate() {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ValidationError::DrumVelocity { row, step, value });
                }
            }
        }
        Ok(())
    }

    /// Number of grid entries at or above `threshold`.
    pub fn count_at_or_above(&self, threshold: f32) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|&&v| v >= threshold)
            .count()
    }

    /// Expand into one-step events for every entry with velocity ≥ `threshold`.
    ///
    /// Velocity is the raw grid value. Events are ordered by step; rows sharing
    /// a step stay in row order.
    pub fn compile(
        &self,
        slot: usize,
        threshold: f32,
    ) -> Result<Vec<ScheduledEvent>, ValidationError> {
        self.validate()?;
        let mut events: Vec<ScheduledEvent> = self
            .rows
            .iter()
            .enumerate()
            .flat_map(|(row, values)| {
                values
                    .iter()
                    .enumerate()
                    .filter(|&(_, &v)| v >= threshold)
                    .map(move |(step, &v)| ScheduledEvent::drum(slot, step as u32, row, v))
            })
            .collect();
        events.sort_by_key(|e| e.step);
        Ok(events)
    }
}
