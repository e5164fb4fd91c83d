//! Sample bars: trigger ranges, each playing one sample reference.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::event::{ScheduledEvent, STEPS_PER_BAR};

/// Steps `[start, end)` playing `sample`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRange {
    pub start: u32,
    pub end: u32,
    /// Full sample reference, e.g. `synth/pads/warm_01.wav`.
    pub sample: String,
}

/// Ordered sample ranges of one bar.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "(Vec<f32>, Vec<String>)")]
pub struct SampleRanges {
    pub ranges: Vec<SampleRange>,
}

impl TryFrom<(Vec<f32>, Vec<String>)> for SampleRanges {
    type Error = ValidationError;

    fn try_from((trig, samples): (Vec<f32>, Vec<String>)) -> Result<Self, Self::Error> {
        Self::from_trig(&trig, &samples)
    }
}

impl SampleRanges {
    pub fn new(ranges: Vec<SampleRange>) -> Self {
        Self { ranges }
    }

    /// Build ranges from a 16-step on/off trigger array.
    ///
    /// Every onset opens a range that runs to the next onset; the last one runs
    /// to the end of the bar. Ranges pair with `samples` in order.
    pub fn from_trig(trig: &[f32], samples: &[String]) -> Result<Self, ValidationError> {
        let expected = STEPS_PER_BAR as usize;
        if trig.len() != expected {
            return Err(ValidationError::TrigLength {
                len: trig.len(),
                expected,
            });
        }

        let mut onsets = Vec::new();
        for (step, &value) in trig.iter().enumerate() {
            if value == 1.0 {
                onsets.push(step as u32);
            } else if value != 0.0 {
                return Err(ValidationError::TrigValue { step, value });
            }
        }

        if samples.len() < onsets.len() {
            return Err(ValidationError::MissingSample {
                ranges: onsets.len(),
                samples: samples.len(),
            });
        }

        let ends = onsets.iter().skip(1).copied().chain([STEPS_PER_BAR]);
        let ranges = onsets
            .iter()
            .zip(ends)
            .zip(samples)
            .map(|((&start, end), sample)| SampleRange {
                start,
                end,
                sample: sample.clone(),
            })
            .collect();
        Ok(Self { ranges })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, r) in self.ranges.iter().enumerate() {
            if r.start >= r.end {
                return Err(ValidationError::EmptyRange {
                    index,
                    start: r.start,
                    end: r.end,
                });
            }
            if r.end > STEPS_PER_BAR {
                return Err(ValidationError::RangeOutOfBar {
                    index,
                    start: r.start,
                    end: r.end,
                });
            }
        }
        Ok(())
    }

    /// One event per range, lasting `end - start` steps.
    pub fn compile(&self, slot: usize) -> Result<Vec<ScheduledEvent>, ValidationError> {
        self.validate()?;
        Ok(self
            .ranges
            .iter()
            .map(|r| ScheduledEvent::sample(slot, r.start, r.sample.clone(), r.end - r.start))
            .collect())
    }
}

/// The identifier a sample cache knows a reference by: its file name.
pub fn sample_id(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}
