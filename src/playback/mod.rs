//! Playback contract — typed messages delivered to the synthesis layer when
//! scheduled events fire.
//!
//! Each bar variant resolves to exactly one [`PlaybackSink`] call. Messages
//! carry everything the synthesis side needs (musical time, block-relative
//! frame offset, and the variant payload), so sinks never reach back into
//! arrangement state.

pub mod queue;

pub use queue::{queue_sink, Firing, QueueReceiver, QueueSink};

use crate::bar::pitch::midi_to_frequency;
use crate::bar::sample::sample_id;
use crate::event::{MusicalTime, ScheduledEvent, Trigger};

/// A drum hit: `(instrument, length, velocity, time)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrumHit {
    pub instrument: usize,
    pub length: MusicalTime,
    pub velocity: f32,
    pub time: MusicalTime,
    /// Frames from the start of the current audio block.
    pub frame_offset: u32,
}

/// A pitched note: `(frequency, length, time)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteOn {
    pub pitch: u8,
    pub frequency: f64,
    pub length: MusicalTime,
    pub velocity: f32,
    pub time: MusicalTime,
    pub frame_offset: u32,
}

/// A sample trigger: `(time, sample id, length)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTrigger {
    pub time: MusicalTime,
    /// File name of the sample, the key used by sample caches.
    pub sample_id: String,
    pub length: MusicalTime,
    pub frame_offset: u32,
}

/// Receives resolved events from the transport.
pub trait PlaybackSink {
    fn drum(&mut self, hit: DrumHit);
    fn note(&mut self, note: NoteOn);
    fn sample(&mut self, trigger: SampleTrigger);

    /// Whether the sample cache holds `sample_id`. Unloaded samples are skipped.
    fn sample_loaded(&self, _sample_id: &str) -> bool {
        true
    }
}

/// Resolve one event into the matching sink call.
///
/// Returns `false` if the event was skipped because its sample is not loaded.
pub fn fire(event: &ScheduledEvent, frame_offset: u32, sink: &mut dyn PlaybackSink) -> bool {
    let time = event.time();
    let length = event.duration();
    match &event.trigger {
        Trigger::Drum { instrument } => {
            sink.drum(DrumHit {
                instrument: *instrument,
                length,
                velocity: event.velocity,
                time,
                frame_offset,
            });
        }
        Trigger::Note { pitch } => {
            sink.note(NoteOn {
                pitch: *pitch,
                frequency: midi_to_frequency(*pitch),
                length,
                velocity: event.velocity,
                time,
                frame_offset,
            });
        }
        Trigger::Sample { sample } => {
            let id = sample_id(sample);
            if !sink.sample_loaded(id) {
                log::debug!("sample {id} not loaded at {time}, skipping");
                return false;
            }
            sink.sample(SampleTrigger {
                time,
                sample_id: id.to_string(),
                length,
                frame_offset,
            });
        }
    }
    true
}

/// Sink that records every call, for tests and offline inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub drums: Vec<DrumHit>,
    pub notes: Vec<NoteOn>,
    pub samples: Vec<SampleTrigger>,
    /// Sample ids reported as loaded; `None` means everything is loaded.
    pub loaded: Option<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the listed sample ids count as loaded.
    pub fn with_loaded(ids: &[&str]) -> Self {
        Self {
            loaded: Some(ids.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Total calls received.
    pub fn len(&self) -> usize {
        self.drums.len() + self.notes.len() + self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PlaybackSink for RecordingSink {
    fn drum(&mut self, hit: DrumHit) {
        self.drums.push(hit);
    }

    fn note(&mut self, note: NoteOn) {
        self.notes.push(note);
    }

    fn sample(&mut self, trigger: SampleTrigger) {
        self.samples.push(trigger);
    }

    fn sample_loaded(&self, sample_id: &str) -> bool {
        match &self.loaded {
            Some(ids) => ids.iter().any(|id| id == sample_id),
            None => true,
        }
    }
}
