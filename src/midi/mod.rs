//! MIDI export — arrangements as standard MIDI files.

pub mod export;
pub mod kit;

pub use export::{MidiCache, MidiExporter, MIDI_PPQN, TICKS_PER_STEP_MIDI};
pub use kit::DrumKitMap;

use thiserror::Error;

use crate::bar::BarKind;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("pitch {pitch} (after track offset) is outside 0..=127")]
    PitchOutOfRange { pitch: i32 },

    #[error("drum row {instrument} has no kit mapping")]
    UnmappedInstrument { instrument: usize },

    #[error("instrument {instrument}: {name:?} is not a note name")]
    NoteName { instrument: String, name: String },

    #[error("{0} tracks have no MIDI rendition")]
    Unsupported(BarKind),

    #[error("failed to write MIDI data: {0}")]
    Io(#[from] std::io::Error),
}
