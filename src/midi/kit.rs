//! Maps drum grid rows to General MIDI percussion notes.

use std::collections::BTreeMap;

use super::ExportError;
use crate::bar::pitch::parse_note_name;

/// Rows of a drum grid, in order, mapped to MIDI notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrumKitMap {
    names: Vec<String>,
    notes: Vec<u8>,
}

impl DrumKitMap {
    pub fn new(entries: Vec<(String, u8)>) -> Self {
        let (names, notes) = entries.into_iter().unzip();
        Self { names, notes }
    }

    /// Build from instrument name → note name (`"C2"`, `"F#2"`).
    ///
    /// Rows follow the sorted instrument names, which is why the defaults carry
    /// a numeric prefix.
    pub fn from_note_names(entries: &BTreeMap<String, String>) -> Result<Self, ExportError> {
        let mut mapped = Vec::with_capacity(entries.len());
        for (instrument, name) in entries {
            let note = parse_note_name(name).ok_or_else(|| ExportError::NoteName {
                instrument: instrument.clone(),
                name: name.clone(),
            })?;
            mapped.push((instrument.clone(), note));
        }
        Ok(Self::new(mapped))
    }

    /// MIDI note for grid row `instrument`.
    pub fn note(&self, instrument: usize) -> Option<u8> {
        self.notes.get(instrument).copied()
    }

    pub fn name(&self, instrument: usize) -> Option<&str> {
        self.names.get(instrument).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl Default for DrumKitMap {
    /// Kick, snare, closed hi-hat.
    fn default() -> Self {
        Self::new(vec![
            ("00_KD".into(), 36),
            ("01_SD".into(), 38),
            ("02_HH".into(), 42),
        ])
    }
}
