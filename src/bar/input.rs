//! Backend payload parsing.
//!
//! The generator answers with `{"ok": true, "<key>": [...]}` where the key is
//! `beat_grid` for drums and `synth_data` for samples. Bar files on disk may
//! also hold the bare array. JSON is read through `serde_yaml`.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{InputError, ValidationError};
use super::{Bar, BarKind, DrumGrid, NoteList, SampleRanges};

fn default_ok() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Envelope {
        #[serde(default = "default_ok")]
        ok: bool,
        #[serde(alias = "beat_grid", alias = "synth_data", alias = "note_data")]
        bars: Vec<T>,
    },
    Bare(Vec<T>),
}

fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, InputError> {
    match serde_yaml::from_str::<Payload<T>>(text)? {
        Payload::Envelope { ok: false, .. } => Err(InputError::NotOk),
        Payload::Envelope { bars, .. } | Payload::Bare(bars) => Ok(bars),
    }
}

/// Parse a generator payload into validated bars of `kind`.
pub fn parse_bars(kind: BarKind, text: &str) -> Result<Vec<Bar>, InputError> {
    let bars: Vec<Bar> = match kind {
        BarKind::Drum => parse_payload::<DrumGrid>(text)?
            .into_iter()
            .map(Bar::drum)
            .collect(),
        BarKind::Note => parse_payload::<NoteList>(text)?
            .into_iter()
            .map(Bar::note)
            .collect(),
        BarKind::Sample => parse_payload::<SampleRanges>(text)?
            .into_iter()
            .map(Bar::sample)
            .collect(),
    };
    validate_all(&bars)?;
    Ok(bars)
}

fn validate_all(bars: &[Bar]) -> Result<(), InputError> {
    bars.iter()
        .enumerate()
        .try_for_each(|(index, bar)| {
            bar.validate()
                .map_err(|source: ValidationError| InputError::Invalid { index, source })
        })
}
