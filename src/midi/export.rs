//! Arrangement → single-track standard MIDI file, using `midly`.
//!
//! Layout of the one track, all meta events at tick 0:
//! track name, 4/4 time signature, tempo, program change, then note on/off
//! pairs by absolute tick, then end-of-track at the end of the loop.

use std::path::Path;
use std::sync::Arc;

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use super::{DrumKitMap, ExportError};
use crate::arrangement::Arrangement;
use crate::bar::BarKind;
use crate::event::{Trigger, STEPS_PER_BAR, STEPS_PER_QUARTER};

/// Tick resolution of exported files.
pub const MIDI_PPQN: u16 = 128;

/// One step (a sixteenth) in file ticks.
pub const TICKS_PER_STEP_MIDI: u32 = MIDI_PPQN as u32 / STEPS_PER_QUARTER;

/// `floor(v * 100)`: the exported velocity range tops out at 100.
fn velocity_byte(velocity: f32) -> u8 {
    (velocity.clamp(0.0, 1.0) * 100.0).floor() as u8
}

fn tempo_micros(bpm: f64) -> u32 {
    (60_000_000.0 / bpm).round() as u32
}

/// A note boundary at an absolute file tick.
#[derive(Debug, Clone, Copy)]
struct Edge {
    tick: u32,
    on: bool,
    key: u8,
    vel: u8,
}

/// Serializes arrangements with a fixed drum kit.
#[derive(Debug, Clone, Default)]
pub struct MidiExporter {
    kit: DrumKitMap,
}

impl MidiExporter {
    pub fn new(kit: DrumKitMap) -> Self {
        Self { kit }
    }

    pub fn kit(&self) -> &DrumKitMap {
        &self.kit
    }

    /// Export `arrangement` at `bpm`. Pure: same input, same bytes.
    pub fn export(&self, arrangement: &Arrangement, bpm: f64) -> Result<Vec<u8>, ExportError> {
        let track = self.track(arrangement, bpm)?;
        let smf = Smf {
            header: Header {
                format: Format::SingleTrack,
                timing: Timing::Metrical(MIDI_PPQN.into()),
            },
            tracks: vec![track],
        };
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes)?;
        Ok(bytes)
    }

    pub fn write_file(
        &self,
        arrangement: &Arrangement,
        bpm: f64,
        path: &Path,
    ) -> Result<(), ExportError> {
        let bytes = self.export(arrangement, bpm)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn edges(&self, arrangement: &Arrangement) -> Result<Vec<Edge>, ExportError> {
        let offset = arrangement.meta().pitch_offset;
        let mut edges = Vec::with_capacity(arrangement.events().len() * 2);
        for event in arrangement.events() {
            let (key, length) = match &event.trigger {
                Trigger::Drum { instrument } => {
                    let key = self.kit.note(*instrument).ok_or(ExportError::UnmappedInstrument {
                        instrument: *instrument,
                    })?;
                    // percussive hits are a fixed sixteenth regardless of gate length
                    (key, TICKS_PER_STEP_MIDI)
                }
                Trigger::Note { pitch } => {
                    let pitch = i32::from(*pitch) + offset;
                    let key = u8::try_from(pitch)
                        .ok()
                        .filter(|k| *k <= 127)
                        .ok_or(ExportError::PitchOutOfRange { pitch })?;
                    (key, event.duration_steps * TICKS_PER_STEP_MIDI)
                }
                Trigger::Sample { .. } => return Err(ExportError::Unsupported(BarKind::Sample)),
            };
            let tick = event.start().rescale(u64::from(MIDI_PPQN)) as u32;
            edges.push(Edge {
                tick,
                on: true,
                key,
                vel: velocity_byte(event.velocity),
            });
            edges.push(Edge {
                tick: tick + length,
                on: false,
                key,
                vel: 0,
            });
        }
        // offs before ons at the same tick, compiled order otherwise
        edges.sort_by_key(|e| (e.tick, e.on));
        Ok(edges)
    }

    fn track<'a>(&self, arrangement: &'a Arrangement, bpm: f64) -> Result<Track<'a>, ExportError> {
        if arrangement.kind() == BarKind::Sample {
            return Err(ExportError::Unsupported(BarKind::Sample));
        }
        let edges = self.edges(arrangement)?;
        let meta = arrangement.meta();
        let channel = meta.channel.into();

        let mut track = Track::new();
        let at_zero = |kind| TrackEvent {
            delta: 0u32.into(),
            kind,
        };
        track.push(at_zero(TrackEventKind::Meta(MetaMessage::TrackName(
            meta.name.as_bytes(),
        ))));
        track.push(at_zero(TrackEventKind::Meta(MetaMessage::TimeSignature(
            4, 2, 24, 8,
        ))));
        track.push(at_zero(TrackEventKind::Meta(MetaMessage::Tempo(
            tempo_micros(bpm).into(),
        ))));
        track.push(at_zero(TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: meta.program.into(),
            },
        }));

        let mut last_tick = 0;
        for edge in &edges {
            let message = if edge.on {
                MidiMessage::NoteOn {
                    key: edge.key.into(),
                    vel: edge.vel.into(),
                }
            } else {
                MidiMessage::NoteOff {
                    key: edge.key.into(),
                    vel: 0.into(),
                }
            };
            track.push(TrackEvent {
                delta: (edge.tick - last_tick).into(),
                kind: TrackEventKind::Midi { channel, message },
            });
            last_tick = edge.tick;
        }

        let loop_end = arrangement.len() as u32 * STEPS_PER_BAR * TICKS_PER_STEP_MIDI;
        let end = loop_end.max(last_tick);
        track.push(TrackEvent {
            delta: (end - last_tick).into(),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        Ok(track)
    }
}

/// Last export of one arrangement, reused until it recompiles or the tempo
/// changes.
///
/// Keyed on the arrangement's generation counter, so a cache must stay with a
/// single arrangement.
#[derive(Debug, Clone, Default)]
pub struct MidiCache {
    entry: Option<((u64, u64), Arc<[u8]>)>,
}

impl MidiCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_export(
        &mut self,
        exporter: &MidiExporter,
        arrangement: &Arrangement,
        bpm: f64,
    ) -> Result<Arc<[u8]>, ExportError> {
        let key = (arrangement.generation(), bpm.to_bits());
        if let Some((cached, bytes)) = &self.entry {
            if *cached == key {
                return Ok(Arc::clone(bytes));
            }
        }
        let bytes: Arc<[u8]> = exporter.export(arrangement, bpm)?.into();
        self.entry = Some((key, Arc::clone(&bytes)));
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::TrackMeta;
    use crate::bar::{Bar, DrumGrid, Note, NoteList, SampleRanges};

    fn drums_with(rows: Vec<Vec<f32>>) -> Arrangement {
        let mut arr = Arrangement::drums(4, 0.2).unwrap();
        arr.add(Arc::new(Bar::drum(DrumGrid::new(rows)))).unwrap();
        arr
    }

    fn row(hits: &[(usize, f32)]) -> Vec<f32> {
        let mut r = vec![0.0; 16];
        for &(step, v) in hits {
            r[step] = v;
        }
        r
    }

    fn bass(notes: Vec<Note>, offset: i32) -> Arrangement {
        let mut arr = Arrangement::new(
            BarKind::Note,
            4,
            TrackMeta::new("bassline", 0, 33, offset),
        );
        arr.add(Arc::new(Bar::note(NoteList::new(notes)))).unwrap();
        arr
    }

    /// (absolute tick, channel, message) for every MIDI event in track 0.
    fn midi_events(bytes: &[u8]) -> Vec<(u32, u8, MidiMessage)> {
        let smf = Smf::parse(bytes).unwrap();
        let mut tick = 0u32;
        let mut out = Vec::new();
        for ev in &smf.tracks[0] {
            tick += u32::from(ev.delta);
            if let TrackEventKind::Midi { channel, message } = ev.kind {
                out.push((tick, u8::from(channel), message));
            }
        }
        out
    }

    #[test]
    fn header_and_meta_events() {
        let bytes = MidiExporter::default()
            .export(&drums_with(vec![row(&[(0, 0.5)])]), 120.0)
            .unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.header.timing, Timing::Metrical(128.into()));
        assert_eq!(smf.tracks.len(), 1);

        let track = &smf.tracks[0];
        assert_eq!(
            track[0].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(&b"drums"[..]))
        );
        assert_eq!(
            track[1].kind,
            TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8))
        );
        assert_eq!(
            track[2].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(500_000.into()))
        );
        assert!(matches!(
            track[3].kind,
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { .. },
                ..
            }
        ));
    }

    #[test]
    fn drum_hit_on_channel_ten() {
        let bytes = MidiExporter::default()
            .export(&drums_with(vec![row(&[(0, 0.5)])]), 110.0)
            .unwrap();
        let events = midi_events(&bytes);
        assert_eq!(
            events[1],
            (0, 9, MidiMessage::NoteOn { key: 36.into(), vel: 50.into() })
        );
        assert_eq!(
            events[2],
            (32, 9, MidiMessage::NoteOff { key: 36.into(), vel: 0.into() })
        );
    }

    #[test]
    fn step_positions_scale_to_file_ticks() {
        let arr = drums_with(vec![row(&[(1, 1.0), (13, 1.0)])]);
        let bytes = MidiExporter::default().export(&arr, 110.0).unwrap();
        let on_ticks: Vec<u32> = midi_events(&bytes)
            .into_iter()
            .filter(|(_, _, m)| matches!(m, MidiMessage::NoteOn { .. }))
            .map(|(t, _, _)| t)
            .collect();
        assert_eq!(on_ticks, vec![32, 13 * 32]);
    }

    #[test]
    fn note_duration_and_offset() {
        let arr = bass(vec![Note::new(60, 4, 2, 0.8)], -24);
        let bytes = MidiExporter::default().export(&arr, 110.0).unwrap();
        let events = midi_events(&bytes);
        assert_eq!(
            events[1],
            (128, 0, MidiMessage::NoteOn { key: 36.into(), vel: 80.into() })
        );
        assert_eq!(
            events[2],
            (192, 0, MidiMessage::NoteOff { key: 36.into(), vel: 0.into() })
        );
    }

    #[test]
    fn offs_precede_ons_at_same_tick() {
        let arr = bass(vec![Note::new(60, 0, 4, 1.0), Note::new(62, 4, 4, 1.0)], 0);
        let bytes = MidiExporter::default().export(&arr, 110.0).unwrap();
        let at_128: Vec<_> = midi_events(&bytes)
            .into_iter()
            .filter(|(t, _, _)| *t == 128)
            .map(|(_, _, m)| m)
            .collect();
        assert_eq!(
            at_128,
            vec![
                MidiMessage::NoteOff { key: 60.into(), vel: 0.into() },
                MidiMessage::NoteOn { key: 62.into(), vel: 100.into() },
            ]
        );
    }

    #[test]
    fn empty_arrangement_is_a_valid_file() {
        let arr = Arrangement::drums(4, 0.2).unwrap();
        let bytes = MidiExporter::default().export(&arr, 110.0).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let last = smf.tracks[0].last().unwrap();
        assert_eq!(last.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack));
        assert_eq!(u32::from(last.delta), 4 * 16 * 32);
        assert_eq!(midi_events(&bytes).len(), 1);
    }

    #[test]
    fn export_is_repeatable() {
        let arr = drums_with(vec![row(&[(0, 0.9), (6, 0.4)]), row(&[(4, 0.7)])]);
        let exporter = MidiExporter::default();
        assert_eq!(
            exporter.export(&arr, 110.0).unwrap(),
            exporter.export(&arr, 110.0).unwrap()
        );
    }

    #[test]
    fn out_of_range_pitch_after_offset() {
        let arr = bass(vec![Note::new(10, 0, 1, 1.0)], -24);
        assert!(matches!(
            MidiExporter::default().export(&arr, 110.0),
            Err(ExportError::PitchOutOfRange { pitch: -14 })
        ));
    }

    #[test]
    fn unmapped_drum_row() {
        let rows = vec![row(&[]), row(&[]), row(&[]), row(&[(0, 1.0)])];
        assert!(matches!(
            MidiExporter::default().export(&drums_with(rows), 110.0),
            Err(ExportError::UnmappedInstrument { instrument: 3 })
        ));
    }

    #[test]
    fn sample_tracks_are_unsupported() {
        let mut arr = Arrangement::new(BarKind::Sample, 4, TrackMeta::new("sounds", 0, 0, 0));
        arr.add(Arc::new(Bar::sample(SampleRanges::default()))).unwrap();
        assert!(matches!(
            MidiExporter::default().export(&arr, 110.0),
            Err(ExportError::Unsupported(BarKind::Sample))
        ));
    }

    #[test]
    fn cache_reuses_until_recompile() {
        let exporter = MidiExporter::default();
        let mut arr = drums_with(vec![row(&[(0, 0.9)])]);
        let mut cache = MidiCache::new();

        let first = cache.get_or_export(&exporter, &arr, 110.0).unwrap();
        let second = cache.get_or_export(&exporter, &arr, 110.0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let retempo = cache.get_or_export(&exporter, &arr, 120.0).unwrap();
        assert!(!Arc::ptr_eq(&first, &retempo));

        arr.recompile().unwrap();
        let third = cache.get_or_export(&exporter, &arr, 110.0).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);
    }

    #[test]
    fn write_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drums.mid");
        let arr = drums_with(vec![row(&[(0, 0.5)])]);
        MidiExporter::default().write_file(&arr, 110.0, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, MidiExporter::default().export(&arr, 110.0).unwrap());
    }

    #[test]
    fn tempo_rounding() {
        assert_eq!(tempo_micros(120.0), 500_000);
        assert_eq!(tempo_micros(110.0), 545_455);
    }

    #[test]
    fn velocity_floor() {
        assert_eq!(velocity_byte(1.0), 100);
        assert_eq!(velocity_byte(0.5), 50);
        assert_eq!(velocity_byte(0.0), 0);
    }
}
