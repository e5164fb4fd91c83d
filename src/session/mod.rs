//! Session — four tracks sharing one transport.
//!
//! Every arrangement mutation rebinds that track's schedule on the transport
//! in the same call, so the live schedule always matches the compiled events.
//! The first bar added to an empty arrangement is therefore live immediately.

pub mod config;

pub use config::{ConfigError, SessionConfig, TrackConfig};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::arrangement::{Arrangement, BarPool, TrackMeta};
use crate::bar::input::parse_bars;
use crate::bar::{Bar, BarKind, InputError, ValidationError};
use crate::control::{ControlRegistry, HandlerError};
use crate::event::{Beat, LoopTransport, PlayState, ScheduleBinding, Transport};
use crate::generate::{BarSource, SourceError};
use crate::midi::{ExportError, MidiCache, MidiExporter};
use crate::playback::PlaybackSink;

/// Bars fetched per `/T/new` request.
pub const BARS_PER_REQUEST: usize = 4;

/// Accepted tempo range.
pub const BPM_RANGE: std::ops::RangeInclusive<f64> = 20.0..=300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Track {
    Drums,
    Bassline,
    Melody,
    Sounds,
}

impl Track {
    pub const ALL: [Track; 4] = [Track::Drums, Track::Bassline, Track::Melody, Track::Sounds];

    pub fn name(self) -> &'static str {
        match self {
            Track::Drums => "drums",
            Track::Bassline => "bassline",
            Track::Melody => "melody",
            Track::Sounds => "sounds",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Track> for BarKind {
    fn from(track: Track) -> Self {
        match track {
            Track::Drums => BarKind::Drum,
            Track::Bassline | Track::Melody => BarKind::Note,
            Track::Sounds => BarKind::Sample,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{track} pool has no bar {index} ({len} bars)")]
    PoolIndex {
        track: Track,
        index: usize,
        len: usize,
    },

    #[error("tempo {0} BPM is outside 20..=300")]
    Bpm(f64),
}

/// Pool, arrangement and live schedule of one track.
#[derive(Debug)]
pub struct TrackState {
    pub pool: BarPool,
    pub arrangement: Arrangement,
    binding: ScheduleBinding,
    midi: MidiCache,
}

impl TrackState {
    fn new(arrangement: Arrangement) -> Self {
        Self {
            pool: BarPool::new(arrangement.kind()),
            arrangement,
            binding: ScheduleBinding::new(),
            midi: MidiCache::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.binding.is_bound()
    }
}

pub struct Session {
    tracks: [TrackState; 4],
    transport: LoopTransport,
    exporter: MidiExporter,
    source: Box<dyn BarSource>,
}

impl Session {
    pub fn new(config: &SessionConfig, source: Box<dyn BarSource>) -> Result<Self, SessionError> {
        config.validate()?;
        let slots = config.slots;
        let tracks = [
            TrackState::new(Arrangement::drums(slots, config.threshold)?),
            TrackState::new(Arrangement::new(BarKind::Note, slots, config.bassline.meta())),
            TrackState::new(Arrangement::new(BarKind::Note, slots, config.melody.meta())),
            TrackState::new(Arrangement::new(
                BarKind::Sample,
                slots,
                TrackMeta::new(Track::Sounds.name(), 0, 0, 0),
            )),
        ];
        let bpm = validate_bpm(config.bpm)?;
        Ok(Self {
            tracks,
            transport: LoopTransport::new(bpm, config.sample_rate, slots as u32),
            exporter: MidiExporter::new(config.drum_kit()?),
            source,
        })
    }

    pub fn track(&self, track: Track) -> &TrackState {
        &self.tracks[track.index()]
    }

    pub fn arrangement(&self, track: Track) -> &Arrangement {
        &self.track(track).arrangement
    }

    pub fn pool(&self, track: Track) -> &BarPool {
        &self.track(track).pool
    }

    pub fn transport(&self) -> &LoopTransport {
        &self.transport
    }

    pub fn bpm(&self) -> f64 {
        self.transport.bpm()
    }

    pub fn threshold(&self) -> f32 {
        self.arrangement(Track::Drums).threshold()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.state() == PlayState::Playing
    }

    fn rebind(&mut self, track: Track) {
        let state = &mut self.tracks[track.index()];
        state
            .binding
            .bind(&mut self.transport, state.arrangement.events());
    }

    /// Add generated bars to a track's pool. Returns the new pool size.
    ///
    /// All or nothing: if any bar is invalid or of the wrong kind, none are
    /// added.
    pub fn ingest(&mut self, track: Track, bars: Vec<Bar>) -> Result<usize, SessionError> {
        let pool = &mut self.tracks[track.index()].pool;
        let expected = pool.kind();
        bars.iter().try_for_each(|bar| {
            if bar.kind() != expected {
                return Err(ValidationError::Kind {
                    expected,
                    found: bar.kind(),
                });
            }
            bar.validate()
        })?;
        for bar in bars {
            pool.push(bar);
        }
        Ok(pool.len())
    }

    /// Parse a generator payload and add its bars to the pool.
    pub fn ingest_payload(&mut self, track: Track, text: &str) -> Result<usize, SessionError> {
        let bars = parse_bars(track.into(), text)?;
        self.ingest(track, bars)
    }

    /// Ask the bar source for `count` new bars.
    pub fn request_bars(&mut self, track: Track, count: usize) -> Result<usize, SessionError> {
        let bars = self.source.request(track, count)?;
        log::debug!("{track}: received {} bars", bars.len());
        self.ingest(track, bars)
    }

    /// Ask the bar source for a variation of pool bar `pool_index`; the
    /// variation is appended to the pool.
    pub fn request_variation(
        &mut self,
        track: Track,
        pool_index: usize,
    ) -> Result<usize, SessionError> {
        let bar = Arc::clone(self.pool_bar(track, pool_index)?);
        let varied = self.source.vary(track, &bar)?;
        self.ingest(track, vec![varied])
    }

    fn pool_bar(&self, track: Track, index: usize) -> Result<&Arc<Bar>, SessionError> {
        let pool = self.pool(track);
        pool.get(index).ok_or(SessionError::PoolIndex {
            track,
            index,
            len: pool.len(),
        })
    }

    /// Place pool bar `pool_index` in the lowest free slot.
    ///
    /// `Ok(None)` when the arrangement is full.
    pub fn add_from_pool(
        &mut self,
        track: Track,
        pool_index: usize,
    ) -> Result<Option<usize>, SessionError> {
        let bar = Arc::clone(self.pool_bar(track, pool_index)?);
        let slot = self.tracks[track.index()].arrangement.add(bar)?;
        if slot.is_some() {
            self.rebind(track);
        }
        Ok(slot)
    }

    /// Clear an arrangement slot. Returns `false` if it was already empty.
    pub fn remove_slot(&mut self, track: Track, slot: usize) -> Result<bool, SessionError> {
        let removed = self.tracks[track.index()].arrangement.remove(slot)?;
        if removed {
            self.rebind(track);
        }
        Ok(removed)
    }

    /// Drop a bar from the pool. Slots holding it keep playing it.
    pub fn delete_from_pool(
        &mut self,
        track: Track,
        pool_index: usize,
    ) -> Result<Arc<Bar>, SessionError> {
        let len = self.pool(track).len();
        self.tracks[track.index()]
            .pool
            .remove(pool_index)
            .ok_or(SessionError::PoolIndex {
                track,
                index: pool_index,
                len,
            })
    }

    /// Change the drum velocity gate, recompiling every drum slot.
    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), SessionError> {
        self.tracks[Track::Drums.index()]
            .arrangement
            .set_threshold(threshold)?;
        self.rebind(Track::Drums);
        Ok(())
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), SessionError> {
        self.transport.set_bpm(validate_bpm(bpm)?);
        Ok(())
    }

    pub fn start(&mut self) {
        self.transport.start();
    }

    pub fn stop(&mut self) {
        self.transport.stop();
    }

    /// Start if stopped, stop if playing.
    pub fn toggle_play(&mut self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Advance the transport, firing due events into `sink`.
    pub fn advance(&mut self, frames: u32, sink: &mut dyn PlaybackSink) -> Option<(Beat, Beat)> {
        self.transport.advance_by_frames(frames, sink)
    }

    /// The track as a standard MIDI file at the current tempo. Cached until
    /// the arrangement recompiles or the tempo changes.
    pub fn export_midi(&mut self, track: Track) -> Result<Arc<[u8]>, SessionError> {
        let bpm = self.transport.bpm();
        let state = &mut self.tracks[track.index()];
        Ok(state
            .midi
            .get_or_export(&self.exporter, &state.arrangement, bpm)?)
    }

    pub fn write_midi(&mut self, track: Track, path: &Path) -> Result<(), SessionError> {
        let bytes = self.export_midi(track)?;
        std::fs::write(path, &bytes[..]).map_err(ExportError::from)?;
        Ok(())
    }

    /// Register the session's remote controls.
    ///
    /// Per track `T`: `/T/add`, `/T/remove`, `/T/delete`, `/T/vary` (index
    /// argument) and `/T/new`. Plus `/drums/threshold`, `/transport/bpm` and
    /// `/transport/play`.
    pub fn register_controls(&self, registry: &mut ControlRegistry<Session>) {
        for track in Track::ALL {
            let name = track.name();
            registry.register_trigger(format!("/{name}/add"), move |s: &mut Session, args: &[f32]| {
                s.add_from_pool(track, index_arg(args)?)?;
                Ok(())
            });
            registry.register_trigger(
                format!("/{name}/remove"),
                move |s: &mut Session, args: &[f32]| {
                    s.remove_slot(track, index_arg(args)?)?;
                    Ok(())
                },
            );
            registry.register_trigger(
                format!("/{name}/delete"),
                move |s: &mut Session, args: &[f32]| {
                    s.delete_from_pool(track, index_arg(args)?)?;
                    Ok(())
                },
            );
            registry.register_trigger(format!("/{name}/vary"), move |s: &mut Session, args: &[f32]| {
                s.request_variation(track, index_arg(args)?)?;
                Ok(())
            });
            registry.register_trigger(format!("/{name}/new"), move |s: &mut Session, _: &[f32]| {
                s.request_bars(track, BARS_PER_REQUEST)?;
                Ok(())
            });
        }
        registry.register_value("/drums/threshold", self.threshold(), |s: &mut Session, v| {
            s.set_threshold(v)?;
            Ok(())
        });
        registry.register_value("/transport/bpm", self.bpm() as f32, |s: &mut Session, v| {
            s.set_bpm(f64::from(v))?;
            Ok(())
        });
        registry.register_trigger("/transport/play", |s: &mut Session, _: &[f32]| {
            s.toggle_play();
            Ok(())
        });
    }
}

fn validate_bpm(bpm: f64) -> Result<f64, SessionError> {
    if BPM_RANGE.contains(&bpm) {
        Ok(bpm)
    } else {
        Err(SessionError::Bpm(bpm))
    }
}

/// First argument as a non-negative integer index.
fn index_arg(args: &[f32]) -> Result<usize, HandlerError> {
    let arg = *args.first().ok_or("missing index argument")?;
    if !arg.is_finite() || arg < 0.0 {
        return Err(format!("{arg} is not an index").into());
    }
    Ok(arg as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::{DrumGrid, Note, NoteList};
    use crate::generate::SeededGenerator;
    use crate::playback::RecordingSink;

    fn session() -> Session {
        Session::new(
            &SessionConfig::default(),
            Box::new(SeededGenerator::new(1)),
        )
        .unwrap()
    }

    fn kick(hits: &[(usize, f32)]) -> Bar {
        let mut row = vec![0.0; 16];
        for &(step, v) in hits {
            row[step] = v;
        }
        Bar::drum(DrumGrid::new(vec![row]))
    }

    #[test]
    fn new_session_is_silent() {
        let s = session();
        for track in Track::ALL {
            assert!(s.arrangement(track).is_empty());
            assert!(!s.track(track).is_live());
        }
        assert_eq!(s.bpm(), 110.0);
        assert_eq!(s.transport().loop_length(), 4);
    }

    #[test]
    fn unusable_config_is_rejected() {
        let source = || Box::new(SeededGenerator::new(1));
        let silent = SessionConfig {
            sample_rate: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Session::new(&silent, source()),
            Err(SessionError::Config(ConfigError::ZeroSampleRate))
        ));
        let slotless = SessionConfig {
            slots: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Session::new(&slotless, source()),
            Err(SessionError::Config(ConfigError::ZeroSlots))
        ));
    }

    #[test]
    fn first_bar_becomes_live() {
        let mut s = session();
        s.ingest(Track::Drums, vec![kick(&[(0, 0.5)])]).unwrap();
        assert_eq!(s.add_from_pool(Track::Drums, 0).unwrap(), Some(0));
        assert!(s.track(Track::Drums).is_live());

        s.start();
        let mut sink = RecordingSink::new();
        s.advance(1024, &mut sink);
        assert_eq!(sink.drums.len(), 1);
        assert!((sink.drums[0].velocity - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn removing_last_bar_releases_schedule() {
        let mut s = session();
        s.ingest(Track::Drums, vec![kick(&[(0, 0.5)])]).unwrap();
        s.add_from_pool(Track::Drums, 0).unwrap();
        assert!(s.remove_slot(Track::Drums, 0).unwrap());
        assert!(!s.track(Track::Drums).is_live());
        assert!(!s.remove_slot(Track::Drums, 0).unwrap());
    }

    #[test]
    fn ingest_rejects_wrong_kind() {
        let mut s = session();
        let err = s
            .ingest(Track::Bassline, vec![kick(&[(0, 0.5)])])
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::Kind { .. })
        ));
        assert!(s.pool(Track::Bassline).is_empty());
    }

    #[test]
    fn bad_batch_adds_nothing() {
        let mut s = session();
        let short = Bar::drum(DrumGrid::new(vec![vec![0.5; 3]]));
        assert!(s.ingest(Track::Drums, vec![kick(&[(0, 0.5)]), short]).is_err());
        assert!(s.pool(Track::Drums).is_empty());

        let note = Bar::note(NoteList::new(vec![Note::new(60, 0, 4, 1.0)]));
        assert!(s.ingest(Track::Drums, vec![kick(&[(0, 0.5)]), note]).is_err());
        assert!(s.pool(Track::Drums).is_empty());
        assert_eq!(s.ingest(Track::Drums, vec![kick(&[(0, 0.5)])]).unwrap(), 1);
    }

    #[test]
    fn pool_index_errors() {
        let mut s = session();
        assert!(matches!(
            s.add_from_pool(Track::Melody, 3),
            Err(SessionError::PoolIndex { index: 3, len: 0, .. })
        ));
        assert!(s.delete_from_pool(Track::Melody, 0).is_err());
    }

    #[test]
    fn threshold_change_rebinds_drums() {
        let mut s = session();
        s.ingest(Track::Drums, vec![kick(&[(0, 0.5)])]).unwrap();
        s.add_from_pool(Track::Drums, 0).unwrap();
        s.set_threshold(0.6).unwrap();
        assert!(s.arrangement(Track::Drums).events().is_empty());
        assert!(!s.track(Track::Drums).is_live());
        s.set_threshold(0.2).unwrap();
        assert!(s.track(Track::Drums).is_live());
        assert!(s.set_threshold(2.0).is_err());
        assert!((s.threshold() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn bpm_bounds() {
        let mut s = session();
        s.set_bpm(128.0).unwrap();
        assert_eq!(s.bpm(), 128.0);
        assert!(matches!(s.set_bpm(0.0), Err(SessionError::Bpm(_))));
        assert_eq!(s.bpm(), 128.0);
    }

    #[test]
    fn requests_fill_the_pool() {
        let mut s = session();
        assert_eq!(s.request_bars(Track::Melody, 3).unwrap(), 3);
        assert_eq!(s.request_variation(Track::Melody, 1).unwrap(), 4);
        let pool = s.pool(Track::Melody);
        assert_eq!(pool.get(3).unwrap().seed, pool.get(1).unwrap().seed);
    }

    #[test]
    fn export_is_cached_until_recompile() {
        let mut s = session();
        s.ingest(
            Track::Bassline,
            vec![Bar::note(NoteList::new(vec![Note::new(36, 0, 4, 1.0)]))],
        )
        .unwrap();
        s.add_from_pool(Track::Bassline, 0).unwrap();
        let a = s.export_midi(Track::Bassline).unwrap();
        let b = s.export_midi(Track::Bassline).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        s.set_bpm(120.0).unwrap();
        let c = s.export_midi(Track::Bassline).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn sounds_do_not_export() {
        let mut s = session();
        assert!(matches!(
            s.export_midi(Track::Sounds),
            Err(SessionError::Export(ExportError::Unsupported(_)))
        ));
    }

    #[test]
    fn index_arguments() {
        assert_eq!(index_arg(&[2.0]).unwrap(), 2);
        assert_eq!(index_arg(&[2.9]).unwrap(), 2);
        assert!(index_arg(&[]).is_err());
        assert!(index_arg(&[-1.0]).is_err());
        assert!(index_arg(&[f32::NAN]).is_err());
    }

    #[test]
    fn track_kinds_and_names() {
        assert_eq!(BarKind::from(Track::Melody), BarKind::Note);
        assert_eq!(Track::Sounds.to_string(), "sounds");
    }
}
