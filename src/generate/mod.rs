//! Where new bars come from.
//!
//! The live system asks a remote generator; [`SeededGenerator`] is the offline
//! stand-in. Every bar it makes is a pure function of its seed, so a seed is
//! enough to regenerate or vary a bar.

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::bar::{Bar, BarContent, BarKind, DrumGrid, InputError, Note, NoteList, SampleRanges};
use crate::event::STEPS_PER_BAR;
use crate::session::Track;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("bar source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Input(#[from] InputError),
}

/// Supplies generated bars for a track.
pub trait BarSource {
    /// `count` fresh bars for `track`.
    fn request(&mut self, track: Track, count: usize) -> Result<Vec<Bar>, SourceError>;

    /// A variation of `bar`, derived from its seed.
    fn vary(&mut self, track: Track, bar: &Bar) -> Result<Bar, SourceError>;
}

/// Minor pentatonic degrees, in semitones above the root.
const PENTATONIC: [i32; 5] = [0, 3, 5, 7, 10];

/// Offline generator producing deterministic bars from a seed sequence.
#[derive(Debug, Clone)]
pub struct SeededGenerator {
    next_seed: u64,
    instruments: usize,
    samples: Vec<String>,
}

impl SeededGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            next_seed: seed,
            instruments: 3,
            samples: vec![
                "synth/pads/pad_01.wav".into(),
                "synth/pads/pad_02.wav".into(),
                "synth/stabs/stab_01.wav".into(),
                "synth/textures/tex_01.wav".into(),
            ],
        }
    }

    /// Number of drum rows per grid (the drum kit size).
    pub fn with_instruments(mut self, instruments: usize) -> Self {
        self.instruments = instruments;
        self
    }

    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = samples;
        self
    }

    fn take_seed(&mut self) -> u64 {
        let seed = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(1);
        seed
    }

    /// The bar `seed` always produces for `track`.
    pub fn generate(&self, track: Track, seed: u64) -> Bar {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let content = match track {
            Track::Drums => BarContent::Drum(self.drum_grid(&mut rng)),
            Track::Bassline => BarContent::Note(note_line(&mut rng, 36, 2..=4)),
            Track::Melody => BarContent::Note(note_line(&mut rng, 60, 3..=7)),
            Track::Sounds => BarContent::Sample(self.sample_ranges(&mut rng)),
        };
        Bar::new(content).with_seed(seed).with_hue(hue(seed))
    }

    fn drum_grid(&self, rng: &mut ChaCha8Rng) -> DrumGrid {
        let rows: Vec<Vec<f32>> = (0..self.instruments)
            .map(|row| {
                (0..STEPS_PER_BAR as usize)
                    .map(|step| {
                        let p = onset_probability(row, step);
                        if rng.gen_bool(p) {
                            rng.gen_range(0.3..=1.0)
                        } else {
                            rng.gen_range(0.0..0.2)
                        }
                    })
                    .collect()
            })
            .collect();
        DrumGrid::new(rows)
    }

    fn sample_ranges(&self, rng: &mut ChaCha8Rng) -> SampleRanges {
        if self.samples.is_empty() {
            return SampleRanges::default();
        }
        let mut trig = vec![0.0; STEPS_PER_BAR as usize];
        trig[0] = 1.0;
        for step in (4..STEPS_PER_BAR as usize).step_by(4) {
            if rng.gen_bool(0.4) {
                trig[step] = 1.0;
            }
        }
        let onsets = trig.iter().filter(|&&t| t == 1.0).count();
        let refs: Vec<String> = (0..onsets)
            .filter_map(|_| self.samples.choose(rng).cloned())
            .collect();
        // trig and refs are built to match, so this cannot fail
        SampleRanges::from_trig(&trig, &refs).unwrap_or_default()
    }
}

impl Default for SeededGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BarSource for SeededGenerator {
    fn request(&mut self, track: Track, count: usize) -> Result<Vec<Bar>, SourceError> {
        Ok((0..count)
            .map(|_| {
                let seed = self.take_seed();
                self.generate(track, seed)
            })
            .collect())
    }

    fn vary(&mut self, track: Track, bar: &Bar) -> Result<Bar, SourceError> {
        if BarKind::from(track) != bar.kind() {
            return Err(SourceError::Unavailable(format!(
                "cannot vary a {} bar on the {} track",
                bar.kind(),
                track
            )));
        }
        let salt = self.take_seed();
        let seed = bar.seed.unwrap_or(salt);
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ salt.rotate_left(32));
        let content = match &bar.content {
            BarContent::Drum(grid) => BarContent::Drum(jitter(grid, &mut rng)),
            BarContent::Note(notes) => BarContent::Note(transpose_some(notes, &mut rng)),
            BarContent::Sample(_) => BarContent::Sample(self.sample_ranges(&mut rng)),
        };
        let mut varied = Bar::new(content).with_seed(seed);
        varied.hue = bar.hue;
        Ok(varied)
    }
}

fn hue(seed: u64) -> f32 {
    (seed.wrapping_mul(137) % 360) as f32
}

/// Kick on quarters, snare on the backbeat, hats on eighths.
fn onset_probability(row: usize, step: usize) -> f64 {
    match row {
        0 if step % 4 == 0 => 0.85,
        1 if step == 4 || step == 12 => 0.9,
        2 if step % 2 == 0 => 0.7,
        _ => 0.1,
    }
}

fn note_line(rng: &mut ChaCha8Rng, root: i32, count: std::ops::RangeInclusive<usize>) -> NoteList {
    let count = rng.gen_range(count);
    let mut starts: Vec<i32> = (0..STEPS_PER_BAR as i32).collect();
    starts.shuffle(rng);
    starts.truncate(count);
    starts.sort_unstable();

    let notes = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let next = starts.get(i + 1).copied().unwrap_or(STEPS_PER_BAR as i32);
            let length = rng.gen_range(1..=next - start);
            let degree = PENTATONIC[rng.gen_range(0..PENTATONIC.len())];
            let octave = if rng.gen_bool(0.2) { 12 } else { 0 };
            Note::new(root + degree + octave, start, length, rng.gen_range(0.5..=1.0))
        })
        .collect();
    NoteList::new(notes)
}

fn jitter(grid: &DrumGrid, rng: &mut ChaCha8Rng) -> DrumGrid {
    let rows = grid
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|&v| (v + rng.gen_range(-0.2..=0.2)).clamp(0.0, 1.0))
                .collect()
        })
        .collect();
    DrumGrid::new(rows)
}

fn transpose_some(notes: &NoteList, rng: &mut ChaCha8Rng) -> NoteList {
    let notes = notes
        .notes
        .iter()
        .map(|n| {
            let shift = match rng.gen_range(0..4) {
                0 => -12,
                1 => 12,
                _ => 0,
            };
            let pitch = n.pitch + shift;
            let pitch = if (0..=127).contains(&pitch) { pitch } else { n.pitch };
            Note::new(pitch, n.start, n.length, n.velocity)
        })
        .collect();
    NoteList::new(notes)
}
