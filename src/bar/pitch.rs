//! Note names to MIDI numbers, MIDI numbers to frequency.

/// Concert pitch of A4 (MIDI 69).
pub const A4_HZ: f64 = 440.0;

/// Equal-tempered frequency of a MIDI note: `440 * 2^((note - 69) / 12)`.
pub fn midi_to_frequency(note: u8) -> f64 {
    A4_HZ * 2f64.powf((note as f64 - 69.0) / 12.0)
}

/// Parse a note name string into a MIDI note number.
///
/// Format: `<letter><optional accidental><octave>`
/// - Letter: C, D, E, F, G, A, B
/// - Accidental: # (sharp) or b (flat)
/// - Octave: -1 to 9 (C4 = middle C = MIDI 60)
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.chars().peekable();

    let base: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let accidental = match chars.peek() {
        Some('#') => {
            chars.next();
            1
        }
        Some('b') => {
            chars.next();
            -1
        }
        _ => 0,
    };

    let octave: i32 = chars.collect::<String>().parse().ok()?;
    let midi = (octave + 1) * 12 + base + accidental;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn a4_is_440() {
        assert_approx_eq!(midi_to_frequency(69), 440.0, 1e-9);
    }

    #[test]
    fn middle_c_frequency() {
        assert_approx_eq!(midi_to_frequency(60), 261.63, 0.01);
    }

    #[test]
    fn octave_doubles() {
        assert_approx_eq!(midi_to_frequency(81), 880.0, 1e-9);
        assert_approx_eq!(midi_to_frequency(57), 220.0, 1e-9);
    }

    #[test]
    fn middle_c() {
        assert_eq!(parse_note_name("C4"), Some(60));
    }

    #[test]
    fn drum_kit_defaults() {
        assert_eq!(parse_note_name("C2"), Some(36));
        assert_eq!(parse_note_name("D2"), Some(38));
        assert_eq!(parse_note_name("F#2"), Some(42));
    }

    #[test]
    fn flats() {
        assert_eq!(parse_note_name("Eb2"), Some(39));
        assert_eq!(parse_note_name("Bb3"), Some(58));
    }

    #[test]
    fn range_limits() {
        assert_eq!(parse_note_name("C-1"), Some(0));
        assert_eq!(parse_note_name("G9"), Some(127));
        assert_eq!(parse_note_name("G#9"), None);
        assert_eq!(parse_note_name("Cb-1"), None);
    }

    #[test]
    fn invalid_names() {
        assert_eq!(parse_note_name(""), None);
        assert_eq!(parse_note_name("X4"), None);
        assert_eq!(parse_note_name("C"), None);
    }
}
