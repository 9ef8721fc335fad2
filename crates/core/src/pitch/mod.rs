//! Conversions between kern pitch tokens and the base-40 pitch space.
//!
//! Base-40 gives every spelling from double flat to double sharp its own
//! number, five per letter, with a spare slot between C/D, D/E, F/G, G/A and
//! A/B. Octave `o` starts at `o * 40`; middle C (`c`) is 162.

/// Base-40 steps in one octave.
pub const OCTAVE: i32 = 40;

/// Base-40 pitch class of each natural letter, C through B.
const NATURALS: [(char, i32); 7] = [
    ('c', 2),
    ('d', 8),
    ('e', 14),
    ('f', 19),
    ('g', 25),
    ('a', 31),
    ('b', 37),
];

/// Semitone above C for every base-40 pitch class. Unused slots take the
/// value between their neighbours.
const SEMITONES: [i32; 40] = [
    -2, -1, 0, 1, 2, 3, 0, 1, 2, 3, 4, 5, 2, 3, 4, 5, 6, 3, 4, 5, 6, 7, 6, 5, 6, 7, 8, 9, 8, 7, 8, 9,
    10, 11, 10, 9, 10, 11, 12, 13,
];

/// Diatonic step above C for every base-40 pitch class.
const STEPS: [i32; 40] = [
    0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 5, 5, 5,
    5, 5, 5, 6, 6, 6, 6, 6,
];

/// Interval quality for every base-40 interval class, paired with its
/// diatonic number within the octave (1-based).
const INTERVAL_NAMES: [(&str, i32); 40] = [
    ("P", 1),
    ("A", 1),
    ("AA", 1),
    ("", 0),
    ("d", 2),
    ("m", 2),
    ("M", 2),
    ("A", 2),
    ("AA", 2),
    ("", 0),
    ("d", 3),
    ("m", 3),
    ("M", 3),
    ("A", 3),
    ("AA", 3),
    ("dd", 4),
    ("d", 4),
    ("P", 4),
    ("A", 4),
    ("AA", 4),
    ("", 0),
    ("dd", 5),
    ("d", 5),
    ("P", 5),
    ("A", 5),
    ("AA", 5),
    ("", 0),
    ("d", 6),
    ("m", 6),
    ("M", 6),
    ("A", 6),
    ("AA", 6),
    ("", 0),
    ("d", 7),
    ("m", 7),
    ("M", 7),
    ("A", 7),
    ("AA", 7),
    ("dd", 8),
    ("d", 8),
];

fn split_octave(base40: i32) -> (i32, usize) {
    (base40.div_euclid(OCTAVE), base40.rem_euclid(OCTAVE) as usize)
}

/// Decodes the first pitch of a kern token. Returns `None` when the token
/// carries no pitch letter at all.
pub fn kern_to_base40(token: &str) -> Option<i32> {
    let first = token.split(' ').find(|part| !part.is_empty())?;
    let start = first.find(|c: char| matches!(c.to_ascii_lowercase(), 'a'..='g'))?;
    let letter = first[start..].chars().next()?;
    let repeats = first[start..].chars().take_while(|c| *c == letter).count() as i32;
    let octave = if letter.is_ascii_lowercase() {
        3 + repeats
    } else {
        4 - repeats
    };
    let lower = letter.to_ascii_lowercase();
    let natural = NATURALS.iter().find(|(name, _)| *name == lower)?.1;
    let accidental: i32 = first
        .chars()
        .map(|c| match c {
            '#' => 1,
            '-' => -1,
            _ => 0,
        })
        .sum();
    Some(octave * OCTAVE + natural + accidental)
}

/// Spells a base-40 pitch as a kern token (no duration).
pub fn base40_to_kern(base40: i32) -> String {
    let (octave, class) = split_octave(base40);
    let class = class as i32;
    let (letter, natural) = NATURALS
        .iter()
        .min_by_key(|(_, natural)| (class - natural).abs())
        .copied()
        .unwrap_or(('c', 2));
    let alteration = class - natural;

    let mut out = String::new();
    if octave >= 4 {
        for _ in 0..(octave - 3) {
            out.push(letter);
        }
    } else {
        for _ in 0..(4 - octave).max(1) {
            out.push(letter.to_ascii_uppercase());
        }
    }
    let mark = if alteration > 0 { '#' } else { '-' };
    for _ in 0..alteration.abs() {
        out.push(mark);
    }
    out
}

/// MIDI key number of a base-40 pitch (middle C = 60).
pub fn base40_to_midi(base40: i32) -> i32 {
    let (octave, class) = split_octave(base40);
    (octave + 1) * 12 + SEMITONES[class]
}

/// Diatonic step number of a base-40 pitch (octave * 7 + letter index).
pub fn base40_to_diatonic(base40: i32) -> i32 {
    let (octave, class) = split_octave(base40);
    octave * 7 + STEPS[class]
}

/// Interval name for a base-40 interval, e.g. `M3`, `P12`, `-m2`.
pub fn base40_to_interval_name(interval: i32) -> String {
    let sign = if interval < 0 { "-" } else { "" };
    let (octaves, class) = split_octave(interval.abs());
    let (quality, number) = INTERVAL_NAMES[class];
    if number == 0 {
        return format!("{sign}X");
    }
    format!("{sign}{quality}{}", number + octaves * 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_kern_octaves_and_accidentals() {
        assert_eq!(kern_to_base40("4c"), Some(162));
        assert_eq!(kern_to_base40("4C"), Some(122));
        assert_eq!(kern_to_base40("2cc#"), Some(203));
        assert_eq!(kern_to_base40("8BB-"), Some(116));
        assert_eq!(kern_to_base40("[4e"), Some(174));
        assert_eq!(kern_to_base40("4en"), Some(174));
        assert_eq!(kern_to_base40("4r"), None);
        assert_eq!(kern_to_base40("4c 4e 4g"), Some(162));
    }

    #[test]
    fn spells_base40_as_kern() {
        assert_eq!(base40_to_kern(162), "c");
        assert_eq!(base40_to_kern(122), "C");
        assert_eq!(base40_to_kern(203), "cc#");
        assert_eq!(base40_to_kern(116), "BB-");
        for token in ["a", "B-", "ff#", "GG", "e--"] {
            let pitch = kern_to_base40(token).unwrap();
            assert_eq!(base40_to_kern(pitch), token);
        }
    }

    #[test]
    fn derives_midi_and_diatonic_numbers() {
        assert_eq!(base40_to_midi(162), 60);
        assert_eq!(base40_to_midi(kern_to_base40("a").unwrap()), 69);
        assert_eq!(base40_to_midi(kern_to_base40("B-").unwrap()), 58);
        assert_eq!(base40_to_diatonic(162), 28);
        assert_eq!(base40_to_diatonic(kern_to_base40("b#").unwrap()), 34);
    }

    #[test]
    fn names_intervals() {
        assert_eq!(base40_to_interval_name(0), "P1");
        assert_eq!(base40_to_interval_name(12), "M3");
        assert_eq!(base40_to_interval_name(23), "P5");
        assert_eq!(base40_to_interval_name(40), "P8");
        assert_eq!(base40_to_interval_name(46), "M9");
        assert_eq!(base40_to_interval_name(-5), "-m2");
    }
}
