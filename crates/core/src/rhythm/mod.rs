//! Rhythmic position of every score line, in quarter notes.

use std::collections::HashMap;

use num_rational::Rational64;

use crate::score::Score;

/// Absolute and in-measure beat position of each line of a score.
#[derive(Debug, Clone, Default)]
pub struct RhythmMap {
    absolute: Vec<Rational64>,
    in_measure: Vec<Rational64>,
}

impl RhythmMap {
    /// Walks the score once, advancing a clock by the shortest pending note
    /// after every data line.
    pub fn analyze(score: &Score) -> Self {
        let mut absolute = Vec::with_capacity(score.len());
        let mut in_measure = Vec::with_capacity(score.len());
        let mut now = Rational64::from_integer(0);
        let mut bar_start = now;
        let mut note_ends: HashMap<usize, Rational64> = HashMap::new();

        for line in score.lines() {
            absolute.push(now);
            in_measure.push(now - bar_start + Rational64::from_integer(1));

            if line.is_barline() {
                bar_start = now;
                continue;
            }
            if !line.is_data() {
                continue;
            }

            for (j, field) in line.fields().iter().enumerate() {
                if !line.is_kern(j) || field.is_null() {
                    continue;
                }
                if let Some(duration) = kern_duration(field.text()) {
                    note_ends.insert(field.spine(), now + duration);
                }
            }

            let next = line
                .fields()
                .iter()
                .filter(|field| field.data_type() == crate::score::KERN)
                .filter_map(|field| pending_end(score, &note_ends, field.spine()))
                .filter(|end| *end > now)
                .min();
            if let Some(next) = next {
                now = next;
            }
        }

        Self {
            absolute,
            in_measure,
        }
    }

    /// Quarter notes elapsed from the start of the score to `line`.
    pub fn absolute_beat(&self, line: usize) -> Rational64 {
        self.absolute
            .get(line)
            .copied()
            .unwrap_or_else(|| Rational64::from_integer(0))
    }

    /// One-based quarter-note position of `line` within its measure.
    pub fn beat_in_measure(&self, line: usize) -> Rational64 {
        self.in_measure
            .get(line)
            .copied()
            .unwrap_or_else(|| Rational64::from_integer(1))
    }
}

fn pending_end(
    score: &Score,
    note_ends: &HashMap<usize, Rational64>,
    spine: usize,
) -> Option<Rational64> {
    let mut current = Some(spine);
    while let Some(id) = current {
        if let Some(end) = note_ends.get(&id) {
            return Some(*end);
        }
        current = score.spine_parent(id);
    }
    None
}

/// Duration in quarter notes of the first note of a kern token. Grace notes
/// last zero; tokens without a rhythm yield `None`.
pub fn kern_duration(token: &str) -> Option<Rational64> {
    let first = token.split(' ').find(|part| !part.is_empty())?;
    if first.contains('q') || first.contains('Q') {
        return Some(Rational64::from_integer(0));
    }

    let start = first.find(|c: char| c.is_ascii_digit())?;
    let rest = &first[start..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let mut tail = &rest[digits.len()..];

    let mut whole = match digits.as_str() {
        "0" => Rational64::from_integer(8),
        "00" => Rational64::from_integer(16),
        "000" => Rational64::from_integer(32),
        _ => Rational64::new(4, digits.parse::<i64>().ok().filter(|v| *v > 0)?),
    };

    if let Some(scaled) = tail.strip_prefix('%') {
        let denominator: String = scaled.chars().take_while(char::is_ascii_digit).collect();
        if let Ok(value) = denominator.parse::<i64>() {
            whole *= Rational64::from_integer(value);
        }
        tail = &scaled[denominator.len()..];
    }

    let dots = tail.chars().filter(|c| *c == '.').count() as u32;
    let mut duration = whole;
    let mut added = whole;
    for _ in 0..dots {
        added = added / Rational64::from_integer(2);
        duration += added;
    }
    Some(duration)
}

/// Formats a number the way a default C-style stream does: at most six
/// significant digits and no trailing zeros.
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let magnitude = value.abs().log10().floor() as i32;
    let precision = (5 - magnitude).max(0) as usize;
    let text = format!("{value:.precision$}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

/// Converts an exact rational to its display form.
pub fn format_rational(value: Rational64) -> String {
    format_decimal(*value.numer() as f64 / *value.denom() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kern_durations() {
        assert_eq!(kern_duration("4c"), Some(Rational64::from_integer(1)));
        assert_eq!(kern_duration("8.d"), Some(Rational64::new(3, 4)));
        assert_eq!(kern_duration("2..e"), Some(Rational64::new(7, 2)));
        assert_eq!(kern_duration("0r"), Some(Rational64::from_integer(8)));
        assert_eq!(kern_duration("12g"), Some(Rational64::new(1, 3)));
        assert_eq!(kern_duration("3%2c"), Some(Rational64::new(8, 3)));
        assert_eq!(kern_duration("8qc"), Some(Rational64::from_integer(0)));
        assert_eq!(kern_duration("c"), None);
    }

    #[test]
    fn tracks_absolute_and_measure_beats() {
        let text = "**kern\t**kern\n=1\t=1\n2c\t4e\n.\t4f\n=2\t=2\n4d\t4g\n*-\t*-\n";
        let score = Score::parse(text).unwrap();
        let rhythm = RhythmMap::analyze(&score);

        assert_eq!(rhythm.absolute_beat(2), Rational64::from_integer(0));
        assert_eq!(rhythm.absolute_beat(3), Rational64::from_integer(1));
        assert_eq!(rhythm.absolute_beat(5), Rational64::from_integer(2));
        assert_eq!(rhythm.beat_in_measure(3), Rational64::from_integer(2));
        assert_eq!(rhythm.beat_in_measure(5), Rational64::from_integer(1));
    }

    #[test]
    fn formats_like_a_stream() {
        assert_eq!(format_decimal(3.0), "3");
        assert_eq!(format_decimal(2.5), "2.5");
        assert_eq!(format_decimal(1.0 / 3.0), "0.333333");
        assert_eq!(format_decimal(12.0 + 2.0 / 3.0), "12.6667");
    }
}
