//! Raw per-voice pitch table the modules are computed from.

use std::io::Write;

use super::RenderContext;
use crate::config::NumberingSystem;
use crate::pitch::{base40_to_diatonic, base40_to_kern, base40_to_midi};
use crate::rhythm::{format_decimal, format_rational, RhythmMap};
use crate::timeline::{PitchEvent, VoiceTimeline};
use crate::Result;

const RHYTHM_HEADER: [&str; 3] = ["**absq", "**bar", "**beat"];

/// Cell encoding of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Base40,
    Base12,
    Base7,
    /// Kern pitches with ties rebuilt from the tie groups.
    Kern,
}

impl Encoding {
    fn header(self) -> &'static str {
        match self {
            Encoding::Base40 => "**b40",
            Encoding::Base12 => "**b12",
            Encoding::Base7 => "**b7",
            Encoding::Kern => "**kern",
        }
    }
}

pub(super) fn render(context: &RenderContext<'_>, out: &mut dyn Write) -> Result<()> {
    let config = context.config;
    let timelines = context.timelines;
    let voices = timelines.voices();
    if voices.is_empty() {
        return Ok(());
    }

    let encoding = if config.interval.chromatic {
        Encoding::Kern
    } else {
        match config.numbering {
            NumberingSystem::Base40 => Encoding::Base40,
            NumberingSystem::Base12 => Encoding::Base12,
            NumberingSystem::Base7 => Encoding::Base7,
        }
    };
    let rhythm = config
        .layout
        .rhythm
        .then(|| RhythmMap::analyze(context.score));

    let mut header: Vec<&str> = Vec::new();
    if rhythm.is_some() {
        header.extend(RHYTHM_HEADER);
    }
    header.extend(voices.iter().map(|_| encoding.header()));
    writeln!(out, "{}", header.join("\t"))?;

    for row in 0..timelines.rows() {
        let mut cells: Vec<String> = Vec::with_capacity(voices.len() + 3);
        if let Some(rhythm) = &rhythm {
            let first = &voices[0][row];
            let line = first.source_line;
            let beat = rhythm.beat_in_measure(line);
            let beat = (*beat.numer() as f64 / *beat.denom() as f64 - 1.0) * first.beat_scale + 1.0;
            cells.push(format_rational(rhythm.absolute_beat(line)));
            cells.push(first.measure.to_string());
            cells.push(format_decimal(beat));
        }
        cells.extend(voices.iter().map(|voice| cell(encoding, voice, row)));
        writeln!(out, "{}", cells.join("\t"))?;
    }

    let trailer = vec!["*-"; header.len()];
    writeln!(out, "{}", trailer.join("\t"))?;
    Ok(())
}

fn cell(encoding: Encoding, voice: &VoiceTimeline, row: usize) -> String {
    let event = &voice[row];
    if event.is_rest() {
        let rest = if encoding == Encoding::Kern { "r" } else { "0" };
        return rest.to_string();
    }
    let signed = |value: i32| {
        if event.is_sustain() {
            -value
        } else {
            value
        }
    };
    match encoding {
        Encoding::Base40 => event.pitch.to_string(),
        Encoding::Base12 => signed(base40_to_midi(event.magnitude())).to_string(),
        Encoding::Base7 => signed(base40_to_diatonic(event.magnitude())).to_string(),
        Encoding::Kern => kern_cell(event, voice.get(row + 1)),
    }
}

/// Kern spelling with `[`, `_` and `]` restored from tie groups.
fn kern_cell(event: &PitchEvent, next: Option<&PitchEvent>) -> String {
    let continues = next.is_some_and(|next| next.is_sustain() && next.tie_group == event.tie_group);
    let mut text = String::new();
    if event.is_attack() && continues {
        text.push('[');
    }
    text.push_str(&base40_to_kern(event.magnitude()));
    if event.is_sustain() {
        text.push(if continues { '_' } else { ']' });
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Timelines;

    #[test]
    fn kern_cells_rebuild_ties() {
        let timelines = Timelines::from_pitches(&[vec![162, -162, -162, 168, 0]]);
        let voice = timelines.voice(0);
        let cells: Vec<String> = (0..voice.len())
            .map(|row| cell(Encoding::Kern, voice, row))
            .collect();
        assert_eq!(cells, ["[c", "c_", "c]", "d", "r"]);
    }

    #[test]
    fn numeric_cells_keep_the_sustain_sign() {
        let timelines = Timelines::from_pitches(&[vec![162, -162, 0]]);
        let voice = timelines.voice(0);
        assert_eq!(cell(Encoding::Base40, voice, 1), "-162");
        assert_eq!(cell(Encoding::Base12, voice, 1), "-60");
        assert_eq!(cell(Encoding::Base7, voice, 0), "28");
        assert_eq!(cell(Encoding::Base7, voice, 2), "0");
    }
}
