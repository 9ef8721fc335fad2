//! Textual rendering of a single harmonic or melodic interval.

use crate::config::{AnalysisConfig, NumberingSystem};
use crate::pitch::{self, base40_to_diatonic, base40_to_interval_name, base40_to_midi};
use crate::timeline::PitchEvent;

/// Printed in place of any interval that involves a rest.
pub const REST_TOKEN: &str = "R";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// Two voices at the same timeline position.
    Harmonic,
    /// One voice between two timeline positions.
    Melodic,
}

/// Spells intervals under one analysis configuration.
#[derive(Debug, Clone, Copy)]
pub struct IntervalCodec<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> IntervalCodec<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Interval from `first` to `second`, shifted by `octave_adjust` octaves.
    pub fn render(
        &self,
        first: &PitchEvent,
        second: &PitchEvent,
        kind: IntervalKind,
        octave_adjust: i32,
    ) -> String {
        if first.is_rest() || second.is_rest() {
            return REST_TOKEN.to_string();
        }

        let style = &self.config.interval;
        let fold = kind == IntervalKind::Harmonic && style.octave_fold;
        let low = first.magnitude();
        let high = second.magnitude();

        let mut interval = high - low + octave_adjust * pitch::OCTAVE;
        if fold {
            interval = fold_into_octave(interval, pitch::OCTAVE);
        }

        if !style.chromatic {
            let derived = match self.config.numbering {
                NumberingSystem::Base40 => None,
                NumberingSystem::Base12 => Some((base40_to_midi(high) - base40_to_midi(low), 12)),
                NumberingSystem::Base7 => {
                    Some((base40_to_diatonic(high) - base40_to_diatonic(low), 7))
                }
            };
            if let Some((raw, octave)) = derived {
                interval = if fold { fold_into_octave(raw, octave) } else { raw };
                interval += octave_adjust * octave;
            }
        }

        let mut text = if style.chromatic {
            base40_to_interval_name(interval)
        } else {
            let magnitude = if self.config.is_diatonic() && !style.zero_based {
                interval.abs() + 1
            } else {
                interval.abs()
            };
            if interval < 0 {
                format!("-{magnitude}")
            } else {
                magnitude.to_string()
            }
        };

        if style.sustain_markup
            || (kind == IntervalKind::Harmonic && style.harmonic_attack_markup)
        {
            text.push(attack_marker(first));
            text.push(attack_marker(second));
        }
        text
    }
}

fn attack_marker(event: &PitchEvent) -> char {
    if event.is_sustain() {
        's'
    } else {
        'x'
    }
}

/// Reduces an interval to the range `1..=octave`, keeping an exact octave
/// (or a multiple of one) as a full octave and leaving unisons at 0.
pub fn fold_into_octave(interval: i32, octave: i32) -> i32 {
    let mut value = interval;
    if value <= -octave {
        value += 100 * octave;
    }
    if value > octave {
        if value % octave == 0 {
            octave
        } else {
            value % octave
        }
    } else if value < 0 {
        value + octave
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn note(pitch: i32) -> PitchEvent {
        PitchEvent {
            pitch,
            ..PitchEvent::rest(0, 0)
        }
    }

    fn config(numbering: NumberingSystem) -> AnalysisConfig {
        AnalysisConfig {
            numbering,
            ..Default::default()
        }
        .normalized()
    }

    #[test]
    fn rests_render_as_rest_token_without_markup() {
        let mut config = config(NumberingSystem::Base40);
        config.interval.sustain_markup = true;
        let codec = IntervalCodec::new(&config);
        assert_eq!(codec.render(&note(0), &note(162), IntervalKind::Harmonic, 0), "R");
    }

    #[test]
    fn renders_in_each_numbering_system() {
        // c up to e
        let (c, e) = (note(162), note(174));
        let base40 = config(NumberingSystem::Base40);
        let base12 = config(NumberingSystem::Base12);
        let base7 = config(NumberingSystem::Base7);
        assert_eq!(IntervalCodec::new(&base40).render(&c, &e, IntervalKind::Melodic, 0), "12");
        assert_eq!(IntervalCodec::new(&base12).render(&c, &e, IntervalKind::Melodic, 0), "4");
        assert_eq!(IntervalCodec::new(&base7).render(&c, &e, IntervalKind::Melodic, 0), "3");
        assert_eq!(IntervalCodec::new(&base7).render(&e, &c, IntervalKind::Melodic, 0), "-3");
        assert_eq!(IntervalCodec::new(&base7).render(&c, &c, IntervalKind::Melodic, 0), "1");

        let mut zero = config(NumberingSystem::Base7);
        zero.interval.zero_based = true;
        assert_eq!(IntervalCodec::new(&zero).render(&c, &e, IntervalKind::Melodic, 0), "2");
    }

    #[test]
    fn reversing_the_pair_flips_only_the_sign() {
        for numbering in [NumberingSystem::Base40, NumberingSystem::Base12, NumberingSystem::Base7] {
            let config = config(numbering);
            let codec = IntervalCodec::new(&config);
            for (a, b) in [(162, 174), (122, 203), (185, -168), (150, 150)] {
                let up = codec.render(&note(a), &note(b), IntervalKind::Melodic, 0);
                let down = codec.render(&note(b), &note(a), IntervalKind::Melodic, 0);
                assert_eq!(up.trim_start_matches('-'), down.trim_start_matches('-'));
                if up != down {
                    assert!(up.starts_with('-') != down.starts_with('-'));
                }
            }
        }
    }

    #[test]
    fn folds_harmonic_intervals_only() {
        let mut config = config(NumberingSystem::Base40);
        config.interval.octave_fold = true;
        let codec = IntervalCodec::new(&config);
        // c to ee: a major tenth
        let (c, ee) = (note(162), note(214));
        assert_eq!(codec.render(&c, &ee, IntervalKind::Harmonic, 0), "12");
        assert_eq!(codec.render(&c, &ee, IntervalKind::Melodic, 0), "52");
        assert_eq!(codec.render(&c, &note(242), IntervalKind::Harmonic, 0), "40");
        assert_eq!(codec.render(&ee, &c, IntervalKind::Harmonic, 0), "28");
    }

    #[test]
    fn folding_is_idempotent() {
        for octave in [40, 12, 7] {
            for value in -250..250 {
                let once = fold_into_octave(value, octave);
                assert_eq!(fold_into_octave(once, octave), once);
            }
        }
    }

    #[test]
    fn octave_adjust_shifts_after_conversion() {
        let config = config(NumberingSystem::Base7);
        let codec = IntervalCodec::new(&config);
        // c to ee is a tenth; one octave down is a third
        assert_eq!(codec.render(&note(162), &note(214), IntervalKind::Harmonic, -1), "3");
    }

    #[test]
    fn chromatic_names_and_markup() {
        let mut config = config(NumberingSystem::Base7);
        config.interval.chromatic = true;
        config.interval.harmonic_attack_markup = true;
        let codec = IntervalCodec::new(&config);
        assert_eq!(codec.render(&note(162), &note(-185), IntervalKind::Harmonic, 0), "P5xs");
        assert_eq!(codec.render(&note(185), &note(162), IntervalKind::Melodic, 0), "-P5");
    }

    #[test]
    fn sustain_markup_covers_melodic_intervals() {
        let mut config = config(NumberingSystem::Base40);
        config.interval.sustain_markup = true;
        let codec = IntervalCodec::new(&config);
        assert_eq!(codec.render(&note(162), &note(-162), IntervalKind::Melodic, 0), "0xs");
        assert_eq!(codec.render(&note(-162), &note(168), IntervalKind::Harmonic, 0), "6sx");
    }
}
