//! Counterpoint module chains for a pair of voices.
//!
//! A module anchored at a timeline row alternates harmonic intervals between
//! the two voices with the melodic motion that connects them. Two variants
//! exist:
//!
//! - the combination chain skips rows where neither voice attacks and obeys
//!   the rest, unison and attack-pairing policies;
//! - the lattice chain takes `n` consecutive rows exactly as they are.
//!
//! Both return a [`Module`]; callers print it or substitute a placeholder
//! when it did not complete.

use std::fmt;

use tracing::trace;

use crate::config::AnalysisConfig;
use crate::interval::{IntervalCodec, IntervalKind};
use crate::pitch;
use crate::timeline::{PitchEvent, Timelines, VoiceTimeline};

/// Two voices by compact voice index. `lower` supplies the first pitch of
/// every harmonic interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePair {
    pub lower: usize,
    pub upper: usize,
}

impl VoicePair {
    pub fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }
}

/// One decorated piece of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleToken {
    Harmonic(String),
    /// One or two melodic intervals for the same step.
    Melodic(String),
}

impl ModuleToken {
    pub fn text(&self) -> &str {
        match self {
            ModuleToken::Harmonic(text) | ModuleToken::Melodic(text) => text,
        }
    }
}

/// Result of one module computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    tokens: Vec<ModuleToken>,
    completed: bool,
    parenthesized: bool,
    double_attacks: usize,
}

impl Module {
    fn aborted() -> Self {
        Self::default()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn tokens(&self) -> &[ModuleToken] {
        &self.tokens
    }

    pub fn harmonic_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| matches!(token, ModuleToken::Harmonic(_)))
            .count()
    }

    pub fn melodic_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| matches!(token, ModuleToken::Melodic(_)))
            .count()
    }

    /// Rows where both voices attacked that counted toward the chain.
    pub fn double_attacks(&self) -> usize {
        self.double_attacks
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parenthesized {
            f.write_str("(")?;
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token.text())?;
        }
        if self.parenthesized {
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Walk the chain only to learn where it ends and its smallest
    /// compound interval.
    Scan,
    Emit,
}

#[derive(Debug, Default)]
struct Walk {
    tokens: Vec<ModuleToken>,
    completed: bool,
    double_attacks: usize,
    smallest_compound: Option<i32>,
}

/// Computes modules over a fixed set of timelines.
#[derive(Debug, Clone, Copy)]
pub struct ModuleEngine<'a> {
    timelines: &'a Timelines,
    config: &'a AnalysisConfig,
    codec: IntervalCodec<'a>,
}

impl<'a> ModuleEngine<'a> {
    pub fn new(timelines: &'a Timelines, config: &'a AnalysisConfig) -> Self {
        Self {
            timelines,
            config,
            codec: IntervalCodec::new(config),
        }
    }

    fn chain_length(&self) -> usize {
        self.config.chain_length.max(1)
    }

    /// Combination chain anchored at `anchor`.
    pub fn combination_module(&self, anchor: usize, pair: VoicePair) -> Module {
        let adjust = if self.config.module.octave_adjust {
            self.octave_adjustment(anchor, pair)
        } else {
            0
        };
        let walk = self.walk(anchor, pair, adjust, Pass::Emit);
        if !walk.completed {
            return Module::aborted();
        }
        Module {
            tokens: walk.tokens,
            completed: true,
            parenthesized: self.config.decoration.parentheses,
            double_attacks: walk.double_attacks,
        }
    }

    /// Whole octaves to shift a combination chain so that its smallest
    /// harmonic interval wider than an octave falls within one. Zero when no
    /// such interval exists or the chain would not complete.
    pub fn octave_adjustment(&self, anchor: usize, pair: VoicePair) -> i32 {
        let walk = self.walk(anchor, pair, 0, Pass::Scan);
        match (walk.completed, walk.smallest_compound) {
            (true, Some(smallest)) => -(smallest / pitch::OCTAVE),
            _ => 0,
        }
    }

    /// The single traversal shared by the octave scan and the printed chain.
    fn walk(&self, anchor: usize, pair: VoicePair, octave_adjust: i32, pass: Pass) -> Walk {
        let n = self.chain_length();
        let policy = &self.config.module;
        let lower = self.timelines.voice(pair.lower);
        let upper = self.timelines.voice(pair.upper);
        let rows = self.timelines.rows();

        if anchor + n >= rows {
            return Walk::default();
        }
        let (first, second) = (&lower[anchor], &upper[anchor]);
        if policy.no_rests && (first.is_rest() || second.is_rest()) {
            trace!(anchor, ?pair, "rest at module anchor");
            return Walk::default();
        }
        if !first.is_attack() && !second.is_attack() {
            return Walk::default();
        }

        let mut walk = Walk::default();
        let mut steps = 0;
        let mut previous: Option<usize> = None;
        let mut closed = false;

        for row in anchor..rows {
            let (a, b) = (&lower[row], &upper[row]);
            if !a.is_attack() && !b.is_attack() {
                continue;
            }
            if policy.no_rests && (a.is_rest() || b.is_rest()) {
                trace!(anchor, row, ?pair, "rest inside module");
                return Walk::default();
            }
            let double = a.is_attack() && b.is_attack();
            if policy.attacks && !double && walk.double_attacks == 0 {
                trace!(anchor, row, ?pair, "chain does not start on a double attack");
                return Walk::default();
            }

            if let Some(prev) = previous.filter(|_| !policy.no_melodic) {
                if policy.no_unisons && (repeats(&lower[prev], a) || repeats(&upper[prev], b)) {
                    trace!(anchor, row, ?pair, "melodic unison");
                    return Walk::default();
                }
                if pass == Pass::Emit {
                    walk.tokens.push(self.melodic_token(lower, upper, prev, row));
                }
            }

            if !a.is_rest() && !b.is_rest() {
                let span = b.magnitude() - a.magnitude();
                if span > pitch::OCTAVE {
                    walk.smallest_compound =
                        Some(walk.smallest_compound.map_or(span, |s| s.min(span)));
                }
            }
            if pass == Pass::Emit && !policy.no_harmonic {
                walk.tokens.push(self.harmonic_token(a, b, octave_adjust));
            }

            if !policy.attacks && steps == n {
                closed = true;
                break;
            }
            previous = Some(row);
            steps += 1;

            if double {
                if walk.double_attacks >= n {
                    break;
                }
                walk.double_attacks += 1;
            }
        }

        walk.completed = if policy.attacks {
            walk.double_attacks == n
        } else {
            closed
        };
        walk
    }

    /// Fixed-length chain over `n` consecutive rows, sustains included.
    pub fn lattice_module(&self, anchor: usize, pair: VoicePair) -> Module {
        let n = self.chain_length();
        if anchor + n >= self.timelines.rows() {
            return Module::aborted();
        }
        let policy = &self.config.module;
        let lower = self.timelines.voice(pair.lower);
        let upper = self.timelines.voice(pair.upper);

        let mut tokens = Vec::with_capacity(2 * n + 1);
        for row in anchor..anchor + n {
            if !policy.no_harmonic {
                tokens.push(self.harmonic_token(&lower[row], &upper[row], 0));
            }
            if !policy.no_melodic {
                tokens.push(self.melodic_token(lower, upper, row, row + 1));
            }
        }
        if !policy.no_harmonic {
            tokens.push(self.harmonic_token(&lower[anchor + n], &upper[anchor + n], 0));
        }

        Module {
            tokens,
            completed: true,
            parenthesized: self.config.decoration.parentheses,
            double_attacks: 0,
        }
    }

    /// Lattice chain over every adjacent voice pair at once: each harmonic
    /// token lists all adjacent pairs, each melodic token every voice's motion.
    pub fn stacked_lattice(&self, anchor: usize) -> Module {
        let n = self.chain_length();
        if anchor + n >= self.timelines.rows() || self.timelines.voice_count() < 2 {
            return Module::aborted();
        }
        let policy = &self.config.module;
        let decoration = &self.config.decoration;
        let voices = self.timelines.voices();
        let mut melodic_voices = voices.len().saturating_sub(1);
        if policy.top {
            melodic_voices += 1;
        }

        let harmonic_set = |row: usize| {
            let intervals: Vec<String> = voices
                .windows(2)
                .map(|pair| {
                    self.codec
                        .render(&pair[0][row], &pair[1][row], IntervalKind::Harmonic, 0)
                })
                .collect();
            ModuleToken::Harmonic(wrap(
                intervals.join(" "),
                decoration.harmonic_brackets,
                '[',
                ']',
            ))
        };

        let mut tokens = Vec::with_capacity(2 * n + 1);
        for row in anchor..anchor + n {
            if !policy.no_harmonic {
                tokens.push(harmonic_set(row));
            }
            if policy.no_melodic {
                continue;
            }
            let intervals: Vec<String> = voices
                .iter()
                .take(melodic_voices)
                .map(|voice| {
                    self.codec
                        .render(&voice[row], &voice[row + 1], IntervalKind::Melodic, 0)
                })
                .collect();
            tokens.push(ModuleToken::Melodic(wrap(
                intervals.join(" "),
                decoration.melodic_braces,
                '{',
                '}',
            )));
        }
        if !policy.no_harmonic {
            tokens.push(harmonic_set(anchor + n));
        }

        Module {
            tokens,
            completed: true,
            parenthesized: decoration.parentheses,
            double_attacks: 0,
        }
    }

    fn harmonic_token(&self, a: &PitchEvent, b: &PitchEvent, octave_adjust: i32) -> ModuleToken {
        let decoration = &self.config.decoration;
        let mut text = self
            .codec
            .render(a, b, IntervalKind::Harmonic, octave_adjust);
        if decoration.harmonic_marker {
            text.push('h');
        }
        ModuleToken::Harmonic(wrap(text, decoration.harmonic_brackets, '[', ']'))
    }

    fn melodic_token(
        &self,
        lower: &VoiceTimeline,
        upper: &VoiceTimeline,
        from: usize,
        to: usize,
    ) -> ModuleToken {
        let policy = &self.config.module;
        let decoration = &self.config.decoration;
        let mut parts = Vec::with_capacity(2);
        if !policy.top_only {
            parts.push(self.codec.render(&lower[from], &lower[to], IntervalKind::Melodic, 0));
        }
        // the marker tags the upper voice's motion only
        if policy.top || policy.top_only {
            let mut text = self.codec.render(&upper[from], &upper[to], IntervalKind::Melodic, 0);
            if decoration.melodic_marker {
                text.push('m');
            }
            parts.push(text);
        }
        ModuleToken::Melodic(wrap(parts.join(" "), decoration.melodic_braces, '{', '}'))
    }
}

/// A sounding pitch that repeats the previous qualifying pitch of its voice.
fn repeats(previous: &PitchEvent, current: &PitchEvent) -> bool {
    !current.is_rest() && current.magnitude() == previous.magnitude()
}

fn wrap(text: String, enabled: bool, open: char, close: char) -> String {
    if enabled {
        format!("{open}{text}{close}")
    } else {
        text
    }
}
