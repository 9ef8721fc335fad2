use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Pitch space used when printing intervals and pitch grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumberingSystem {
    /// Forty steps per octave; every spelling has its own number.
    #[serde(rename = "base-40", alias = "base40")]
    Base40,
    /// Twelve semitones per octave.
    #[serde(rename = "base-12", alias = "base12")]
    Base12,
    /// Seven diatonic steps per octave.
    #[default]
    #[serde(rename = "base-7", alias = "base7")]
    Base7,
}

/// Which renderer drives the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    #[default]
    Combination,
    Lattice,
    InterleavedLattice,
    PitchGrid,
}

/// How a single interval is spelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalStyle {
    /// Print interval names such as `M3` instead of numbers.
    pub chromatic: bool,
    /// Diatonic numbers start at 0 for a unison.
    pub zero_based: bool,
    /// Fold harmonic intervals into a single octave.
    pub octave_fold: bool,
    /// Append attack/sustain markup to every interval.
    pub sustain_markup: bool,
    /// Append attack/sustain markup to harmonic intervals only.
    pub harmonic_attack_markup: bool,
}

/// Rules that decide whether a module chain completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulePolicy {
    /// Chain on pairs of simultaneous attacks instead of a fixed length.
    pub attacks: bool,
    /// Abort a chain as soon as either voice rests.
    pub no_rests: bool,
    /// Abort a chain that contains a melodic perfect unison.
    pub no_unisons: bool,
    /// Shift whole modules down so the smallest compound interval fits an octave.
    pub octave_adjust: bool,
    pub no_harmonic: bool,
    pub no_melodic: bool,
    /// Also print the upper voice's melodic interval.
    pub top: bool,
    /// Print only the upper voice's melodic interval.
    pub top_only: bool,
}

/// Characters wrapped around or appended to module parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decoration {
    pub parentheses: bool,
    pub harmonic_brackets: bool,
    pub melodic_braces: bool,
    pub harmonic_marker: bool,
    pub melodic_marker: bool,
}

/// Output layout switches that do not change any interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Drop all pass-through lines and print one module per line.
    pub raw: bool,
    /// Lattice row form: one module per adjacent voice pair.
    pub rows: bool,
    /// Add rhythmic position columns to the pitch grid.
    pub rhythm: bool,
}

/// Complete, immutable analysis configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub numbering: NumberingSystem,
    pub chain_length: usize,
    pub mode: OutputMode,
    pub interval: IntervalStyle,
    pub module: ModulePolicy,
    pub decoration: Decoration,
    pub layout: Layout,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            numbering: NumberingSystem::default(),
            chain_length: 1,
            mode: OutputMode::default(),
            interval: IntervalStyle::default(),
            module: ModulePolicy::default(),
            decoration: Decoration::default(),
            layout: Layout::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reads a JSON configuration file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&text)?;
        Ok(config.normalized())
    }

    /// Applies the invariants every consumer relies on.
    pub fn normalized(mut self) -> Self {
        self.chain_length = self.chain_length.max(1);
        if self.numbering != NumberingSystem::Base7 {
            self.interval.zero_based = false;
        }
        self
    }

    pub fn is_diatonic(&self) -> bool {
        self.numbering == NumberingSystem::Base7
    }
}
