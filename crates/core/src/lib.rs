//! Core library for the counterpoint interval analyzer.
//!
//! A Humdrum score is read into a line/spine view, the `**kern` voices are
//! flattened into synchronized timelines, and pairs of voices are described
//! as chains of harmonic and melodic intervals (counterpoint modules). Each
//! module owns one stage of that pipeline; [`analyze`] runs all of them and
//! writes one of the four output layouts.

pub mod config;
pub mod engine;
pub mod error;
pub mod interval;
pub mod pitch;
pub mod render;
pub mod rhythm;
pub mod score;
pub mod timeline;

pub use config::{
    AnalysisConfig, Decoration, IntervalStyle, Layout, ModulePolicy, NumberingSystem, OutputMode,
};
pub use engine::{Module, ModuleEngine, ModuleToken, VoicePair};
pub use error::{CintError, Result};
pub use interval::{IntervalCodec, IntervalKind};
pub use render::analyze;
pub use rhythm::RhythmMap;
pub use score::{Line, LineKind, Score};
pub use timeline::{PitchEvent, TimelineBuilder, Timelines, VoiceMap, VoiceTimeline};
