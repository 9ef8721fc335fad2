//! Output strategies that turn voice timelines back into tab-separated text.
//!
//! Every renderer but the pitch grid walks the score line by line. Lines
//! without data are copied with a filler token in the analysis columns;
//! data lines are matched to their timeline row through a forward-only
//! [`RowCursor`] and filled with modules from the [`ModuleEngine`].

mod columns;
mod lattice;
mod pitch_grid;

use std::io::Write;

use tracing::{debug, warn};

use crate::config::{AnalysisConfig, OutputMode};
use crate::engine::ModuleEngine;
use crate::score::{Line, Score};
use crate::timeline::{TimelineBuilder, Timelines, VoiceMap};
use crate::Result;

/// Exclusive interpretation of the analysis columns.
pub const CINT: &str = "**cint";

/// Filler for data lines past the end of the timeline, or too close to it to
/// hold a full chain.
pub const NO_MODULE: &str = ".";

/// Filler for a data line that has no timeline row of its own.
pub const UNMATCHED: &str = "?";

/// Analyzes one score and writes the configured output.
pub fn analyze(score: &Score, config: &AnalysisConfig, out: &mut dyn Write) -> Result<()> {
    let config = config.clone().normalized();
    let timelines = TimelineBuilder::new(score).build();
    if timelines.voice_count() == 0 {
        warn!("score has no **kern spines");
    }
    debug!(
        rows = timelines.rows(),
        voices = timelines.voice_count(),
        mode = ?config.mode,
        "rendering score"
    );

    let context = RenderContext {
        score,
        config: &config,
        timelines: &timelines,
    };
    match config.mode {
        OutputMode::PitchGrid => pitch_grid::render(&context, out),
        OutputMode::Lattice => lattice::render(&context, out),
        OutputMode::InterleavedLattice => columns::interleaved_lattice(&context, out),
        OutputMode::Combination => columns::combination(&context, out),
    }
}

/// Read-only inputs shared by one render pass.
struct RenderContext<'a> {
    score: &'a Score,
    config: &'a AnalysisConfig,
    timelines: &'a Timelines,
}

impl<'a> RenderContext<'a> {
    fn engine(&self) -> ModuleEngine<'a> {
        ModuleEngine::new(self.timelines, self.config)
    }

    fn map(&self) -> &'a VoiceMap {
        self.timelines.map()
    }

    fn raw(&self) -> bool {
        self.config.layout.raw
    }

    /// Timeline row a data line starts a full chain from, or the filler to
    /// print instead.
    fn anchor(&self, seek: Seek, unmatched: &'static str) -> std::result::Result<usize, &'static str> {
        match seek {
            Seek::Matched(row) if row + self.config.chain_length < self.timelines.rows() => Ok(row),
            Seek::Matched(_) | Seek::Exhausted => Err(NO_MODULE),
            Seek::Unmatched => Err(unmatched),
        }
    }
}

/// Outcome of looking up the timeline row of a score line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
    Matched(usize),
    /// The line was collapsed out of the timeline.
    Unmatched,
    /// No rows remain.
    Exhausted,
}

/// Forward-only position in the timeline rows, owned by one render pass.
#[derive(Debug, Default)]
struct RowCursor {
    row: usize,
}

impl RowCursor {
    fn seek(&mut self, timelines: &Timelines, line: usize) -> Seek {
        while let Some(source) = timelines.row_line(self.row) {
            if source >= line {
                break;
            }
            self.row += 1;
        }
        match timelines.row_line(self.row) {
            None => Seek::Exhausted,
            Some(source) if source == line => Seek::Matched(self.row),
            Some(_) => {
                debug!(line, row = self.row, "data line has no timeline row");
                Seek::Unmatched
            }
        }
    }
}

/// Copies every field of `line`, letting `extra` append analysis cells after
/// the last sub-spine of each voice.
fn interleave(line: &Line, map: &VoiceMap, mut extra: impl FnMut(usize, &mut Vec<String>)) -> String {
    let mut cells = Vec::with_capacity(line.field_count() * 2);
    for (j, field) in line.fields().iter().enumerate() {
        cells.push(field.text().to_string());
        if !line.is_kern(j) || !line.closes_track(j) {
            continue;
        }
        if let Some(voice) = map.voice_for_track(field.track()) {
            extra(voice, &mut cells);
        }
    }
    cells.join("\t")
}

/// Filler token for a line that carries no data.
fn filler(line: &Line) -> &str {
    if line.is_exclusive() {
        CINT
    } else if line.is_terminator() {
        "*-"
    } else if line.is_interpretation() {
        "*"
    } else if line.is_local_comment() {
        "!"
    } else {
        line.token(0)
    }
}
