//! Renderers that keep the score and add a module column after each voice
//! for every pair that voice leads.

use std::io::Write;

use super::{filler, interleave, RenderContext, RowCursor, NO_MODULE, UNMATCHED};
use crate::engine::{Module, ModuleEngine, VoicePair};
use crate::score::Line;
use crate::Result;

/// Every voice against every voice to its right.
pub(super) fn combination(context: &RenderContext<'_>, out: &mut dyn Write) -> Result<()> {
    let voices = context.timelines.voice_count();
    render(
        context,
        out,
        |voice| (voice + 1..voices).map(|upper| VoicePair::new(voice, upper)).collect(),
        |engine, row, pair| engine.combination_module(row, pair),
    )
}

/// Each voice against its right-hand neighbour, fixed-length chains.
pub(super) fn interleaved_lattice(context: &RenderContext<'_>, out: &mut dyn Write) -> Result<()> {
    let map = context.map();
    render(
        context,
        out,
        |voice| {
            if map.is_last_voice(voice) {
                Vec::new()
            } else {
                vec![VoicePair::new(voice, voice + 1)]
            }
        },
        |engine, row, pair| engine.lattice_module(row, pair),
    )
}

fn render(
    context: &RenderContext<'_>,
    out: &mut dyn Write,
    pairs: impl Fn(usize) -> Vec<VoicePair>,
    module: impl Fn(&ModuleEngine<'_>, usize, VoicePair) -> Module,
) -> Result<()> {
    let raw = context.raw();
    let engine = context.engine();
    let mut cursor = RowCursor::default();

    for line in context.score.lines() {
        if !line.has_spines() {
            if !raw {
                writeln!(out, "{line}")?;
            }
            continue;
        }
        if !line.is_data() {
            if !raw {
                writeln!(out, "{}", pass_through(context, line, &pairs, filler(line)))?;
            }
            continue;
        }

        let seek = cursor.seek(context.timelines, line.index());
        let row = match context.anchor(seek, UNMATCHED) {
            Ok(row) => row,
            Err(placeholder) => {
                if !raw {
                    writeln!(out, "{}", pass_through(context, line, &pairs, placeholder))?;
                }
                continue;
            }
        };

        let mut completed = Vec::new();
        let text = interleave(line, context.map(), |voice, cells| {
            for pair in pairs(voice) {
                let result = module(&engine, row, pair);
                if result.is_completed() {
                    let text = result.to_string();
                    completed.push(text.clone());
                    cells.push(text);
                } else {
                    cells.push(NO_MODULE.to_string());
                }
            }
        });

        if raw {
            for text in completed {
                writeln!(out, "{text}")?;
            }
        } else {
            writeln!(out, "{text}")?;
        }
    }
    Ok(())
}

/// One `token` for each pair column of the line.
fn pass_through(
    context: &RenderContext<'_>,
    line: &Line,
    pairs: &impl Fn(usize) -> Vec<VoicePair>,
    token: &str,
) -> String {
    interleave(line, context.map(), |voice, cells| {
        cells.extend(pairs(voice).iter().map(|_| token.to_string()));
    })
}
