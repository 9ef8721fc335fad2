//! Score followed by a single lattice column covering all voices.

use std::io::Write;

use super::{filler, RenderContext, RowCursor, NO_MODULE, UNMATCHED};
use crate::engine::VoicePair;
use crate::Result;

/// Placeholder for an unmatched line in the stacked form.
const UNMATCHED_STACK: &str = "??";

pub(super) fn render(context: &RenderContext<'_>, out: &mut dyn Write) -> Result<()> {
    let raw = context.raw();
    let rows_form = context.config.layout.rows;
    let engine = context.engine();
    let voices = context.timelines.voice_count();
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
                writeln!(out, "{line}\t{}", filler(line))?;
            }
            continue;
        }

        let seek = cursor.seek(context.timelines, line.index());
        let unmatched = if rows_form { UNMATCHED } else { UNMATCHED_STACK };
        let row = match context.anchor(seek, unmatched) {
            Ok(row) => row,
            Err(placeholder) => {
                if !raw {
                    writeln!(out, "{line}\t{placeholder}")?;
                }
                continue;
            }
        };

        let modules: Vec<String> = if rows_form {
            (0..voices.saturating_sub(1))
                .map(|lower| engine.lattice_module(row, VoicePair::new(lower, lower + 1)))
                .filter(|module| module.is_completed())
                .map(|module| module.to_string())
                .collect()
        } else {
            let module = engine.stacked_lattice(row);
            if module.is_completed() {
                vec![module.to_string()]
            } else {
                Vec::new()
            }
        };

        if raw {
            for module in &modules {
                writeln!(out, "{module}")?;
            }
        } else if modules.is_empty() {
            writeln!(out, "{line}\t{NO_MODULE}")?;
        } else {
            writeln!(out, "{line}\t{}", modules.join(" "))?;
        }
    }
    Ok(())
}
