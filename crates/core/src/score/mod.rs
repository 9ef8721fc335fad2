//! Line, field and spine view over a Humdrum score.
//!
//! Only the structure the interval analysis needs is modelled: line
//! classification, the primary track and data type of every field, spine
//! manipulators, measure numbers and the back-reference of `.` null tokens.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{CintError, Result};

static MEASURE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^=+(\d+)").expect("measure pattern is valid"));

/// Data type of the spines the analysis reads.
pub const KERN: &str = "**kern";

/// Classification of one score line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Global comments, reference records, blank lines and anything outside
    /// of spines. Printed verbatim.
    Global,
    Interpretation,
    LocalComment,
    Barline,
    Data,
}

/// One tab-separated token of a spined line.
#[derive(Debug, Clone)]
pub struct Field {
    text: String,
    track: usize,
    spine: usize,
    data_type: String,
    null_ref: Option<(usize, usize)>,
}

impl Field {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// One-based track number shared by all sub-spines of a split spine.
    pub fn track(&self) -> usize {
        self.track
    }

    /// Identity of the spine segment holding this field.
    pub fn spine(&self) -> usize {
        self.spine
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn is_null(&self) -> bool {
        self.text == "."
    }
}

#[derive(Debug, Clone)]
pub struct Line {
    index: usize,
    text: String,
    kind: LineKind,
    fields: Vec<Field>,
}

impl Line {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Text of field `j`, or an empty string past the end of the line.
    pub fn token(&self, j: usize) -> &str {
        self.fields.get(j).map(Field::text).unwrap_or("")
    }

    pub fn has_spines(&self) -> bool {
        self.kind != LineKind::Global
    }

    pub fn is_data(&self) -> bool {
        self.kind == LineKind::Data
    }

    pub fn is_barline(&self) -> bool {
        self.kind == LineKind::Barline
    }

    pub fn is_interpretation(&self) -> bool {
        self.kind == LineKind::Interpretation
    }

    pub fn is_local_comment(&self) -> bool {
        self.kind == LineKind::LocalComment
    }

    /// Exclusive interpretation line (`**kern`, ...).
    pub fn is_exclusive(&self) -> bool {
        self.is_interpretation() && self.token(0).starts_with("**")
    }

    /// Spine terminator line (`*-`).
    pub fn is_terminator(&self) -> bool {
        self.is_interpretation() && self.token(0) == "*-"
    }

    pub fn is_kern(&self, j: usize) -> bool {
        self.fields
            .get(j)
            .map(|field| field.data_type == KERN)
            .unwrap_or(false)
    }

    pub fn primary_track(&self, j: usize) -> Option<usize> {
        self.fields.get(j).map(Field::track)
    }

    /// True when field `j` is the last (or only) sub-spine of its track on
    /// this line.
    pub fn closes_track(&self, j: usize) -> bool {
        match (self.primary_track(j), self.primary_track(j + 1)) {
            (Some(track), Some(next)) => track != next,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone)]
struct Spine {
    id: usize,
    track: usize,
    data_type: String,
}

/// A parsed score.
#[derive(Debug, Clone, Default)]
pub struct Score {
    lines: Vec<Line>,
    kern_tracks: Vec<usize>,
    max_track: usize,
    spine_parents: Vec<Option<usize>>,
}

impl Score {
    /// Parses score text. Fails only when a spined line does not match the
    /// active spine layout.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::default();
        for (index, raw) in text.lines().enumerate() {
            parser.push_line(index, raw.trim_end_matches('\r'))?;
        }
        Ok(parser.finish())
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> &Line {
        &self.lines[index]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Tracks of the `**kern` spines declared on the first exclusive
    /// interpretation line, left to right.
    pub fn kern_tracks(&self) -> &[usize] {
        &self.kern_tracks
    }

    pub fn max_track(&self) -> usize {
        self.max_track
    }

    /// Bar number written on a barline, if any.
    pub fn measure_number(&self, index: usize) -> Option<i32> {
        let line = self.lines.get(index)?;
        if !line.is_barline() {
            return None;
        }
        let captures = MEASURE_NUMBER.captures(line.token(0))?;
        captures[1].parse().ok()
    }

    /// Location of the token a `.` null token stands for.
    pub fn resolve_null(&self, index: usize, j: usize) -> Option<(usize, usize)> {
        self.lines.get(index)?.fields.get(j)?.null_ref
    }

    /// Spine segment that a split spine was created from.
    pub fn spine_parent(&self, spine: usize) -> Option<usize> {
        self.spine_parents.get(spine).copied().flatten()
    }
}

#[derive(Debug, Default)]
struct Parser {
    lines: Vec<Line>,
    active: Vec<Spine>,
    kern_tracks: Option<Vec<usize>>,
    max_track: usize,
    spine_parents: Vec<Option<usize>>,
    last_token: Vec<Option<(usize, usize)>>,
}

impl Parser {
    fn new_spine(&mut self, track: usize, data_type: &str, parent: Option<usize>) -> Spine {
        let id = self.spine_parents.len();
        self.spine_parents.push(parent);
        self.last_token.push(None);
        self.max_track = self.max_track.max(track);
        Spine {
            id,
            track,
            data_type: data_type.to_string(),
        }
    }

    fn push_line(&mut self, index: usize, text: &str) -> Result<()> {
        let kind = classify(text, !self.active.is_empty());
        let fields = if kind == LineKind::Global {
            Vec::new()
        } else if self.active.is_empty() {
            self.open_spines(text)
        } else {
            self.assign_fields(index, text, kind)?
        };

        self.lines.push(Line {
            index,
            text: text.to_string(),
            kind,
            fields,
        });

        if kind == LineKind::Interpretation {
            self.apply_manipulators(index)?;
        }
        Ok(())
    }

    fn open_spines(&mut self, text: &str) -> Vec<Field> {
        let mut fields = Vec::new();
        for (j, token) in text.split('\t').enumerate() {
            let spine = self.new_spine(j + 1, token, None);
            fields.push(Field {
                text: token.to_string(),
                track: spine.track,
                spine: spine.id,
                data_type: spine.data_type.clone(),
                null_ref: None,
            });
            self.active.push(spine);
        }
        if self.kern_tracks.is_none() {
            self.kern_tracks = Some(
                fields
                    .iter()
                    .filter(|field| field.data_type == KERN)
                    .map(|field| field.track)
                    .collect(),
            );
        }
        fields
    }

    fn assign_fields(&mut self, index: usize, text: &str, kind: LineKind) -> Result<Vec<Field>> {
        let tokens: Vec<&str> = text.split('\t').collect();
        if tokens.len() != self.active.len() {
            return Err(CintError::structure(
                index,
                format!(
                    "expected {} fields but found {}",
                    self.active.len(),
                    tokens.len()
                ),
            ));
        }

        let mut fields = Vec::with_capacity(tokens.len());
        for (j, token) in tokens.into_iter().enumerate() {
            let spine = &mut self.active[j];
            if kind == LineKind::Interpretation
                && token.starts_with("**")
                && spine.data_type.is_empty()
            {
                spine.data_type = token.to_string();
            }
            let mut null_ref = None;
            if kind == LineKind::Data {
                if token == "." {
                    null_ref = self.lookup_token(self.active[j].id);
                } else {
                    self.last_token[self.active[j].id] = Some((index, j));
                }
            }
            let spine = &self.active[j];
            fields.push(Field {
                text: token.to_string(),
                track: spine.track,
                spine: spine.id,
                data_type: spine.data_type.clone(),
                null_ref,
            });
        }
        Ok(fields)
    }

    fn lookup_token(&self, spine: usize) -> Option<(usize, usize)> {
        let mut current = Some(spine);
        while let Some(id) = current {
            if let Some(found) = self.last_token[id] {
                return Some(found);
            }
            current = self.spine_parents[id];
        }
        None
    }

    fn apply_manipulators(&mut self, index: usize) -> Result<()> {
        let tokens: Vec<String> = self.lines[index]
            .fields
            .iter()
            .map(|field| field.text.clone())
            .collect();
        let previous = std::mem::take(&mut self.active);
        let mut next = Vec::with_capacity(previous.len());
        let mut j = 0;
        while j < previous.len() {
            let spine = previous[j].clone();
            match tokens[j].as_str() {
                "*^" => {
                    let left = self.new_spine(spine.track, &spine.data_type, Some(spine.id));
                    let right = self.new_spine(spine.track, &spine.data_type, Some(spine.id));
                    next.push(left);
                    next.push(right);
                }
                "*v" => {
                    let run = tokens[j..].iter().take_while(|token| *token == "*v").count();
                    if run < 2 {
                        return Err(CintError::structure(index, "lone *v merge manipulator"));
                    }
                    next.push(spine);
                    j += run;
                    continue;
                }
                "*x" => {
                    if tokens.get(j + 1).map(String::as_str) != Some("*x") {
                        return Err(CintError::structure(index, "unpaired *x exchange manipulator"));
                    }
                    next.push(previous[j + 1].clone());
                    next.push(spine);
                    j += 2;
                    continue;
                }
                "*+" => {
                    let track = self.max_track + 1;
                    next.push(spine);
                    let added = self.new_spine(track, "", None);
                    next.push(added);
                }
                "*-" => {}
                _ => next.push(spine),
            }
            j += 1;
        }
        self.active = next;
        Ok(())
    }

    fn finish(self) -> Score {
        Score {
            lines: self.lines,
            kern_tracks: self.kern_tracks.unwrap_or_default(),
            max_track: self.max_track,
            spine_parents: self.spine_parents,
        }
    }
}

fn classify(text: &str, spined: bool) -> LineKind {
    if text.starts_with("!!") || text.is_empty() {
        return LineKind::Global;
    }
    if !spined && !text.starts_with("**") {
        return LineKind::Global;
    }
    match text.chars().next() {
        Some('*') => LineKind::Interpretation,
        Some('!') => LineKind::LocalComment,
        Some('=') => LineKind::Barline,
        _ => LineKind::Data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_VOICES: &str = "!!!COM: Anonymous\n\
**kern\t**text\t**kern\n\
*M4/4\t*\t*M4/4\n\
=1\t=1\t=1\n\
4c\tla\t4e\n\
.\t.\t4f\n\
*-\t*-\t*-\n";

    #[test]
    fn classifies_lines_and_tracks() {
        let score = Score::parse(TWO_VOICES).unwrap();
        assert_eq!(score.len(), 7);
        assert_eq!(score.line(0).kind(), LineKind::Global);
        assert!(score.line(1).is_exclusive());
        assert!(score.line(3).is_barline());
        assert!(score.line(4).is_data());
        assert!(score.line(6).is_terminator());
        assert_eq!(score.kern_tracks(), &[1, 3]);
        assert_eq!(score.max_track(), 3);
        assert!(score.line(4).is_kern(2));
        assert!(!score.line(4).is_kern(1));
        assert_eq!(score.measure_number(3), Some(1));
    }

    #[test]
    fn resolves_null_tokens_to_previous_token() {
        let score = Score::parse(TWO_VOICES).unwrap();
        assert_eq!(score.resolve_null(5, 0), Some((4, 0)));
        assert_eq!(score.resolve_null(5, 2), None);
    }

    #[test]
    fn split_spines_share_track_and_inherit_references() {
        let text = "**kern\t**kern\n4c\t4e\n*^\t*\n.\t4d\t4f\n4e\t.\t4g\n*v\t*v\t*\n.\t.\n*-\t*-\n";
        let score = Score::parse(text).unwrap();
        let split = score.line(3);
        assert_eq!(split.primary_track(0), Some(1));
        assert_eq!(split.primary_track(1), Some(1));
        assert!(!split.closes_track(0));
        assert!(split.closes_track(1));
        assert_eq!(score.resolve_null(3, 0), Some((1, 0)));
        assert_eq!(score.resolve_null(4, 1), Some((3, 1)));
        assert_eq!(score.resolve_null(6, 0), Some((4, 0)));
    }

    #[test]
    fn rejects_field_count_mismatch() {
        let err = Score::parse("**kern\t**kern\n4c\n").unwrap_err();
        assert!(format!("{err}").contains("line 2"));
    }

    #[test]
    fn measure_number_is_absent_on_unnumbered_barlines() {
        let score = Score::parse("**kern\n=\n=||\n=12a\n*-\n").unwrap();
        assert_eq!(score.measure_number(1), None);
        assert_eq!(score.measure_number(2), None);
        assert_eq!(score.measure_number(3), Some(12));
    }
}
