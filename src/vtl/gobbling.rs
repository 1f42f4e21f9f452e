//! Space gobbling
//!
//!     Directive-only lines would otherwise leave their indentation and newline in the
//!     output. This pass decides, per source line, whether that whitespace is suppressed,
//!     and edits the CST's text segments before the AST is built.
//!
//! Classification
//!
//!     The CST is flattened in document order into atoms: blank runs, newlines and words
//!     from text segments, a mark for every directive keyword (block marks for `#if`,
//!     `#elseif`, `#else`, `#end`, `#foreach`, `#macro`; line marks for everything else),
//!     and opaque content for references and unparsed blocks. Atoms are then grouped into
//!     lines, each ending with (and including) its newline. A line is a candidate when it
//!     holds marks and otherwise nothing but blanks; what happens next depends on the mode:
//!
//!         none        nothing is suppressed
//!         bc          a line with exactly one mark loses the blanks after the mark and its
//!                     newline; leading indentation stays
//!         lines       a line with exactly one mark loses its blanks and its newline
//!         structured  like lines, and additionally lines holding several marks, all of them
//!                     block marks (`#end#end`, `#if(..)#foreach(..)`)
//!
//!     Mixed lines (any word or reference next to the directive) are never touched. A
//!     candidate on the last line without a trailing newline only loses its indentation
//!     (bc has nothing to remove there).

use crate::vtl::parsing::cst::SegmentWithSpans;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Whitespace policy around directive-only lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpaceGobbling {
    None,
    Bc,
    #[default]
    Lines,
    Structured,
}

impl SpaceGobbling {
    /// Parse a mode name, falling back to [SpaceGobbling::Lines] for anything unknown.
    pub fn from_name_lossy(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("unknown space gobbling mode {:?}, using lines", name);
            SpaceGobbling::Lines
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceGobbling::None => "none",
            SpaceGobbling::Bc => "bc",
            SpaceGobbling::Lines => "lines",
            SpaceGobbling::Structured => "structured",
        }
    }
}

/// Returned by [SpaceGobbling::from_str] for unknown names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown space gobbling mode {0:?}")]
pub struct UnknownMode(pub String);

impl FromStr for SpaceGobbling {
    type Err = UnknownMode;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(SpaceGobbling::None),
            "bc" => Ok(SpaceGobbling::Bc),
            "lines" => Ok(SpaceGobbling::Lines),
            "structured" => Ok(SpaceGobbling::Structured),
            _ => Err(UnknownMode(name.to_string())),
        }
    }
}

impl From<String> for SpaceGobbling {
    fn from(name: String) -> Self {
        SpaceGobbling::from_name_lossy(&name)
    }
}

impl From<SpaceGobbling> for String {
    fn from(mode: SpaceGobbling) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for SpaceGobbling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceKind {
    Blank,
    Newline,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkKind {
    Block,
    Line,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Atom {
    /// Part of the text segment with the given document-order index
    Piece {
        segment: usize,
        bytes: Range<usize>,
        kind: PieceKind,
    },
    Mark(MarkKind),
    Content,
}

impl Atom {
    fn is_newline(&self) -> bool {
        matches!(
            self,
            Atom::Piece {
                kind: PieceKind::Newline,
                ..
            }
        )
    }
}

/// Apply `mode` to the text segments of `segments`, recursively.
pub fn apply(mode: SpaceGobbling, segments: &mut [SegmentWithSpans]) {
    if mode == SpaceGobbling::None {
        return;
    }

    let mut atoms = Vec::new();
    let mut text_count = 0;
    flatten(segments, &mut atoms, &mut text_count);

    let mut cuts = vec![Vec::new(); text_count];
    for line in lines(&atoms) {
        for (segment, bytes) in suppressed(mode, line) {
            cuts[segment].push(bytes);
        }
    }

    let mut next = 0;
    edit(segments, &cuts, &mut next);
}

fn flatten(segments: &[SegmentWithSpans], atoms: &mut Vec<Atom>, text_count: &mut usize) {
    for segment in segments {
        match segment {
            SegmentWithSpans::Text { text, .. } => {
                let index = *text_count;
                *text_count += 1;
                split_pieces(text, index, atoms);
            }
            SegmentWithSpans::Unparsed { .. }
            | SegmentWithSpans::Reference { .. }
            | SegmentWithSpans::Formal { .. } => atoms.push(Atom::Content),
            SegmentWithSpans::If(directive) => {
                for branch in &directive.branches {
                    atoms.push(Atom::Mark(MarkKind::Block));
                    flatten(&branch.body, atoms, text_count);
                }
                if let Some(otherwise) = &directive.otherwise {
                    atoms.push(Atom::Mark(MarkKind::Block));
                    flatten(&otherwise.body, atoms, text_count);
                }
                atoms.push(Atom::Mark(MarkKind::Block));
            }
            SegmentWithSpans::Foreach(directive) => {
                atoms.push(Atom::Mark(MarkKind::Block));
                flatten(&directive.body, atoms, text_count);
                if let Some(otherwise) = &directive.otherwise {
                    atoms.push(Atom::Mark(MarkKind::Block));
                    flatten(&otherwise.body, atoms, text_count);
                }
                atoms.push(Atom::Mark(MarkKind::Block));
            }
            SegmentWithSpans::Macro(definition) => {
                atoms.push(Atom::Mark(MarkKind::Block));
                flatten(&definition.body, atoms, text_count);
                atoms.push(Atom::Mark(MarkKind::Block));
            }
            SegmentWithSpans::Set(_)
            | SegmentWithSpans::Break { .. }
            | SegmentWithSpans::Stop { .. }
            | SegmentWithSpans::MacroCall(_)
            | SegmentWithSpans::Evaluate { .. }
            | SegmentWithSpans::Parse { .. }
            | SegmentWithSpans::Include { .. } => atoms.push(Atom::Mark(MarkKind::Line)),
        }
    }
}

fn split_pieces(text: &str, segment: usize, atoms: &mut Vec<Atom>) {
    let kind_of = |c: char| match c {
        '\n' => PieceKind::Newline,
        ' ' | '\t' | '\r' => PieceKind::Blank,
        _ => PieceKind::Word,
    };

    let mut current: Option<(PieceKind, usize)> = None;
    for (at, c) in text.char_indices() {
        let kind = kind_of(c);
        match current {
            // Newlines are never merged: each one ends its own line
            Some((open, _)) if open == kind && kind != PieceKind::Newline => {}
            Some((open, start)) => {
                atoms.push(Atom::Piece {
                    segment,
                    bytes: start..at,
                    kind: open,
                });
                current = Some((kind, at));
            }
            None => current = Some((kind, at)),
        }
    }
    if let Some((kind, start)) = current {
        atoms.push(Atom::Piece {
            segment,
            bytes: start..text.len(),
            kind,
        });
    }
}

/// Split atoms into lines; each line ends with its newline atom, if any.
fn lines(atoms: &[Atom]) -> impl Iterator<Item = &[Atom]> {
    atoms.split_inclusive(Atom::is_newline)
}

/// Byte ranges to delete from text segments for one line.
fn suppressed(mode: SpaceGobbling, line: &[Atom]) -> Vec<(usize, Range<usize>)> {
    let marks: Vec<MarkKind> = line
        .iter()
        .filter_map(|atom| match atom {
            Atom::Mark(kind) => Some(*kind),
            _ => None,
        })
        .collect();
    let directive_only = line.iter().all(|atom| match atom {
        Atom::Piece { kind, .. } => *kind != PieceKind::Word,
        Atom::Mark(_) => true,
        Atom::Content => false,
    });
    if marks.is_empty() || !directive_only {
        return Vec::new();
    }

    let eligible = match mode {
        SpaceGobbling::None => false,
        SpaceGobbling::Bc | SpaceGobbling::Lines => marks.len() == 1,
        SpaceGobbling::Structured => {
            marks.len() == 1 || marks.iter().all(|kind| *kind == MarkKind::Block)
        }
    };
    if !eligible {
        return Vec::new();
    }

    let after_last_mark = line
        .iter()
        .rposition(|atom| matches!(atom, Atom::Mark(_)))
        .map_or(0, |at| at + 1);
    let first = if mode == SpaceGobbling::Bc {
        after_last_mark
    } else {
        0
    };

    line[first..]
        .iter()
        .filter_map(|atom| match atom {
            Atom::Piece { segment, bytes, .. } => Some((*segment, bytes.clone())),
            _ => None,
        })
        .collect()
}

fn edit(segments: &mut [SegmentWithSpans], cuts: &[Vec<Range<usize>>], next: &mut usize) {
    for segment in segments {
        match segment {
            SegmentWithSpans::Text { text, .. } => {
                let index = *next;
                *next += 1;
                if let Some(ranges) = cuts.get(index).filter(|ranges| !ranges.is_empty()) {
                    *text = remove_ranges(text, ranges);
                }
            }
            SegmentWithSpans::If(directive) => {
                for branch in &mut directive.branches {
                    edit(&mut branch.body, cuts, next);
                }
                if let Some(otherwise) = &mut directive.otherwise {
                    edit(&mut otherwise.body, cuts, next);
                }
            }
            SegmentWithSpans::Foreach(directive) => {
                edit(&mut directive.body, cuts, next);
                if let Some(otherwise) = &mut directive.otherwise {
                    edit(&mut otherwise.body, cuts, next);
                }
            }
            SegmentWithSpans::Macro(definition) => edit(&mut definition.body, cuts, next),
            _ => {}
        }
    }
}

/// Remove ascending, non-overlapping byte ranges from `text`.
fn remove_ranges(text: &str, ranges: &[Range<usize>]) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut from = 0;
    for range in ranges {
        kept.push_str(&text[from..range.start]);
        from = range.end;
    }
    kept.push_str(&text[from..]);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vtl::lexing::tokenize;
    use crate::vtl::parsing::parse_segments;

    /// Texts of every text segment, in document order, after gobbling.
    fn gobbled(source: &str, mode: SpaceGobbling) -> Vec<String> {
        let tokens = tokenize(source).expect("lexing should succeed");
        let mut segments = parse_segments(source, tokens, 64).expect("parsing should succeed");
        apply(mode, &mut segments);
        let mut texts = Vec::new();
        collect_texts(&segments, &mut texts);
        texts
    }

    fn collect_texts(segments: &[SegmentWithSpans], texts: &mut Vec<String>) {
        for segment in segments {
            match segment {
                SegmentWithSpans::Text { text, .. } => texts.push(text.clone()),
                SegmentWithSpans::If(directive) => {
                    for branch in &directive.branches {
                        collect_texts(&branch.body, texts);
                    }
                    if let Some(otherwise) = &directive.otherwise {
                        collect_texts(&otherwise.body, texts);
                    }
                }
                SegmentWithSpans::Foreach(directive) => collect_texts(&directive.body, texts),
                SegmentWithSpans::Macro(definition) => collect_texts(&definition.body, texts),
                _ => {}
            }
        }
    }

    const NESTED: &str = "a\n  #if($x)\n  b\n  #end\nc";

    #[test]
    fn test_none_keeps_everything() {
        assert_eq!(
            gobbled(NESTED, SpaceGobbling::None),
            vec!["a\n  ", "\n  b\n  ", "\nc"]
        );
    }

    #[test]
    fn test_lines_removes_directive_lines() {
        assert_eq!(
            gobbled(NESTED, SpaceGobbling::Lines),
            vec!["a\n", "  b\n", "c"]
        );
    }

    #[test]
    fn test_bc_keeps_indentation() {
        assert_eq!(
            gobbled(NESTED, SpaceGobbling::Bc),
            vec!["a\n  ", "  b\n  ", "c"]
        );
    }

    #[test]
    fn test_mixed_lines_untouched() {
        let source = "  x #if($a)y#end\n";
        for mode in [SpaceGobbling::Bc, SpaceGobbling::Lines, SpaceGobbling::Structured] {
            assert_eq!(gobbled(source, mode), vec!["  x ", "y", "\n"]);
        }
    }

    #[test]
    fn test_structured_handles_stacked_block_marks() {
        let source = "#if($a)#if($b)\nx\n#end#end\n";
        assert_eq!(
            gobbled(source, SpaceGobbling::Lines),
            vec!["\nx\n", "\n"]
        );
        assert_eq!(gobbled(source, SpaceGobbling::Structured), vec!["x\n", ""]);
    }

    #[test]
    fn test_structured_ignores_stacked_line_marks() {
        let source = "#set($a = 1)#set($b = 2)\nx";
        assert_eq!(gobbled(source, SpaceGobbling::Structured), vec!["\nx"]);
    }

    #[test]
    fn test_last_line_without_newline() {
        assert_eq!(
            gobbled("x\n   #set($a = 1)", SpaceGobbling::Lines),
            vec!["x\n"]
        );
    }

    #[test]
    fn test_reference_makes_line_mixed() {
        assert_eq!(
            gobbled("#set($a = 1)$a\n", SpaceGobbling::Lines),
            vec!["\n"]
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("STRUCTURED".parse::<SpaceGobbling>(), Ok(SpaceGobbling::Structured));
        assert_eq!(SpaceGobbling::from_name_lossy("sideways"), SpaceGobbling::Lines);
        assert_eq!(SpaceGobbling::default(), SpaceGobbling::Lines);
        assert_eq!(SpaceGobbling::Bc.to_string(), "bc");
    }
}
