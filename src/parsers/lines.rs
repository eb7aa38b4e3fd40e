//! Splits raw input into logical lines
//!
//! `\n`, `\r\n` and `\r` all end a physical line. Physical lines that continue an open quoted
//! field are merged into the logical line that opened it, joined with `\n`.

use std::{borrow::Cow, ops::Range};

use crate::config::Dialect;

use super::delimited::{DelimitedParser, FieldState, is_space};

/// Whether the text seen so far leaves a quoted field open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteState {
    Normal,
    InsideQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Only spaces and tabs
    Blank,
    /// Optional spaces and tabs, then the comment character
    Comment,
    Data,
}

/// Classifies a physical line without regard to quoting
pub fn classify(text: &str, dialect: &Dialect) -> LineKind {
    let content = text.trim_start_matches(is_space);
    if content.is_empty() {
        LineKind::Blank
    } else if dialect.comment.is_some_and(|c| content.starts_with(c)) {
        LineKind::Comment
    } else {
        LineKind::Data
    }
}

/// One record of the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine<'a> {
    pub text: Cow<'a, str>,
    pub kind: LineKind,
    /// 1-based number of the first physical line
    pub number: usize,
    /// Byte range in the input, including the terminator of the last physical line
    pub span: Range<usize>,
    pub physical_lines: usize,
    /// Physical lines of this record that are neither blank nor comments on their own
    pub eligible_lines: usize,
}

/// A physical line without its terminator
#[derive(Debug, Clone, Copy)]
struct PhysicalLine<'a> {
    text: &'a str,
    start: usize,
    /// Offset right after the terminator
    next: usize,
}

#[derive(Debug, Clone)]
struct PhysicalLines<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Iterator for PhysicalLines<'a> {
    type Item = PhysicalLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }
        let start = self.pos;
        let bytes = &self.input.as_bytes()[start..];
        let (end, next) = match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') => {
                (start + i, start + i + 2)
            }
            Some(i) => (start + i, start + i + 1),
            None => (self.input.len(), self.input.len()),
        };
        self.pos = next;
        Some(PhysicalLine {
            text: &self.input[start..end],
            start,
            next,
        })
    }
}

/// Lazy iterator of [`LogicalLine`]s; clone it to restart from the same position
#[derive(Debug, Clone)]
pub struct LineNormalizer<'a> {
    physical: PhysicalLines<'a>,
    parser: DelimitedParser,
    /// Byte offset of `input` within the whole text
    base: usize,
    next_number: usize,
}

impl<'a> LineNormalizer<'a> {
    pub fn new(input: &'a str, parser: DelimitedParser) -> Self {
        Self::starting_at(input, parser, 0, 1)
    }

    /// Normalizes a slice of a larger input that begins at byte `base` on line `first_line`
    pub fn starting_at(input: &'a str, parser: DelimitedParser, base: usize, first_line: usize) -> Self {
        Self {
            physical: PhysicalLines { input, pos: 0 },
            parser,
            base,
            next_number: first_line,
        }
    }
}

impl<'a> Iterator for LineNormalizer<'a> {
    type Item = LogicalLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.physical.next()?;
        let number = self.next_number;
        self.next_number += 1;

        let dialect = self.parser.dialect();
        let kind = classify(first.text, dialect);
        let mut line = LogicalLine {
            text: Cow::Borrowed(first.text),
            kind,
            number,
            span: self.base + first.start..self.base + first.next,
            physical_lines: 1,
            eligible_lines: usize::from(kind == LineKind::Data),
        };
        if kind != LineKind::Data {
            return Some(line);
        }

        let mut state = self.parser.run(first.text, FieldState::StartField, &mut ());
        while state.quote_state() == QuoteState::InsideQuote {
            let Some(next) = self.physical.next() else {
                break;
            };
            self.next_number += 1;
            line.physical_lines += 1;
            if classify(next.text, dialect) == LineKind::Data {
                line.eligible_lines += 1;
            }
            line.span.end = self.base + next.next;

            let text = line.text.to_mut();
            let appended = text.len();
            text.push('\n');
            text.push_str(next.text);
            state = self.parser.run(&text[appended..], state, &mut ());
        }
        Some(line)
    }
}
