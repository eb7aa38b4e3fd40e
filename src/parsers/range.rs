//! Selects the data rows of a table
//!
//! Row indices count eligible physical lines, i.e. lines that are neither blank nor
//! comments. Quoting is ignored when counting, so a line that continues a quoted field
//! still occupies an index.

use log::debug;

use crate::error::{ParseError, StructuralKind};

use super::lines::{LineKind, LineNormalizer, LogicalLine};

/// Resolved, non-negative bounds of the data rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    /// Exclusive; `None` reads to the end of the input
    pub end: Option<usize>,
}

/// Total number of eligible physical lines
pub fn eligible_count(lines: &LineNormalizer<'_>) -> usize {
    lines.clone().map(|line| line.eligible_lines).sum()
}

/// Turns a possibly negative index into an absolute one.
///
/// `total` is only counted when an index is actually negative.
pub(crate) fn resolve_index(
    key: &'static str,
    index: i64,
    total: &mut dyn FnMut() -> usize,
) -> Result<usize, ParseError> {
    if index >= 0 {
        return Ok(index as usize);
    }
    let total = total();
    let back = index.unsigned_abs() as usize;
    total.checked_sub(back).ok_or_else(|| {
        ParseError::config(
            key,
            format!("{index} is out of range for {total} available lines"),
        )
    })
}

/// Resolves the configured data bounds against the input
pub fn resolve(
    lines: &LineNormalizer<'_>,
    start: Option<i64>,
    default_start: usize,
    end: Option<i64>,
) -> Result<RowRange, ParseError> {
    let mut count = None;
    let mut total = || *count.get_or_insert_with(|| eligible_count(lines));
    let start = match start {
        Some(start) => resolve_index("data_start", start, &mut total)?,
        None => default_start,
    };
    let end = end
        .map(|end| resolve_index("data_end", end, &mut total))
        .transpose()?;
    let range = RowRange { start, end };
    debug!("Resolved data rows {:?}", range);
    Ok(range)
}

/// The data lines of a [`RowRange`], in input order
#[derive(Debug, Clone)]
pub struct SelectedRows<'a> {
    lines: LineNormalizer<'a>,
    range: RowRange,
    /// Eligible index of the next line
    index: usize,
    done: bool,
}

impl<'a> SelectedRows<'a> {
    pub fn new(lines: LineNormalizer<'a>, range: RowRange) -> Self {
        Self {
            lines,
            range,
            index: 0,
            // an end at or before the start selects nothing, wherever the start falls
            done: range.end.is_some_and(|end| end <= range.start),
        }
    }
}

impl<'a> Iterator for SelectedRows<'a> {
    type Item = Result<LogicalLine<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some(line) = self.lines.next() else {
                self.done = true;
                return None;
            };
            if line.kind != LineKind::Data {
                continue;
            }
            let first = self.index;
            self.index += line.eligible_lines;
            if self.range.end.is_some_and(|end| first >= end) {
                self.done = true;
                return None;
            }
            if first >= self.range.start {
                return Some(Ok(line));
            }
            if self.index > self.range.start {
                // the start index is a continuation line of this record
                self.done = true;
                return Some(Err(ParseError::Structural {
                    kind: StructuralKind::InsideQuotedField,
                    row: 1,
                    line: line.number + (self.range.start - first),
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Flavor, parsers::delimited::DelimitedParser};

    const QUOTED: &str = "A B C\n1 2 3\n4 5 6\n\n7 8 \"9\n \t1\"\n# comment\n10 11 12\n";

    fn normalizer(input: &str) -> LineNormalizer<'_> {
        LineNormalizer::new(input, DelimitedParser::new(Flavor::Basic.dialect()))
    }

    fn selected(input: &str, range: RowRange) -> Vec<String> {
        SelectedRows::new(normalizer(input), range)
            .map(|line| line.unwrap().text.into_owned())
            .collect()
    }

    #[test]
    fn test_eligible_count() {
        assert_eq!(eligible_count(&normalizer(QUOTED)), 6);
    }

    #[test]
    fn test_resolve_negative() {
        let lines = normalizer("a b\n1 2\n3 4\n5 6\n");
        let range = resolve(&lines, Some(-2), 1, Some(-1)).unwrap();
        assert_eq!(range, RowRange { start: 2, end: Some(3) });

        let err = resolve(&lines, Some(-5), 1, None).unwrap_err();
        assert!(matches!(err, ParseError::Configuration { key: "data_start", .. }));
        let err = resolve(&lines, None, 1, Some(-9)).unwrap_err();
        assert!(matches!(err, ParseError::Configuration { key: "data_end", .. }));
    }

    #[test]
    fn test_select_skips_blank_and_comment() {
        let rows = selected(QUOTED, RowRange { start: 3, end: None });
        assert_eq!(rows, vec!["7 8 \"9\n \t1\"", "10 11 12"]);
        let rows = selected(QUOTED, RowRange { start: 5, end: None });
        assert_eq!(rows, vec!["10 11 12"]);
    }

    #[test]
    fn test_select_end() {
        let rows = selected(QUOTED, RowRange { start: 1, end: Some(3) });
        assert_eq!(rows, vec!["1 2 3", "4 5 6"]);
        let rows = selected(QUOTED, RowRange { start: 3, end: Some(1) });
        assert!(rows.is_empty());
    }

    #[test]
    fn test_record_starting_before_end_is_whole() {
        let rows = selected(QUOTED, RowRange { start: 3, end: Some(4) });
        assert_eq!(rows, vec!["7 8 \"9\n \t1\""]);
    }

    #[test]
    fn test_start_inside_quoted_field() {
        let mut rows = SelectedRows::new(normalizer(QUOTED), RowRange { start: 4, end: None });
        let err = rows.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            ParseError::Structural {
                kind: StructuralKind::InsideQuotedField,
                row: 1,
                line: 6,
            }
        ));
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_empty_range_inside_quoted_field() {
        for end in [3, 4] {
            let rows = selected(QUOTED, RowRange { start: 4, end: Some(end) });
            assert!(rows.is_empty(), "end {}", end);
        }
    }
}
