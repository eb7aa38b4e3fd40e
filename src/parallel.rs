//! Parses the data region in chunks on a worker pool
//!
//! Chunk boundaries are moved forward to the next line terminator without looking at quote
//! state, so a quoted field that spans a boundary is split. Reads with multi-line quoted
//! fields must stay sequential.

use std::ops::Range;

use log::debug;
use rayon::prelude::*;

use crate::{
    columns::{ColumnSet, RowPlan},
    error::ParseError,
    parsers::lines::{LineKind, LineNormalizer},
};

/// A line-aligned slice of the data region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChunk {
    pub span: Range<usize>,
    /// Source line number of the first line in the chunk
    pub first_line: usize,
}

/// Returns the first line start at or after `pos`
fn align_to_line(input: &str, pos: usize, end: usize) -> usize {
    let bytes = input.as_bytes();
    match bytes[pos - 1] {
        b'\n' => return pos,
        b'\r' if bytes.get(pos) != Some(&b'\n') => return pos,
        _ => {}
    }
    match bytes[pos..end].iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(i) if bytes[pos + i] == b'\r' && bytes.get(pos + i + 1) == Some(&b'\n') => {
            (pos + i + 2).min(end)
        }
        Some(i) => pos + i + 1,
        None => end,
    }
}

fn count_line_breaks(text: &str) -> usize {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|&(i, &b)| b == b'\n' || (b == b'\r' && bytes.get(i + 1) != Some(&b'\n')))
        .count()
}

/// Splits `span` of `input` into at most `parts` line-aligned chunks
pub fn split_chunks(input: &str, span: Range<usize>, first_line: usize, parts: usize) -> Vec<ParseChunk> {
    let len = span.end - span.start;
    let parts = parts.max(1);
    let mut bounds = vec![span.start];
    for i in 1..parts {
        let target = span.start + len * i / parts;
        let last = *bounds.last().unwrap_or(&span.start);
        if target <= last {
            continue;
        }
        let bound = align_to_line(input, target, span.end);
        if bound > last && bound < span.end {
            bounds.push(bound);
        }
    }
    bounds.push(span.end);

    let mut line = first_line;
    bounds
        .windows(2)
        .filter(|w| w[0] < w[1])
        .map(|w| {
            let chunk = ParseChunk {
                span: w[0]..w[1],
                first_line: line,
            };
            line += count_line_breaks(&input[w[0]..w[1]]);
            chunk
        })
        .collect()
}

/// Parses the data lines of `span` with `workers` threads and joins the results in order
pub fn parse_chunks(
    input: &str,
    span: Range<usize>,
    first_line: usize,
    plan: &RowPlan,
    workers: usize,
) -> Result<ColumnSet, ParseError> {
    let chunks = split_chunks(input, span, first_line, workers);
    debug!("Parsing {} chunks on {} workers", chunks.len(), workers);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    let results: Vec<Result<ColumnSet, ParseError>> = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| {
                let lines = LineNormalizer::starting_at(
                    &input[chunk.span.clone()],
                    plan.parser,
                    chunk.span.start,
                    chunk.first_line,
                );
                plan.build(lines.filter(|l| l.kind == LineKind::Data).map(Ok))
            })
            .collect()
    });

    let mut merged = plan.empty_set();
    for result in results {
        match result {
            Ok(set) => merged.append(set),
            Err(err) => return Err(err.rebase_row(merged.rows)),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        columns::OutputColumn,
        config::Flavor,
        error::StructuralKind,
        fill::FillSpec,
        parsers::delimited::DelimitedParser,
    };

    fn plan(width: usize) -> RowPlan {
        RowPlan {
            parser: DelimitedParser::new(Flavor::Basic.dialect()),
            width,
            columns: (0..width)
                .map(|source| OutputColumn {
                    name: format!("col{}", source + 1),
                    source,
                    declared: None,
                    fill: FillSpec::default().plan_for("x"),
                })
                .collect(),
            capacity: 16,
        }
    }

    fn texts<'a>(input: &'a str, chunks: &[ParseChunk]) -> Vec<&'a str> {
        chunks.iter().map(|c| &input[c.span.clone()]).collect()
    }

    #[test]
    fn test_split_aligns_to_lines() {
        let input = "1 2\n3 4\n5 6\n7 8\n";
        let chunks = split_chunks(input, 0..input.len(), 1, 3);
        let texts = texts(input, &chunks);
        assert_eq!(texts.concat(), input);
        assert!(texts.iter().all(|t| t.ends_with('\n')));
        let lines: Vec<_> = chunks.iter().map(|c| c.first_line).collect();
        let mut expected = 1;
        for (chunk, text) in lines.iter().zip(&texts) {
            assert_eq!(*chunk, expected);
            expected += text.matches('\n').count();
        }
    }

    #[test]
    fn test_split_crlf() {
        let input = "1 2\r\n3 4\r\n5 6\r\n";
        for parts in 1..8 {
            let chunks = split_chunks(input, 0..input.len(), 1, parts);
            let texts = texts(input, &chunks);
            assert_eq!(texts.concat(), input);
            assert!(texts.iter().all(|t| t.ends_with("\r\n")));
        }
    }

    #[test]
    fn test_more_parts_than_lines() {
        let input = "1 2\n3 4";
        let chunks = split_chunks(input, 0..input.len(), 5, 16);
        assert_eq!(texts(input, &chunks), vec!["1 2\n", "3 4"]);
        assert_eq!(chunks[1].first_line, 6);
    }

    #[test]
    fn test_parse_chunks_matches_sequential() {
        let input: String = (0..200).map(|i| format!("{} {}\n", i, i * 2)).collect();
        let plan = plan(2);
        let sequential = plan
            .build(
                LineNormalizer::new(&input, plan.parser)
                    .filter(|l| l.kind == LineKind::Data)
                    .map(Ok),
            )
            .unwrap();
        let parallel = parse_chunks(&input, 0..input.len(), 1, &plan, 4).unwrap();
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.rows, 200);
    }

    #[test]
    fn test_error_row_is_rebased() {
        let mut input: String = (0..100).map(|i| format!("{} {}\n", i, i)).collect();
        input.push_str("1 2 3\n");
        let err = parse_chunks(&input, 0..input.len(), 1, &plan(2), 4).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Structural {
                kind: StructuralKind::TooManyColumns { .. },
                row: 101,
                line: 101,
            }
        ));
    }
}
