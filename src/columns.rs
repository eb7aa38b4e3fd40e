//! Accumulates the fields of each output column
//!
//! A [`RowPlan`] is shared read-only by every worker; each worker owns the [`ColumnSet`]
//! it fills.

use crate::{
    error::{ParseError, StructuralKind},
    fill::ColumnFill,
    parsers::{
        delimited::{DelimitedParser, Fields},
        header::DeclaredType,
        lines::LogicalLine,
    },
};

/// Strings of one column stored back to back, with one mask flag per value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnBuffer {
    text: String,
    ends: Vec<usize>,
    mask: Vec<bool>,
}

impl ColumnBuffer {
    /// `capacity` is the initial size of the string arena in bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            ends: Vec::new(),
            mask: Vec::new(),
        }
    }

    pub fn push(&mut self, value: &str, masked: bool) {
        self.text.push_str(value);
        self.ends.push(self.text.len());
        self.mask.push(masked);
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        Some(&self.text[start..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        let starts = std::iter::once(0).chain(self.ends.iter().copied());
        starts
            .zip(&self.ends)
            .zip(&self.mask)
            .map(|((start, &end), &masked)| (&self.text[start..end], masked))
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Moves the values of `other` to the end of this buffer
    pub fn append(&mut self, other: ColumnBuffer) {
        let offset = self.text.len();
        self.text.push_str(&other.text);
        self.ends.extend(other.ends.iter().map(|end| end + offset));
        self.mask.extend(other.mask);
    }

    pub fn into_mask(self) -> Vec<bool> {
        self.mask
    }
}

/// An output column and the rules used to fill it
#[derive(Debug, Clone)]
pub struct OutputColumn {
    pub name: String,
    /// Field position in a data row
    pub source: usize,
    pub declared: Option<DeclaredType>,
    pub fill: ColumnFill,
}

/// How data rows turn into column values
#[derive(Debug, Clone)]
pub struct RowPlan {
    pub parser: DelimitedParser,
    /// Number of fields a row must have
    pub width: usize,
    pub columns: Vec<OutputColumn>,
    pub capacity: usize,
}

/// Column buffers of a run of rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    pub buffers: Vec<ColumnBuffer>,
    pub rows: usize,
}

impl ColumnSet {
    /// Appends the rows of `other`, which must come from the same plan
    pub fn append(&mut self, other: ColumnSet) {
        for (buffer, more) in self.buffers.iter_mut().zip(other.buffers) {
            buffer.append(more);
        }
        self.rows += other.rows;
    }
}

impl RowPlan {
    pub fn empty_set(&self) -> ColumnSet {
        ColumnSet {
            buffers: (0..self.columns.len())
                .map(|_| ColumnBuffer::with_capacity(self.capacity))
                .collect(),
            rows: 0,
        }
    }

    /// Tokenizes, checks and fills `rows`, numbering them from 1
    pub fn build<'a, I>(&self, rows: I) -> Result<ColumnSet, ParseError>
    where
        I: IntoIterator<Item = Result<LogicalLine<'a>, ParseError>>,
    {
        let mut set = self.empty_set();
        let mut fields = Fields::default();
        for (index, line) in rows.into_iter().enumerate() {
            let line = line?;
            let row = index + 1;
            self.parser.tokenize(&line.text, &mut fields);

            let found = fields.len();
            let kind = if found > self.width {
                Some(StructuralKind::TooManyColumns {
                    expected: self.width,
                    found,
                })
            } else if found < self.width && self.parser.dialect().strict_width {
                Some(StructuralKind::NotEnoughColumns {
                    expected: self.width,
                    found,
                })
            } else {
                None
            };
            if let Some(kind) = kind {
                return Err(ParseError::Structural {
                    kind,
                    row,
                    line: line.number,
                });
            }

            for (buffer, column) in set.buffers.iter_mut().zip(&self.columns) {
                // missing trailing fields of lenient rows are empty
                let raw = fields.get(column.source).unwrap_or("");
                match column.fill.replacement(raw) {
                    Some(replacement) => buffer.push(replacement, true),
                    None => buffer.push(raw, false),
                }
            }
            set.rows += 1;
        }
        Ok(set)
    }
}
