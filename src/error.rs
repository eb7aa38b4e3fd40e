//! Errors that can occur when reading a table
//!
//! Every error aborts the whole read. [`ParseError::category`] groups the variants into the
//! broad classes callers usually branch on.

use std::{io, str::Utf8Error};

use thiserror::Error;

/// Broad class of a [`ParseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Settings were rejected before (or while resolving them against) the input
    Configuration,
    /// An unknown engine option key was supplied
    OptionSchema,
    /// The input does not have the shape the settings describe
    Structural,
    /// A column with a declared numeric type holds a non-numeric value
    Conversion,
    /// The bytes could not be acquired, decoded or handed to the worker pool
    Source,
}

/// Problems with the width of a single data row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralKind {
    #[error("too many columns found")]
    TooManyColumns { expected: usize, found: usize },
    #[error("not enough columns found")]
    NotEnoughColumns { expected: usize, found: usize },
    #[error("not enough columns found (row begins inside an unterminated quoted field)")]
    InsideQuotedField,
}

/// Problems with the header line(s)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderErrorKind {
    #[error("mismatch between number of column names and column types")]
    TypeCountMismatch { names: usize, types: usize },
    #[error("type definitions do not all match [num](N|S), found {token:?}")]
    InvalidTypeToken { token: String },
    #[error("no line with column type definitions follows the header")]
    MissingTypeLine,
    #[error("{names} column names supplied for {columns} header columns")]
    NameCountMismatch { names: usize, columns: usize },
}

/// Errors that can occur when reading a table
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value for `{key}`: {reason}")]
    Configuration { key: &'static str, reason: String },
    #[error("unknown engine option `{key}`")]
    OptionSchema { key: String },
    #[error("{kind} in line {row} of data (source line {line})")]
    Structural {
        kind: StructuralKind,
        /// 1-based row number within the selected data
        row: usize,
        /// 1-based physical line number in the input
        line: usize,
    },
    #[error("invalid header in line {line}: {kind}")]
    Header { kind: HeaderErrorKind, line: usize },
    #[error("header line {index} not found in input")]
    MissingHeader { index: usize },
    #[error("Column {column} failed to convert: invalid value {value:?} in line {row} of data")]
    Conversion {
        column: String,
        value: String,
        row: usize,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ParseError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::OptionSchema { .. } => ErrorCategory::OptionSchema,
            Self::Structural { .. } | Self::Header { .. } | Self::MissingHeader { .. } => {
                ErrorCategory::Structural
            }
            Self::Conversion { .. } => ErrorCategory::Conversion,
            Self::Io(_) | Self::Utf8(_) | Self::Regex(_) | Self::WorkerPool(_) => {
                ErrorCategory::Source
            }
        }
    }

    pub(crate) fn config(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            key,
            reason: reason.into(),
        }
    }

    /// Shifts the data row number of a row-level error by `offset` rows.
    ///
    /// Chunks number their rows from 1, the merged result must report rows of the whole region.
    pub(crate) fn rebase_row(self, offset: usize) -> Self {
        match self {
            Self::Structural { kind, row, line } => Self::Structural {
                kind,
                row: row + offset,
                line,
            },
            Self::Conversion { column, value, row } => Self::Conversion {
                column,
                value,
                row: row + offset,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_message() {
        let err = ParseError::Structural {
            kind: StructuralKind::TooManyColumns {
                expected: 3,
                found: 4,
            },
            row: 3,
            line: 4,
        };
        assert_eq!(
            err.to_string(),
            "too many columns found in line 3 of data (source line 4)"
        );
        assert_eq!(err.category(), ErrorCategory::Structural);
    }

    #[test]
    fn test_rebase_row() {
        let err = ParseError::Structural {
            kind: StructuralKind::NotEnoughColumns {
                expected: 3,
                found: 2,
            },
            row: 2,
            line: 10,
        };
        let err = err.rebase_row(40);
        assert!(matches!(err, ParseError::Structural { row: 42, line: 10, .. }));

        let err = ParseError::config("delimiter", "must be a single character").rebase_row(40);
        assert!(matches!(err, ParseError::Configuration { key: "delimiter", .. }));
    }

    #[test]
    fn test_conversion_names_column() {
        let err = ParseError::Conversion {
            column: "B".to_string(),
            value: "b".to_string(),
            row: 1,
        };
        assert!(err.to_string().starts_with("Column B failed to convert"));
        assert_eq!(err.category(), ErrorCategory::Conversion);
    }
}
