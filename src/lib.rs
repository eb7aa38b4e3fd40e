//! `asciitab` reads delimited plain-text tables (space, comma or tab separated, with optional
//! quoting, comments and typed headers) into typed columns.
//!
//! ```
//! use asciitab::{Flavor, ReadOptions, parse};
//!
//! let table = parse("A B C\n1 2 3\n4 5 6", &ReadOptions::new(Flavor::Basic)).unwrap();
//! assert_eq!(table.names(), vec!["A", "B", "C"]);
//! ```
//!
//! # Pipeline
//! Settings are validated before the input is touched. Input is split into logical lines
//! (a quoted field may span several physical lines), the header is located, and the data
//! rows selected by `data_start`/`data_end` are split into fields. Fill rules replace and
//! mask matching fields, and once every row is collected each column is typed as integer,
//! float or string.
//!
//! With `parallel` enabled the data rows are split into line-aligned chunks parsed on a
//! worker pool. Chunk boundaries ignore quoting, so inputs with quoted fields that span
//! lines must be read sequentially.

mod columns;
pub mod config;
pub mod error;
pub mod fill;
mod parallel;
pub mod parsers;
mod reader;
pub mod source;
pub mod table;

pub use config::{Config, Dialect, EngineOptions, Flavor, ReadOptions};
pub use error::{ErrorCategory, HeaderErrorKind, ParseError, StructuralKind};
pub use fill::{FillRule, FillScope};
pub use reader::{TableReader, parse};
pub use source::Source;
pub use table::{Column, ColumnType, ColumnValues, Table};
