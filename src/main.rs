//! `asciitab` is a CLI tool for reading delimited ASCII tables into typed columns.
//!
//! It reads a file (or stdin), prints a summary of the resolved columns to stderr and
//! the first rows as CSV to stdout.
//!
//! # Example usage:
//!
//! ```sh
//! # whitespace separated table with a header line
//! asciitab data.txt
//! # comma separated, treat "-999" and empty fields as missing
//! asciitab -f csv --fill=-999=0 --fill==0 data.csv
//! # typed header (RDB), skip the last two data lines
//! asciitab -f rdb --data-end=-2 data.rdb
//! # parse a large file on 8 workers
//! cat big.txt | asciitab -p -w 8 -n 0
//! ```
//!
//! Set `RUST_LOG=debug` to see how the header, data range and column types were resolved.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use runner::run_asciitab;

mod runner;

/// Table layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Basic,
    Csv,
    Tab,
    NoHeader,
    CommentedHeader,
    Rdb,
}

/// `asciitab` reads delimited ASCII tables into typed columns
#[derive(Debug, Parser)]
struct Args {
    /// Input file, stdin if not provided
    file: Option<PathBuf>,
    /// Table layout preset
    #[arg(short, long, value_enum, default_value_t = Format::Basic)]
    format: Format,
    /// Field delimiter, a single character
    #[arg(short, long)]
    delimiter: Option<String>,
    /// Quote character, a single character
    #[arg(short, long)]
    quotechar: Option<String>,
    /// Comment character, a single character
    #[arg(short, long, conflicts_with = "no_comment")]
    comment: Option<String>,
    /// Do not treat any line as a comment
    #[arg(long)]
    no_comment: bool,
    /// Index of the header line. Negative values count back from `--data-start`
    #[arg(long, allow_negative_numbers = true, conflicts_with = "no_header")]
    header_start: Option<i64>,
    /// The input has no header line
    #[arg(long)]
    no_header: bool,
    /// Index of the first data line. Negative values count from the end
    #[arg(long, allow_negative_numbers = true)]
    data_start: Option<i64>,
    /// Index one past the last data line. Negative values count from the end
    #[arg(long, allow_negative_numbers = true)]
    data_end: Option<i64>,
    /// Comma separated column names replacing the header
    #[arg(long, value_delimiter = ',')]
    names: Option<Vec<String>>,
    /// Comma separated names of the columns to keep
    #[arg(long, value_delimiter = ',')]
    include: Option<Vec<String>>,
    /// Comma separated names of the columns to drop
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,
    /// Fill rule `MATCH=REPLACEMENT[:COL,COL...]`, may be repeated. Replaces the default `=0` rule
    #[arg(long, conflicts_with = "no_fill")]
    fill: Vec<String>,
    /// Disable fill rules and masking
    #[arg(long)]
    no_fill: bool,
    /// Comma separated names of the columns all-column fill rules apply to
    #[arg(long, value_delimiter = ',')]
    fill_include: Option<Vec<String>>,
    /// Comma separated names of the columns all-column fill rules skip
    #[arg(long, value_delimiter = ',')]
    fill_exclude: Option<Vec<String>>,
    /// Parse data rows in parallel chunks. Not safe with quoted fields spanning lines
    #[arg(short, long)]
    parallel: bool,
    /// Number of workers for `--parallel`, defaults to the number of CPUs
    #[arg(short, long)]
    workers: Option<usize>,
    /// Engine option `KEY=VALUE`, may be repeated
    #[arg(short, long)]
    engine: Vec<String>,
    /// Number of rows written to stdout
    #[arg(short = 'n', long, default_value_t = 10)]
    head: usize,
}

/// Primary entrypoint for `asciitab`
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run_asciitab(args)
}
