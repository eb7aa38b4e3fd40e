//! Runs the command line tool

use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use asciitab::{EngineOptions, FillRule, Flavor, ReadOptions, Table, TableReader};
use bytesize::ByteSize;
use log::{debug, info};

use crate::{Args, Format};

/// Placeholder written for masked values
const MASKED_CELL: &str = "--";

impl From<Format> for Flavor {
    fn from(format: Format) -> Self {
        match format {
            Format::Basic => Flavor::Basic,
            Format::Csv => Flavor::Csv,
            Format::Tab => Flavor::Tab,
            Format::NoHeader => Flavor::NoHeader,
            Format::CommentedHeader => Flavor::CommentedHeader,
            Format::Rdb => Flavor::Rdb,
        }
    }
}

/// Parses `MATCH=REPLACEMENT[:COL,COL...]`
fn parse_fill_rule(rule: &str) -> Result<FillRule> {
    let (matches, rest) = rule
        .split_once('=')
        .ok_or_else(|| anyhow!("Fill rule {:?} is missing '='", rule))?;
    match rest.split_once(':') {
        Some((replacement, columns)) => Ok(FillRule::for_columns(
            matches,
            replacement,
            columns.split(',').filter(|c| !c.is_empty()),
        )),
        None => Ok(FillRule::new(matches, rest)),
    }
}

/// Parses `KEY=VALUE`
fn parse_key_value(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .ok_or_else(|| anyhow!("Engine option {:?} is not of the form KEY=VALUE", pair))
}

/// Translates the command line into reader settings
fn build_options(args: &Args) -> Result<ReadOptions> {
    let pairs = args
        .engine
        .iter()
        .map(|pair| parse_key_value(pair))
        .collect::<Result<Vec<_>>>()?;
    let mut engine = EngineOptions::from_pairs(pairs)?;
    engine.parallel |= args.parallel;
    if args.workers.is_some() {
        engine.workers = args.workers;
    }

    let mut options = ReadOptions::new(args.format.into()).engine(engine);
    if let Some(delimiter) = &args.delimiter {
        options = options.delimiter(delimiter.as_str());
    }
    if let Some(quotechar) = &args.quotechar {
        options = options.quotechar(quotechar.as_str());
    }
    if let Some(comment) = &args.comment {
        options = options.comment(comment.as_str());
    }
    if args.no_comment {
        options = options.no_comment();
    }
    if let Some(header_start) = args.header_start {
        options = options.header_start(header_start);
    }
    if args.no_header {
        options = options.no_header();
    }
    if let Some(data_start) = args.data_start {
        options = options.data_start(data_start);
    }
    if let Some(data_end) = args.data_end {
        options = options.data_end(data_end);
    }
    if let Some(names) = &args.names {
        options = options.names(names.iter().cloned());
    }
    if let Some(include) = &args.include {
        options = options.include_names(include.iter().cloned());
    }
    if let Some(exclude) = &args.exclude {
        options = options.exclude_names(exclude.iter().cloned());
    }
    if args.no_fill {
        options = options.fill_values(Vec::new());
    } else if !args.fill.is_empty() {
        let rules = args
            .fill
            .iter()
            .map(|rule| parse_fill_rule(rule))
            .collect::<Result<Vec<_>>>()?;
        options = options.fill_values(rules);
    }
    if let Some(names) = &args.fill_include {
        options = options.fill_include_names(names.iter().cloned());
    }
    if let Some(names) = &args.fill_exclude {
        options = options.fill_exclude_names(names.iter().cloned());
    }
    Ok(options)
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            Ok(bytes)
        }
    }
}

/// Writes one line per column: name, type, number of masked values
fn print_summary(table: &Table) {
    eprintln!("{} rows, {} columns", table.rows(), table.columns().len());
    for column in table.columns() {
        eprintln!(
            "  {:<20} {:<6} {} masked",
            column.name(),
            column.column_type(),
            column.masked_count()
        );
    }
}

/// Writes the first `rows` rows of `table` as CSV
fn write_head<W: io::Write>(table: &Table, rows: usize, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.names())?;
    for row in 0..rows.min(table.rows()) {
        let record = table.columns().iter().map(|column| {
            if column.is_masked_at(row) {
                MASKED_CELL.to_string()
            } else {
                column.values().display(row).unwrap_or_default()
            }
        });
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Runs `asciitab`
pub fn run_asciitab(args: Args) -> Result<()> {
    let options = build_options(&args)?;
    let reader = TableReader::new(options).context("Invalid reader settings")?;
    debug!("Reader settings: {:?}", reader.config());

    let input = read_input(args.file.as_deref())?;
    info!("Read {} of input", ByteSize::b(input.len() as u64));
    let table = reader.read(input).context("Failed to read table")?;

    print_summary(&table);
    if args.head > 0 {
        write_head(&table, args.head, io::stdout().lock())?;
    }
    Ok(())
}
