//! Reads a table from a [`Source`]
//!
//! Settings are validated first, then the header and the data range are resolved once.
//! The data rows are parsed either in a single pass or in chunks on a worker pool, and
//! column types are resolved over the complete columns.

use log::debug;

use crate::{
    columns::{ColumnSet, OutputColumn, RowPlan},
    config::{Config, ReadOptions},
    error::ParseError,
    parallel,
    parsers::{
        delimited::{DelimitedParser, Fields},
        header::{self, HeaderSpec},
        inference::infer_column,
        lines::LineNormalizer,
        range::{self, RowRange, SelectedRows},
    },
    source::Source,
    table::Table,
};

/// Reads any number of sources with one validated configuration
#[derive(Debug, Clone)]
pub struct TableReader {
    config: Config,
}

impl TableReader {
    pub fn new(options: ReadOptions) -> Result<Self, ParseError> {
        Ok(Self {
            config: options.validate()?,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn read<'a>(&self, source: impl Into<Source<'a>>) -> Result<Table, ParseError> {
        let text = source.into().into_text()?;
        read_text(&text, &self.config)
    }
}

/// Validates `options` and reads one table from `source`
pub fn parse<'a>(source: impl Into<Source<'a>>, options: &ReadOptions) -> Result<Table, ParseError> {
    TableReader::new(options.clone())?.read(source)
}

fn output_plan(spec: &HeaderSpec, parser: DelimitedParser, config: &Config) -> RowPlan {
    let columns: Vec<OutputColumn> = spec
        .output_columns(config.include_names.as_deref(), config.exclude_names.as_deref())
        .into_iter()
        .map(|column| OutputColumn {
            name: column.name.clone(),
            source: column.source,
            declared: column.declared,
            fill: config.fill.plan_for(&column.name),
        })
        .collect();
    let filled: Vec<&str> = columns
        .iter()
        .filter(|column| !column.fill.is_empty())
        .map(|column| column.name.as_str())
        .collect();
    debug!("Fill rules apply to columns {:?}", filled);
    RowPlan {
        parser,
        width: spec.width(),
        columns,
        capacity: config.engine.column_capacity,
    }
}

fn parse_rows(
    text: &str,
    lines: LineNormalizer<'_>,
    range: RowRange,
    plan: &RowPlan,
    config: &Config,
) -> Result<ColumnSet, ParseError> {
    let mut rows = SelectedRows::new(lines, range);
    if !config.engine.parallel {
        return plan.build(rows);
    }

    // the chunks cover the selected rows, from the first one to the end of the region
    let Some(first) = rows.next().transpose()? else {
        return Ok(plan.empty_set());
    };
    let end = match range.end {
        None => text.len(),
        Some(_) => {
            let mut end = first.span.end;
            for line in rows {
                end = line?.span.end;
            }
            end
        }
    };
    parallel::parse_chunks(
        text,
        first.span.start..end,
        first.number,
        plan,
        config.engine.worker_count(),
    )
}

fn read_text(text: &str, config: &Config) -> Result<Table, ParseError> {
    let parser = DelimitedParser::new(config.dialect);
    let lines = LineNormalizer::new(text, parser);

    let parsed = header::read_header(&lines, &parser, config)?;
    let range = range::resolve(
        &lines,
        config.data_start,
        parsed.default_data_start,
        config.data_end,
    )?;
    let spec = header::build_spec(parsed, config, || {
        match SelectedRows::new(lines.clone(), range).next() {
            Some(line) => {
                let mut fields = Fields::default();
                parser.tokenize(&line?.text, &mut fields);
                Ok(fields.len())
            }
            None => Ok(0),
        }
    })?;
    debug!("Reading {} columns from data rows {:?}", spec.width(), range);

    let plan = output_plan(&spec, parser, config);
    let set = parse_rows(text, lines, range, &plan, config)?;
    let rows = set.rows;
    let columns = plan
        .columns
        .into_iter()
        .zip(set.buffers)
        .map(|(column, buffer)| infer_column(column.name, buffer, column.declared))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Table::new(columns, rows))
}
