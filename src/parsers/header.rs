//! Locates the header and builds the column layout of a table

use std::sync::LazyLock;

use log::debug;
use regex::{Regex, RegexBuilder};

use crate::{
    config::Config,
    error::{HeaderErrorKind, ParseError},
};

use super::{
    delimited::{DelimitedParser, Fields, is_space},
    lines::{LineKind, LineNormalizer, LogicalLine},
    range::resolve_index,
};

/// Pattern every column type of a typed header must match, e.g. `N`, `S`, `10n`
const TYPE_TOKEN_PATTERN: &str = r"^\d*[NS]$";

static TYPE_TOKEN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    RegexBuilder::new(TYPE_TOKEN_PATTERN)
        .case_insensitive(true)
        .build()
});

/// Column type declared by a typed header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Numeric,
    Text,
}

/// What the header lines of the input say about the columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHeader {
    /// Names read from the header line, `None` without a header
    pub names: Option<Vec<String>>,
    pub types: Option<Vec<DeclaredType>>,
    /// Source line of the header
    pub line: Option<usize>,
    /// Data start used when none is configured
    pub default_data_start: usize,
}

/// A column of the table as the data rows lay it out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    /// Field position in a data row
    pub source: usize,
    pub declared: Option<DeclaredType>,
}

/// Final column layout: every field position of a row, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    pub columns: Vec<ColumnSpec>,
}

impl HeaderSpec {
    fn new(names: Vec<String>, types: Option<Vec<DeclaredType>>) -> Self {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(source, name)| ColumnSpec {
                name,
                source,
                declared: types.as_ref().and_then(|t| t.get(source).copied()),
            })
            .collect();
        Self { columns }
    }

    /// Number of fields every data row must have
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Columns kept in the output. Include names apply before exclude names.
    pub fn output_columns(
        &self,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> Vec<&ColumnSpec> {
        self.columns
            .iter()
            .filter(|c| include.is_none_or(|names| names.contains(&c.name)))
            .filter(|c| !exclude.is_some_and(|names| names.contains(&c.name)))
            .collect()
    }
}

/// Generated names for headerless tables
pub fn positional_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("col{i}")).collect()
}

/// Reads the header lines selected by `config`
pub fn read_header(
    lines: &LineNormalizer<'_>,
    parser: &DelimitedParser,
    config: &Config,
) -> Result<ParsedHeader, ParseError> {
    let Some(header_start) = config.header_start() else {
        return Ok(ParsedHeader::default());
    };
    let mut fields = Fields::default();
    let header = if config.flavor.header_in_comments() {
        read_commented_header(lines, parser, header_start, &mut fields)?
    } else {
        read_data_header(lines, parser, config, header_start, &mut fields)?
    };

    if let (Some(names), Some(header_names)) = (&config.names, &header.names) {
        if names.len() != header_names.len() {
            return Err(ParseError::Header {
                kind: HeaderErrorKind::NameCountMismatch {
                    names: names.len(),
                    columns: header_names.len(),
                },
                line: header.line.unwrap_or_default(),
            });
        }
    }
    debug!("Read header {:?}", header);
    Ok(header)
}

/// The header is one of the comment lines, data indices count only data lines
fn read_commented_header(
    lines: &LineNormalizer<'_>,
    parser: &DelimitedParser,
    header_start: i64,
    fields: &mut Fields,
) -> Result<ParsedHeader, ParseError> {
    let comments = || lines.clone().filter(|l| l.kind == LineKind::Comment);
    let index = resolve_index("header_start", header_start, &mut || comments().count())?;
    let line = comments()
        .nth(index)
        .ok_or(ParseError::MissingHeader { index })?;

    let content = line.text.trim_start_matches(is_space);
    let mut content = content.chars();
    content.next();
    parser.tokenize(content.as_str(), fields);
    Ok(ParsedHeader {
        names: Some(fields.to_vec()),
        types: None,
        line: Some(line.number),
        default_data_start: index,
    })
}

/// Finds the data line whose eligible index is `index`
fn find_eligible<'a>(
    lines: &mut LineNormalizer<'a>,
    index: usize,
    next_index: &mut usize,
) -> Option<LogicalLine<'a>> {
    for line in lines.by_ref().filter(|l| l.kind == LineKind::Data) {
        let first = *next_index;
        *next_index += line.eligible_lines;
        if first == index {
            return Some(line);
        }
        if first > index {
            return None;
        }
    }
    None
}

fn read_data_header(
    lines: &LineNormalizer<'_>,
    parser: &DelimitedParser,
    config: &Config,
    header_start: i64,
    fields: &mut Fields,
) -> Result<ParsedHeader, ParseError> {
    let index = if header_start < 0 {
        // validation guarantees a non-negative data start alongside a negative header
        let data_start = config.data_start.unwrap_or_default().max(0);
        let index = data_start + header_start;
        usize::try_from(index).map_err(|_| {
            ParseError::config(
                "header_start",
                format!("{header_start} is out of range before data line {data_start}"),
            )
        })?
    } else {
        header_start as usize
    };

    let mut scan = lines.clone();
    let mut next_index = 0;
    let line = find_eligible(&mut scan, index, &mut next_index)
        .ok_or(ParseError::MissingHeader { index })?;
    parser.tokenize(&line.text, fields);
    let names = fields.to_vec();

    if !config.flavor.has_typed_header() {
        return Ok(ParsedHeader {
            names: Some(names),
            types: None,
            line: Some(line.number),
            default_data_start: next_index,
        });
    }

    let type_index = next_index;
    let type_line = find_eligible(&mut scan, type_index, &mut next_index).ok_or(
        ParseError::Header {
            kind: HeaderErrorKind::MissingTypeLine,
            line: line.number,
        },
    )?;
    parser.tokenize(&type_line.text, fields);
    let types = parse_types(fields, names.len(), type_line.number)?;
    Ok(ParsedHeader {
        names: Some(names),
        types: Some(types),
        line: Some(line.number),
        default_data_start: next_index,
    })
}

fn parse_types(
    fields: &Fields,
    names: usize,
    line: usize,
) -> Result<Vec<DeclaredType>, ParseError> {
    if fields.len() != names {
        return Err(ParseError::Header {
            kind: HeaderErrorKind::TypeCountMismatch {
                names,
                types: fields.len(),
            },
            line,
        });
    }
    let pattern = TYPE_TOKEN.as_ref().map_err(Clone::clone)?;
    fields
        .iter()
        .map(|token| {
            let token = token.trim();
            if !pattern.is_match(token) {
                return Err(ParseError::Header {
                    kind: HeaderErrorKind::InvalidTypeToken {
                        token: token.to_string(),
                    },
                    line,
                });
            }
            if token.ends_with(['N', 'n']) {
                Ok(DeclaredType::Numeric)
            } else {
                Ok(DeclaredType::Text)
            }
        })
        .collect()
}

/// Combines header names, configured names and the first data row into the column layout
pub fn build_spec(
    header: ParsedHeader,
    config: &Config,
    first_row_width: impl FnOnce() -> Result<usize, ParseError>,
) -> Result<HeaderSpec, ParseError> {
    let names = match (config.names.clone(), header.names) {
        (Some(names), _) => names,
        (None, Some(names)) => names,
        (None, None) => positional_names(first_row_width()?),
    };
    Ok(HeaderSpec::new(names, header.types))
}
