//! Infers the type of each column
//!
//! A column is an integer column if every unmasked value parses as an `i64`, otherwise a
//! float column if every unmasked value parses as an `f64`, otherwise a string column.
//! Columns declared by a typed header skip inference.

use std::str::FromStr;

use log::debug;

use crate::{
    columns::ColumnBuffer,
    error::ParseError,
    table::{Column, ColumnValues},
};

use super::{delimited::is_space, header::DeclaredType};

/// Parses every value of `buffer`.
///
/// Masked values hold their replacement, which falls back to `T::default()` when it does not
/// parse. If every value is masked the replacements must parse like regular values.
/// Leading spaces and tabs are skipped, trailing ones are not.
/// Returns the index of the first value that does not parse.
fn parse_all<T: FromStr + Default>(buffer: &ColumnBuffer) -> Result<Vec<T>, usize> {
    let all_masked = buffer.mask().iter().all(|m| *m);
    let mut values = Vec::with_capacity(buffer.len());
    for (index, (value, masked)) in buffer.iter().enumerate() {
        match value.trim_start_matches(is_space).parse() {
            Ok(parsed) => values.push(parsed),
            Err(_) if masked && !all_masked => values.push(T::default()),
            Err(_) => return Err(index),
        }
    }
    Ok(values)
}

fn strings(buffer: &ColumnBuffer) -> ColumnValues {
    ColumnValues::Str(buffer.iter().map(|(value, _)| value.to_owned()).collect())
}

/// Resolves the values of one column
pub fn infer_column(
    name: String,
    buffer: ColumnBuffer,
    declared: Option<DeclaredType>,
) -> Result<Column, ParseError> {
    let values = if buffer.is_empty() {
        ColumnValues::Str(Vec::new())
    } else {
        match declared {
            Some(DeclaredType::Text) => strings(&buffer),
            Some(DeclaredType::Numeric) => match parse_all::<i64>(&buffer) {
                Ok(ints) => ColumnValues::Int(ints),
                Err(_) => match parse_all::<f64>(&buffer) {
                    Ok(floats) => ColumnValues::Float(floats),
                    Err(row) => {
                        return Err(ParseError::Conversion {
                            value: buffer.get(row).unwrap_or_default().to_string(),
                            column: name,
                            row: row + 1,
                        });
                    }
                },
            },
            None => {
                if let Ok(ints) = parse_all::<i64>(&buffer) {
                    ColumnValues::Int(ints)
                } else if let Ok(floats) = parse_all::<f64>(&buffer) {
                    ColumnValues::Float(floats)
                } else {
                    strings(&buffer)
                }
            }
        }
    };
    debug!(
        "Column {} resolved to {} ({} rows)",
        name,
        values.column_type(),
        values.len()
    );
    Ok(Column::new(name, values, buffer.into_mask()))
}
