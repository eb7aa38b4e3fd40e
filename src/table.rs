//! Typed columnar result of a read

use std::fmt;

/// Resolved type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Str,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        };
        f.pad(name)
    }
}

/// Values of a column
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ColumnValues {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Int,
            Self::Float(_) => ColumnType::Float,
            Self::Str(_) => ColumnType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_int(&self) -> Option<&[i64]> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&[String]> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Renders the value at `row`
    pub fn display(&self, row: usize) -> Option<String> {
        match self {
            Self::Int(v) => v.get(row).map(i64::to_string),
            Self::Float(v) => v.get(row).map(f64::to_string),
            Self::Str(v) => v.get(row).cloned(),
        }
    }
}

/// NaN compares equal to NaN so that tables holding `nan` can be compared
impl PartialEq for ColumnValues {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

/// A named, typed column with one mask flag per value
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
    mask: Vec<bool>,
}

impl Column {
    pub fn new(name: String, values: ColumnValues, mask: Vec<bool>) -> Self {
        debug_assert_eq!(values.len(), mask.len());
        Self { name, values, mask }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn column_type(&self) -> ColumnType {
        self.values.column_type()
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn is_masked_at(&self, row: usize) -> bool {
        self.mask.get(row).copied().unwrap_or(false)
    }

    /// At least one value is masked
    pub fn is_masked(&self) -> bool {
        self.mask.iter().any(|m| *m)
    }

    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }
}

/// Columns of equal length, in header order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == rows));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
