//! Parsers for the pieces of a delimited table
//!
//! Lines are normalized first, then the header and the data range are located, and
//! finally rows are split into fields. Column typing happens once all rows are read.

pub mod delimited;
pub mod header;
pub mod inference;
pub mod lines;
pub mod range;
