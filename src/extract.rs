//! Clock extraction over a table of move comments.
//!
//! Every row is matched; rows without a marker (or with a NULL comment) get NULL in all five
//! clock columns. The output keeps the input's row count and order, and nothing is added
//! unless every column can be added.

use std::error::Error;
use std::fmt;

use crate::clock::{ClockField, ClockPattern, ParsedClock};
use crate::table::{DataType, Table, TableError, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractError {
    MissingColumn(String),
    NotText {
        column: String,
        data_type: DataType,
    },
    NameCollision(String),
    Table(TableError),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::MissingColumn(name) => write!(f, "comment column '{name}' not found"),
            ExtractError::NotText { column, data_type } => {
                write!(f, "comment column '{column}' is {data_type}, expected VARCHAR")
            }
            ExtractError::NameCollision(name) => {
                write!(f, "clock column '{name}' already exists")
            }
            ExtractError::Table(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ExtractError {}

impl From<TableError> for ExtractError {
    fn from(e: TableError) -> Self {
        ExtractError::Table(e)
    }
}

fn comments<'t>(table: &'t Table, comment_column: &str) -> Result<&'t [Value], ExtractError> {
    let field = table
        .schema()
        .field(comment_column)
        .ok_or_else(|| ExtractError::MissingColumn(comment_column.to_string()))?;

    if field.data_type != DataType::Text {
        return Err(ExtractError::NotText {
            column: comment_column.to_string(),
            data_type: field.data_type,
        });
    }

    table
        .column(comment_column)
        .ok_or_else(|| ExtractError::MissingColumn(comment_column.to_string()))
}

fn ensure_free(table: &Table, name: &str) -> Result<(), ExtractError> {
    if table.schema().contains(name) {
        return Err(ExtractError::NameCollision(name.to_string()));
    }
    Ok(())
}

fn parse_rows(values: &[Value], pattern: &ClockPattern) -> Vec<Option<ParsedClock>> {
    values
        .iter()
        .map(|v| v.as_str().and_then(|comment| pattern.parse(comment)))
        .collect()
}

/// Append `prefix`, `hours`, `minutes`, `seconds` and `suffix` text columns.
pub fn extract_clock_columns(
    table: &Table,
    comment_column: &str,
    pattern: &ClockPattern,
) -> Result<Table, ExtractError> {
    let values = comments(table, comment_column)?;
    for field in ClockField::ALL {
        ensure_free(table, field.as_str())?;
    }

    let parsed = parse_rows(values, pattern);
    let mut out = table.clone();
    for field in ClockField::ALL {
        let column: Vec<Value> = parsed
            .iter()
            .map(|clock| match clock {
                Some(clock) => Value::Text(clock.field(field).to_string()),
                None => Value::Null,
            })
            .collect();
        out = out.with_column(field.as_str(), DataType::Text, column)?;
    }

    Ok(out)
}

/// Append `output` with the remaining clock time in seconds.
///
/// NULL when there is no marker or the marker's minutes/seconds are out of range.
pub fn extract_clock_seconds(
    table: &Table,
    comment_column: &str,
    pattern: &ClockPattern,
    output: &str,
) -> Result<Table, ExtractError> {
    let values = comments(table, comment_column)?;
    ensure_free(table, output)?;

    let seconds: Vec<Value> = parse_rows(values, pattern)
        .into_iter()
        .map(|clock| clock.and_then(|c| c.total_seconds()).into())
        .collect();

    Ok(table
        .clone()
        .with_column(output, DataType::Float, seconds)?)
}
