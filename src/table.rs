//! A small columnar table of nullable values.
//!
//! This is the row-preserving container the extraction adapter and the feature pipeline
//! operate on when they run outside DuckDB. Tables are values: adding a column or
//! reordering rows produces a new `Table`.

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Text,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    pub fn sql_name(self) -> &'static str {
        match self {
            DataType::Int => "BIGINT",
            DataType::Float => "DOUBLE",
            DataType::Text => "VARCHAR",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(DataType::Int),
            Value::Float(_) => Some(DataType::Float),
            Value::Text(_) => Some(DataType::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Null | Value::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Equality used by case matching: null never matches, `Int` and `Float` compare by value.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            _ => false,
        }
    }

    /// Ascending order with nulls last.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            data_type,
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub(crate) fn push(&mut self, field: Field) {
        self.fields.push(field);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    DuplicateColumn(String),
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    TypeMismatch {
        column: String,
        row: usize,
        expected: DataType,
    },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::DuplicateColumn(name) => write!(f, "duplicate column '{name}'"),
            TableError::LengthMismatch {
                column,
                expected,
                actual,
            } => write!(
                f,
                "column '{column}' has {actual} rows, expected {expected}"
            ),
            TableError::TypeMismatch {
                column,
                row,
                expected,
            } => write!(f, "column '{column}' row {row}: expected {expected} value"),
        }
    }
}

impl Error for TableError {}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    schema: Schema,
    columns: Vec<Vec<Value>>,
    num_rows: usize,
}

impl Table {
    /// Build a table from `(name, type, values)` triples.
    pub fn from_columns<S: Into<String>>(
        columns: Vec<(S, DataType, Vec<Value>)>,
    ) -> Result<Self, TableError> {
        let mut iter = columns.into_iter();
        let Some((name, data_type, values)) = iter.next() else {
            return Ok(Self::default());
        };

        let mut table = Self {
            schema: Schema::new(),
            columns: Vec::new(),
            num_rows: values.len(),
        };
        table.push_column(name.into(), data_type, values)?;

        for (name, data_type, values) in iter {
            table.push_column(name.into(), data_type, values)?;
        }

        Ok(table)
    }

    /// Return a new table with `values` appended as column `name`.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        values: Vec<Value>,
    ) -> Result<Self, TableError> {
        if self.columns.is_empty() {
            self.num_rows = values.len();
        }
        self.push_column(name.into(), data_type, values)?;
        Ok(self)
    }

    fn push_column(
        &mut self,
        name: String,
        data_type: DataType,
        values: Vec<Value>,
    ) -> Result<(), TableError> {
        if self.schema.contains(&name) {
            return Err(TableError::DuplicateColumn(name));
        }

        if values.len() != self.num_rows {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.num_rows,
                actual: values.len(),
            });
        }

        if let Some(row) = values
            .iter()
            .position(|v| v.data_type().is_some_and(|t| t != data_type))
        {
            return Err(TableError::TypeMismatch {
                column: name,
                row,
                expected: data_type,
            });
        }

        self.schema.push(Field { name, data_type });
        self.columns.push(values);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        let idx = self.schema.index_of(name)?;
        Some(&self.columns[idx])
    }

    pub(crate) fn columns(&self) -> &[Vec<Value>] {
        &self.columns
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name)?.get(row)
    }

    /// Rows reordered by `indices`. Every index must be `< num_rows()`.
    pub(crate) fn take(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
            .collect();

        Self {
            schema: self.schema.clone(),
            columns,
            num_rows: indices.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn games() -> Table {
        Table::from_columns(vec![
            (
                "white_rating",
                DataType::Int,
                vec![Value::Int(1500), Value::Int(1620)],
            ),
            ("result", DataType::Text, vec!["1-0".into(), Value::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns_basic() {
        let table = games();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.value(0, "white_rating"), Some(&Value::Int(1500)));
        assert_eq!(table.value(1, "result"), Some(&Value::Null));
        assert_eq!(table.value(2, "result"), None);
        assert_eq!(table.value(0, "missing"), None);
    }

    #[test]
    fn test_from_columns_empty() {
        let table = Table::from_columns::<String>(Vec::new()).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert!(table.schema().is_empty());
    }

    #[test]
    fn test_with_column_length_mismatch() {
        let err = games()
            .with_column("black_rating", DataType::Int, vec![Value::Int(1400)])
            .unwrap_err();
        assert_eq!(
            err,
            TableError::LengthMismatch {
                column: "black_rating".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_with_column_duplicate() {
        let err = games()
            .with_column("result", DataType::Text, vec![Value::Null, Value::Null])
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("result".to_string()));
    }

    #[test]
    fn test_with_column_type_mismatch() {
        let err = games()
            .with_column(
                "black_rating",
                DataType::Int,
                vec![Value::Int(1400), Value::Float(1.5)],
            )
            .unwrap_err();
        assert_eq!(
            err,
            TableError::TypeMismatch {
                column: "black_rating".to_string(),
                row: 1,
                expected: DataType::Int,
            }
        );
    }

    #[test]
    fn test_take_reorders_rows() {
        let table = games().take(&[1, 0]);
        assert_eq!(table.value(0, "white_rating"), Some(&Value::Int(1620)));
        assert_eq!(table.value(1, "result"), Some(&Value::Text("1-0".into())));
    }

    #[test]
    fn test_value_matches() {
        assert!(Value::Int(3).matches(&Value::Float(3.0)));
        assert!(Value::from("1-0").matches(&Value::from("1-0")));
        assert!(!Value::from("1-0").matches(&Value::from("0-1")));
        assert!(!Value::Null.matches(&Value::Null));
        assert!(!Value::Int(1).matches(&Value::from("1")));
    }

    #[test]
    fn test_sort_cmp_nulls_last() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int(0)), Ordering::Greater);
        assert_eq!(Value::Int(-5).sort_cmp(&Value::Null), Ordering::Less);
        assert_eq!(Value::Int(2).sort_cmp(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Null.sort_cmp(&Value::Null), Ordering::Equal);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(Some(5i64)), Value::Int(5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
