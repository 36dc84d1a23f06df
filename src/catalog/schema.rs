// Schema Module
//
// This module defines the field types and the ordered Schema that every
// tuple flowing through the executor conforms to.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use super::column::Column;
use crate::query::executor::result::{QueryError, QueryResult};

/// Data types supported by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
    Timestamp,
    Blob,
}

impl DataType {
    /// Convert a string representation to a DataType
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(DataType::Integer),
            "FLOAT" | "REAL" | "DOUBLE" => Ok(DataType::Float),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Ok(DataType::Text),
            "BOOL" | "BOOLEAN" => Ok(DataType::Boolean),
            "DATE" => Ok(DataType::Date),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            "BLOB" | "BINARY" => Ok(DataType::Blob),
            _ => Err(format!("Unknown data type: {}", s)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Blob => "BLOB",
        };
        write!(f, "{}", name)
    }
}

/// Shared, immutable schema handle
pub type SchemaRef = Arc<Schema>;

/// An ordered sequence of columns.
///
/// Position is the canonical identity of a field: names may repeat (a join
/// of a table with itself produces duplicate names), so lookups by name are
/// a convenience layered on top of positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Create a schema from its columns
    pub fn new(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    /// Create a schema from (name, type) pairs
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, DataType)>) -> Self {
        Schema {
            columns: pairs
                .into_iter()
                .map(|(name, data_type)| Column::new(name.into(), data_type))
                .collect(),
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column at position `i`
    pub fn column(&self, i: usize) -> Option<&Column> {
        self.columns.get(i)
    }

    /// Name of the field at position `i`
    pub fn field_name(&self, i: usize) -> QueryResult<&str> {
        self.columns
            .get(i)
            .map(|c| c.name())
            .ok_or_else(|| QueryError::ColumnNotFound(format!(
                "field index {} out of range for schema with {} fields", i, self.columns.len()
            )))
    }

    /// Type of the field at position `i`
    pub fn field_type(&self, i: usize) -> QueryResult<DataType> {
        self.columns
            .get(i)
            .map(|c| c.data_type())
            .ok_or_else(|| QueryError::ColumnNotFound(format!(
                "field index {} out of range for schema with {} fields", i, self.columns.len()
            )))
    }

    /// Position of the field called `name`.
    ///
    /// An exact match on the (possibly qualified) name wins. Otherwise an
    /// unqualified name matches the field whose unqualified part equals it,
    /// provided exactly one such field exists.
    pub fn index_of(&self, name: &str) -> QueryResult<usize> {
        if let Some(pos) = self.columns.iter().position(|c| c.name() == name) {
            return Ok(pos);
        }

        let mut matches = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.unqualified_name() == name);

        match (matches.next(), matches.next()) {
            (Some((pos, _)), None) => Ok(pos),
            (Some(_), Some(_)) => Err(QueryError::ColumnNotFound(format!(
                "ambiguous field name: {}", name
            ))),
            _ => Err(QueryError::ColumnNotFound(name.to_string())),
        }
    }

    /// A copy of this schema with every field qualified by `alias`
    pub fn qualified(&self, alias: &str) -> Schema {
        Schema {
            columns: self.columns.iter().map(|c| c.with_qualifier(alias)).collect(),
        }
    }

    /// Concatenate the fields of `a` and then `b` into a new schema
    pub fn merge(a: &Schema, b: &Schema) -> Schema {
        let mut columns = Vec::with_capacity(a.len() + b.len());
        columns.extend(a.columns.iter().cloned());
        columns.extend(b.columns.iter().cloned());
        Schema { columns }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", column)?;
        }
        Ok(())
    }
}
