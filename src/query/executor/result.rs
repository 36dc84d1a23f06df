// Query Result Implementation
//
// This module defines the value, error and result-set types for query execution.

use std::fmt;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::catalog::schema::{DataType, SchemaRef};
use crate::query::executor::tuple::Tuple;

/// Possible values of a single field
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DataValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Date(String),
    Timestamp(String),
    Blob(Vec<u8>),
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DataValue::Null => 0.hash(state),
            DataValue::Integer(i) => { 1.hash(state); i.hash(state); }
            DataValue::Float(f) => {
                // -0.0 == 0.0, so both must hash alike
                let f = if *f == 0.0 { 0.0 } else { *f };
                2.hash(state);
                f.to_bits().hash(state);
            }
            DataValue::Text(s) => { 3.hash(state); s.hash(state); }
            DataValue::Boolean(b) => { 4.hash(state); b.hash(state); }
            DataValue::Date(s) => { 5.hash(state); s.hash(state); }
            DataValue::Timestamp(s) => { 6.hash(state); s.hash(state); }
            DataValue::Blob(b) => { 7.hash(state); b.hash(state); }
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "\"{}\"", s),
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::Date(s) => write!(f, "DATE '{}'", s),
            DataValue::Timestamp(s) => write!(f, "TIMESTAMP '{}'", s),
            DataValue::Blob(b) => write!(f, "X'{}'", hex::encode(b)),
        }
    }
}

// Values order only against values of the same type, matching `==`
impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (DataValue::Null, DataValue::Null) => Some(Ordering::Equal),
            (DataValue::Null, _) => Some(Ordering::Less),
            (_, DataValue::Null) => Some(Ordering::Greater),

            (DataValue::Integer(a), DataValue::Integer(b)) => a.partial_cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b),
            (DataValue::Text(a), DataValue::Text(b)) => Some(a.cmp(b)),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.partial_cmp(b),
            (DataValue::Date(a), DataValue::Date(b)) => Some(a.cmp(b)),
            (DataValue::Timestamp(a), DataValue::Timestamp(b)) => Some(a.cmp(b)),
            (DataValue::Blob(_), DataValue::Blob(_)) => None, // Blobs are not ordered beyond equality

            _ => None,
        }
    }
}

impl DataValue {
    /// The type of this value, or `None` for NULL
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            DataValue::Null => None,
            DataValue::Integer(_) => Some(DataType::Integer),
            DataValue::Float(_) => Some(DataType::Float),
            DataValue::Text(_) => Some(DataType::Text),
            DataValue::Boolean(_) => Some(DataType::Boolean),
            DataValue::Date(_) => Some(DataType::Date),
            DataValue::Timestamp(_) => Some(DataType::Timestamp),
            DataValue::Blob(_) => Some(DataType::Blob),
        }
    }

    /// Whether this value may be stored in a field of `data_type`.
    /// NULL conforms to every type.
    pub fn conforms_to(&self, data_type: &DataType) -> bool {
        match self.data_type() {
            None => true,
            Some(own) => own == *data_type,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Order two values of the same type. NULLs sort before any non-NULL
    /// value; mixed types, blobs and NaN have no order.
    pub fn compare(&self, other: &Self) -> QueryResult<Ordering> {
        self.partial_cmp(other).ok_or_else(|| {
            QueryError::TypeError(format!("Cannot compare incompatible values: {} and {}", self, other))
        })
    }
}

/// Represents query execution error
#[derive(Error, Debug)]
pub enum QueryError {
    /// Iterator protocol misuse (operator in the wrong lifecycle state)
    #[error("Illegal state: {0}")]
    IllegalState(String),
    /// `next` called with no remaining tuple
    #[error("No such element: {0}")]
    NoSuchElement(String),
    /// Predicate not usable by the requested join algorithm
    #[error("Predicate mismatch: {0}")]
    PredicateMismatch(String),
    /// Error from the storage layer underneath a child operator
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Error during query execution
    #[error("Execution error: {0}")]
    ExecutionError(String),
    /// Error in data types or tuple shape
    #[error("Type error: {0}")]
    TypeError(String),
    /// Column not found
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Materialized query output
#[derive(Debug)]
pub struct QueryResultSet {
    /// Schema of every tuple in the set
    schema: SchemaRef,
    /// Tuples in arrival order
    tuples: Vec<Tuple>,
}

impl QueryResultSet {
    /// Create a new empty resultset for `schema`
    pub fn new(schema: SchemaRef) -> Self {
        QueryResultSet {
            schema,
            tuples: Vec::new(),
        }
    }

    /// Add a tuple to the resultset
    pub fn add_tuple(&mut self, tuple: Tuple) {
        self.tuples.push(tuple);
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn row_count(&self) -> usize {
        self.tuples.len()
    }

    /// Format the resultset as a string table
    pub fn to_string_table(&self) -> String {
        if self.schema.is_empty() {
            return "Empty result".to_string();
        }

        let mut result = String::new();

        result.push_str("| ");
        for col in self.schema.columns() {
            result.push_str(&format!("{} | ", col.name()));
        }
        result.push('\n');

        result.push('|');
        for col in self.schema.columns() {
            result.push_str(&format!("{}|", "-".repeat(col.name().len() + 2)));
        }
        result.push('\n');

        for tuple in &self.tuples {
            result.push_str("| ");
            for value in tuple.values() {
                result.push_str(&format!("{} | ", value));
            }
            result.push('\n');
        }

        result
    }
}
