// Column Module
//
// This module defines the Column type: one named, typed field of a Schema.

use std::fmt;

use serde::{Serialize, Deserialize};

use super::schema::DataType;

/// A single field of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Field name, optionally qualified as `alias.field`
    name: String,
    /// Field data type
    data_type: DataType,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, data_type: DataType) -> Self {
        Column { name, data_type }
    }

    /// Get the (possibly qualified) column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the column name without its qualifier
    pub fn unqualified_name(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((_, field)) => field,
            None => &self.name,
        }
    }

    /// Get the qualifier, if the name has one
    pub fn qualifier(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(alias, _)| alias)
    }

    /// Get the column data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// A copy of this column qualified by `alias`
    pub fn with_qualifier(&self, alias: &str) -> Column {
        Column {
            name: format!("{}.{}", alias, self.unqualified_name()),
            data_type: self.data_type,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.data_type)
    }
}
