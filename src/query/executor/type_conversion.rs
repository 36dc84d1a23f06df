// Type Conversion Utilities for the Execution Engine
//
// Parsing of textual input (CSV cells, CLI arguments) into typed values.

use crate::catalog::schema::DataType;
use crate::query::executor::result::{QueryResult, QueryError, DataValue};

/// Parse `text` as a value of `target`. Empty text is NULL.
pub fn parse_value(text: &str, target: DataType) -> QueryResult<DataValue> {
    let s = text.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return Ok(DataValue::Null);
    }

    match target {
        DataType::Integer => s.parse::<i64>()
            .map(DataValue::Integer)
            .map_err(|e| QueryError::TypeError(format!("Cannot convert Text '{}' to Integer: {}", s, e))),
        DataType::Float => s.parse::<f64>()
            .map(DataValue::Float)
            .map_err(|e| QueryError::TypeError(format!("Cannot convert Text '{}' to Float: {}", s, e))),
        DataType::Boolean => match s.to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(DataValue::Boolean(true)),
            "false" | "f" | "0" => Ok(DataValue::Boolean(false)),
            _ => Err(QueryError::TypeError(format!("Cannot convert Text '{}' to Boolean", s))),
        },
        DataType::Date => {
            // Basic YYYY-MM-DD check
            if s.len() == 10 && s.chars().nth(4) == Some('-') && s.chars().nth(7) == Some('-') {
                Ok(DataValue::Date(s.to_string()))
            } else {
                Err(QueryError::TypeError(format!("Cannot convert Text '{}' to Date. Expected YYYY-MM-DD.", s)))
            }
        }
        DataType::Timestamp => {
            if s.len() >= 19 {
                Ok(DataValue::Timestamp(s.to_string()))
            } else {
                Err(QueryError::TypeError(format!("Cannot convert Text '{}' to Timestamp.", s)))
            }
        }
        DataType::Text => Ok(DataValue::Text(s.to_string())),
        DataType::Blob => hex::decode(s)
            .map(DataValue::Blob)
            .map_err(|e| QueryError::TypeError(format!("Cannot convert Text '{}' to Blob (hex decode failed): {}", s, e))),
    }
}
