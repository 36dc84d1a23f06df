// Join Predicate
//
// A binary comparison between one field of a left tuple and one field of a
// right tuple.

use std::cmp::Ordering;
use std::fmt;

use crate::query::executor::result::{DataValue, QueryError, QueryResult};
use crate::query::executor::tuple::Tuple;

/// Comparison operators usable in a join predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    /// Substring containment on text: the left value contains the right one
    Like,
}

impl CompareOp {
    /// Parse an operator from its symbol or short name
    pub fn from_str(s: &str) -> QueryResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "=" | "==" | "eq" => Ok(CompareOp::Equals),
            "<>" | "!=" | "ne" => Ok(CompareOp::NotEquals),
            ">" | "gt" => Ok(CompareOp::GreaterThan),
            ">=" | "ge" => Ok(CompareOp::GreaterThanOrEq),
            "<" | "lt" => Ok(CompareOp::LessThan),
            "<=" | "le" => Ok(CompareOp::LessThanOrEq),
            "like" => Ok(CompareOp::Like),
            _ => Err(QueryError::InvalidOperation(format!("Unsupported operator: {}", s))),
        }
    }

    /// Apply the operator to two values. NULL on either side never matches.
    ///
    /// Equality is type-strict, so `Integer(1) <> Float(1.0)`. The ordering
    /// operators only hold between values of the same type.
    pub fn compare(&self, left: &DataValue, right: &DataValue) -> bool {
        if left.is_null() || right.is_null() {
            return false;
        }

        match self {
            CompareOp::Equals => left == right,
            CompareOp::NotEquals => left != right,
            CompareOp::Like => match (left, right) {
                (DataValue::Text(l), DataValue::Text(r)) => l.contains(r.as_str()),
                _ => false,
            },
            CompareOp::GreaterThan
            | CompareOp::GreaterThanOrEq
            | CompareOp::LessThan
            | CompareOp::LessThanOrEq => {
                let Ok(ordering) = left.compare(right) else {
                    return false;
                };
                match self {
                    CompareOp::GreaterThan => ordering == Ordering::Greater,
                    CompareOp::GreaterThanOrEq => ordering != Ordering::Less,
                    CompareOp::LessThan => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "<>",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEq => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEq => "<=",
            CompareOp::Like => "LIKE",
        };
        write!(f, "{}", symbol)
    }
}

/// Compares field `left_field` of a left tuple against field `right_field`
/// of a right tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPredicate {
    left_field: usize,
    op: CompareOp,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: CompareOp, right_field: usize) -> Self {
        JoinPredicate { left_field, op, right_field }
    }

    /// Shorthand for an equality predicate
    pub fn equals(left_field: usize, right_field: usize) -> Self {
        Self::new(left_field, CompareOp::Equals, right_field)
    }

    pub fn left_field(&self) -> usize {
        self.left_field
    }

    pub fn right_field(&self) -> usize {
        self.right_field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn is_equality(&self) -> bool {
        self.op == CompareOp::Equals
    }

    /// Whether the pair (`left`, `right`) satisfies the predicate.
    /// A field position outside either tuple yields false.
    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        match (left.get(self.left_field), right.get(self.right_field)) {
            (Some(l), Some(r)) => self.op.compare(l, r),
            _ => false,
        }
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "left[{}] {} right[{}]", self.left_field, self.op, self.right_field)
    }
}
