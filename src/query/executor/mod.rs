// Query Executor Module
//
// This module implements the iterator-based execution model: tuples,
// predicates and the operators that pull tuples from their children.

pub mod result;
pub mod tuple;
pub mod predicate;
pub mod type_conversion;
pub mod operators;

// Export key types
pub use self::result::{DataValue, QueryError, QueryResult, QueryResultSet};
pub use self::tuple::Tuple;
pub use self::predicate::{CompareOp, JoinPredicate};
pub use self::operators::{Operator, OperatorRef};
