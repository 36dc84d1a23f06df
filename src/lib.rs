// BayunJoin: join operators for a pull-based query executor

pub mod catalog;
pub mod query;

// Re-export key items for convenient access
pub use catalog::{Column, DataType, Schema, SchemaRef};
pub use query::executor::result::{DataValue, QueryError, QueryResult, QueryResultSet};
pub use query::executor::tuple::Tuple;
pub use query::executor::predicate::{CompareOp, JoinPredicate};
pub use query::executor::operators::{collect_all, operator_ref, Operator, OperatorRef, TupleScan};
pub use query::executor::operators::join::{
    create_hash_join, create_join, create_nested_loop_join, HashEquiJoin, HashJoinConfig, JoinOperator,
    JoinStrategy, NestedLoopJoin,
};
