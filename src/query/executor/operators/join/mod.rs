// Join Operators Module
//
// This module defines the join operators for query execution in the
// iterator-based execution model.

pub use self::nested_loop::NestedLoopJoin;
pub use self::hash_join::{HashEquiJoin, HashIndex, HashJoinConfig};

mod nested_loop;
mod hash_join;

use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::catalog::schema::{Schema, SchemaRef};
use crate::query::executor::operators::{operator_ref, Operator, OperatorRef};
use crate::query::executor::predicate::JoinPredicate;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::executor::tuple::Tuple;

/// Available join algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Any predicate, O(n*m) comparisons
    NestedLoop,
    /// Equality predicates only, builds an in-memory index over the left input
    Hash,
}

impl JoinStrategy {
    pub fn from_str(s: &str) -> QueryResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "nested-loop" | "nested_loop" | "nl" => Ok(JoinStrategy::NestedLoop),
            "hash" => Ok(JoinStrategy::Hash),
            _ => Err(QueryError::InvalidOperation(format!("Unknown join strategy: {}", s))),
        }
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinStrategy::NestedLoop => write!(f, "nested-loop"),
            JoinStrategy::Hash => write!(f, "hash"),
        }
    }
}

/// A join operator of either strategy
pub enum JoinOperator {
    NestedLoop(NestedLoopJoin),
    Hash(HashEquiJoin),
}

impl JoinOperator {
    /// Create a join using `strategy`
    pub fn new(
        strategy: JoinStrategy,
        predicate: JoinPredicate,
        left: OperatorRef,
        right: OperatorRef,
    ) -> QueryResult<Self> {
        Self::with_config(strategy, predicate, left, right, HashJoinConfig::default())
    }

    /// Create a join using `strategy`. `config` only applies to the hash strategy.
    pub fn with_config(
        strategy: JoinStrategy,
        predicate: JoinPredicate,
        left: OperatorRef,
        right: OperatorRef,
        config: HashJoinConfig,
    ) -> QueryResult<Self> {
        match strategy {
            JoinStrategy::NestedLoop => Ok(JoinOperator::NestedLoop(NestedLoopJoin::new(predicate, left, right)?)),
            JoinStrategy::Hash => Ok(JoinOperator::Hash(HashEquiJoin::with_config(predicate, left, right, config)?)),
        }
    }

    pub fn strategy(&self) -> JoinStrategy {
        match self {
            JoinOperator::NestedLoop(_) => JoinStrategy::NestedLoop,
            JoinOperator::Hash(_) => JoinStrategy::Hash,
        }
    }

    pub fn predicate(&self) -> &JoinPredicate {
        match self {
            JoinOperator::NestedLoop(join) => join.predicate(),
            JoinOperator::Hash(join) => join.predicate(),
        }
    }

    pub fn join_field_names(&self) -> QueryResult<(String, String)> {
        match self {
            JoinOperator::NestedLoop(join) => join.join_field_names(),
            JoinOperator::Hash(join) => join.join_field_names(),
        }
    }

    fn inner(&mut self) -> &mut dyn Operator {
        match self {
            JoinOperator::NestedLoop(join) => join,
            JoinOperator::Hash(join) => join,
        }
    }
}

impl Operator for JoinOperator {
    fn open(&mut self) -> QueryResult<()> {
        self.inner().open()
    }

    fn has_next(&mut self) -> QueryResult<bool> {
        self.inner().has_next()
    }

    fn next(&mut self) -> QueryResult<Tuple> {
        self.inner().next()
    }

    fn rewind(&mut self) -> QueryResult<()> {
        self.inner().rewind()
    }

    fn close(&mut self) -> QueryResult<()> {
        self.inner().close()
    }

    fn schema(&self) -> SchemaRef {
        match self {
            JoinOperator::NestedLoop(join) => join.schema(),
            JoinOperator::Hash(join) => join.schema(),
        }
    }
}

/// Create a nested loop join operator
pub fn create_nested_loop_join(
    predicate: JoinPredicate,
    left: OperatorRef,
    right: OperatorRef,
) -> QueryResult<OperatorRef> {
    Ok(operator_ref(NestedLoopJoin::new(predicate, left, right)?))
}

/// Create a hash join operator
pub fn create_hash_join(
    predicate: JoinPredicate,
    left: OperatorRef,
    right: OperatorRef,
) -> QueryResult<OperatorRef> {
    Ok(operator_ref(HashEquiJoin::new(predicate, left, right)?))
}

/// Create a join operator for `strategy`
pub fn create_join(
    strategy: JoinStrategy,
    predicate: JoinPredicate,
    left: OperatorRef,
    right: OperatorRef,
) -> QueryResult<OperatorRef> {
    Ok(operator_ref(JoinOperator::new(strategy, predicate, left, right)?))
}

/// Check the predicate's field positions against both inputs and return
/// the merged output schema.
fn output_schema(predicate: &JoinPredicate, left: &OperatorRef, right: &OperatorRef) -> QueryResult<SchemaRef> {
    let left_schema = left.lock().schema();
    let right_schema = right.lock().schema();
    left_schema.field_name(predicate.left_field())?;
    right_schema.field_name(predicate.right_field())?;
    Ok(Arc::new(Schema::merge(&left_schema, &right_schema)))
}

fn join_field_names(predicate: &JoinPredicate, left: &OperatorRef, right: &OperatorRef) -> QueryResult<(String, String)> {
    let left_name = left.lock().schema().field_name(predicate.left_field())?.to_string();
    let right_name = right.lock().schema().field_name(predicate.right_field())?.to_string();
    Ok((left_name, right_name))
}

/// Open both children; if the right one fails the left one is closed again.
fn open_children(left: &OperatorRef, right: &OperatorRef) -> QueryResult<()> {
    left.lock().open()?;
    if let Err(e) = right.lock().open() {
        close_quietly(left, "left");
        return Err(e);
    }
    Ok(())
}

/// Close both children, reporting the first failure
fn close_children(left: &OperatorRef, right: &OperatorRef) -> QueryResult<()> {
    let left_result = left.lock().close();
    let right_result = right.lock().close();
    left_result?;
    right_result
}

fn close_quietly(child: &OperatorRef, side: &str) {
    if let Err(e) = child.lock().close() {
        warn!("Failed to close {} join input: {}", side, e);
    }
}
