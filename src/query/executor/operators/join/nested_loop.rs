// Nested Loop Join Implementation
//
// This file implements the nested loop join algorithm, which works for any join condition
// but has O(n*m) time complexity.

use log::{debug, trace};

use crate::catalog::schema::SchemaRef;
use crate::query::executor::operators::{FetchNext, Lookahead, Operator, OperatorRef};
use crate::query::executor::predicate::JoinPredicate;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::executor::tuple::Tuple;

use super::{close_children, join_field_names, open_children, output_schema};

/// Nested Loop Join operator implementation
pub struct NestedLoopJoin {
    /// Join condition
    predicate: JoinPredicate,
    /// Left (outer) input operator
    left: OperatorRef,
    /// Right (inner) input operator
    right: OperatorRef,
    /// Merged schema of both inputs
    schema: SchemaRef,
    /// Outer tuple currently being matched against the inner input
    current_left: Option<Tuple>,
    state: Lookahead,
}

impl NestedLoopJoin {
    /// Create a new nested loop join operator
    pub fn new(predicate: JoinPredicate, left: OperatorRef, right: OperatorRef) -> QueryResult<Self> {
        let schema = output_schema(&predicate, &left, &right)?;
        Ok(NestedLoopJoin {
            predicate,
            left,
            right,
            schema,
            current_left: None,
            state: Lookahead::new(),
        })
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    /// Names of the left and right join fields
    pub fn join_field_names(&self) -> QueryResult<(String, String)> {
        join_field_names(&self.predicate, &self.left, &self.right)
    }

    /// The (left, right) children
    pub fn children(&self) -> (&OperatorRef, &OperatorRef) {
        (&self.left, &self.right)
    }

    /// Replace both children. Only allowed while closed.
    pub fn set_children(&mut self, left: OperatorRef, right: OperatorRef) -> QueryResult<()> {
        if self.state.is_open() {
            return Err(QueryError::IllegalState(
                "cannot replace the children of an open NestedLoopJoin".to_string(),
            ));
        }
        self.schema = output_schema(&self.predicate, &left, &right)?;
        self.left = left;
        self.right = right;
        Ok(())
    }
}

impl FetchNext for NestedLoopJoin {
    fn name(&self) -> &'static str {
        "NestedLoopJoin"
    }

    fn lookahead(&mut self) -> &mut Lookahead {
        &mut self.state
    }

    /// Returns the next left/right pair satisfying the predicate. The inner
    /// cursor is left where the match was found so the next call resumes the
    /// scan of the inner input for the same outer tuple.
    fn fetch_next(&mut self) -> QueryResult<Option<Tuple>> {
        loop {
            let outer = match self.current_left.take() {
                Some(tuple) => tuple,
                None => {
                    let mut left = self.left.lock();
                    if !left.has_next()? {
                        return Ok(None);
                    }
                    left.next()?
                }
            };

            let mut right = self.right.lock();
            while right.has_next()? {
                let inner = right.next()?;
                if self.predicate.filter(&outer, &inner) {
                    let joined = Tuple::merge_into(self.schema.clone(), &outer, &inner);
                    self.current_left = Some(outer);
                    trace!("NestedLoopJoin emitting {}", joined);
                    return Ok(Some(joined));
                }
            }

            // Inner input exhausted for this outer tuple
            right.rewind()?;
        }
    }
}

impl Operator for NestedLoopJoin {
    fn open(&mut self) -> QueryResult<()> {
        if self.state.is_open() {
            return Err(QueryError::IllegalState("NestedLoopJoin is already open".to_string()));
        }
        open_children(&self.left, &self.right)?;
        self.current_left = None;
        self.state.open(self.name())?;
        debug!("NestedLoopJoin opened on {}", self.predicate);
        Ok(())
    }

    fn has_next(&mut self) -> QueryResult<bool> {
        self.buffered_has_next()
    }

    fn next(&mut self) -> QueryResult<Tuple> {
        self.buffered_next()
    }

    fn rewind(&mut self) -> QueryResult<()> {
        self.state.ensure_open(self.name())?;
        self.left.lock().rewind()?;
        self.right.lock().rewind()?;
        self.current_left = None;
        self.state.reset();
        debug!("NestedLoopJoin rewound");
        Ok(())
    }

    fn close(&mut self) -> QueryResult<()> {
        self.state.close();
        self.current_left = None;
        close_children(&self.left, &self.right)?;
        debug!("NestedLoopJoin closed");
        Ok(())
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}
