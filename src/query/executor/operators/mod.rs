// Query Operators Module
//
// This module defines the operators used for query execution in the
// iterator-based execution model.

pub mod scan;
pub mod join;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::catalog::schema::SchemaRef;
use crate::query::executor::result::{QueryError, QueryResult};
use crate::query::executor::tuple::Tuple;

pub use self::scan::TupleScan;

/// The Operator trait defines the interface for all query execution operators
/// in the iterator-based execution model.
///
/// Lifecycle: an operator is constructed closed. `open` moves it to open and
/// fails if it already is; `has_next`, `next` and `rewind` are valid only
/// while open; `close` is valid in either state and may be repeated.
pub trait Operator: Send {
    /// Open the operator (and its children) for iteration
    fn open(&mut self) -> QueryResult<()>;

    /// Whether another tuple is available
    fn has_next(&mut self) -> QueryResult<bool>;

    /// Return the next tuple, failing with `NoSuchElement` when exhausted
    fn next(&mut self) -> QueryResult<Tuple>;

    /// Restart iteration from the first tuple
    fn rewind(&mut self) -> QueryResult<()>;

    /// Close the operator and release any resources
    fn close(&mut self) -> QueryResult<()>;

    /// Schema of the tuples this operator produces
    fn schema(&self) -> SchemaRef;
}

/// Shared handle to an operator.
///
/// Whoever builds a plan keeps its own handle to every child; a parent only
/// drives the children it is given.
pub type OperatorRef = Arc<Mutex<dyn Operator>>;

/// Wrap an operator into a shared handle
pub fn operator_ref<O: Operator + 'static>(operator: O) -> OperatorRef {
    Arc::new(Mutex::new(operator))
}

/// Open/closed flag plus at most one buffered tuple.
///
/// Operators that compute results through [`FetchNext::fetch_next`] derive
/// `has_next`/`next` from this state.
#[derive(Debug, Default)]
pub struct Lookahead {
    open: bool,
    pending: Option<Tuple>,
}

impl Lookahead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Transition closed -> open
    pub fn open(&mut self, operator: &str) -> QueryResult<()> {
        if self.open {
            return Err(QueryError::IllegalState(format!("{} is already open", operator)));
        }
        self.open = true;
        self.pending = None;
        Ok(())
    }

    /// Transition to closed; valid from either state
    pub fn close(&mut self) {
        self.open = false;
        self.pending = None;
    }

    /// Fail unless open
    pub fn ensure_open(&self, operator: &str) -> QueryResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(QueryError::IllegalState(format!("{} is not open", operator)))
        }
    }

    /// Drop the buffered tuple, e.g. on rewind
    pub fn reset(&mut self) {
        self.pending = None;
    }
}

/// Producers that compute one result at a time.
pub(crate) trait FetchNext {
    /// Name used in protocol error messages
    fn name(&self) -> &'static str;

    fn lookahead(&mut self) -> &mut Lookahead;

    /// Compute the next result, or `None` when there are no more
    fn fetch_next(&mut self) -> QueryResult<Option<Tuple>>;

    fn buffered_has_next(&mut self) -> QueryResult<bool> {
        let name = self.name();
        self.lookahead().ensure_open(name)?;
        if self.lookahead().pending.is_none() {
            let next = self.fetch_next()?;
            self.lookahead().pending = next;
        }
        Ok(self.lookahead().pending.is_some())
    }

    fn buffered_next(&mut self) -> QueryResult<Tuple> {
        let name = self.name();
        if !self.buffered_has_next()? {
            return Err(QueryError::NoSuchElement(format!("{} has no more tuples", name)));
        }
        self.lookahead()
            .pending
            .take()
            .ok_or_else(|| QueryError::NoSuchElement(format!("{} has no more tuples", name)))
    }
}

/// Drain an open operator into a vector
pub fn collect_all(operator: &mut dyn Operator) -> QueryResult<Vec<Tuple>> {
    let mut tuples = Vec::new();
    while operator.has_next()? {
        tuples.push(operator.next()?);
    }
    Ok(tuples)
}
