// Tuple Scan Operator
//
// This module implements an in-memory scan over a fixed set of tuples. It is
// the leaf producer used to feed join operators when no storage layer sits
// underneath.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::trace;

use crate::catalog::schema::SchemaRef;
use crate::query::executor::operators::{FetchNext, Lookahead, Operator};
use crate::query::executor::result::{DataValue, QueryError, QueryResult};
use crate::query::executor::tuple::Tuple;

static NEXT_OPERATOR_ID: AtomicUsize = AtomicUsize::new(0);

/// Scan over tuples held in memory
pub struct TupleScan {
    schema: SchemaRef,
    tuples: Vec<Tuple>,
    /// Index of the next tuple to fetch
    position: usize,
    /// Number of successful fetches before injected failures start
    fail_after: Option<usize>,
    /// Successful fetches since construction
    fetched: usize,
    state: Lookahead,
    /// Operator ID for easier debugging
    operator_id: usize,
}

impl TupleScan {
    /// Create a scan over `tuples`, each of which must have `schema`'s shape
    pub fn new(schema: SchemaRef, tuples: Vec<Tuple>) -> QueryResult<Self> {
        for tuple in &tuples {
            if **tuple.schema() != *schema {
                return Err(QueryError::TypeError(format!(
                    "tuple schema [{}] does not match scan schema [{}]",
                    tuple.schema(),
                    schema
                )));
            }
        }

        Ok(TupleScan {
            schema,
            tuples,
            position: 0,
            fail_after: None,
            fetched: 0,
            state: Lookahead::new(),
            operator_id: NEXT_OPERATOR_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Create a scan from raw rows, validating each against `schema`
    pub fn from_rows(schema: SchemaRef, rows: Vec<Vec<DataValue>>) -> QueryResult<Self> {
        let tuples = rows
            .into_iter()
            .map(|values| Tuple::new(schema.clone(), values))
            .collect::<QueryResult<Vec<_>>>()?;
        Self::new(schema, tuples)
    }

    /// Make every fetch after the first `n` fail with a storage error
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

impl FetchNext for TupleScan {
    fn name(&self) -> &'static str {
        "TupleScan"
    }

    fn lookahead(&mut self) -> &mut Lookahead {
        &mut self.state
    }

    fn fetch_next(&mut self) -> QueryResult<Option<Tuple>> {
        if let Some(limit) = self.fail_after {
            if self.fetched >= limit {
                return Err(QueryError::StorageError(format!(
                    "scan {} failed after {} tuples",
                    self.operator_id, limit
                )));
            }
        }

        let tuple = self.tuples.get(self.position).cloned();
        if tuple.is_some() {
            self.position += 1;
            self.fetched += 1;
        }
        Ok(tuple)
    }
}

impl Operator for TupleScan {
    fn open(&mut self) -> QueryResult<()> {
        self.state.open(self.name())?;
        self.position = 0;
        trace!("TupleScan {} opened over {} tuples", self.operator_id, self.tuples.len());
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
        self.state.reset();
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) -> QueryResult<()> {
        self.state.close();
        Ok(())
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}
