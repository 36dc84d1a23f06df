// Hash Join Implementation
//
// This file implements the hash equi-join algorithm, which is optimized for
// equality-based join conditions with O(n+m) time complexity.
//
// The left input is the build side: it is drained into an in-memory index
// when the join is opened and closed right afterwards. The right input is
// the probe side and is streamed.

use std::collections::HashMap;

use log::{debug, trace};

use crate::catalog::schema::SchemaRef;
use crate::query::executor::operators::{FetchNext, Lookahead, Operator, OperatorRef};
use crate::query::executor::predicate::JoinPredicate;
use crate::query::executor::result::{DataValue, QueryError, QueryResult};
use crate::query::executor::tuple::Tuple;

use super::{close_children, close_quietly, join_field_names, open_children, output_schema};

/// Configuration for hash join behavior
#[derive(Debug, Clone)]
pub struct HashJoinConfig {
    /// Number of distinct keys the index is pre-sized for
    pub initial_capacity: usize,
}

impl Default for HashJoinConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
        }
    }
}

/// Multimap from join key to the build tuples carrying that key, in
/// insertion order.
#[derive(Debug, Default)]
pub struct HashIndex {
    buckets: HashMap<DataValue, Vec<Tuple>>,
    tuples: usize,
}

impl HashIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        HashIndex {
            buckets: HashMap::with_capacity(capacity),
            tuples: 0,
        }
    }

    /// Append `tuple` to the bucket for `key`. NULL keys can never match an
    /// equality predicate and are not indexed; returns whether the tuple was
    /// added.
    pub fn insert(&mut self, key: DataValue, tuple: Tuple) -> bool {
        if key.is_null() {
            return false;
        }
        self.buckets.entry(key).or_default().push(tuple);
        self.tuples += 1;
        true
    }

    /// Build tuples whose key equals `key`
    pub fn get(&self, key: &DataValue) -> Option<&[Tuple]> {
        self.buckets.get(key).map(|bucket| bucket.as_slice())
    }

    /// Number of indexed tuples
    pub fn len(&self) -> usize {
        self.tuples
    }

    pub fn is_empty(&self) -> bool {
        self.tuples == 0
    }

    /// Number of distinct keys
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Position inside the bucket matching the current probe tuple
#[derive(Debug)]
struct MatchCursor {
    key: DataValue,
    position: usize,
}

/// Hash equi-join operator implementation
pub struct HashEquiJoin {
    /// Join condition (always an equality)
    predicate: JoinPredicate,
    /// Left input operator (build side)
    left: OperatorRef,
    /// Right input operator (probe side)
    right: OperatorRef,
    /// Merged schema of both inputs
    schema: SchemaRef,
    config: HashJoinConfig,
    /// Index over the build side, present only while open
    index: Option<HashIndex>,
    /// Probe tuple whose matches are being emitted
    current_right: Option<Tuple>,
    /// Remaining matches for `current_right`
    matches: Option<MatchCursor>,
    state: Lookahead,
}

impl HashEquiJoin {
    /// Create a new hash join operator. The predicate must be an equality.
    pub fn new(predicate: JoinPredicate, left: OperatorRef, right: OperatorRef) -> QueryResult<Self> {
        Self::with_config(predicate, left, right, HashJoinConfig::default())
    }

    pub fn with_config(
        predicate: JoinPredicate,
        left: OperatorRef,
        right: OperatorRef,
        config: HashJoinConfig,
    ) -> QueryResult<Self> {
        if !predicate.is_equality() {
            return Err(QueryError::PredicateMismatch(format!(
                "hash join requires an equality predicate, got {}",
                predicate
            )));
        }
        let schema = output_schema(&predicate, &left, &right)?;

        Ok(HashEquiJoin {
            predicate,
            left,
            right,
            schema,
            config,
            index: None,
            current_right: None,
            matches: None,
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

    /// The (build, probe) children
    pub fn children(&self) -> (&OperatorRef, &OperatorRef) {
        (&self.left, &self.right)
    }

    /// Replace both children. Only allowed while closed.
    pub fn set_children(&mut self, left: OperatorRef, right: OperatorRef) -> QueryResult<()> {
        if self.state.is_open() {
            return Err(QueryError::IllegalState(
                "cannot replace the children of an open HashEquiJoin".to_string(),
            ));
        }
        self.schema = output_schema(&self.predicate, &left, &right)?;
        self.left = left;
        self.right = right;
        Ok(())
    }

    pub fn config(&self) -> &HashJoinConfig {
        &self.config
    }

    /// Number of build tuples currently indexed (0 while closed)
    pub fn index_len(&self) -> usize {
        self.index.as_ref().map_or(0, |index| index.len())
    }

    /// Drain the build side into a fresh index
    fn build_index(&self) -> QueryResult<HashIndex> {
        let mut index = HashIndex::with_capacity(self.config.initial_capacity);
        let mut left = self.left.lock();
        while left.has_next()? {
            let tuple = left.next()?;
            let key = tuple.get(self.predicate.left_field()).cloned().unwrap_or(DataValue::Null);
            index.insert(key, tuple);
        }
        Ok(index)
    }
}

impl FetchNext for HashEquiJoin {
    fn name(&self) -> &'static str {
        "HashEquiJoin"
    }

    fn lookahead(&mut self) -> &mut Lookahead {
        &mut self.state
    }

    /// Emits every build tuple matching the current probe tuple before
    /// pulling the next probe tuple.
    fn fetch_next(&mut self) -> QueryResult<Option<Tuple>> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| QueryError::IllegalState("hash index has not been built".to_string()))?;

        loop {
            if let (Some(cursor), Some(probe)) = (self.matches.as_mut(), self.current_right.as_ref()) {
                if let Some(build) = index.get(&cursor.key).and_then(|bucket| bucket.get(cursor.position)) {
                    cursor.position += 1;
                    let joined = Tuple::merge_into(self.schema.clone(), build, probe);
                    trace!("HashEquiJoin emitting {}", joined);
                    return Ok(Some(joined));
                }
            }
            self.matches = None;

            let probe = {
                let mut right = self.right.lock();
                if !right.has_next()? {
                    self.current_right = None;
                    return Ok(None);
                }
                right.next()?
            };

            let key = match probe.get(self.predicate.right_field()) {
                Some(key) if !key.is_null() && index.get(key).is_some() => key.clone(),
                _ => continue,
            };
            self.matches = Some(MatchCursor { key, position: 0 });
            self.current_right = Some(probe);
        }
    }
}

impl Operator for HashEquiJoin {
    fn open(&mut self) -> QueryResult<()> {
        if self.state.is_open() {
            return Err(QueryError::IllegalState("HashEquiJoin is already open".to_string()));
        }
        open_children(&self.left, &self.right)?;

        // A failed build discards the partial index and leaves the join closed
        let index = match self.build_index() {
            Ok(index) => index,
            Err(e) => {
                close_quietly(&self.left, "build");
                close_quietly(&self.right, "probe");
                return Err(e);
            }
        };

        // The build side is never read again
        if let Err(e) = self.left.lock().close() {
            close_quietly(&self.right, "probe");
            return Err(e);
        }

        debug!(
            "HashEquiJoin built index with {} tuples in {} buckets on {}",
            index.len(),
            index.bucket_count(),
            self.predicate
        );
        self.index = Some(index);
        self.current_right = None;
        self.matches = None;
        self.state.open(self.name())
    }

    fn has_next(&mut self) -> QueryResult<bool> {
        self.buffered_has_next()
    }

    fn next(&mut self) -> QueryResult<Tuple> {
        self.buffered_next()
    }

    /// Restarts the probe side only. The build input was closed after the
    /// index was built, so the index is reused as is; changes to the build
    /// input since `open` are not observed until the join is reopened.
    fn rewind(&mut self) -> QueryResult<()> {
        self.state.ensure_open(self.name())?;
        self.right.lock().rewind()?;
        self.current_right = None;
        self.matches = None;
        self.state.reset();
        debug!("HashEquiJoin rewound probe side");
        Ok(())
    }

    fn close(&mut self) -> QueryResult<()> {
        self.state.close();
        self.index = None;
        self.current_right = None;
        self.matches = None;
        close_children(&self.left, &self.right)?;
        debug!("HashEquiJoin closed");
        Ok(())
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}
