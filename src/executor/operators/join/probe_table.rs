// Hash Probe Table
//
// Built once from the probe side of a hash join, then read for every stream
// row. Rows are stored in insertion order and buckets hold indexes into that
// storage, so a candidate can be identified by its insertion position.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::executor::operators::join::hasher::KeyHasher;
use crate::executor::operators::join::key::JoinKey;
use crate::executor::row::{Row, Value};

/// Advisory counters kept by a probe table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStats {
    /// Rows inserted with `put`
    pub rows: u64,
    /// Lookups that found no candidate at all
    pub misses: u64,
    /// Largest keyed bucket ever observed
    pub max_bucket: usize,
    /// Rows placed in the no-key bucket
    pub no_key_rows: u64,
}

pub struct ProbeTable<X> {
    key: JoinKey,
    hasher: Arc<dyn KeyHasher<X>>,
    rows: Vec<Row<X>>,
    buckets: HashMap<u64, Vec<usize>>,
    no_key_bucket: Vec<usize>,
    stats: ProbeStats,
    misses: Cell<u64>,
}

impl<X: Value> ProbeTable<X> {
    pub fn new(key: JoinKey, hasher: Arc<dyn KeyHasher<X>>) -> Self {
        ProbeTable {
            key,
            hasher,
            rows: Vec::new(),
            buckets: HashMap::new(),
            no_key_bucket: Vec::new(),
            stats: ProbeStats::default(),
            misses: Cell::new(0),
        }
    }

    pub fn key(&self) -> &JoinKey {
        &self.key
    }

    /// Add a probe row to the bucket for its key hash
    pub fn put(&mut self, row: Row<X>) {
        let id = self.rows.len();
        match self.hasher.hash(&self.key, &row) {
            Some(hash) => {
                let bucket = self.buckets.entry(hash).or_default();
                bucket.push(id);
                self.stats.max_bucket = self.stats.max_bucket.max(bucket.len());
            }
            None => {
                self.no_key_bucket.push(id);
                self.stats.no_key_rows += 1;
            }
        }
        self.rows.push(row);
        self.stats.rows += 1;
    }

    /// Candidate probe rows for `row`.
    ///
    /// A keyed row gets its bucket followed by the no-key bucket. A row with no
    /// key gets every probe row in insertion order. Candidates may still fail
    /// to merge: a bucket is shared by every row with the same hash.
    pub fn get_candidates(&self, row: &Row<X>) -> Candidates<'_, X> {
        Candidates { table: self, cursor: self.cursor(row) }
    }

    pub(crate) fn cursor(&self, row: &Row<X>) -> CandidateCursor {
        let cursor = match self.hasher.hash(&self.key, row) {
            Some(hash) => CandidateCursor::Keyed { hash, bucket_pos: 0, no_key_pos: 0 },
            None => CandidateCursor::Scan { pos: 0 },
        };
        if cursor.is_empty(self) {
            self.misses.set(self.misses.get() + 1);
            return CandidateCursor::Exhausted;
        }
        cursor
    }

    /// Probe row by insertion index
    pub fn row(&self, id: usize) -> Option<&Row<X>> {
        self.rows.get(id)
    }

    /// All probe rows in insertion order
    pub fn rows(&self) -> &[Row<X>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of keyed buckets, not counting the no-key bucket
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn stats(&self) -> ProbeStats {
        ProbeStats { misses: self.misses.get(), ..self.stats }
    }

    /// Release every bucket and row. Counters survive so they can still be
    /// reported after teardown.
    pub fn clear(&mut self) {
        self.rows = Vec::new();
        self.buckets = HashMap::new();
        self.no_key_bucket = Vec::new();
    }
}

/// Position within the candidates of one lookup. Holds no borrow of the
/// table, so the hash join can keep it across pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CandidateCursor {
    Keyed { hash: u64, bucket_pos: usize, no_key_pos: usize },
    Scan { pos: usize },
    Exhausted,
}

impl CandidateCursor {
    fn is_empty<X: Value>(&self, table: &ProbeTable<X>) -> bool {
        match self {
            CandidateCursor::Keyed { hash, .. } => {
                !table.buckets.contains_key(hash) && table.no_key_bucket.is_empty()
            }
            CandidateCursor::Scan { .. } => table.rows.is_empty(),
            CandidateCursor::Exhausted => true,
        }
    }

    /// Insertion index of the next candidate
    pub(crate) fn next_id<X: Value>(&mut self, table: &ProbeTable<X>) -> Option<usize> {
        match self {
            CandidateCursor::Keyed { hash, bucket_pos, no_key_pos } => {
                if let Some(&id) = table.buckets.get(hash).and_then(|b| b.get(*bucket_pos)) {
                    *bucket_pos += 1;
                    return Some(id);
                }
                if let Some(&id) = table.no_key_bucket.get(*no_key_pos) {
                    *no_key_pos += 1;
                    return Some(id);
                }
            }
            CandidateCursor::Scan { pos } => {
                if *pos < table.rows.len() {
                    *pos += 1;
                    return Some(*pos - 1);
                }
            }
            CandidateCursor::Exhausted => return None,
        }
        *self = CandidateCursor::Exhausted;
        None
    }
}

/// Iterator over the candidate rows of one lookup
pub struct Candidates<'a, X> {
    table: &'a ProbeTable<X>,
    cursor: CandidateCursor,
}

impl<'a, X: Value> Iterator for Candidates<'a, X> {
    type Item = &'a Row<X>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor.next_id(self.table)?;
        self.table.row(id)
    }
}
