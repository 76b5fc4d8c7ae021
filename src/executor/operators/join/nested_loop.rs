// Nested Loop Join Implementation
//
// This file implements the nested loop join algorithm: one side is
// materialized, the other streamed, and every streamed row is merged against
// every materialized row. No hashing, O(n*m) merges. Used when no join key is
// worth hashing on, and as the reference the hash join is checked against.

use log::{debug, info, warn};

use crate::executor::operators::Operator;
use crate::executor::operators::join::hash_join::Phase;
use crate::executor::operators::join::stats::JoinStats;
use crate::executor::operators::join::variant::{JoinKind, JoinPolicy, RowFilter, Trailer};
use crate::executor::result::{JoinError, JoinResult};
use crate::executor::row::{merge, Row, Value};
use crate::executor::row_list::RowList;

/// Nested Loop Join operator implementation
pub struct NestedLoopJoin<X: Value> {
    /// Input held in memory and scanned once per stream row
    materialize_input: RowList<X>,
    /// Input pulled one row at a time
    stream_input: RowList<X>,
    materialized: Vec<Row<X>>,
    policy: JoinPolicy<X>,
    phase: Phase,
    /// Stream row currently being scanned against `materialized`
    current: Option<Row<X>>,
    /// Next materialized index to try for `current`
    scan_pos: usize,
    /// Flag indicating if the current stream row produced an accepted row
    found_match: bool,
    trailer: Option<Trailer<X>>,
    stats: JoinStats,
    explain: bool,
}

impl<X: Value> NestedLoopJoin<X> {
    /// Create a new nested loop join operator
    pub fn new(materialize_input: RowList<X>, stream_input: RowList<X>, kind: JoinKind) -> Self {
        NestedLoopJoin {
            materialize_input,
            stream_input,
            materialized: Vec::new(),
            policy: JoinPolicy::new(kind, None),
            phase: Phase::Init,
            current: None,
            scan_pos: 0,
            found_match: false,
            trailer: None,
            stats: JoinStats::default(),
            explain: false,
        }
    }

    /// Condition applied to every merged row before it is accepted
    pub fn with_filter(mut self, filter: RowFilter<X>) -> Self {
        self.policy = JoinPolicy::new(self.policy.kind(), Some(filter));
        self
    }

    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Statistics so far. `misses` counts stream rows with no accepted match
    /// and `max_bucket` is the whole materialized side.
    pub fn stats(&self) -> JoinStats {
        self.stats
    }

    fn materialize(&mut self) -> JoinResult<()> {
        self.phase = Phase::Hash;
        self.materialize_input.init()?;
        while let Some(row) = self.materialize_input.next()? {
            self.materialized.push(row);
        }
        self.materialize_input.close()?;

        self.stats.probe_rows = self.materialized.len() as u64;
        self.stats.max_bucket = self.materialized.len();
        self.policy.on_build(self.materialized.len());
        self.phase = Phase::Stream;
        debug!("Nested loop join materialized {} rows", self.materialized.len());

        if self.materialized.is_empty() && self.policy.can_skip_stream() {
            self.stream_input.close()?;
            self.finish_stream();
        } else {
            self.stream_input.init()?;
        }
        Ok(())
    }

    fn stream_next(&mut self) -> JoinResult<Option<Row<X>>> {
        loop {
            if self.current.is_none() {
                match self.stream_input.next()? {
                    Some(row) => {
                        self.stats.stream_rows += 1;
                        self.current = Some(row);
                        self.scan_pos = 0;
                        self.found_match = false;
                    }
                    None => {
                        self.stream_input.close()?;
                        self.finish_stream();
                        return Ok(None);
                    }
                }
            }
            let Some(stream_row) = self.current.as_ref() else {
                continue;
            };

            if let Some(candidate) = self.materialized.get(self.scan_pos) {
                let id = self.scan_pos;
                self.scan_pos += 1;
                if let Some(merged) = merge(candidate, stream_row) {
                    if let Some(row) = self.policy.on_yield(id, merged) {
                        self.found_match = true;
                        self.stats.results += 1;
                        return Ok(Some(row));
                    }
                }
                continue;
            }

            // Reached the end of the materialized side for this stream row
            let Some(stream_row) = self.current.take() else {
                continue;
            };
            if !self.found_match {
                self.stats.misses += 1;
                if let Some(row) = self.policy.on_no_match(&stream_row) {
                    self.stats.results += 1;
                    return Ok(Some(row));
                }
            }
        }
    }

    fn finish_stream(&mut self) {
        match self.policy.on_finish(&self.materialized) {
            Some(trailer) => {
                self.trailer = Some(trailer);
                self.phase = Phase::Trailer;
            }
            None => self.done(),
        }
    }

    fn done(&mut self) {
        self.phase = Phase::Done;
        self.materialized = Vec::new();
    }

    fn advance(&mut self) -> JoinResult<Option<Row<X>>> {
        loop {
            match self.phase {
                Phase::Init => self.materialize()?,
                Phase::Hash => {
                    return Err(JoinError::IllegalState(
                        "pull while the materialized side is being read".to_string(),
                    ));
                }
                Phase::Stream => {
                    if let Some(row) = self.stream_next()? {
                        return Ok(Some(row));
                    }
                }
                Phase::Trailer => match self.trailer.as_mut().and_then(|t| t.next()) {
                    Some(row) => {
                        self.stats.results += 1;
                        return Ok(Some(row));
                    }
                    None => {
                        self.trailer = None;
                        self.done();
                    }
                },
                Phase::Done => return Ok(None),
                Phase::Closed => {
                    return Err(JoinError::IllegalState(
                        "nested loop join already closed".to_string(),
                    ));
                }
            }
        }
    }

    fn fail(&mut self, err: JoinError) -> JoinError {
        warn!("Nested loop join failed in phase {:?}: {}", self.phase, err);
        if let Err(close_err) = self.release() {
            warn!("Error while closing failed nested loop join: {}", close_err);
        }
        err
    }

    fn release(&mut self) -> JoinResult<()> {
        if self.phase == Phase::Closed {
            return Ok(());
        }
        self.phase = Phase::Closed;
        self.materialized = Vec::new();
        self.current = None;
        self.trailer = None;

        let materialize_closed = self.materialize_input.close();
        let stream_closed = self.stream_input.close();
        if self.explain {
            info!("Nested loop join ({}): {}", self.policy.kind(), self.stats);
        }
        materialize_closed?;
        stream_closed
    }
}

impl<X: Value> Operator<X> for NestedLoopJoin<X> {
    fn init(&mut self) -> JoinResult<()> {
        if self.phase != Phase::Init {
            return Err(JoinError::IllegalState(format!(
                "cannot materialize in phase {:?}",
                self.phase
            )));
        }
        self.materialize().map_err(|e| self.fail(e))
    }

    fn next(&mut self) -> JoinResult<Option<Row<X>>> {
        match self.phase {
            Phase::Closed => Err(JoinError::IllegalState(
                "nested loop join already closed".to_string(),
            )),
            _ => self.advance().map_err(|e| self.fail(e)),
        }
    }

    fn close(&mut self) -> JoinResult<()> {
        self.release()
    }
}
