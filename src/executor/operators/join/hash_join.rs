// Hash Join Implementation
//
// Build-then-stream hash join. The probe side is drained into a probe table
// before the first row is produced; the stream side is then pulled one row at
// a time and matched against the candidates its key hash selects.
//
// Phases: Init -> Hash -> Stream -> [Trailer] -> Done, with Closed reachable
// from any of them. The caller picks the smaller input as the probe side.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::executor::operators::Operator;
use crate::executor::operators::join::hasher::KeyHasher;
use crate::executor::operators::join::key::JoinKey;
use crate::executor::operators::join::probe_table::{CandidateCursor, ProbeTable};
use crate::executor::operators::join::stats::JoinStats;
use crate::executor::operators::join::variant::{JoinKind, JoinPolicy, RowFilter, Trailer};
use crate::executor::result::{JoinError, JoinResult};
use crate::executor::row::{merge, Row, Value};
use crate::executor::row_list::RowList;

/// Execution phase of a join operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, nothing pulled yet
    Init,
    /// Draining the probe side
    Hash,
    /// Matching stream rows against the probe side
    Stream,
    /// Emitting rows supplied after the stream side ran out
    Trailer,
    /// Exhausted; every pull returns `None`
    Done,
    /// Resources released; pulls are an error
    Closed,
}

/// Hash Join operator implementation
pub struct HashJoin<X: Value> {
    /// Input drained into the probe table
    probe_input: RowList<X>,
    /// Input scanned one row at a time
    stream_input: RowList<X>,
    table: ProbeTable<X>,
    policy: JoinPolicy<X>,
    phase: Phase,
    /// Stream row currently being matched
    current: Option<Row<X>>,
    /// Remaining candidates for `current`; `None` means pull a new stream row
    cursor: Option<CandidateCursor>,
    /// Whether `current` produced any accepted row
    yielded: bool,
    trailer: Option<Trailer<X>>,
    stats: JoinStats,
    explain: bool,
}

impl<X: Value> HashJoin<X> {
    /// Create a new hash join operator
    pub fn new(
        probe_input: RowList<X>,
        stream_input: RowList<X>,
        key: JoinKey,
        hasher: Arc<dyn KeyHasher<X>>,
        kind: JoinKind,
    ) -> Self {
        HashJoin {
            probe_input,
            stream_input,
            table: ProbeTable::new(key, hasher),
            policy: JoinPolicy::new(kind, None),
            phase: Phase::Init,
            current: None,
            cursor: None,
            yielded: false,
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

    /// Log statistics when the join is closed
    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn kind(&self) -> JoinKind {
        self.policy.kind()
    }

    pub fn stats(&self) -> JoinStats {
        self.stats.with_probe(self.table.stats())
    }

    /// Drain the probe side into the table: Init -> Hash -> Stream
    fn build(&mut self) -> JoinResult<()> {
        self.phase = Phase::Hash;
        debug!("Hash join building probe table on key {}", self.table.key());

        self.probe_input.init()?;
        while let Some(row) = self.probe_input.next()? {
            self.table.put(row);
        }
        self.probe_input.close()?;

        self.policy.on_build(self.table.len());
        self.phase = Phase::Stream;
        debug!(
            "Probe table built: {} rows in {} buckets",
            self.table.len(),
            self.table.bucket_count()
        );

        if self.table.is_empty() && self.policy.can_skip_stream() {
            debug!("Probe side is empty, skipping the stream side");
            self.stream_input.close()?;
            self.finish_stream();
        } else {
            self.stream_input.init()?;
        }
        Ok(())
    }

    /// One pull in the Stream phase. Returns `None` once the stream side is
    /// exhausted, after moving to Trailer or Done.
    fn stream_next(&mut self) -> JoinResult<Option<Row<X>>> {
        loop {
            if self.cursor.is_none() {
                match self.stream_input.next()? {
                    Some(row) => {
                        self.stats.stream_rows += 1;
                        self.cursor = Some(self.table.cursor(&row));
                        self.current = Some(row);
                        self.yielded = false;
                    }
                    None => {
                        self.stream_input.close()?;
                        self.finish_stream();
                        return Ok(None);
                    }
                }
            }

            let (Some(cursor), Some(stream_row)) = (self.cursor.as_mut(), self.current.as_ref())
            else {
                return Err(JoinError::IllegalState(
                    "candidate cursor without a stream row".to_string(),
                ));
            };

            match cursor.next_id(&self.table) {
                Some(id) => {
                    let Some(candidate) = self.table.row(id) else {
                        continue;
                    };
                    // A conflicting pair is not a match; keep scanning
                    let Some(merged) = merge(candidate, stream_row) else {
                        continue;
                    };
                    if let Some(row) = self.policy.on_yield(id, merged) {
                        self.yielded = true;
                        self.stats.results += 1;
                        return Ok(Some(row));
                    }
                }
                None => {
                    self.cursor = None;
                    let stream_row = self.current.take();
                    if self.yielded {
                        continue;
                    }
                    if let Some(row) = stream_row.and_then(|r| self.policy.on_no_match(&r)) {
                        self.stats.results += 1;
                        return Ok(Some(row));
                    }
                }
            }
        }
    }

    /// Stream side exhausted: ask the policy for trailer rows
    fn finish_stream(&mut self) {
        match self.policy.on_finish(self.table.rows()) {
            Some(trailer) => {
                debug!("Hash join entering trailer phase");
                self.trailer = Some(trailer);
                self.phase = Phase::Trailer;
            }
            None => self.done(),
        }
    }

    fn trailer_next(&mut self) -> Option<Row<X>> {
        match self.trailer.as_mut().and_then(|t| t.next()) {
            Some(row) => {
                self.stats.results += 1;
                Some(row)
            }
            None => {
                self.trailer = None;
                self.done();
                None
            }
        }
    }

    fn done(&mut self) {
        self.phase = Phase::Done;
        // Nothing reads the table any more
        self.table.clear();
    }

    fn advance(&mut self) -> JoinResult<Option<Row<X>>> {
        loop {
            match self.phase {
                Phase::Init => self.build()?,
                Phase::Hash => {
                    return Err(JoinError::IllegalState(
                        "pull while the probe table is being built".to_string(),
                    ));
                }
                Phase::Stream => {
                    if let Some(row) = self.stream_next()? {
                        return Ok(Some(row));
                    }
                }
                Phase::Trailer => {
                    if let Some(row) = self.trailer_next() {
                        return Ok(Some(row));
                    }
                }
                Phase::Done => return Ok(None),
                Phase::Closed => {
                    return Err(JoinError::IllegalState("hash join already closed".to_string()));
                }
            }
        }
    }

    /// Tear down after an upstream failure, keeping the original error
    fn fail(&mut self, err: JoinError) -> JoinError {
        warn!("Hash join failed in phase {:?}: {}", self.phase, err);
        if let Err(close_err) = self.release() {
            warn!("Error while closing failed hash join: {}", close_err);
        }
        err
    }

    fn release(&mut self) -> JoinResult<()> {
        if self.phase == Phase::Closed {
            return Ok(());
        }
        let stats = self.stats();
        self.phase = Phase::Closed;
        self.table.clear();
        self.current = None;
        self.cursor = None;
        self.trailer = None;

        let probe_closed = self.probe_input.close();
        let stream_closed = self.stream_input.close();
        if self.explain {
            info!("Hash join ({}) on {}: {}", self.policy.kind(), self.table.key(), stats);
        }
        probe_closed?;
        stream_closed
    }
}

impl<X: Value> Operator<X> for HashJoin<X> {
    fn init(&mut self) -> JoinResult<()> {
        if self.phase != Phase::Init {
            return Err(JoinError::IllegalState(format!(
                "cannot build the probe table in phase {:?}",
                self.phase
            )));
        }
        self.build().map_err(|e| self.fail(e))
    }

    fn next(&mut self) -> JoinResult<Option<Row<X>>> {
        match self.phase {
            Phase::Closed => {
                Err(JoinError::IllegalState("hash join already closed".to_string()))
            }
            _ => self.advance().map_err(|e| self.fail(e)),
        }
    }

    fn close(&mut self) -> JoinResult<()> {
        self.release()
    }
}
