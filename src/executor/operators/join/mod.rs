// Join Operators Module
//
// This module defines the join operators for query execution in the
// iterator-based execution model, and the `Join` facade that picks an
// algorithm and wraps the result as a row list.

pub use self::hash_join::{HashJoin, Phase};
pub use self::hasher::{CompositeKeyHasher, KeyHasher, LeadingVarHasher};
pub use self::key::JoinKey;
pub use self::nested_loop::NestedLoopJoin;
pub use self::probe_table::{Candidates, ProbeStats, ProbeTable};
pub use self::stats::JoinStats;
pub use self::variant::{JoinKind, RowFilter};

mod hash_join;
mod hasher;
mod key;
mod nested_loop;
mod probe_table;
mod stats;
mod variant;

use std::sync::Arc;

use log::{debug, warn};

use crate::config::{HasherKind, JoinAlgorithm, JoinConfig, LeftJoinStrategy};
use crate::executor::operators::Operator;
use crate::executor::result::JoinResult;
use crate::executor::row::{Value, Var};
use crate::executor::row_list::{dedup_vars, RowList};

/// Chooses a join algorithm and exposes the join entry points.
///
/// Every algorithm produces the same multiset of rows for the same inputs;
/// only iteration order and cost differ.
pub struct Join<X: Value> {
    config: JoinConfig,
    hasher: Arc<dyn KeyHasher<X>>,
}

impl<X: Value> Default for Join<X> {
    fn default() -> Self {
        Self::new(JoinConfig::default())
    }
}

impl<X: Value> Join<X> {
    pub fn new(config: JoinConfig) -> Self {
        let hasher: Arc<dyn KeyHasher<X>> = match config.hasher {
            HasherKind::Leading => Arc::new(LeadingVarHasher),
            HasherKind::Composite => Arc::new(CompositeKeyHasher),
        };
        Join { config, hasher }
    }

    /// Replace the configured hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn KeyHasher<X>>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Inner join on the variables both inputs share. `left` is the side
    /// held in memory, so pass the smaller input there.
    pub fn inner_join(&self, left: RowList<X>, right: RowList<X>) -> JoinResult<RowList<X>> {
        let key = JoinKey::shared(left.vars(), right.vars());
        self.join(left, right, key, false, None)
    }

    pub fn inner_join_with_key(
        &self,
        left: RowList<X>,
        right: RowList<X>,
        key: JoinKey,
    ) -> JoinResult<RowList<X>> {
        check_key(&key, &left, &right);
        self.join(left, right, key, false, None)
    }

    /// Left outer join: every `left` row appears, merged with each accepted
    /// `right` match or alone when there is none
    pub fn left_join(
        &self,
        left: RowList<X>,
        right: RowList<X>,
        filter: Option<RowFilter<X>>,
    ) -> JoinResult<RowList<X>> {
        let key = JoinKey::shared(left.vars(), right.vars());
        self.join(left, right, key, true, filter)
    }

    pub fn left_join_with_key(
        &self,
        left: RowList<X>,
        right: RowList<X>,
        key: JoinKey,
        filter: Option<RowFilter<X>>,
    ) -> JoinResult<RowList<X>> {
        check_key(&key, &left, &right);
        self.join(left, right, key, true, filter)
    }

    fn join(
        &self,
        left: RowList<X>,
        right: RowList<X>,
        key: JoinKey,
        outer: bool,
        filter: Option<RowFilter<X>>,
    ) -> JoinResult<RowList<X>> {
        let vars = union_vars(left.vars(), right.vars());

        // (held in memory, streamed, kind)
        let (held, streamed, kind) = match (outer, self.config.left_join_strategy) {
            (false, _) => (left, right, JoinKind::Inner),
            (true, LeftJoinStrategy::MaterializeRight) => (right, left, JoinKind::LeftOuterStreamSide),
            (true, LeftJoinStrategy::MaterializeLeft) => (left, right, JoinKind::LeftOuterProbeSide),
        };
        debug!("Creating {} {} join on {}", self.config.algorithm, kind, key);

        let operator: Box<dyn Operator<X>> = match self.config.algorithm {
            JoinAlgorithm::Hash => {
                let mut join = HashJoin::new(held, streamed, key, self.hasher.clone(), kind)
                    .with_explain(self.config.explain);
                if let Some(filter) = filter {
                    join = join.with_filter(filter);
                }
                Box::new(join)
            }
            JoinAlgorithm::NestedLoop => {
                let mut join = NestedLoopJoin::new(held, streamed, kind)
                    .with_explain(self.config.explain);
                if let Some(filter) = filter {
                    join = join.with_filter(filter);
                }
                Box::new(join)
            }
        };
        Ok(RowList::from_operator(vars, operator))
    }
}

/// Create a hash join over `probe` and `stream` with the leading-variable hasher
pub fn create_hash_join<X: Value>(
    probe: RowList<X>,
    stream: RowList<X>,
    key: JoinKey,
    kind: JoinKind,
) -> JoinResult<RowList<X>> {
    let vars = union_vars(probe.vars(), stream.vars());
    let join = HashJoin::new(probe, stream, key, Arc::new(LeadingVarHasher), kind);
    Ok(RowList::from_operator(vars, Box::new(join)))
}

/// Create a nested loop join holding `materialize` in memory
pub fn create_nested_loop_join<X: Value>(
    materialize: RowList<X>,
    stream: RowList<X>,
    kind: JoinKind,
) -> JoinResult<RowList<X>> {
    let vars = union_vars(materialize.vars(), stream.vars());
    let join = NestedLoopJoin::new(materialize, stream, kind);
    Ok(RowList::from_operator(vars, Box::new(join)))
}

fn union_vars(left: &[Var], right: &[Var]) -> Vec<Var> {
    dedup_vars(left.iter().chain(right.iter()).cloned())
}

/// Advisories for an explicit key. None of these are errors.
fn key_advisories(key: &JoinKey, left: &[Var], right: &[Var]) -> Vec<String> {
    let mut advisories = Vec::new();
    if key.len() > 1 {
        advisories.push(format!(
            "Multi-variable join key {}: buckets are selected on fewer variables than the key",
            key
        ));
    }
    for var in key.vars() {
        if !left.contains(var) || !right.contains(var) {
            advisories.push(format!("Join key variable {} is not carried by both inputs", var));
        }
    }
    advisories
}

fn check_key<X: Value>(key: &JoinKey, left: &RowList<X>, right: &RowList<X>) {
    for advisory in key_advisories(key, left.vars(), right.vars()) {
        warn!("{}", advisory);
    }
}
