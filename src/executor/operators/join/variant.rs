// Join Variants
//
// The hash join and nested loop join share one driver loop. What differs
// between an inner join and the left outer joins is confined to three hooks
// on `JoinPolicy`, called by the driver at fixed points:
//
//   on_yield     a candidate merged with the stream row; may veto it
//   on_no_match  a stream row finished with no accepted candidate
//   on_finish    the stream side is exhausted; may supply trailer rows

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::executor::row::{Row, Value};

/// Which side of the join, if any, is preserved when it finds no match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinKind {
    #[default]
    Inner,
    /// Left outer join whose preserved side is the stream side
    LeftOuterStreamSide,
    /// Left outer join whose preserved side is the probe (materialized) side
    LeftOuterProbeSide,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "inner"),
            JoinKind::LeftOuterStreamSide => write!(f, "left-outer(stream)"),
            JoinKind::LeftOuterProbeSide => write!(f, "left-outer(probe)"),
        }
    }
}

/// Extra condition applied to each merged row of a left join
pub type RowFilter<X> = Arc<dyn Fn(&Row<X>) -> bool + Send + Sync>;

/// Rows appended after the stream side is exhausted
pub type Trailer<X> = std::vec::IntoIter<Row<X>>;

pub(crate) struct JoinPolicy<X> {
    kind: JoinKind,
    filter: Option<RowFilter<X>>,
    /// Per probe row, whether any merge with it was accepted
    matched: Vec<bool>,
}

impl<X: Value> JoinPolicy<X> {
    pub(crate) fn new(kind: JoinKind, filter: Option<RowFilter<X>>) -> Self {
        JoinPolicy { kind, filter, matched: Vec::new() }
    }

    pub(crate) fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Size match tracking once the probe side is fully materialized
    pub(crate) fn on_build(&mut self, probe_rows: usize) {
        if self.kind == JoinKind::LeftOuterProbeSide {
            self.matched = vec![false; probe_rows];
        }
    }

    /// True when an empty probe side cannot produce any output
    pub(crate) fn can_skip_stream(&self) -> bool {
        self.kind != JoinKind::LeftOuterStreamSide
    }

    pub(crate) fn on_yield(&mut self, candidate: usize, merged: Row<X>) -> Option<Row<X>> {
        if let Some(filter) = &self.filter {
            if !filter(&merged) {
                return None;
            }
        }
        if let Some(seen) = self.matched.get_mut(candidate) {
            *seen = true;
        }
        Some(merged)
    }

    pub(crate) fn on_no_match(&mut self, stream_row: &Row<X>) -> Option<Row<X>> {
        match self.kind {
            JoinKind::LeftOuterStreamSide => Some(stream_row.clone()),
            JoinKind::Inner | JoinKind::LeftOuterProbeSide => None,
        }
    }

    /// `probe_rows` are in insertion order, matching the indexes given to `on_yield`
    pub(crate) fn on_finish(&mut self, probe_rows: &[Row<X>]) -> Option<Trailer<X>> {
        if self.kind != JoinKind::LeftOuterProbeSide {
            return None;
        }
        let unmatched: Vec<Row<X>> = probe_rows
            .iter()
            .zip(self.matched.iter())
            .filter(|(_, seen)| !**seen)
            .map(|(row, _)| row.clone())
            .collect();
        self.matched = Vec::new();
        if unmatched.is_empty() {
            None
        } else {
            Some(unmatched.into_iter())
        }
    }
}
