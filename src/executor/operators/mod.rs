// Query Operators Module
//
// This module defines the pull interface shared by row sources and the join
// operators built on top of them.

pub mod join;

use crate::executor::result::JoinResult;
use crate::executor::row::Row;

/// The Operator trait defines the interface for every row producer in the
/// iterator-based execution model. A consumer pulls rows one at a time and
/// closes the operator when it is done, whether or not it was exhausted.
pub trait Operator<X>: Send {
    /// Prepare the operator before the first pull.
    ///
    /// `next` calls this on demand, so explicit calls are optional.
    fn init(&mut self) -> JoinResult<()> {
        Ok(())
    }

    /// Get the next row, or `None` once the operator is exhausted
    fn next(&mut self) -> JoinResult<Option<Row<X>>>;

    /// Release resources. Must be safe to call more than once.
    fn close(&mut self) -> JoinResult<()>;
}
