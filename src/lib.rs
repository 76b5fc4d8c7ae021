// Rowjoin Join Engine
//
// Streaming join primitives over rows of variable bindings: a build-then-stream
// hash join, a nested loop join, and a facade choosing between them.

pub mod config;
pub mod executor;

// Re-export key items for convenient access
pub use config::{HasherKind, JoinAlgorithm, JoinConfig, LeftJoinStrategy};
pub use executor::operators::join::{
    create_hash_join, create_nested_loop_join, CompositeKeyHasher, HashJoin, Join, JoinKey,
    JoinKind, JoinStats, KeyHasher, LeadingVarHasher, NestedLoopJoin, Phase, ProbeTable, RowFilter,
};
pub use executor::{DataValue, JoinError, JoinResult, Operator, Row, RowBuilder, RowList, Var};
