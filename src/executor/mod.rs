// Join Executor Module
//
// Row model and the pull-based join operators that consume it.

pub mod operators;
pub mod result;
pub mod row;
pub mod row_list;

// Export key types
pub use self::operators::Operator;
pub use self::result::{DataValue, JoinError, JoinResult};
pub use self::row::{compatible, merge, Row, RowBuilder, Value, Var};
pub use self::row_list::{IterSource, RowList, VecSource};
