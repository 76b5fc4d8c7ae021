// Join Key
//
// The ordered set of variables two row sources have in common. Probe rows are
// partitioned into buckets by their projection onto this key.

use std::fmt;

use crate::executor::row::Var;
use crate::executor::row_list::dedup_vars;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinKey {
    vars: Vec<Var>,
}

impl JoinKey {
    /// Key over explicit variables. Duplicates are dropped, first occurrence wins.
    pub fn new<V>(vars: V) -> Self
    where
        V: IntoIterator,
        V::Item: Into<Var>,
    {
        JoinKey { vars: dedup_vars(vars) }
    }

    /// The empty key: every probe row is a candidate for every stream row
    pub fn empty() -> Self {
        JoinKey { vars: Vec::new() }
    }

    /// Variables shared by both sides, in the order they appear on the left
    pub fn shared(left: &[Var], right: &[Var]) -> Self {
        JoinKey::new(left.iter().filter(|v| right.contains(v)).cloned())
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// First variable of the key, if any
    pub fn leading(&self) -> Option<&Var> {
        self.vars.first()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, var) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", var)?;
        }
        write!(f, "]")
    }
}
