// Row Implementation
//
// A row is an immutable partial binding from variables to values. Rows are
// shared between the operator that produced them and every join that reads
// them, so the bindings live behind an `Arc` and a clone is a pointer copy.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::executor::result::{JoinError, JoinResult};

/// Bound required of the values carried in rows
pub trait Value: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// A query variable, identified by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(Arc<str>);

impl Var {
    pub fn new(name: &str) -> Self {
        Var(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Var {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Var::new(name)
    }
}

impl From<String> for Var {
    fn from(name: String) -> Self {
        Var(Arc::from(name))
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Immutable mapping from variable to value.
///
/// Bindings keep insertion order for display; equality ignores order.
#[derive(Debug, Clone)]
pub struct Row<X> {
    bindings: Arc<LinkedHashMap<Var, X>>,
}

impl<X: Value> Row<X> {
    /// The row with no bindings
    pub fn empty() -> Self {
        Row { bindings: Arc::new(LinkedHashMap::new()) }
    }

    /// Start building a new row
    pub fn builder() -> RowBuilder<X> {
        RowBuilder::new()
    }

    /// Build a row from `(var, value)` pairs, rejecting conflicting duplicates
    pub fn from_pairs<V, I>(pairs: I) -> JoinResult<Self>
    where
        V: Into<Var>,
        I: IntoIterator<Item = (V, X)>,
    {
        let mut builder = RowBuilder::new();
        for (var, value) in pairs {
            builder.add(var.into(), value)?;
        }
        Ok(builder.build())
    }

    /// Get the value bound to a variable
    pub fn get<Q>(&self, var: &Q) -> Option<&X>
    where
        Var: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.bindings.get(var)
    }

    /// Variables bound in this row, in binding order
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.bindings.keys()
    }

    /// Bindings in binding order
    pub fn iter(&self) -> impl Iterator<Item = (&Var, &X)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<X: Value> PartialEq for Row<X> {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.bindings, &other.bindings) {
            return true;
        }
        self.len() == other.len()
            && self.iter().all(|(var, value)| other.get(var) == Some(value))
    }
}

impl<X: Value> Eq for Row<X> {}

impl<X: Value> Default for Row<X> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<X: Value + fmt::Display> fmt::Display for Row<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (var, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{} = {}", var, value)?;
        }
        write!(f, ")")
    }
}

/// Accumulates bindings for a new row
#[derive(Debug, Clone)]
pub struct RowBuilder<X> {
    bindings: LinkedHashMap<Var, X>,
}

impl<X: Value> Default for RowBuilder<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: Value> RowBuilder<X> {
    pub fn new() -> Self {
        RowBuilder { bindings: LinkedHashMap::new() }
    }

    /// Start from the bindings of an existing row
    pub fn from_row(row: &Row<X>) -> Self {
        RowBuilder { bindings: (*row.bindings).clone() }
    }

    /// Bind `var` to `value`.
    ///
    /// Binding a variable again to an equal value is a no-op; binding it to a
    /// different value is an error.
    pub fn add(&mut self, var: Var, value: X) -> JoinResult<&mut Self> {
        match self.bindings.get(&var) {
            Some(existing) if *existing != value => {
                return Err(JoinError::DuplicateVariable(format!(
                    "{} already bound to {:?}, cannot rebind to {:?}",
                    var, existing, value
                )));
            }
            Some(_) => {}
            None => {
                self.bindings.insert(var, value);
            }
        }
        Ok(self)
    }

    /// Add every binding of `row`
    pub fn add_all(&mut self, row: &Row<X>) -> JoinResult<&mut Self> {
        for (var, value) in row.iter() {
            self.add(var.clone(), value.clone())?;
        }
        Ok(self)
    }

    pub fn build(self) -> Row<X> {
        Row { bindings: Arc::new(self.bindings) }
    }
}

/// True when every variable bound in both rows has the same value in each
pub fn compatible<X: Value>(left: &Row<X>, right: &Row<X>) -> bool {
    let (small, large) = if left.len() <= right.len() { (left, right) } else { (right, left) };
    small.iter().all(|(var, value)| match large.get(var) {
        Some(other) => other == value,
        None => true,
    })
}

/// Merge two rows into one carrying the union of their bindings.
///
/// Returns `None` when the rows disagree on a shared variable. That is the
/// normal "no result for this pair" outcome, not an error.
pub fn merge<X: Value>(left: &Row<X>, right: &Row<X>) -> Option<Row<X>> {
    if !compatible(left, right) {
        return None;
    }
    if right.is_empty() {
        return Some(left.clone());
    }
    if left.is_empty() {
        return Some(right.clone());
    }

    let mut builder = RowBuilder::from_row(left);
    builder.add_all(right).ok()?;
    Some(builder.build())
}
