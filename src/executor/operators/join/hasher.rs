// Join Key Hashers
//
// A key hasher maps a row's projection onto the join key to a bucket hash.
// Returning `None` means the row cannot be placed by key (a key variable is
// unbound, or the key is empty); such rows go to the probe table's no-key
// bucket and match against everything.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use crate::executor::operators::join::key::JoinKey;
use crate::executor::row::{Row, Value};

pub trait KeyHasher<X>: Send + Sync {
    fn hash(&self, key: &JoinKey, row: &Row<X>) -> Option<u64>;
}

impl<X, F> KeyHasher<X> for F
where
    F: Fn(&JoinKey, &Row<X>) -> Option<u64> + Send + Sync,
{
    fn hash(&self, key: &JoinKey, row: &Row<X>) -> Option<u64> {
        self(key, row)
    }
}

/// Hashes only the first key variable.
///
/// Rows that differ in later key variables share a bucket and are separated
/// by merge instead, so multi-variable keys lose selectivity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadingVarHasher;

impl<X: Value> KeyHasher<X> for LeadingVarHasher {
    fn hash(&self, key: &JoinKey, row: &Row<X>) -> Option<u64> {
        let value = row.get(key.leading()?)?;
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Some(hasher.finish())
    }
}

/// Hashes every key variable; a row missing any of them has no key
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeKeyHasher;

impl<X: Value> KeyHasher<X> for CompositeKeyHasher {
    fn hash(&self, key: &JoinKey, row: &Row<X>) -> Option<u64> {
        if key.is_empty() {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        for var in key.vars() {
            row.get(var)?.hash(&mut hasher);
        }
        Some(hasher.finish())
    }
}
