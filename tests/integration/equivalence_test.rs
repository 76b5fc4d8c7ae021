// Every algorithm, hasher and left join strategy must produce the same
// multiset of rows for the same inputs.

use std::sync::Arc;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rowjoin::{
    DataValue, HasherKind, Join, JoinAlgorithm, JoinConfig, JoinKey, KeyHasher, LeftJoinStrategy,
    Row, RowBuilder, RowList, Var,
};

const VARS: [&str; 4] = ["a", "b", "c", "d"];

/// Rows over a random subset of `vars`, values drawn from a small domain so
/// that matches and conflicts are both common
fn random_rows(rng: &mut StdRng, vars: &[&str], count: usize) -> Vec<Row<DataValue>> {
    (0..count)
        .map(|_| {
            let mut builder = RowBuilder::new();
            for var in vars {
                // Leave roughly one binding in five unbound
                if rng.gen_range(0..5) > 0 {
                    builder.add(Var::new(var), DataValue::Integer(rng.gen_range(0..4))).unwrap();
                }
            }
            builder.build()
        })
        .collect()
}

fn canonical(rows: &[Row<DataValue>]) -> Vec<String> {
    let mut out: Vec<String> = rows
        .iter()
        .map(|row| {
            let mut pairs: Vec<String> = row.iter().map(|(v, x)| format!("{}={}", v, x)).collect();
            pairs.sort();
            pairs.join(",")
        })
        .collect();
    out.sort();
    out
}

fn configs() -> Vec<JoinConfig> {
    let mut configs = Vec::new();
    for algorithm in [JoinAlgorithm::Hash, JoinAlgorithm::NestedLoop] {
        for strategy in [LeftJoinStrategy::MaterializeRight, LeftJoinStrategy::MaterializeLeft] {
            for hasher in [HasherKind::Leading, HasherKind::Composite] {
                configs.push(
                    JoinConfig::default()
                        .with_algorithm(algorithm)
                        .with_left_join_strategy(strategy)
                        .with_hasher(hasher),
                );
            }
        }
    }
    configs
}

fn run(
    join: &Join<DataValue>,
    left: &[Row<DataValue>],
    right: &[Row<DataValue>],
    key: Option<JoinKey>,
    outer: bool,
) -> Result<Vec<String>> {
    let left = RowList::with_vars(VARS[..3].to_vec(), left.to_vec());
    let right = RowList::with_vars(VARS[1..].to_vec(), right.to_vec());
    let out = match (outer, key) {
        (false, None) => join.inner_join(left, right)?,
        (false, Some(key)) => join.inner_join_with_key(left, right, key)?,
        (true, None) => join.left_join(left, right, None)?,
        (true, Some(key)) => join.left_join_with_key(left, right, key, None)?,
    };
    Ok(canonical(&out.materialize()?))
}

#[test]
fn test_inner_join_algorithms_agree() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let left = random_rows(&mut rng, &VARS[..3], 15);
        let right = random_rows(&mut rng, &VARS[1..], 15);
        let baseline = run(
            &Join::new(JoinConfig::default().with_algorithm(JoinAlgorithm::NestedLoop)),
            &left,
            &right,
            None,
            false,
        )?;

        for config in configs() {
            let join = Join::new(config.clone());
            for key in [None, Some(JoinKey::new(["c", "b"])), Some(JoinKey::empty())] {
                let rows = run(&join, &left, &right, key.clone(), false)?;
                assert_eq!(rows, baseline, "config {:?} key {:?}", config, key);
            }
        }
    }
    Ok(())
}

#[test]
fn test_left_join_algorithms_agree() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let left = random_rows(&mut rng, &VARS[..3], 12);
        let right = random_rows(&mut rng, &VARS[1..], 12);
        let baseline = run(
            &Join::new(JoinConfig::default().with_algorithm(JoinAlgorithm::NestedLoop)),
            &left,
            &right,
            None,
            true,
        )?;

        for config in configs() {
            let join = Join::new(config.clone());
            let rows = run(&join, &left, &right, Some(JoinKey::new(["b", "c"])), true)?;
            assert_eq!(rows, baseline, "config {:?}", config);
        }
    }
    Ok(())
}

#[test]
fn test_colliding_hasher_agrees() -> Result<()> {
    // Every keyed row lands in one of two buckets; merge has to sort it out
    let parity = |key: &JoinKey, row: &Row<DataValue>| match row.get(key.leading()?)? {
        DataValue::Integer(i) => Some((*i % 2) as u64),
        _ => None,
    };
    let hasher: Arc<dyn KeyHasher<DataValue>> = Arc::new(parity);

    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
        let left = random_rows(&mut rng, &VARS[..3], 15);
        let right = random_rows(&mut rng, &VARS[1..], 15);
        let baseline = run(
            &Join::new(JoinConfig::default().with_algorithm(JoinAlgorithm::NestedLoop)),
            &left,
            &right,
            None,
            false,
        )?;
        let join = Join::new(JoinConfig::default()).with_hasher(hasher.clone());
        assert_eq!(run(&join, &left, &right, None, false)?, baseline);
    }
    Ok(())
}
