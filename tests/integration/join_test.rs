use std::sync::Arc;

use anyhow::Result;
use rowjoin::{
    create_hash_join, DataValue, HasherKind, Join, JoinAlgorithm, JoinConfig, JoinError, JoinKey,
    JoinKind, LeftJoinStrategy, Operator, Row, RowFilter, RowList,
};

fn text_row(pairs: &[(&str, &str)]) -> Row<DataValue> {
    Row::from_pairs(pairs.iter().map(|(v, x)| (*v, DataValue::from(*x)))).unwrap()
}

fn int_row(pairs: &[(&str, i64)]) -> Row<DataValue> {
    Row::from_pairs(pairs.iter().map(|(v, x)| (*v, DataValue::from(*x)))).unwrap()
}

fn all_configs() -> Vec<JoinConfig> {
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

fn contains_all(rows: &[Row<DataValue>], expected: &[Row<DataValue>]) -> bool {
    rows.len() == expected.len() && expected.iter().all(|e| rows.contains(e))
}

#[test]
fn test_triple_pattern_join() -> Result<()> {
    let probe = vec![text_row(&[("s", "a"), ("p", "p1")]), text_row(&[("s", "b"), ("p", "p1")])];
    let stream = vec![text_row(&[("p", "p1"), ("o", "x")]), text_row(&[("p", "p2"), ("o", "y")])];
    let expected = vec![
        text_row(&[("s", "a"), ("p", "p1"), ("o", "x")]),
        text_row(&[("s", "b"), ("p", "p1"), ("o", "x")]),
    ];

    for config in all_configs() {
        let rows = Join::new(config.clone())
            .inner_join_with_key(
                RowList::from_rows(probe.clone()),
                RowList::from_rows(stream.clone()),
                JoinKey::new(["p"]),
            )?
            .materialize()?;
        assert!(contains_all(&rows, &expected), "config {:?} produced {:?}", config, rows);
    }
    Ok(())
}

#[test]
fn test_cross_product_with_empty_key() -> Result<()> {
    let left = vec![int_row(&[("x", 1)]), int_row(&[("x", 2)])];
    let right = vec![int_row(&[("y", 10)])];

    for config in all_configs() {
        let rows = Join::new(config)
            .inner_join_with_key(
                RowList::from_rows(left.clone()),
                RowList::from_rows(right.clone()),
                JoinKey::empty(),
            )?
            .materialize()?;
        assert!(contains_all(&rows, &[
            int_row(&[("x", 1), ("y", 10)]),
            int_row(&[("x", 2), ("y", 10)]),
        ]));
    }
    Ok(())
}

#[test]
fn test_optional_match() -> Result<()> {
    // Every person appears once; only Alice has an email
    let people = vec![
        text_row(&[("person", "alice"), ("name", "Alice")]),
        text_row(&[("person", "bob"), ("name", "Bob")]),
    ];
    let emails = vec![text_row(&[("person", "alice"), ("email", "alice@example.org")])];
    let expected = vec![
        text_row(&[("person", "alice"), ("name", "Alice"), ("email", "alice@example.org")]),
        text_row(&[("person", "bob"), ("name", "Bob")]),
    ];

    for config in all_configs() {
        let rows = Join::new(config)
            .left_join(RowList::from_rows(people.clone()), RowList::from_rows(emails.clone()), None)?
            .materialize()?;
        assert!(contains_all(&rows, &expected));
    }
    Ok(())
}

#[test]
fn test_optional_match_with_filter() -> Result<()> {
    let items = vec![int_row(&[("item", 1)]), int_row(&[("item", 2)])];
    let prices = vec![
        int_row(&[("item", 1), ("price", 5)]),
        int_row(&[("item", 1), ("price", 50)]),
        int_row(&[("item", 2), ("price", 7)]),
    ];
    let expensive: RowFilter<DataValue> = Arc::new(|row: &Row<DataValue>| {
        matches!(row.get("price"), Some(DataValue::Integer(p)) if *p > 10)
    });
    let expected = vec![int_row(&[("item", 1), ("price", 50)]), int_row(&[("item", 2)])];

    for config in all_configs() {
        let rows = Join::new(config)
            .left_join(
                RowList::from_rows(items.clone()),
                RowList::from_rows(prices.clone()),
                Some(expensive.clone()),
            )?
            .materialize()?;
        assert!(contains_all(&rows, &expected), "got {:?}", rows);
    }
    Ok(())
}

#[test]
fn test_unbound_key_variable_matches_everything() -> Result<()> {
    // The second probe row leaves ?x unbound, so it is compatible with any ?x
    let probe = vec![int_row(&[("x", 1), ("a", 1)]), int_row(&[("a", 2)])];
    let stream = vec![int_row(&[("x", 1)]), int_row(&[("x", 9)])];
    let expected = vec![
        int_row(&[("x", 1), ("a", 1)]),
        int_row(&[("x", 1), ("a", 2)]),
        int_row(&[("x", 9), ("a", 2)]),
    ];

    for config in all_configs() {
        let rows = Join::new(config)
            .inner_join_with_key(
                RowList::from_rows(probe.clone()),
                RowList::from_rows(stream.clone()),
                JoinKey::new(["x"]),
            )?
            .materialize()?;
        assert!(contains_all(&rows, &expected), "got {:?}", rows);
    }
    Ok(())
}

#[test]
fn test_join_of_joins() -> Result<()> {
    let join = Join::<DataValue>::default();
    let ab = join.inner_join(
        RowList::from_rows(vec![int_row(&[("a", 1), ("b", 2)])]),
        RowList::from_rows(vec![int_row(&[("b", 2), ("c", 3)])]),
    )?;
    let abc = join.inner_join(
        ab,
        RowList::from_rows(vec![int_row(&[("c", 3), ("d", 4)]), int_row(&[("c", 4), ("d", 5)])]),
    )?;
    assert_eq!(abc.vars().len(), 4);
    assert_eq!(abc.materialize()?, vec![int_row(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)])]);
    Ok(())
}

#[test]
fn test_upstream_error_reaches_consumer() {
    let failing = RowList::from_results(
        ["x"],
        vec![Ok(int_row(&[("x", 1)])), Err(JoinError::ExecutionError("disk read failed".to_string()))]
            .into_iter(),
    );
    let mut out = create_hash_join(
        RowList::from_rows(vec![int_row(&[("x", 1)])]),
        failing,
        JoinKey::new(["x"]),
        JoinKind::Inner,
    )
    .unwrap();

    assert!(out.next().unwrap().is_some());
    assert!(matches!(out.next(), Err(JoinError::ExecutionError(_))));
    assert!(out.close().is_ok());
}

#[test]
fn test_early_close() -> Result<()> {
    let left: Vec<_> = (0..100).map(|i| int_row(&[("x", i % 10), ("l", i)])).collect();
    let right: Vec<_> = (0..100).map(|i| int_row(&[("x", i % 10), ("r", i)])).collect();
    let mut out = Join::default().inner_join(RowList::from_rows(left), RowList::from_rows(right))?;

    assert!(out.next()?.is_some());
    out.close()?;
    assert!(out.is_closed());
    out.close()?;
    assert!(matches!(out.next(), Err(JoinError::IllegalState(_))));
    Ok(())
}
