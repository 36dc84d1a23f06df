use std::sync::Arc;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bayunjoin::{
    collect_all, operator_ref, CompareOp, DataType, DataValue, HashEquiJoin, JoinOperator, JoinPredicate,
    JoinStrategy, NestedLoopJoin, Operator, QueryError, Schema, Tuple, TupleScan,
};

#[path = "../common/mod.rs"]
mod common;

use common::{init_logging, int_scan, int_schema, ints, multiset, run_to_end};

// Every (o, i) pair with P(o, i), computed without any join operator
fn expected_pairs(outer: &[Vec<i64>], inner: &[Vec<i64>], width_o: usize, width_i: usize, p: &JoinPredicate) -> Vec<String> {
    let so = int_schema("o", width_o);
    let si = int_schema("i", width_i);
    let mut out = Vec::new();
    for o in outer {
        let to = Tuple::new(so.clone(), ints(o)).unwrap();
        for i in inner {
            let ti = Tuple::new(si.clone(), ints(i)).unwrap();
            if p.filter(&to, &ti) {
                out.push(Tuple::merge(&to, &ti));
            }
        }
    }
    multiset(&out)
}

fn random_rows(rng: &mut StdRng, n: usize, width: usize, key_range: i64) -> Vec<Vec<i64>> {
    (0..n)
        .map(|_| (0..width).map(|_| rng.gen_range(0..key_range)).collect())
        .collect()
}

#[test]
fn test_end_to_end_example_both_strategies() -> Result<()> {
    init_logging();
    for strategy in [JoinStrategy::NestedLoop, JoinStrategy::Hash] {
        let outer = int_scan("o", 3, &[vec![1, 2, 3]]);
        let inner = int_scan("i", 3, &[vec![1, 5, 6], vec![7, 8, 9]]);
        let mut join = JoinOperator::new(strategy, JoinPredicate::equals(0, 0), outer, inner)?;

        let rows = run_to_end(&mut join);
        assert_eq!(rows.len(), 1, "{} join", strategy);
        assert_eq!(rows[0].values(), ints(&[1, 2, 3, 1, 5, 6]).as_slice());
        assert_eq!(rows[0].schema().field_name(3)?, "i.c0");
    }
    Ok(())
}

#[test]
fn test_nested_loop_completeness_randomized() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let ops = [
        CompareOp::Equals,
        CompareOp::NotEquals,
        CompareOp::LessThan,
        CompareOp::GreaterThanOrEq,
    ];

    for round in 0..20 {
        let (n_outer, n_inner) = (rng.gen_range(0..12), rng.gen_range(0..12));
        let outer = random_rows(&mut rng, n_outer, 2, 5);
        let inner = random_rows(&mut rng, n_inner, 3, 5);
        let predicate = JoinPredicate::new(round % 2, ops[round % ops.len()], 2 - round % 3);

        let mut join = NestedLoopJoin::new(predicate, int_scan("o", 2, &outer), int_scan("i", 3, &inner))?;
        let actual = multiset(&run_to_end(&mut join));
        assert_eq!(actual, expected_pairs(&outer, &inner, 2, 3, &predicate), "round {}", round);
    }
    Ok(())
}

#[test]
fn test_hash_join_matches_nested_loop_randomized() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..25 {
        let (n_build, n_probe) = (rng.gen_range(0..30), rng.gen_range(0..30));
        let build = random_rows(&mut rng, n_build, 2, 6);
        let probe = random_rows(&mut rng, n_probe, 2, 6);
        let predicate = JoinPredicate::equals(round % 2, (round / 2) % 2);

        let mut nested = NestedLoopJoin::new(predicate, int_scan("o", 2, &build), int_scan("i", 2, &probe))?;
        let mut hash = HashEquiJoin::new(predicate, int_scan("o", 2, &build), int_scan("i", 2, &probe))?;

        let nested_rows = run_to_end(&mut nested);
        let hash_rows = run_to_end(&mut hash);
        assert_eq!(multiset(&nested_rows), multiset(&hash_rows), "round {}", round);
        assert_eq!(nested.schema(), hash.schema());
    }
    Ok(())
}

#[test]
fn test_interleaving_of_has_next_and_next() -> Result<()> {
    let outer = vec![vec![1], vec![2], vec![1], vec![3]];
    let inner = vec![vec![1], vec![1], vec![3]];

    for strategy in [JoinStrategy::NestedLoop, JoinStrategy::Hash] {
        let mut join = JoinOperator::new(strategy, JoinPredicate::equals(0, 0), int_scan("o", 1, &outer), int_scan("i", 1, &inner))?;
        join.open()?;

        // next() without has_next(), then has_next() repeated
        let mut rows = Vec::new();
        rows.push(join.next()?);
        while join.has_next()? && join.has_next()? {
            rows.push(join.next()?);
        }
        assert_eq!(rows.len(), 5, "{} join", strategy);
        assert!(matches!(join.next(), Err(QueryError::NoSuchElement(_))));
        join.close()?;
    }
    Ok(())
}

#[test]
fn test_protocol_discipline() -> Result<()> {
    for strategy in [JoinStrategy::NestedLoop, JoinStrategy::Hash] {
        let mut join = JoinOperator::new(
            strategy,
            JoinPredicate::equals(0, 0),
            int_scan("o", 1, &[vec![1]]),
            int_scan("i", 1, &[vec![1]]),
        )?;

        assert!(matches!(join.next(), Err(QueryError::IllegalState(_))));
        assert!(matches!(join.has_next(), Err(QueryError::IllegalState(_))));
        assert!(matches!(join.rewind(), Err(QueryError::IllegalState(_))));

        join.open()?;
        assert!(matches!(join.open(), Err(QueryError::IllegalState(_))));
        join.next()?;
        assert!(matches!(join.next(), Err(QueryError::NoSuchElement(_))));

        join.close()?;
        join.close()?;
        assert!(matches!(join.next(), Err(QueryError::IllegalState(_))));
    }
    Ok(())
}

#[test]
fn test_rewind_semantics() -> Result<()> {
    let outer = vec![vec![1, 10], vec![2, 20], vec![1, 30]];
    let inner = vec![vec![1], vec![2], vec![1]];

    for strategy in [JoinStrategy::NestedLoop, JoinStrategy::Hash] {
        let mut join = JoinOperator::new(strategy, JoinPredicate::equals(0, 0), int_scan("o", 2, &outer), int_scan("i", 1, &inner))?;
        join.open()?;
        let first = collect_all(&mut join)?;
        assert_eq!(first.len(), 5);

        join.rewind()?;
        let second = collect_all(&mut join)?;
        assert_eq!(multiset(&first), multiset(&second), "{} join", strategy);

        // Rewind after a partial enumeration
        join.rewind()?;
        join.next()?;
        join.next()?;
        join.rewind()?;
        assert_eq!(multiset(&collect_all(&mut join)?), multiset(&first));
        join.close()?;
    }
    Ok(())
}

#[test]
fn test_empty_inputs() -> Result<()> {
    for strategy in [JoinStrategy::NestedLoop, JoinStrategy::Hash] {
        for (outer, inner) in [(vec![], vec![vec![1]]), (vec![vec![1]], vec![]), (vec![], vec![])] {
            let mut join = JoinOperator::new(strategy, JoinPredicate::equals(0, 0), int_scan("o", 1, &outer), int_scan("i", 1, &inner))?;
            join.open()?;
            assert!(!join.has_next()?);
            join.close()?;
        }
    }
    Ok(())
}

#[test]
fn test_duplicate_join_columns_are_kept() -> Result<()> {
    let schema = Arc::new(Schema::from_pairs([("id", DataType::Integer), ("name", DataType::Text)]));
    let rows = |names: &[&str]| -> Vec<Vec<DataValue>> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| vec![DataValue::Integer(i as i64), DataValue::Text(n.to_string())])
            .collect()
    };
    let left = operator_ref(TupleScan::from_rows(schema.clone(), rows(&["a", "b"]))?);
    let right = operator_ref(TupleScan::from_rows(schema, rows(&["x", "y"]))?);

    let mut join = HashEquiJoin::new(JoinPredicate::equals(0, 0), left, right)?;
    let out = run_to_end(&mut join);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].schema().len(), 4);
    assert_eq!(out[0].schema().field_name(0)?, "id");
    assert_eq!(out[0].schema().field_name(2)?, "id");
    assert_eq!(out[0].get(0), out[0].get(2));
    Ok(())
}

#[test]
fn test_text_keys_with_nulls() -> Result<()> {
    let left_schema = Arc::new(Schema::from_pairs([("l.key", DataType::Text)]));
    let right_schema = Arc::new(Schema::from_pairs([("r.key", DataType::Text), ("r.n", DataType::Float)]));
    let text = |s: &str| DataValue::Text(s.to_string());

    let build = || {
        operator_ref(
            TupleScan::from_rows(left_schema.clone(), vec![vec![text("a")], vec![DataValue::Null], vec![text("b")]]).unwrap(),
        )
    };
    let probe = || {
        operator_ref(
            TupleScan::from_rows(
                right_schema.clone(),
                vec![
                    vec![text("b"), DataValue::Float(1.0)],
                    vec![DataValue::Null, DataValue::Float(2.0)],
                    vec![text("a"), DataValue::Float(-0.0)],
                ],
            )
            .unwrap(),
        )
    };

    let mut nested = NestedLoopJoin::new(JoinPredicate::equals(0, 0), build(), probe())?;
    let mut hash = HashEquiJoin::new(JoinPredicate::equals(0, 0), build(), probe())?;
    let nested_rows = run_to_end(&mut nested);
    assert_eq!(nested_rows.len(), 2);
    assert_eq!(multiset(&nested_rows), multiset(&run_to_end(&mut hash)));
    Ok(())
}

#[test]
fn test_integer_and_float_keys_never_match() -> Result<()> {
    let left_schema = Arc::new(Schema::from_pairs([("l.key", DataType::Integer)]));
    let right_schema = Arc::new(Schema::from_pairs([("r.key", DataType::Float)]));

    let integers = || {
        operator_ref(
            TupleScan::from_rows(left_schema.clone(), vec![ints(&[1]), ints(&[2])]).unwrap(),
        )
    };
    let floats = || {
        operator_ref(
            TupleScan::from_rows(
                right_schema.clone(),
                vec![vec![DataValue::Float(1.0)], vec![DataValue::Float(1.5)]],
            )
            .unwrap(),
        )
    };

    for op in [CompareOp::Equals, CompareOp::GreaterThanOrEq, CompareOp::LessThanOrEq, CompareOp::LessThan] {
        let mut nested = NestedLoopJoin::new(JoinPredicate::new(0, op, 0), integers(), floats())?;
        assert!(run_to_end(&mut nested).is_empty(), "{} matched across types", op);
    }

    let mut hash = HashEquiJoin::new(JoinPredicate::equals(0, 0), integers(), floats())?;
    assert!(run_to_end(&mut hash).is_empty());

    let mut nested = NestedLoopJoin::new(JoinPredicate::new(0, CompareOp::NotEquals, 0), integers(), floats())?;
    assert_eq!(run_to_end(&mut nested).len(), 4);
    Ok(())
}

#[test]
fn test_child_errors_propagate_unchanged() -> Result<()> {
    let schema = int_schema("o", 1);
    let failing_outer = || {
        operator_ref(
            TupleScan::from_rows(schema.clone(), vec![ints(&[1]), ints(&[2]), ints(&[3])])
                .unwrap()
                .fail_after(2),
        )
    };

    // Nested loop: failure surfaces during iteration
    let mut nested = NestedLoopJoin::new(JoinPredicate::equals(0, 0), failing_outer(), int_scan("i", 1, &[vec![1], vec![2]]))?;
    nested.open()?;
    assert!(nested.next().is_ok());
    assert!(nested.next().is_ok());
    assert!(matches!(nested.has_next(), Err(QueryError::StorageError(_))));
    nested.close()?;

    // Hash join: failure surfaces from open while building
    let mut hash = HashEquiJoin::new(JoinPredicate::equals(0, 0), failing_outer(), int_scan("i", 1, &[vec![1]]))?;
    assert!(matches!(hash.open(), Err(QueryError::StorageError(_))));
    assert_eq!(hash.index_len(), 0);
    Ok(())
}

#[test]
fn test_join_of_join() -> Result<()> {
    let a = int_scan("a", 1, &[vec![1], vec![2], vec![3]]);
    let b = int_scan("b", 2, &[vec![1, 10], vec![2, 20], vec![2, 21]]);
    let c = int_scan("c", 1, &[vec![20], vec![21], vec![10]]);

    let ab = operator_ref(HashEquiJoin::new(JoinPredicate::equals(0, 0), a, b)?);
    // a.c0, b.c0, b.c1 joined to c on b.c1 = c.c0
    let mut abc = NestedLoopJoin::new(JoinPredicate::equals(2, 0), ab.clone(), c)?;
    assert_eq!(abc.join_field_names()?, ("b.c1".to_string(), "c.c0".to_string()));

    let rows = run_to_end(&mut abc);
    assert_eq!(
        multiset(&rows),
        vec!["(1, 1, 10, 10)".to_string(), "(2, 2, 20, 20)".to_string(), "(2, 2, 21, 21)".to_string()]
    );

    // The caller's handle to the inner join is still usable
    let mut inner = ab.lock();
    inner.open()?;
    assert_eq!(collect_all(&mut *inner)?.len(), 3);
    inner.close()?;
    Ok(())
}

#[test]
fn test_join_field_names_and_children() -> Result<()> {
    let left = int_scan("emp", 2, &[]);
    let right = int_scan("dept", 3, &[]);
    let join = HashEquiJoin::new(JoinPredicate::equals(1, 2), left.clone(), right.clone())?;

    assert_eq!(join.join_field_names()?, ("emp.c1".to_string(), "dept.c2".to_string()));
    let (l, r) = join.children();
    assert!(Arc::ptr_eq(l, &left));
    assert!(Arc::ptr_eq(r, &right));
    assert_eq!(join.schema().len(), 5);
    Ok(())
}
