use std::sync::Arc;
use anyhow::Result;

use bayunjoin::{
    collect_all, operator_ref, DataType, DataValue, JoinOperator, JoinPredicate, JoinStrategy, Operator,
    QueryResultSet, Schema, TupleScan,
};

fn main() -> Result<()> {
    // Two three-column integer relations
    let left_schema = Arc::new(Schema::from_pairs([
        ("a.x", DataType::Integer),
        ("a.y", DataType::Integer),
        ("a.z", DataType::Integer),
    ]));
    let right_schema = Arc::new(left_schema.qualified("b"));

    let ints = |vals: &[i64]| vals.iter().map(|v| DataValue::Integer(*v)).collect::<Vec<_>>();

    for strategy in [JoinStrategy::NestedLoop, JoinStrategy::Hash] {
        let left = operator_ref(TupleScan::from_rows(left_schema.clone(), vec![ints(&[1, 2, 3])])?);
        let right = operator_ref(TupleScan::from_rows(
            right_schema.clone(),
            vec![ints(&[1, 5, 6]), ints(&[7, 8, 9])],
        )?);

        // Join on equality of the first column
        let mut join = JoinOperator::new(strategy, JoinPredicate::equals(0, 0), left, right)?;
        join.open()?;

        let mut result_set = QueryResultSet::new(join.schema());
        for tuple in collect_all(&mut join)? {
            result_set.add_tuple(tuple);
        }
        join.close()?;

        println!("{} join:", strategy);
        print!("{}", result_set.to_string_table());
    }

    Ok(())
}
