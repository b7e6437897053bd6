//! Property tests for condition grouping, clone naming and the parameter
//! database.

use missionscript::command::{combine, LogicalOp};
use missionscript::config::next_clone_name;
use missionscript::ParameterDatabase;
use proptest::prelude::*;

fn arb_op() -> impl Strategy<Value = LogicalOp> {
    prop_oneof![Just(LogicalOp::And), Just(LogicalOp::Or)]
}

fn arb_chain() -> impl Strategy<Value = (Vec<bool>, Vec<LogicalOp>)> {
    (1usize..8).prop_flat_map(|n| {
        (
            proptest::collection::vec(any::<bool>(), n),
            proptest::collection::vec(arb_op(), n - 1),
        )
    })
}

/// OR over the AND-groups, written out the long way.
fn grouped(values: &[bool], ops: &[LogicalOp]) -> bool {
    let mut groups: Vec<Vec<bool>> = vec![vec![values[0]]];
    for (op, value) in ops.iter().zip(&values[1..]) {
        match op {
            LogicalOp::And => {
                if let Some(group) = groups.last_mut() {
                    group.push(*value);
                }
            }
            LogicalOp::Or => groups.push(vec![*value]),
        }
    }
    groups.iter().any(|g| g.iter().all(|v| *v))
}

proptest! {
    /// `&` binds tighter than `|`.
    #[test]
    fn prop_and_binds_tighter_than_or((values, ops) in arb_chain()) {
        let combined = combine(&values, &ops);
        prop_assert_eq!(combined.ok(), Some(grouped(&values, &ops)));
    }

    /// A chain whose operator count does not match is rejected.
    #[test]
    fn prop_mismatched_chain_is_rejected((values, mut ops) in arb_chain(), extra in arb_op()) {
        ops.push(extra);
        prop_assert!(combine(&values, &ops).is_err());
    }

    /// Clone names are fresh and keep the alphabetic stem.
    #[test]
    fn prop_clone_name_is_free(
        stem in "[A-Za-z][A-Za-z_]{0,6}",
        digits in proptest::option::of(0u32..50),
        taken in proptest::collection::hash_set(0u32..60, 0..20),
    ) {
        let name = match digits {
            Some(d) => format!("{}{}", stem, d),
            None => stem.clone(),
        };
        let is_taken = |candidate: &str| {
            candidate == name
                || taken.iter().any(|t| format!("{}{}", stem, t) == candidate)
        };
        let clone = next_clone_name(&name, is_taken);
        prop_assert!(!is_taken(&clone));
        prop_assert!(clone.starts_with(&stem));
        prop_assert_ne!(clone, name);
    }

    /// Adding a name twice never changes the database.
    #[test]
    fn prop_duplicate_add_is_ignored(names in proptest::collection::vec("[a-z]{1,4}", 1..20)) {
        let mut db = ParameterDatabase::new();
        let mut expected: Vec<String> = Vec::new();
        for name in &names {
            let added = db.add(name);
            prop_assert_eq!(added, !expected.contains(name));
            if added {
                expected.push(name.clone());
            }
        }
        let registered: Vec<&str> = db.names().collect();
        prop_assert_eq!(registered, expected.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert!(db.unbound().len() == expected.len());
    }
}
