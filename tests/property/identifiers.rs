//! Property-based tests for identifier generation

use proptest::prelude::*;
use recoverd::types::{new_context_id, new_recovery_id, CONTEXT_ID_PREFIX, RECOVERY_ID_PREFIX};
use std::collections::HashSet;

fn assert_shape(id: &str, prefix: &str) {
    let suffix = id.strip_prefix(prefix).expect("prefix");
    assert_eq!(suffix.len(), 16);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

/// Every batch of generated IDs is well formed and free of duplicates
#[test]
fn test_generated_ids_are_unique_and_well_formed() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(32));

    runner
        .run(&(1usize..500), |count| {
            let mut seen = HashSet::new();
            for _ in 0..count {
                let ctx = new_context_id();
                let rec = new_recovery_id();
                assert_shape(&ctx, CONTEXT_ID_PREFIX);
                assert_shape(&rec, RECOVERY_ID_PREFIX);
                prop_assert!(seen.insert(ctx));
                prop_assert!(seen.insert(rec));
            }
            Ok(())
        })
        .unwrap();
}
