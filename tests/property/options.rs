//! Property-based tests for recovery option handling

use proptest::prelude::*;
use recoverd::logging::normalize_level;
use recoverd::recovery::options::MAX_PARANOID;
use recoverd::recovery::RecoveryOptions;

/// Paranoia is clamped and every flag passes through unchanged
#[test]
fn test_engine_options_clamp_paranoia() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(any::<u8>(), any::<[bool; 5]>()),
            |(paranoid, [keep, ext2, expert, low_memory, verbose])| {
                let options = RecoveryOptions {
                    paranoid_mode: paranoid,
                    keep_corrupted_files: keep,
                    enable_ext2_optimization: ext2,
                    expert_mode: expert,
                    low_memory_mode: low_memory,
                    verbose_output: verbose,
                    ..RecoveryOptions::default()
                };
                let engine = options.engine_options();
                prop_assert!(engine.paranoid <= MAX_PARANOID);
                if paranoid <= MAX_PARANOID {
                    prop_assert_eq!(engine.paranoid, paranoid);
                }
                prop_assert_eq!(engine.keep_corrupted, keep);
                prop_assert_eq!(engine.ext2_optimization, ext2);
                prop_assert_eq!(engine.expert, expert);
                prop_assert_eq!(engine.low_memory, low_memory);
                prop_assert_eq!(engine.verbose, verbose);
                Ok(())
            },
        )
        .unwrap();
}

/// Options survive JSON even when the request only names some fields
#[test]
fn test_partial_option_documents_keep_defaults() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<u8>(), any::<bool>()), |(paranoid, keep)| {
            let doc = format!(
                r#"{{"paranoid_mode": {}, "keep_corrupted_files": {}}}"#,
                paranoid, keep
            );
            let options: RecoveryOptions = serde_json::from_str(&doc).unwrap();
            prop_assert_eq!(options.paranoid_mode, paranoid);
            prop_assert_eq!(options.keep_corrupted_files, keep);
            prop_assert!(options.enable_ext2_optimization);
            prop_assert!(!options.has_file_type_filters());
            Ok(())
        })
        .unwrap();
}

/// Level normalization is idempotent
#[test]
fn test_level_normalization_is_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&"[A-Za-z=,_]{0,24}", |level| {
            let once = normalize_level(&level);
            prop_assert_eq!(normalize_level(&once), once);
            Ok(())
        })
        .unwrap();
}
