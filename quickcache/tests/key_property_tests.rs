//! Property-Based Tests for Cache Key Derivation
//!
//! For any encodable arguments, a derived key SHALL:
//! - start with `quickcache.<name>.<8 hex>/`
//! - be identical across independently built helpers for the same function
//! - keep its argument part within the length bound, hashing longer ones
//! - ignore arguments that are not varied on

use std::sync::Arc;

use proptest::prelude::*;
use quickcache::prelude::*;
use quickcache_test_utils::assertions::{assert_hashed_args, assert_key_shape};
use quickcache_test_utils::fixtures::{locmem, signature};
use quickcache_test_utils::generators::arb_value;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

const PARAMS: [&str; 4] = ["a", "b", "c", "d"];

fn helper(vary_on: &[&str]) -> MemoizationHelper<i64> {
    QuickCache::<i64>::new()
        .vary_on(vary_on.iter().copied())
        .cache(CacheTier::<i64>::new(locmem::<i64>("locmem"), None))
        .assert_function(|_, _| {})
        .build(signature("keyed", &PARAMS, "a"), |_: &BoundArgs| -> QuickCacheResult<i64> {
            Ok(0)
        })
        .unwrap()
}

fn call_with(values: &[Value]) -> CallArgs {
    values
        .iter()
        .cloned()
        .fold(CallArgs::new(), |call, value| call.arg(value))
}

fn arb_full_args() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(arb_value(), PARAMS.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_key_shape_and_bound(values in arb_full_args()) {
        let key = helper(&PARAMS).cache_key(&call_with(&values)).unwrap();
        let args = assert_key_shape(&key, "keyed");
        prop_assert!(args.len() <= quickcache::core::MAX_ARGS_LEN);
        // Unhashed argument lists always start with a type tag, never `H`.
        if args.starts_with('H') {
            assert_hashed_args(args);
        }
    }

    #[test]
    fn prop_key_stable_across_helpers(values in arb_full_args()) {
        let call = call_with(&values);
        prop_assert_eq!(
            helper(&PARAMS).cache_key(&call).unwrap(),
            helper(&PARAMS).cache_key(&call).unwrap()
        );
    }

    #[test]
    fn prop_unvaried_arguments_ignored(
        values in arb_full_args(),
        other_c in arb_value(),
        other_d in arb_value(),
    ) {
        let keyed = helper(&["a", "b"]);
        let mut changed = values.clone();
        changed[2] = other_c;
        changed[3] = other_d;
        prop_assert_eq!(
            keyed.cache_key(&call_with(&values)).unwrap(),
            keyed.cache_key(&call_with(&changed)).unwrap()
        );
    }

    #[test]
    fn prop_poke_then_peek(values in arb_full_args(), stored in any::<i64>()) {
        let keyed = helper(&PARAMS);
        let call = call_with(&values);
        keyed.poke(&call).unwrap().to(stored).unwrap();
        prop_assert_eq!(keyed.peek(&call).unwrap(), Some(stored));
        prop_assert_eq!(keyed.call(&call).unwrap(), stored);
    }

    #[test]
    fn prop_keyword_and_positional_agree(values in prop::collection::vec(arb_value(), 2)) {
        let keyed = helper(&["a", "b"]);
        let positional = call_with(&values).arg(0).arg(0);
        let keyword = CallArgs::new()
            .kwarg("b", values[1].clone())
            .kwarg("a", values[0].clone())
            .kwarg("c", 0)
            .kwarg("d", 0);
        prop_assert_eq!(
            keyed.cache_key(&positional).unwrap(),
            keyed.cache_key(&keyword).unwrap()
        );
    }
}

#[test]
fn test_shared_backend_separates_functions() {
    let backend = locmem::<i64>("shared");
    let cache: Arc<dyn Cache<i64>> = Arc::new(CacheTier::<i64>::new(backend.clone(), None));
    let build = |name: &str, result: i64| {
        QuickCache::<i64>::new()
            .vary_on(["a"])
            .shared_cache(Arc::clone(&cache))
            .build(signature(name, &["a"], "a"), move |_: &BoundArgs| -> QuickCacheResult<i64> {
                Ok(result)
            })
            .unwrap()
    };
    let first = build("first", 1);
    let second = build("second", 2);
    let call = CallArgs::new().arg("same");

    assert_eq!(first.call(&call).unwrap(), 1);
    assert_eq!(second.call(&call).unwrap(), 2);
    assert_eq!(backend.len(), 2);
}
