//! Property-based tests for the algebraic laws of effects.
//!
//! Each property forks both sides of an equation on a fresh test scheduler
//! and compares their outcomes.

use std::time::Duration;

use proptest::prelude::*;
use undertow::prelude::*;
use undertow::testing::test_runtime;

fn outcome<Eff: Effect>(effect: &Eff, env: Eff::Env) -> Option<Result<Eff::Output, RunError<Eff::Error>>> {
    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(effect, env);
    scheduler.run_to_end();
    fiber.poll_outcome()
}

fn source(value: Result<i32, String>) -> BoxedEffect<i32, String, ()> {
    match value {
        Ok(v) => of(v).boxed(),
        Err(e) => reject(e).boxed(),
    }
}

fn arb_source() -> impl Strategy<Value = Result<i32, String>> {
    prop_oneof![
        any::<i32>().prop_map(Ok),
        "[a-z]{1,8}".prop_map(Err),
    ]
}

proptest! {
    #[test]
    fn prop_map_identity(value in arb_source()) {
        let effect = source(value);
        prop_assert_eq!(outcome(&effect.clone().map(|x| x), ()), outcome(&effect, ()));
    }

    #[test]
    fn prop_map_composition(value in arb_source(), a in -1000i32..1000, b in -1000i32..1000) {
        let f = move |x: i32| x.wrapping_add(a);
        let g = move |x: i32| x.wrapping_mul(b);
        let left = source(value.clone()).map(f).map(g);
        let right = source(value).map(move |x| g(f(x)));
        prop_assert_eq!(outcome(&left, ()), outcome(&right, ()));
    }

    #[test]
    fn prop_chain_left_identity(value in any::<i32>(), offset in any::<i32>()) {
        let f = move |x: i32| of::<_, String, ()>(x.wrapping_add(offset));
        let left = of::<_, String, ()>(value).chain(f);
        prop_assert_eq!(outcome(&left, ()), outcome(&f(value), ()));
    }

    #[test]
    fn prop_chain_right_identity(value in arb_source()) {
        let effect = source(value);
        let chained = effect.clone().chain(|x| of(x));
        prop_assert_eq!(outcome(&chained, ()), outcome(&effect, ()));
    }

    #[test]
    fn prop_chain_associativity(value in arb_source(), limit in any::<i32>()) {
        let f = move |x: i32| {
            if x > limit {
                reject::<i32, _, ()>(format!("{} over {}", x, limit)).boxed()
            } else {
                of(x.wrapping_add(1)).boxed()
            }
        };
        let g = |x: i32| of::<_, String, ()>(x.wrapping_mul(2));

        let left = source(value.clone()).chain(f).chain(g);
        let right = source(value).chain(move |x| f(x).chain(g));
        prop_assert_eq!(outcome(&left, ()), outcome(&right, ()));
    }

    #[test]
    fn prop_catch_on_success_is_noop(value in any::<i32>()) {
        let effect = of::<_, String, ()>(value).catch(|_| of::<_, String, ()>(0));
        prop_assert_eq!(outcome(&effect, ()), Some(Ok(value)));
    }

    #[test]
    fn prop_race_takes_earlier_timer(a in 1u64..500, b in 1u64..500) {
        let effect = timeout::<_, String, ()>("left", Duration::from_millis(a))
            .race(timeout("right", Duration::from_millis(b)));
        let expected = if a <= b { "left" } else { "right" };
        prop_assert_eq!(outcome(&effect, ()), Some(Ok(expected)));
    }

    #[test]
    fn prop_zip_settles_at_later_timer(a in 0u64..500, b in 0u64..500) {
        let effect = timeout::<_, String, ()>(a, Duration::from_millis(a))
            .zip(timeout(b, Duration::from_millis(b)));
        let (runtime, scheduler) = test_runtime();
        let fiber = runtime.fork(&effect, ());
        scheduler.run_to_end();
        prop_assert_eq!(fiber.poll_outcome(), Some(Ok((a, b))));
        prop_assert_eq!(scheduler.now(), Duration::from_millis(a.max(b)));
    }

    #[test]
    fn prop_delay_settles_exactly_at_deadline(delay in 1u64..10_000) {
        let effect = of::<_, String, ()>(()).delay(Duration::from_millis(delay));
        let (runtime, scheduler) = test_runtime();
        let fiber = runtime.fork(&effect, ());
        scheduler.advance_by(Duration::from_millis(delay - 1));
        prop_assert_eq!(fiber.status(), Status::Forked);
        scheduler.advance_by(Duration::from_millis(1));
        prop_assert_eq!(fiber.status(), Status::Resolved);
    }

    #[test]
    fn prop_sequential_sum(values in prop::collection::vec(-1000i32..1000, 0..20)) {
        let expected: i32 = values.iter().sum();
        let effect = values.iter().fold(of::<_, String, ()>(0).boxed(), |acc, &v| {
            acc.chain(move |total| of(total + v)).boxed()
        });
        prop_assert_eq!(outcome(&effect, ()), Some(Ok(expected)));
    }
}
