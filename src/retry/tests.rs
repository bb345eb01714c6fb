//! Integration tests for retry functionality.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use super::*;
use crate::prelude::*;
use crate::testing::{test_runtime, Timeline};
use crate::{assert_pending, assert_resolves};

fn flaky(failures: u32, calls: Rc<Cell<u32>>) -> impl Effect<Output = &'static str, Error = String, Env = ()> {
    lift(move || {
        calls.set(calls.get() + 1);
        if calls.get() <= failures {
            Err(format!("transient failure {}", calls.get()))
        } else {
            Ok("success")
        }
    })
}

#[test]
fn test_retry_succeeds_on_third_attempt() {
    let calls = Rc::new(Cell::new(0));
    let effect = flaky(2, calls.clone())
        .retry(RetryPolicy::constant(Duration::from_millis(1)).with_max_retries(5));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_resolves!(fiber, "success");
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_retry_exhausted_returns_final_error() {
    let calls = Rc::new(Cell::new(0));
    let effect = flaky(u32::MAX, calls.clone())
        .retry(RetryPolicy::constant(Duration::from_millis(10)).with_max_retries(3));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_eq!(
        fiber.poll_outcome(),
        Some(Err(RunError::Rejected(RetryExhausted::new(
            "transient failure 4".to_string(),
            4,
            Duration::from_millis(30),
        ))))
    );
    assert_eq!(calls.get(), 4);
}

#[test]
fn test_zero_retries_runs_once() {
    let calls = Rc::new(Cell::new(0));
    let effect = flaky(1, calls.clone())
        .retry(RetryPolicy::constant(Duration::from_millis(10)).with_max_retries(0));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert!(matches!(
        fiber.poll_outcome(),
        Some(Err(RunError::Rejected(RetryExhausted { attempts: 1, .. })))
    ));
    assert_eq!(scheduler.now(), Duration::ZERO);
}

#[test]
fn test_exponential_backoff_timing() {
    let (runtime, scheduler) = test_runtime();
    let timeline = Timeline::new(scheduler.clone());
    let effect = timeline
        .mark::<&str, ()>("attempt")
        .chain(|_| reject::<(), _, ()>("nope"))
        .retry(RetryPolicy::exponential(Duration::from_millis(10)).with_max_retries(3));

    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    let times: Vec<_> = timeline.entries().into_iter().map(|(at, _)| at).collect();
    assert_eq!(
        times,
        vec![
            Duration::ZERO,
            Duration::from_millis(10),
            Duration::from_millis(30),
            Duration::from_millis(70),
        ]
    );
    assert!(fiber.is_done());
}

#[test]
fn test_max_delay_caps_backoff() {
    let (runtime, scheduler) = test_runtime();
    let timeline = Timeline::new(scheduler.clone());
    let effect = timeline
        .mark::<&str, ()>("attempt")
        .chain(|_| reject::<(), _, ()>("nope"))
        .retry(
            RetryPolicy::exponential(Duration::from_millis(10))
                .with_max_retries(4)
                .with_max_delay(Duration::from_millis(25)),
        );

    runtime.fork(&effect, ());
    scheduler.run_to_end();

    let last = timeline.entries().last().map(|(at, _)| *at);
    // 10 + 20 + 25 + 25
    assert_eq!(last, Some(Duration::from_millis(80)));
}

#[test]
fn test_retry_waits_on_virtual_clock() {
    let calls = Rc::new(Cell::new(0));
    let effect = flaky(1, calls.clone())
        .retry(RetryPolicy::constant(Duration::from_secs(60)).with_max_retries(1));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.advance_by(Duration::from_secs(59));
    assert_pending!(fiber);
    assert_eq!(calls.get(), 1);

    scheduler.advance_by(Duration::from_secs(1));
    assert_resolves!(fiber, "success");
}

#[test]
fn test_panic_is_not_retried() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let effect = lift::<_, _, String, ()>(move || -> Result<(), String> {
        counter.set(counter.get() + 1);
        panic!("corrupt state")
    })
    .retry(RetryPolicy::constant(Duration::from_millis(1)).with_max_retries(5));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_eq!(
        fiber.poll_outcome(),
        Some(Err(RunError::Panicked(Panic::new("corrupt state"))))
    );
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_cancel_during_backoff_stops_retries() {
    let calls = Rc::new(Cell::new(0));
    let effect = flaky(u32::MAX, calls.clone())
        .retry(RetryPolicy::constant(Duration::from_millis(10)).with_max_retries(5));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.advance_by(Duration::from_millis(5));
    fiber.cancel();
    scheduler.run_to_end();

    assert_eq!(calls.get(), 1);
    assert_eq!(fiber.poll_outcome(), Some(Err(RunError::Cancelled)));
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn test_retry_with_environment() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let effect = access_m(move |threshold: u32| {
        counter.set(counter.get() + 1);
        if counter.get() < threshold {
            reject::<u32, _, u32>("not yet")
                .boxed()
        } else {
            of(counter.get()).boxed()
        }
    })
    .retry(RetryPolicy::constant(Duration::from_millis(1)).with_max_retries(10));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, 4);
    scheduler.run_to_end();
    assert_resolves!(fiber, 4);
}

#[test]
fn test_retry_with_timeout_per_attempt() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let attempt = lift::<_, _, String, ()>(move || {
        counter.set(counter.get() + 1);
        Ok(counter.get())
    })
    .chain(|n| {
        let wait = if n < 3 { 1_000 } else { 5 };
        timeout(n, Duration::from_millis(wait))
    })
    .with_timeout(Duration::from_millis(50));
    let effect = attempt.retry(RetryPolicy::constant(Duration::from_millis(10)).with_max_retries(5));

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_resolves!(fiber, 3);
    // two timed-out attempts of 50ms, two 10ms pauses, then 5ms
    assert_eq!(scheduler.now(), Duration::from_millis(125));
}

#[tokio::test]
async fn test_retry_on_default_runtime() {
    let calls = Rc::new(Cell::new(0));
    let effect = flaky(2, calls.clone())
        .retry(RetryPolicy::exponential(Duration::from_millis(1)).with_max_retries(3));

    let result = default_runtime().run(&effect, ()).await;

    assert_eq!(result, Ok("success"));
    assert_eq!(calls.get(), 3);
}
