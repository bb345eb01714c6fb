//! Integration tests running effects on the tokio-backed default scheduler.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use undertow::prelude::*;
use undertow::runtime::UnhandledRejection;
use undertow::testing::test_runtime;
use undertow::{FMap, MapError, Ref, TestScheduler};

#[derive(Clone)]
struct Services {
    base_url: String,
    latency: Duration,
}

fn services() -> Services {
    Services {
        base_url: "https://api.example.test".to_string(),
        latency: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn test_run_resolves_value() {
    let effect = of::<_, String, ()>(20).zip(of(22)).map(|(a, b)| a + b);
    assert_eq!(default_runtime().run(&effect, ()).await, Ok(42));
}

#[tokio::test]
async fn test_run_reports_rejection() {
    let effect = reject::<i32, _, ()>("offline".to_string());
    assert_eq!(
        default_runtime().run(&effect, ()).await,
        Err(RunError::Rejected("offline".to_string()))
    );
}

#[tokio::test]
async fn test_run_reports_stalled_effect() {
    let effect = never::<i32, String, ()>();
    assert_eq!(default_runtime().run(&effect, ()).await, Err(RunError::Stalled));
}

#[tokio::test]
async fn test_delay_waits_on_wall_clock() {
    let started = Instant::now();
    let effect = of::<_, String, ()>("late").delay(Duration::from_millis(30));
    assert_eq!(default_runtime().run(&effect, ()).await, Ok("late"));
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_access_p_awaits_future_built_from_env() {
    let fetch = access_p(|env: Services| async move {
        tokio::time::sleep(env.latency).await;
        Ok::<_, String>(format!("{}/orders", env.base_url))
    });

    let result = default_runtime().run(&fetch, services()).await;
    assert_eq!(result, Ok("https://api.example.test/orders".to_string()));
}

#[tokio::test]
async fn test_encase_p_rejects_with_future_error() {
    let parse = encase_p::<_, _, _, _, _, ()>(|raw: &'static str| async move {
        tokio::task::yield_now().await;
        raw.parse::<u16>().map_err(|e| e.to_string())
    });

    let runtime = default_runtime();
    assert_eq!(runtime.run(&parse("8080"), ()).await, Ok(8080));
    assert!(matches!(
        runtime.run(&parse("port"), ()).await,
        Err(RunError::Rejected(_))
    ));
}

#[tokio::test]
async fn test_with_timeout_cancels_slow_future() {
    let dropped = Rc::new(RefCell::new(false));
    let flag = dropped.clone();
    let slow = access_p(move |_: ()| {
        let guard = DropFlag(flag.clone());
        async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, String>(1)
        }
    })
    .with_timeout(Duration::from_millis(10));

    let started = Instant::now();
    let result = default_runtime().run(&slow, ()).await;

    assert_eq!(
        result,
        Err(RunError::Rejected(TimeoutError::Timeout(Duration::from_millis(10))))
    );
    assert!(*dropped.borrow());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unbounded_timeout_on_default_scheduler() {
    let effect = of::<_, String, ()>(1).with_timeout(Duration::MAX);
    assert_eq!(default_runtime().run(&effect, ()).await, Ok(1));
}

#[test]
fn test_unbounded_timeout_after_clock_moved() {
    let (runtime, scheduler) = test_runtime();
    scheduler.advance_by(Duration::from_millis(1));

    let effect = of::<_, String, ()>(1).with_timeout(Duration::MAX);
    let fiber = runtime.fork(&effect, ());
    scheduler.run();

    assert_eq!(fiber.poll_outcome(), Some(Ok(1)));
    assert_eq!(scheduler.pending(), 0);
}

struct DropFlag(Rc<RefCell<bool>>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        *self.0.borrow_mut() = true;
    }
}

#[tokio::test]
async fn test_fiber_is_a_future() {
    let runtime = default_runtime();
    let fiber = of::<_, String, ()>("from fiber")
        .delay(Duration::from_millis(5))
        .to_future((), &runtime);

    let (_, outcome) = tokio::join!(runtime.scheduler().drive(), fiber);
    assert_eq!(outcome, Ok("from fiber"));
}

#[tokio::test]
async fn test_retry_on_wall_clock() {
    let attempts = Ref::new(0u32);
    let counter = attempts.clone();
    let effect = attempts
        .update::<String, (), _>(|n| n + 1)
        .chain(|n| {
            if n < 3 {
                reject(format!("attempt {} failed", n)).boxed()
            } else {
                of(n).boxed()
            }
        })
        .retry(RetryPolicy::constant(Duration::from_millis(2)).with_max_retries(5));

    let runtime = default_runtime();
    assert_eq!(runtime.run(&effect, ()).await, Ok(3));
    assert_eq!(runtime.run(&counter.read::<String, ()>(), ()).await, Ok(3));
}

#[tokio::test]
async fn test_fmap_shared_across_runs() {
    let cache: FMap<String, usize> = FMap::default();
    let runtime = default_runtime();

    runtime
        .run(&cache.set::<MapError, ()>("k".to_string(), 7), ())
        .await
        .unwrap();
    assert_eq!(runtime.run(&cache.get::<MapError, ()>("k".to_string()), ()).await, Ok(7));
    assert_eq!(
        runtime.run(&cache.get::<MapError, ()>("x".to_string()), ()).await,
        Err(RunError::Rejected(MapError::NoSuchElement))
    );
}

#[test]
fn test_builder_with_virtual_scheduler() {
    let scheduler = TestScheduler::new();
    let runtime = Runtime::builder()
        .name("virtual")
        .unhandled(UnhandledRejection::Ignore)
        .scheduler(scheduler.clone())
        .build();

    let fiber = runtime.fork(&timeout::<_, String, ()>(1, Duration::from_secs(3600)), ());
    scheduler.advance_by(Duration::from_secs(3600));
    assert_eq!(fiber.poll_outcome(), Some(Ok(1)));
    assert_eq!(runtime.config().name, "virtual");
}

#[test]
fn test_runtime_run_drives_test_scheduler() {
    let (runtime, scheduler) = test_runtime();
    let effect = of::<_, String, ()>(5).delay(Duration::from_secs(1));
    let result = tokio_test::block_on(runtime.run(&effect, ()));
    assert_eq!(result, Ok(5));
    assert_eq!(scheduler.now(), Duration::from_secs(1));
}
