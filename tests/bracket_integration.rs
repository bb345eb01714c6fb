//! Integration tests for bracket resource management.
//!
//! These tests verify that release runs exactly once on every exit path,
//! including real async file I/O on the default scheduler.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use undertow::effect::combinators::Of;
use undertow::prelude::*;
use undertow::testing::{test_runtime, Probe};
use undertow::{assert_rejects, assert_resolves};

// ============================================================================
// Helpers
// ============================================================================

fn temp_file_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("undertow_bracket_test_{}.txt", name))
}

/// A release function that counts its invocations.
fn counting_release<R: Clone + 'static>(
    count: Rc<Cell<usize>>,
) -> impl Fn(&'static str) -> BoxedEffect<(), String, R> {
    move |_handle| {
        let count = count.clone();
        lift(move || {
            count.set(count.get() + 1);
            Ok(())
        })
        .boxed()
    }
}

// ============================================================================
// Exit paths on the test scheduler
// ============================================================================

#[test]
fn bracket_releases_once_on_resolve() {
    let released = Rc::new(Cell::new(0));
    let effect = bracket(
        of::<_, String, ()>("conn"),
        counting_release(released.clone()),
        |conn| of(conn.len()).delay(Duration::from_millis(10)),
    );

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_resolves!(fiber, 4);
    assert_eq!(released.get(), 1);
}

#[test]
fn bracket_releases_once_on_reject() {
    let released = Rc::new(Cell::new(0));
    let effect = bracket(
        of::<_, String, ()>("conn"),
        counting_release(released.clone()),
        |_| reject::<usize, _, ()>("query failed".to_string()),
    );

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_rejects!(fiber, "query failed".to_string());
    assert_eq!(released.get(), 1);
}

#[test]
fn bracket_releases_once_on_cancel() {
    let released = Rc::new(Cell::new(0));
    let body = Probe::<usize, String, ()>::never();
    let use_body = body.clone();
    let effect = bracket(
        of::<_, String, ()>("conn"),
        counting_release(released.clone()),
        move |_| use_body.clone(),
    );

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run();
    assert_eq!(body.forks(), 1);

    fiber.cancel();
    fiber.cancel();
    scheduler.run_to_end();

    assert_eq!(released.get(), 1);
    assert_eq!(body.cancels(), 1);
}

#[test]
fn bracket_skips_release_when_acquire_fails() {
    let released = Rc::new(Cell::new(0));
    let used = Rc::new(Cell::new(false));
    let flag = used.clone();
    let effect = bracket(
        reject::<&'static str, _, ()>("no connection".to_string()),
        counting_release(released.clone()),
        move |_| {
            flag.set(true);
            of(0usize)
        },
    );

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_rejects!(fiber, "no connection".to_string());
    assert_eq!(released.get(), 0);
    assert!(!used.get());
}

#[test]
fn bracket_delivers_outcome_after_release() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let release_order = order.clone();
    let effect = bracket(
        of::<_, String, ()>(1),
        move |_| {
            let order = release_order.clone();
            lift(move || {
                order.borrow_mut().push("release");
                Ok(())
            })
            .delay(Duration::from_millis(20))
        },
        |n| of(n + 1),
    );

    let (runtime, scheduler) = test_runtime();
    let delivered = order.clone();
    runtime.execute(
        &effect,
        (),
        |_| {},
        move |_| delivered.borrow_mut().push("deliver"),
    );
    scheduler.run_to_end();

    assert_eq!(*order.borrow(), vec!["release", "deliver"]);
}

#[test]
fn bracket_body_error_wins_over_release_error() {
    let effect = bracket(
        of::<_, String, ()>(1),
        |_| reject::<(), _, ()>("release failed".to_string()),
        |_| reject::<i32, _, ()>("body failed".to_string()),
    );

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert_rejects!(fiber, "body failed".to_string());
}

#[test]
fn bracket_releases_when_body_panics() {
    let released = Rc::new(Cell::new(0));
    let effect = bracket(
        of::<_, String, ()>("conn"),
        counting_release(released.clone()),
        |_| -> Of<usize, String, ()> { panic!("body blew up") },
    );

    let (runtime, scheduler) = test_runtime();
    let fiber = runtime.fork(&effect, ());
    scheduler.run_to_end();

    assert!(matches!(fiber.poll_outcome(), Some(Err(RunError::Panicked(_)))));
    assert_eq!(released.get(), 1);
}

// ============================================================================
// File I/O on the default scheduler
// ============================================================================

#[tokio::test]
async fn bracket_cleans_up_temp_file_on_success() {
    let path = temp_file_path("success");
    let create = encase_p::<_, _, _, _, _, ()>(|path: PathBuf| async move {
        tokio::fs::write(&path, "test content").await?;
        Ok::<_, std::io::Error>(path)
    });
    let remove = encase_p::<_, _, _, _, _, ()>(|path: PathBuf| async move {
        tokio::fs::remove_file(&path).await
    });
    let read = encase_p::<_, _, _, _, _, ()>(|path: PathBuf| async move {
        tokio::fs::read_to_string(&path).await
    });

    let effect = bracket(create(path.clone()), remove, read);
    let result = default_runtime().run(&effect, ()).await;

    assert_eq!(result.ok().as_deref(), Some("test content"));
    assert!(!path.exists());
}

#[tokio::test]
async fn bracket_cleans_up_temp_file_on_failure() {
    let path = temp_file_path("failure");
    let create = encase_p::<_, _, _, _, _, ()>(|path: PathBuf| async move {
        tokio::fs::write(&path, "test content").await?;
        Ok::<_, std::io::Error>(path)
    });
    let remove = encase_p::<_, _, _, _, _, ()>(|path: PathBuf| async move {
        tokio::fs::remove_file(&path).await
    });

    let effect = bracket(create(path.clone()), remove, |_path: PathBuf| {
        lift::<_, _, std::io::Error, ()>(|| Err::<String, _>(std::io::Error::other("parse error")))
    });
    let result = default_runtime().run(&effect, ()).await;

    assert!(matches!(result, Err(RunError::Rejected(_))));
    assert!(!path.exists());
}
