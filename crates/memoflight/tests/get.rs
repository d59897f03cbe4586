// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "test code")]

//! Integration tests for `Memo::get()`.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures_util::{StreamExt, stream::FuturesUnordered};
use memoflight::{Error, Memo};
use tokio::sync::Notify;

/// A memoized function that counts its invocations and, for gated keys, waits for the gate.
fn gated(calls: &Arc<AtomicUsize>, gate: &Arc<Notify>, gated_key: &'static str) -> Memo<String, usize, String> {
    let calls = Arc::clone(calls);
    let gate = Arc::clone(gate);

    Memo::new(move |key: String| {
        calls.fetch_add(1, Ordering::SeqCst);
        let gate = Arc::clone(&gate);
        async move {
            if key == gated_key {
                gate.notified().await;
            }
            Ok(key.len())
        }
    })
}

#[tokio::test]
async fn direct_call() {
    let memo = Memo::new(|key: String| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok::<_, String>(format!("Result for {key}"))
    });

    assert_eq!(memo.get("key".to_string()).await, Ok("Result for key".to_string()));
}

#[tokio::test]
async fn concurrent_calls_compute_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo = Memo::new(move |_key: &'static str| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, String>("Result".to_string())
        }
    });

    let futures = FuturesUnordered::new();
    for _ in 0..10 {
        futures.push(memo.get("key"));
    }

    assert!(futures.all(|out| async move { out == Ok("Result".to_string()) }).await);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_from_many_tasks_compute_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let memo = gated(&calls, &gate, "shared");

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let memo = memo.clone();
            tokio::spawn(async move { memo.get("shared".to_string()).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(tasks.iter().all(|t| !t.is_finished()));

    gate.notify_one();

    for task in tasks {
        assert_eq!(task.await.unwrap(), Ok(6));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn value_replayed_after_completion() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let memo = gated(&calls, &gate, "never");

    assert_eq!(memo.get("abcd".to_string()).await, Ok(4));
    assert_eq!(memo.get("abcd".to_string()).await, Ok(4));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(memo.get("abcd".to_string()).await, Ok(4));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn errors_are_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo = Memo::new(move |key: String| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Err::<usize, _>(format!("cannot compute {key}")) }
    });

    let expected = Err(Error::Computation("cannot compute bad".to_string()));
    let (first, second) = tokio::join!(memo.get("bad".to_string()), memo.get("bad".to_string()));
    assert_eq!(first, expected);
    assert_eq!(second, expected);

    // Issued after the first computation finished.
    assert_eq!(memo.get("bad".to_string()).await, expected);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_keys_do_not_block_each_other() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let memo = gated(&calls, &gate, "a");

    let slow = tokio::spawn({
        let memo = memo.clone();
        async move { memo.get("a".to_string()).await }
    });

    let fast = tokio::time::timeout(Duration::from_secs(5), memo.get("bb".to_string())).await;
    assert_eq!(fast, Ok(Ok(2)));
    assert!(!slow.is_finished());

    gate.notify_one();
    assert_eq!(slow.await.unwrap(), Ok(1));
}

#[tokio::test]
async fn no_waiter_is_lost() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let memo = gated(&calls, &gate, "k");

    let waiters: Vec<_> = (0..100)
        .map(|_| {
            let memo = memo.clone();
            tokio::spawn(async move { memo.get("k".to_string()).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(waiters.iter().all(|w| !w.is_finished()));

    gate.notify_one();

    for waiter in waiters {
        let result = tokio::time::timeout(Duration::from_secs(5), waiter).await;
        assert_eq!(result.unwrap().unwrap(), Ok(1));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mixed_keys_scenario() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo = Memo::new(move |key: String| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if key == "x" {
                Err("boom".to_string())
            } else {
                Ok(key.len())
            }
        }
    });

    let (ab1, ab2, x, cde) = tokio::join!(
        memo.get("ab".to_string()),
        memo.get("ab".to_string()),
        memo.get("x".to_string()),
        memo.get("cde".to_string()),
    );

    assert_eq!(ab1, Ok(2));
    assert_eq!(ab2, Ok(2));
    assert_eq!(x, Err(Error::Computation("boom".to_string())));
    assert_eq!(cde, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn panic_is_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let memo = Memo::new(move |key: String| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            assert_ne!(key, "explode", "function panicked");
            Ok::<_, String>(key.len())
        }
    });

    let (first, second) = tokio::join!(memo.get("explode".to_string()), memo.get("explode".to_string()));
    assert_eq!(first, Err(Error::Panicked));
    assert_eq!(second, Err(Error::Panicked));
    assert_eq!(memo.get("explode".to_string()).await, Err(Error::Panicked));

    // Other keys are unaffected.
    assert_eq!(memo.get("fine".to_string()).await, Ok(4));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn abandoned_caller_does_not_affect_others() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());
    let memo = gated(&calls, &gate, "slow");

    let abandoned = tokio::time::timeout(Duration::from_millis(10), memo.get("slow".to_string())).await;
    assert!(abandoned.is_err());

    let patient = tokio::spawn({
        let memo = memo.clone();
        async move { memo.get("slow".to_string()).await }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    gate.notify_one();

    assert_eq!(patient.await.unwrap(), Ok(4));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn custom_key_type() {
    #[derive(Clone, PartialEq, Eq, Hash)]
    struct UserId(u32);

    let memo = Memo::new(|id: UserId| async move { Ok::<_, String>(format!("user-{}", id.0)) });

    assert_eq!(memo.get(UserId(1)).await, Ok("user-1".to_string()));
    assert_eq!(memo.get(UserId(2)).await, Ok("user-2".to_string()));
}
