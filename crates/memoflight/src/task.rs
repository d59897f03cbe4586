// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The short-lived tasks spawned by the coordinator.
//!
//! A computation task runs the memoized function for a newly inserted entry and publishes the
//! result. A delivery task waits for an entry to become ready and forwards its result to one
//! caller.

use std::{fmt, panic::AssertUnwindSafe, sync::Arc};

use futures_util::{FutureExt, future::BoxFuture};
use tokio::sync::oneshot;

use crate::{
    Error, Spawner,
    entry::Entry,
    error::Result,
};

type AsyncFn<K, V, E> = dyn Fn(K) -> BoxFuture<'static, std::result::Result<V, E>> + Send + Sync;
type BlockingFn<K, V, E> = dyn Fn(K) -> std::result::Result<V, E> + Send + Sync;

/// The function being memoized.
pub(crate) enum Function<K, V, E> {
    Async(Arc<AsyncFn<K, V, E>>),
    Blocking(Arc<BlockingFn<K, V, E>>),
}

impl<K, V, E> Function<K, V, E> {
    pub(crate) fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        Self::Async(Arc::new(move |key| f(key).boxed()))
    }

    pub(crate) fn from_blocking<F>(f: F) -> Self
    where
        F: Fn(K) -> std::result::Result<V, E> + Send + Sync + 'static,
    {
        Self::Blocking(Arc::new(f))
    }
}

impl<K, V, E> Clone for Function<K, V, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Async(f) => Self::Async(Arc::clone(f)),
            Self::Blocking(f) => Self::Blocking(Arc::clone(f)),
        }
    }
}

impl<K, V, E> fmt::Debug for Function<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async(_) => f.write_str("Async"),
            Self::Blocking(_) => f.write_str("Blocking"),
        }
    }
}

/// Invokes `function(key)` once and publishes whatever it produces into `entry`.
pub(crate) async fn compute<K, V, E>(function: Function<K, V, E>, spawner: Spawner, key: K, entry: Arc<Entry<V, E>>, name: &'static str)
where
    K: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
{
    let output = match function {
        Function::Async(f) => AssertUnwindSafe(async move { f(key).await }).catch_unwind().await,
        Function::Blocking(f) => spawner.run_blocking(move || f(key)).await,
    };

    let result = match output {
        Ok(Ok(value)) => {
            tracing::debug!(memo.name = name, memo.outcome = "value", "memo.computed");
            Ok(value)
        }
        Ok(Err(e)) => {
            tracing::debug!(memo.name = name, memo.outcome = "error", "memo.computed");
            Err(Error::Computation(e))
        }
        Err(_panic) => {
            tracing::warn!(memo.name = name, memo.outcome = "panic", "memo.computed");
            Err(Error::Panicked)
        }
    };

    entry.publish(result);
}

/// Forwards the result of `entry` to a single caller once it is ready.
///
/// Gives up early if the caller stops listening, so an abandoned request does not keep a task
/// parked until the computation finishes.
pub(crate) async fn deliver<V, E>(entry: Arc<Entry<V, E>>, mut reply: oneshot::Sender<Result<V, E>>, name: &'static str)
where
    V: Clone,
    E: Clone,
{
    let result = tokio::select! {
        biased;
        result = entry.wait() => Some(result),
        () = reply.closed() => None,
    };

    let delivered = match result {
        Some(result) => reply.send(result).is_ok(),
        None => false,
    };

    if !delivered {
        tracing::debug!(memo.name = name, "memo.abandoned");
    }
}
