// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The [`Memo`] handle callers use to request results.

use std::{fmt, hash::Hash, sync::Arc};

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::{
    Error, MemoBuilder,
    coordinator::Request,
    error::Result,
    task::Function,
};

/// A concurrency-safe memoization of a function.
///
/// Each distinct key is computed at most once for the lifetime of the cache. Requests for
/// different keys proceed in parallel, while concurrent requests for the same key wait for the
/// single in-flight computation and then all observe the same result. Failures are memoized too.
///
/// `Memo` is a cheap handle: clones share the same cache. The cache stops accepting requests
/// when [`close`](Self::close) is called or when the last handle is dropped. Computations
/// already running are never cancelled.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
///
/// use memoflight::Memo;
///
/// # #[tokio::main]
/// # async fn main() {
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
///
/// let memo = Memo::new(move |key: String| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     async move { Ok::<_, String>(key.len()) }
/// });
///
/// let (a, b) = tokio::join!(memo.get("ab".to_string()), memo.get("ab".to_string()));
/// assert_eq!(a, Ok(2));
/// assert_eq!(b, Ok(2));
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// # }
/// ```
pub struct Memo<K, V, E> {
    shared: Arc<Shared<K, V, E>>,
}

struct Shared<K, V, E> {
    name: &'static str,
    // Taken on close. Sends happen under the read lock so no request slips in after close.
    requests: RwLock<Option<mpsc::UnboundedSender<Request<K, V, E>>>>,
}

impl<K, V, E> Memo<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a cache memoizing the async function `f`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. Use [`Memo::builder`] with a custom
    /// [`Spawner`](crate::Spawner) to run on another executor.
    #[must_use]
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        Self::builder(f).build()
    }

    /// Creates a cache memoizing the blocking function `f`.
    ///
    /// With the Tokio spawner, `f` runs on the blocking thread pool.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn new_blocking<F>(f: F) -> Self
    where
        F: Fn(K) -> std::result::Result<V, E> + Send + Sync + 'static,
    {
        Self::builder_blocking(f).build()
    }

    /// Returns a builder for a cache memoizing the async function `f`.
    pub fn builder<F, Fut>(f: F) -> MemoBuilder<K, V, E>
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        MemoBuilder::new(Function::from_async(f))
    }

    /// Returns a builder for a cache memoizing the blocking function `f`.
    pub fn builder_blocking<F>(f: F) -> MemoBuilder<K, V, E>
    where
        F: Fn(K) -> std::result::Result<V, E> + Send + Sync + 'static,
    {
        MemoBuilder::new(Function::from_blocking(f))
    }

    pub(crate) fn from_parts(name: &'static str, requests: mpsc::UnboundedSender<Request<K, V, E>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                requests: RwLock::new(Some(requests)),
            }),
        }
    }

    /// Returns the result of the memoized function for `key`.
    ///
    /// The first request for a key starts the computation; later and concurrent requests wait for
    /// it. Dropping the returned future abandons the request without affecting other callers or
    /// the computation itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Computation`] or [`Error::Panicked`] if the function failed for `key`,
    /// now or on an earlier call. Returns [`Error::Closed`] if the cache was closed.
    pub async fn get(&self, key: K) -> Result<V, E> {
        let response = self.submit(key)?;
        response.await.unwrap_or(Err(Error::Closed))
    }

    /// Blocking variant of [`get`](Self::get) for callers outside of an async context.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn get_blocking(&self, key: K) -> Result<V, E> {
        let response = self.submit(key)?;
        response.blocking_recv().unwrap_or(Err(Error::Closed))
    }

    /// Stops accepting new requests.
    ///
    /// Requests accepted earlier still receive their results and running computations continue.
    /// Calling `close` more than once has no further effect.
    pub fn close(&self) {
        if self.shared.requests.write().take().is_some() {
            tracing::debug!(memo.name = self.shared.name, "memo.closed");
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called on any handle of this cache.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.requests.read().is_none()
    }

    /// Returns the name this cache was built with.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    fn submit(&self, key: K) -> Result<oneshot::Receiver<Result<V, E>>, E> {
        let (reply, response) = oneshot::channel();

        let requests = self.shared.requests.read();
        let Some(sender) = requests.as_ref() else {
            return Err(Error::Closed);
        };

        // Fails only if the coordinator task is gone, e.g. its runtime shut down.
        if sender.send(Request { key, reply }).is_err() {
            return Err(Error::Closed);
        }

        Ok(response)
    }
}

impl<K, V, E> Clone for Memo<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V, E> fmt::Debug for Memo<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("name", &self.shared.name)
            .field("closed", &self.shared.requests.read().is_none())
            .finish()
    }
}
