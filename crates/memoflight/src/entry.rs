// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key record of a computation and its published result.

use std::{fmt, sync::OnceLock};

use tokio::sync::Notify;

use crate::error::Result;

/// The cache's knowledge about one key.
///
/// An entry starts out pending and becomes ready exactly once, when the computation task that
/// created it publishes the result. After that the result never changes.
pub(crate) struct Entry<V, E> {
    result: OnceLock<Result<V, E>>,
    ready: Notify,
}

impl<V, E> Entry<V, E> {
    pub(crate) fn new() -> Self {
        Self {
            result: OnceLock::new(),
            ready: Notify::new(),
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.result.get().is_some()
    }

    /// Records the result, then wakes every waiter.
    ///
    /// # Panics
    ///
    /// Panics if the entry was already published. Only the task that created the entry may
    /// publish it, so a second publication means the single-flight guarantee is broken.
    #[expect(clippy::panic, reason = "double publication is a broken invariant, not a recoverable error")]
    pub(crate) fn publish(&self, result: Result<V, E>) {
        if self.result.set(result).is_err() {
            panic!("memo entry published twice");
        }

        self.ready.notify_waiters();
    }

    /// Waits until the entry is ready and returns a copy of its result.
    pub(crate) async fn wait(&self) -> Result<V, E>
    where
        V: Clone,
        E: Clone,
    {
        loop {
            // Registered before the check so a publish racing with us cannot be missed.
            let notified = self.ready.notified();

            if let Some(result) = self.result.get() {
                return result.clone();
            }

            notified.await;
        }
    }
}

impl<V, E> fmt::Debug for Entry<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_ready() { "Ready" } else { "Pending" };
        f.debug_struct("Entry").field("state", &state).finish_non_exhaustive()
    }
}
