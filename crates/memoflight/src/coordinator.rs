// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The single owner of the key to entry mapping.
//!
//! The coordinator serializes every lookup and insertion by processing one request at a time in
//! its own task. It never awaits the memoized function: a miss spawns a computation task, every
//! request spawns a delivery task, and the loop moves on to the next request. Slow keys therefore
//! never hold up unrelated ones, and no lock is ever held across the slow call.

use std::{
    collections::{HashMap, hash_map},
    fmt,
    hash::Hash,
    sync::Arc,
};

use tokio::sync::{mpsc, oneshot};

use crate::{
    Spawner,
    entry::Entry,
    error::Result,
    task::{self, Function},
};

/// A caller asking for the result of `key`, to be sent on its private `reply` channel.
pub(crate) struct Request<K, V, E> {
    pub(crate) key: K,
    pub(crate) reply: oneshot::Sender<Result<V, E>>,
}

pub(crate) struct Coordinator<K, V, E> {
    name: &'static str,
    function: Function<K, V, E>,
    spawner: Spawner,
    entries: HashMap<K, Arc<Entry<V, E>>, ahash::RandomState>,
}

impl<K, V, E> Coordinator<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: &'static str, function: Function<K, V, E>, spawner: Spawner) -> Self {
        Self {
            name,
            function,
            spawner,
            entries: HashMap::default(),
        }
    }

    /// Handles requests until every sender is gone.
    ///
    /// Requests already buffered in the channel when it closes are still handled.
    pub(crate) async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request<K, V, E>>) {
        tracing::debug!(memo.name = self.name, "memo.coordinator.started");

        while let Some(request) = requests.recv().await {
            self.handle(request);
        }

        tracing::debug!(memo.name = self.name, memo.entries = self.entries.len(), "memo.coordinator.stopped");
    }

    /// Looks up the entry for the request's key, starting its computation on first sight, and
    /// arranges for the result to reach the requester.
    pub(crate) fn handle(&mut self, request: Request<K, V, E>) {
        let Request { key, reply } = request;

        let entry = match self.entries.entry(key) {
            hash_map::Entry::Occupied(slot) => {
                tracing::debug!(memo.name = self.name, memo.ready = slot.get().is_ready(), "memo.hit");
                Arc::clone(slot.get())
            }
            hash_map::Entry::Vacant(slot) => {
                tracing::debug!(memo.name = self.name, "memo.miss");
                let key = slot.key().clone();
                let entry = Arc::clone(slot.insert(Arc::new(Entry::new())));

                // The only place a computation is ever started, so each key is computed once.
                self.spawner.spawn(task::compute(
                    self.function.clone(),
                    self.spawner.clone(),
                    key,
                    Arc::clone(&entry),
                    self.name,
                ));

                entry
            }
        };

        self.spawner.spawn(task::deliver(entry, reply, self.name));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V, E> fmt::Debug for Coordinator<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("name", &self.name)
            .field("function", &self.function)
            .field("spawner", &self.spawner)
            .field("entries", &self.entries.len())
            .finish()
    }
}
