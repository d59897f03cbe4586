// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring a [`Memo`] before its coordinator starts.

use std::{fmt, hash::Hash};

use tokio::sync::mpsc;

use crate::{
    Memo, Spawner,
    coordinator::Coordinator,
    task::Function,
};

const DEFAULT_NAME: &str = "memo";

/// Builder for a [`Memo`].
///
/// Created by [`Memo::builder`] or [`Memo::builder_blocking`].
///
/// # Examples
///
/// ```
/// use memoflight::{Memo, Spawner};
///
/// # #[tokio::main]
/// # async fn main() {
/// let memo = Memo::builder(|id: u32| async move { Ok::<_, String>(format!("user-{id}")) })
///     .name("users")
///     .spawner(Spawner::new_tokio())
///     .build();
///
/// assert_eq!(memo.name(), "users");
/// assert_eq!(memo.get(7).await, Ok("user-7".to_string()));
/// # }
/// ```
pub struct MemoBuilder<K, V, E> {
    name: &'static str,
    spawner: Option<Spawner>,
    function: Function<K, V, E>,
}

impl<K, V, E> MemoBuilder<K, V, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(function: Function<K, V, E>) -> Self {
        Self {
            name: DEFAULT_NAME,
            spawner: None,
            function,
        }
    }

    /// Sets the name reported in the `memo.name` field of log events.
    ///
    /// Defaults to `"memo"`.
    #[must_use]
    pub fn name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Sets the spawner used for the coordinator and for every computation and delivery task.
    ///
    /// Defaults to [`Spawner::new_tokio`].
    #[must_use]
    pub fn spawner(self, spawner: Spawner) -> Self {
        Self {
            spawner: Some(spawner),
            ..self
        }
    }

    /// Starts the coordinator and returns a ready-to-use cache.
    ///
    /// # Panics
    ///
    /// With the default Tokio spawner, panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn build(self) -> Memo<K, V, E> {
        let spawner = self.spawner.unwrap_or_default();
        let (sender, receiver) = mpsc::unbounded_channel();

        let coordinator = Coordinator::new(self.name, self.function, spawner.clone());
        spawner.spawn(coordinator.run(receiver));

        Memo::from_parts(self.name, sender)
    }
}

impl<K, V, E> fmt::Debug for MemoBuilder<K, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoBuilder")
            .field("name", &self.name)
            .field("spawner", &self.spawner)
            .field("function", &self.function)
            .finish()
    }
}
