// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Spawner`] for plugging in runtime implementations.

use std::{
    any::Any,
    fmt::Debug,
    panic::{AssertUnwindSafe, catch_unwind},
    pin::Pin,
    sync::Arc,
};

pub(crate) type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type SpawnFn = dyn Fn(BoxedFuture) + Send + Sync;

/// Payload of a panic caught while running a blocking function.
pub(crate) type PanicPayload = Box<dyn Any + Send>;

/// Runtime-agnostic task spawner.
///
/// A [`Memo`](crate::Memo) runs its coordinator, one computation task per distinct key and one
/// delivery task per request on the spawner it was built with. Tasks are fire-and-forget: the
/// cache tracks their outcome through its own channels.
///
/// # Examples
///
/// Using Tokio:
///
/// ```rust
/// use memoflight::{Memo, Spawner};
///
/// # #[tokio::main]
/// # async fn main() {
/// let memo = Memo::builder(|key: u64| async move { Ok::<_, String>(key * 2) })
///     .spawner(Spawner::new_tokio())
///     .build();
///
/// assert_eq!(memo.get(21).await, Ok(42));
/// # }
/// ```
///
/// ## Custom Runtime
///
/// ```rust
/// use memoflight::{Memo, Spawner};
///
/// let spawner = Spawner::new_custom(|fut| {
///     std::thread::spawn(move || futures::executor::block_on(fut));
/// });
///
/// let memo = Memo::builder(|key: u64| async move { Ok::<_, String>(key * 2) })
///     .spawner(spawner)
///     .build();
///
/// assert_eq!(futures::executor::block_on(memo.get(21)), Ok(42));
/// ```
#[derive(Debug, Clone)]
pub struct Spawner(SpawnerKind);

#[derive(Clone)]
enum SpawnerKind {
    Tokio,
    Custom(Arc<SpawnFn>),
}

impl Debug for SpawnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tokio => f.write_str("Tokio"),
            Self::Custom(_) => f.debug_struct("CustomSpawner").finish_non_exhaustive(),
        }
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new_tokio()
    }
}

impl Spawner {
    /// Creates a spawner that uses the Tokio runtime.
    ///
    /// Spawning panics if it happens outside of a Tokio runtime context, so a
    /// [`Memo`](crate::Memo) using this spawner must be built inside one.
    #[must_use]
    pub fn new_tokio() -> Self {
        Self(SpawnerKind::Tokio)
    }

    /// Creates a custom spawner from a closure.
    ///
    /// The closure receives a boxed, pinned future and is responsible for driving it to
    /// completion on the appropriate runtime.
    pub fn new_custom<F>(f: F) -> Self
    where
        F: Fn(BoxedFuture) + Send + Sync + 'static,
    {
        Self(SpawnerKind::Custom(Arc::new(f)))
    }

    /// Spawns a fire-and-forget task.
    ///
    /// # Panics
    ///
    /// With the Tokio spawner, panics if called outside of a Tokio runtime context.
    pub(crate) fn spawn(&self, work: impl Future<Output = ()> + Send + 'static) {
        match &self.0 {
            SpawnerKind::Tokio => {
                drop(::tokio::spawn(work));
            }
            SpawnerKind::Custom(spawn) => spawn(Box::pin(work)),
        }
    }

    /// Runs a blocking function without stalling the async workers, if the runtime allows it.
    ///
    /// Tokio moves the work onto its blocking thread pool. A custom runtime owns the thread the
    /// spawned future runs on, so the work runs inline there.
    pub(crate) async fn run_blocking<T>(&self, work: impl FnOnce() -> T + Send + 'static) -> Result<T, PanicPayload>
    where
        T: Send + 'static,
    {
        match &self.0 {
            SpawnerKind::Tokio => match ::tokio::task::spawn_blocking(work).await {
                Ok(value) => Ok(value),
                Err(e) => match e.try_into_panic() {
                    Ok(payload) => Err(payload),
                    // Cancelled because the runtime is shutting down.
                    Err(e) => Err(Box::new(e.to_string())),
                },
            },
            SpawnerKind::Custom(_) => catch_unwind(AssertUnwindSafe(work)),
        }
    }
}
