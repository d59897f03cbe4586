// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Concurrency-safe, non-blocking memoization of a fallible function.
//!
//! This crate provides [`Memo`], a cache that wraps an expensive, possibly slow, possibly failing
//! function. Each distinct key is computed at most once for the lifetime of the cache:
//!
//! - Requests for **different keys** never block each other; their computations run in parallel.
//! - Requests for the **same key** issued while it is being computed wait for that single
//!   computation, then all receive the same result.
//! - Failures are results too. An error (or a panic) is memoized and replayed to every caller of
//!   the key; the function is never retried.
//!
//! # Example
//!
//! ```
//! use memoflight::{Error, Memo};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let memo = Memo::new(|key: String| async move {
//!     if key == "x" { Err("boom".to_string()) } else { Ok(key.len()) }
//! });
//!
//! let (ab, x, cde) = tokio::join!(
//!     memo.get("ab".to_string()),
//!     memo.get("x".to_string()),
//!     memo.get("cde".to_string()),
//! );
//!
//! assert_eq!(ab, Ok(2));
//! assert_eq!(x, Err(Error::Computation("boom".to_string())));
//! assert_eq!(cde, Ok(3));
//! # }
//! ```
//!
//! # How It Works
//!
//! A single coordinator task owns the map from keys to entries and processes requests one at a
//! time. For a key it has not seen, it inserts a pending entry and spawns a computation task; for
//! every request it spawns a delivery task that waits for the entry to become ready and sends the
//! result to that caller's private reply channel. The coordinator never awaits the function, so a
//! slow key cannot hold up the others, and since nothing else touches the map no lock is needed
//! around it.
//!
//! # Lifecycle
//!
//! [`Memo::close`] stops the cache from accepting new requests; later calls fail with
//! [`Error::Closed`]. Requests accepted before that are still answered and computations already
//! running are never cancelled. Dropping the last [`Memo`] handle closes the cache as well.
//!
//! # Runtimes
//!
//! Tasks are started through a [`Spawner`]. [`Memo::new`] uses Tokio, while
//! [`Spawner::new_custom`] plugs in any other executor.

mod builder;
mod coordinator;
mod entry;
mod error;
mod memo;
mod spawner;
mod task;

pub use builder::MemoBuilder;
pub use error::{Error, Result};
pub use memo::Memo;
pub use spawner::Spawner;
