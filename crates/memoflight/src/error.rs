// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// The result of a [`Memo::get`](crate::Memo::get) call.
pub type Result<T, E> = std::result::Result<T, Error<E>>;

/// An error returned by [`Memo::get`](crate::Memo::get).
///
/// Failures of the memoized function are data, not faults: they are recorded next to the key
/// exactly like a successful value and every caller of that key observes the same error. The
/// cache never retries a failed key.
///
/// # Examples
///
/// ```
/// use memoflight::{Error, Memo};
///
/// # #[tokio::main]
/// # async fn main() {
/// let memo = Memo::new(|key: String| async move {
///     if key.is_empty() { Err("empty key".to_string()) } else { Ok(key.len()) }
/// });
///
/// let err = memo.get(String::new()).await.unwrap_err();
/// assert_eq!(err.computation().map(String::as_str), Some("empty key"));
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E> {
    /// The memoized function returned an error for this key.
    ///
    /// The error is stored verbatim and replayed to every past and future caller of the key.
    #[error("computation failed: {0}")]
    Computation(E),

    /// The memoized function panicked while computing this key.
    ///
    /// The panic is memoized like any other failure, the function is not invoked again.
    #[error("computation panicked")]
    Panicked,

    /// The cache was closed before the request could be accepted.
    #[error("cache is closed")]
    Closed,
}

impl<E> Error<E> {
    /// Returns `true` if the request was rejected because the cache is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns the error produced by the memoized function, if any.
    #[must_use]
    pub const fn computation(&self) -> Option<&E> {
        match self {
            Self::Computation(e) => Some(e),
            Self::Panicked | Self::Closed => None,
        }
    }

    /// Consumes `self` and returns the error produced by the memoized function, if any.
    #[must_use]
    pub fn into_computation(self) -> Option<E> {
        match self {
            Self::Computation(e) => Some(e),
            Self::Panicked | Self::Closed => None,
        }
    }
}
