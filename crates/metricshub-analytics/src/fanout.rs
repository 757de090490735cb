//! Concurrent fan-out of independent warehouse queries.
//!
//! Every join is all-or-nothing: an error ends the join and the remaining
//! futures are dropped, so no partial result ever reaches the cache.
//! [`join_all`] returns as soon as any future fails. [`join_bounded`] yields
//! results in input order, so a failure is only seen once every earlier
//! future has finished. Heterogeneous result types join with
//! `tokio::try_join!` instead.

use std::future::Future;
use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt, future, stream};

use crate::query::{QueryError, QueryResult};

/// Runs all `futures` concurrently; results keep input order.
pub async fn join_all<I, F, T>(futures: I) -> QueryResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = QueryResult<T>>,
{
    future::try_join_all(futures).await
}

/// [`join_all`] with at most `limit` futures in flight. A zero limit is
/// treated as one.
pub async fn join_bounded<I, F, T>(limit: usize, futures: I) -> QueryResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = QueryResult<T>>,
{
    stream::iter(futures)
        .buffered(limit.max(1))
        .try_collect()
        .await
}

/// Fails with [`QueryError::Timeout`] when `fut` outlives `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> QueryResult<T>
where
    F: Future<Output = QueryResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Query fan-out exceeded its deadline");
            Err(QueryError::Timeout(deadline))
        }
    }
}

/// [`with_deadline`] when a deadline is configured, the bare future otherwise.
pub async fn with_optional_deadline<F, T>(deadline: Option<Duration>, fut: F) -> QueryResult<T>
where
    F: Future<Output = QueryResult<T>>,
{
    match deadline {
        Some(deadline) => with_deadline(deadline, fut).await,
        None => fut.await,
    }
}
