//! Concurrent batch processing utilities.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Processes items with a bounded number of operations in flight.
///
/// Each item is handed to `processor` together with its index; results arrive in
/// completion order, and items whose processor returns `None` are dropped.
///
/// # Examples
///
/// ```no_run
/// # use core_jpt::fetch::batch::process_in_batches;
/// # async fn example() {
/// let urls = vec!["url1", "url2", "url3"];
/// let results = process_in_batches(
///     urls,
///     |url, _index| async move { Some(format!("Processed: {}", url)) },
///     2,
/// )
/// .await;
/// # }
/// ```
pub async fn process_in_batches<T, F, Fut, R>(items: Vec<T>, processor: F, concurrency: usize) -> Vec<R>
where
    F: Fn(T, usize) -> Fut,
    Fut: Future<Output = Option<R>>,
{
    stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| processor(item, index))
        .buffer_unordered(concurrency.max(1))
        .filter_map(|result| async move { result })
        .collect()
        .await
}
