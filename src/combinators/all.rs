//! Join-all.
use std::sync::Arc;

use log::debug;

use super::settle_detached;
use crate::{future::Future, settlable::SettlableFuture, signal::Select};

/// Settle every future concurrently and complete once all of them have
/// settled.
///
/// The joined future's value is the input futures themselves, in their
/// original order; call [Future::result] on each to inspect its individual
/// outcome. The join never fails because a member failed. An empty input
/// settles immediately with an empty vector. Members that are already settled
/// are not handed to a thread of their own.
///
/// ```
/// use settle::{all, Future, SettlableFuture};
/// use std::sync::Arc;
///
/// let items = ["1", "2", "3"].map(|s| Arc::new(SettlableFuture::new(move || Ok(s))));
///
/// let joined = all(items);
/// joined.settle();
///
/// let parts: Vec<_> = joined
///     .result()
///     .unwrap()
///     .iter()
///     .map(|f| f.result().unwrap())
///     .collect();
/// assert_eq!(parts.join(" - "), "1 - 2 - 3");
/// ```
pub fn all<I, F>(futures: I) -> SettlableFuture<Vec<Arc<F>>>
where
    I: IntoIterator<Item = Arc<F>>,
    F: Future + ?Sized + 'static,
{
    let futures: Vec<Arc<F>> = futures.into_iter().collect();

    SettlableFuture::new(move || {
        debug!("Joining {} futures", futures.len());

        for (i, future) in futures.iter().enumerate() {
            if !future.is_settled() {
                settle_detached(future.clone(), format!("settle-all-{i}"))?;
            }
        }

        {
            let mut pending = Select::with_capacity(futures.len());
            for future in &futures {
                pending.insert(future.settled(), ());
            }

            while !pending.is_empty() {
                for key in pending.wait() {
                    pending.remove(key);
                }
            }
        }

        debug!("All {} futures settled", futures.len());

        Ok(futures)
    })
}
