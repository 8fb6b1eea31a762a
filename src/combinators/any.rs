//! Race-any.
use std::sync::Arc;

use log::debug;

use super::settle_detached;
use crate::{
    error::Error,
    future::Future,
    settlable::SettlableFuture,
    signal::Select,
};

/// Settle every future concurrently and complete with the outcome of the first
/// one to settle, success or error alike.
///
/// Losing futures are not cancelled: their computations keep running in the
/// background and their outcomes are simply not used here. If several futures
/// settle at effectively the same moment, any one of them may win. An empty
/// input settles with an error.
///
/// Racing against a timer future is how a timeout is expressed:
///
/// ```
/// use settle::{any, Error, Future, SettlableFuture};
/// use std::{sync::Arc, thread, time::Duration};
///
/// let work = Arc::new(SettlableFuture::new(|| {
///     thread::sleep(Duration::from_secs(5));
///     Ok("Hello Future!")
/// }));
/// let timeout = Arc::new(SettlableFuture::new(|| {
///     thread::sleep(Duration::from_millis(50));
///     Err(Error::msg("Timed out!"))
/// }));
///
/// let race = any([work, timeout]);
/// race.settle();
///
/// assert_eq!(race.result().unwrap_err().to_string(), "Timed out!");
/// ```
pub fn any<I, F>(futures: I) -> SettlableFuture<F::Output>
where
    I: IntoIterator<Item = Arc<F>>,
    F: Future + ?Sized + 'static,
    F::Output: Clone + Send + Sync,
{
    let futures: Vec<Arc<F>> = futures.into_iter().collect();

    SettlableFuture::new(move || {
        if futures.is_empty() {
            return Err(Error::msg("no futures to race"));
        }

        debug!("Racing {} futures", futures.len());

        for (i, future) in futures.iter().enumerate() {
            if !future.is_settled() {
                settle_detached(future.clone(), format!("settle-any-{i}"))?;
            }
        }

        let mut racers = Select::with_capacity(futures.len());
        for (i, future) in futures.iter().enumerate() {
            racers.insert(future.settled(), i);
        }

        let winner = racers
            .wait()
            .first()
            .and_then(|key| racers.get(*key))
            .copied()
            .ok_or_else(|| Error::msg("race finished without a winner"))?;

        debug!("Future {winner} won the race");

        futures[winner].result()
    })
}

#[cfg(test)]
mod tests {
    use super::any;
    use crate::{all, Error, Future, SettlableFuture};
    use anyhow::Result;
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    fn delayed(ms: u64, outcome: crate::Outcome<i32>) -> Arc<SettlableFuture<i32>> {
        Arc::new(SettlableFuture::new(move || {
            thread::sleep(Duration::from_millis(ms));
            outcome
        }))
    }

    #[test]
    fn fastest_value_wins() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let items = [
            delayed(500, Ok(119)),
            delayed(500, Ok(1119)),
            delayed(0, Ok(19)),
        ];

        let before = Instant::now();
        let race = any(items);
        race.settle();

        assert_eq!(race.result()?, 19);
        assert!(before.elapsed() < Duration::from_millis(400));

        Ok(())
    }

    #[test]
    fn fastest_error_wins() -> Result<()> {
        let expected = Error::msg("expected error");
        let items = [
            delayed(500, Ok(119)),
            delayed(500, Ok(1119)),
            delayed(0, Err(expected.clone())),
        ];

        let race = any(items);
        race.settle();

        assert!(Error::ptr_eq(&race.result().unwrap_err(), &expected));

        Ok(())
    }

    #[test]
    fn losers_keep_running() -> Result<()> {
        let finished = Arc::new(AtomicBool::new(false));
        let slow = {
            let finished = finished.clone();
            Arc::new(SettlableFuture::new(move || {
                thread::sleep(Duration::from_millis(200));
                finished.store(true, Ordering::SeqCst);
                Ok(1)
            }))
        };

        let race = any([slow.clone(), delayed(0, Ok(2))]);
        race.settle();

        assert_eq!(race.result()?, 2);
        assert!(!finished.load(Ordering::SeqCst));

        slow.result()?;
        assert!(finished.load(Ordering::SeqCst));

        Ok(())
    }

    #[test]
    fn simultaneous_winners_do_not_hang() -> Result<()> {
        let items: Vec<_> = (0..8).map(|i| delayed(0, Ok(i))).collect();

        let race = any(items);
        race.settle();

        assert!((0..8).contains(&race.result()?));

        Ok(())
    }

    #[test]
    fn already_settled_member_wins() -> Result<()> {
        let done = Arc::new(SettlableFuture::resolved(5));
        let race = any([delayed(500, Ok(1)), done]);

        let before = Instant::now();
        race.settle();

        assert_eq!(race.result()?, 5);
        assert!(before.elapsed() < Duration::from_millis(400));

        Ok(())
    }

    #[test]
    fn empty_race_is_an_error() -> Result<()> {
        let race = any(Vec::<Arc<SettlableFuture<i32>>>::new());
        race.settle();

        assert!(race.result().is_err());

        Ok(())
    }

    #[test]
    fn races_joined_futures() -> Result<()> {
        let slow = Arc::new(all([delayed(500, Ok(1))]));
        let fast = Arc::new(all([delayed(0, Ok(2)), delayed(10, Ok(3))]));

        let race = any([slow, fast]);
        race.settle();

        let winners = race.result()?;
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[1].result()?, 3);

        Ok(())
    }
}
