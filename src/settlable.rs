//! The base settlable future.
//!
//! A [SettlableFuture] wraps a deferred computation. Nothing runs until some
//! caller invokes [Future::settle]; from then on the outcome is fixed and any
//! number of callers may retrieve it.
//!
//! # Example
//!
//! Settling on another thread while the current one blocks on the result:
//!
//! ```
//! use settle::{Future, SettlableFuture};
//! use std::{sync::Arc, thread};
//!
//! let f = Arc::new(SettlableFuture::new(|| Ok("Hello Future!")));
//!
//! {
//!     let f = f.clone();
//!     thread::spawn(move || f.settle());
//! }
//!
//! assert_eq!(f.result().unwrap(), "Hello Future!");
//! ```
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, OnceLock, PoisonError},
};

use log::{trace, warn};

use crate::{
    error::{Error, Outcome},
    future::Future,
    signal::Signal,
};

type Computation<T> = Box<dyn FnOnce() -> Outcome<T> + Send>;

/// Settle-once storage shared by every concrete future in this crate.
///
/// The outcome cell is the one-time execution guard: the first caller of
/// [Slot::fill] claims it and runs the body while all other callers block
/// until the claimant has stored the outcome. The signal is set only after the
/// outcome is in place, and nothing outside the crate can set it.
pub(crate) struct Slot<T> {
    outcome: OnceLock<Outcome<T>>,
    signal: Signal,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: OnceLock::new(),
            signal: Signal::new(),
        }
    }

    pub(crate) fn fill(&self, body: impl FnOnce() -> Outcome<T>) {
        self.outcome.get_or_init(|| {
            trace!("Settling future {:p}", self);

            panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
                let err = Error::panicked(payload);
                warn!("{err}");
                Err(err)
            })
        });

        self.signal.set();
    }

    pub(crate) fn signal(&self) -> &Signal {
        &self.signal
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.signal.is_set()
    }
}

impl<T: Clone> Slot<T> {
    pub(crate) fn outcome(&self) -> Outcome<T> {
        if let Some(outcome) = self.outcome.get() {
            return outcome.clone();
        }

        self.signal.wait();

        self.outcome
            .get()
            .cloned()
            .unwrap_or_else(|| Err(Error::msg("future signalled settled without an outcome")))
    }
}

/// A future over a deferred computation.
///
/// See the [module-level documentation](self) for more information.
pub struct SettlableFuture<T> {
    computation: Mutex<Option<Computation<T>>>,
    slot: Slot<T>,
}

impl<T> SettlableFuture<T> {
    /// Create an unsettled future over `f`. The computation does not run until
    /// the future is settled.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Outcome<T> + Send + 'static,
    {
        Self {
            computation: Mutex::new(Some(Box::new(f))),
            slot: Slot::new(),
        }
    }

    /// Create a future that is already settled with `value`.
    pub fn resolved(value: T) -> Self {
        Self::from_outcome(Ok(value))
    }

    /// Create a future that is already settled with `err`.
    pub fn rejected(err: Error) -> Self {
        Self::from_outcome(Err(err))
    }

    fn from_outcome(outcome: Outcome<T>) -> Self {
        let slot = Slot::new();
        slot.fill(|| outcome);

        Self {
            computation: Mutex::new(None),
            slot,
        }
    }
}

impl<T> Future for SettlableFuture<T>
where
    T: Clone + Send + Sync,
{
    type Output = T;

    fn settle(&self) {
        self.slot.fill(|| {
            let computation = self
                .computation
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();

            match computation {
                Some(f) => f(),
                None => Err(Error::msg("computation already consumed")),
            }
        });
    }

    fn settled(&self) -> &Signal {
        self.slot.signal()
    }

    fn result(&self) -> Outcome<T> {
        self.slot.outcome()
    }
}

impl<T> fmt::Debug for SettlableFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlableFuture")
            .field("settled", &self.slot.is_filled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{SettlableFuture, Slot};
    use crate::{Error, Future};
    use anyhow::Result;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc, Arc,
        },
        thread,
        time::Duration,
    };

    #[test]
    fn settles_with_value() -> Result<()> {
        let f = SettlableFuture::new(|| Ok(19));

        f.settle();

        assert_eq!(f.result()?, 19);

        Ok(())
    }

    #[test]
    fn settles_with_error() {
        let expected = Error::msg("expected error");
        let e = expected.clone();
        let f = SettlableFuture::<i32>::new(move || Err(e));

        f.settle();

        let err = f.result().unwrap_err();
        assert!(Error::ptr_eq(&err, &expected));
    }

    #[test]
    fn result_many_times() -> Result<()> {
        let f = SettlableFuture::new(|| Ok(String::from("19")));

        f.settle();

        for _ in 0..1000 {
            assert_eq!(f.result()?, "19");
        }

        Ok(())
    }

    #[test]
    fn settle_many_times_runs_once() -> Result<()> {
        let runs = Arc::new(AtomicUsize::new(0));
        let f = {
            let runs = runs.clone();
            SettlableFuture::new(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(19)
            })
        };

        for _ in 0..1000 {
            f.settle();
        }

        assert_eq!(f.result()?, 19);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        Ok(())
    }

    #[test]
    fn concurrent_settle_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let f = {
            let runs = runs.clone();
            Arc::new(SettlableFuture::new(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Ok(19)
            }))
        };

        let settlers: Vec<_> = (0..16)
            .map(|_| {
                let f = f.clone();
                thread::spawn(move || {
                    f.settle();
                    // Settle only returns once the outcome is visible.
                    assert!(f.is_settled());
                    f.result().unwrap()
                })
            })
            .collect();

        for settler in settlers {
            assert_eq!(settler.join().unwrap(), 19);
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn result_blocks_until_settled() -> Result<()> {
        let f = Arc::new(SettlableFuture::new(|| Ok(19)));
        let (tx, rx) = mpsc::channel();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let f = f.clone();
                let tx = tx.clone();
                thread::spawn(move || tx.send(f.result().unwrap()).unwrap())
            })
            .collect();

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        f.settle();

        for _ in 0..4 {
            assert_eq!(rx.recv_timeout(Duration::from_secs(5))?, 19);
        }

        for waiter in waiters {
            waiter.join().unwrap();
        }

        Ok(())
    }

    #[test]
    fn settled_does_not_block() {
        let f = SettlableFuture::new(|| Ok(19));

        assert!(!f.is_settled());
        assert!(!f.settled().wait_timeout(Duration::ZERO));

        f.settle();

        assert!(f.is_settled());
        assert!(f.settled().wait_timeout(Duration::ZERO));
    }

    #[test]
    fn wait_with_timeout() {
        let f = Arc::new(SettlableFuture::new(|| {
            thread::sleep(Duration::from_secs(2));
            Ok("Hello Future!")
        }));

        {
            let f = f.clone();
            thread::spawn(move || f.settle());
        }

        assert!(!f.settled().wait_timeout(Duration::from_millis(50)));
    }

    #[test]
    fn panic_becomes_error() {
        let f = SettlableFuture::<i32>::new(|| panic!("kaboom"));

        f.settle();

        let err = f.result().unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "computation panicked: kaboom");
        assert!(f.is_settled());
    }

    #[test]
    fn already_settled() -> Result<()> {
        let ok = SettlableFuture::resolved(7);
        assert!(ok.is_settled());
        assert_eq!(ok.result()?, 7);

        let err = SettlableFuture::<i32>::rejected(Error::msg("nope"));
        err.settle();
        assert_eq!(err.result().unwrap_err().to_string(), "nope");

        Ok(())
    }

    #[test]
    fn signal_without_outcome_is_an_error() {
        let slot = Slot::<i32>::new();

        slot.signal().set();

        let err = slot.outcome().unwrap_err();
        assert_eq!(err.to_string(), "future signalled settled without an outcome");
    }

    #[test]
    fn many_live_futures() -> Result<()> {
        let futures: Vec<_> = (0..5000).map(|i| SettlableFuture::new(move || Ok(i))).collect();

        for f in &futures {
            f.settle();
        }

        for (i, f) in futures.iter().enumerate() {
            assert_eq!(f.result()?, i);
        }

        Ok(())
    }
}
